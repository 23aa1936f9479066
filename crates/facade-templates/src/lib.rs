//! HTML template compilation.
//!
//! Pages, layouts, partials and data files combine into one output document
//! per page. Parsed layouts and partials are cached inside the compiler and
//! must be explicitly invalidated after a template-source change.

pub mod compiler;
pub mod frontmatter;

pub use compiler::{CompileReport, TemplateCompiler, TemplateError, TemplateOptions};
pub use frontmatter::{extract_frontmatter, FrontmatterError, PageMeta};
