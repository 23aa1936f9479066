//! Asset transform tasks.
//!
//! Each task is a stateless source-to-destination pipeline: it enumerates a
//! source tree, applies transforms delegated to external libraries, and
//! writes under the destination root. Tasks never write outside their own
//! destination subpath, which is what makes running them concurrently safe.

pub mod clean;
pub mod copy;
pub mod fingerprint;
pub mod icons;
pub mod images;
pub mod scripts;
pub mod styles;
pub mod walk;

pub use clean::{clean_dist, CleanError};
pub use copy::{copy_fonts, copy_media, CopyError, CopyReport, FONT_EXTENSIONS};
pub use fingerprint::fingerprint;
pub use icons::{generate_icons, IconError, IconOptions, IconReport};
pub use images::{optimize_images, ImageError, ImageOptions, ImageReport, IMAGE_EXTENSIONS};
pub use scripts::{bundle_scripts, ScriptError, ScriptOptions, ScriptReport};
pub use styles::{compile_styles, StyleError, StyleOptions, StyleReport};
