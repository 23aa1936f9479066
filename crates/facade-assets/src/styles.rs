//! Stylesheet compilation.
//!
//! Uses lightningcss to lower nested rules, vendor-prefix against the
//! configured browser matrix, and minify. All stylesheet sources are
//! concatenated into a single artifact in lexicographic path order, with an
//! adjacent source map referencing the original files.

use std::io;
use std::path::PathBuf;

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::{OriginalLocation, SourceMap};

use crate::walk::{relative_path, walk_files};

/// Configuration for the style transform task.
#[derive(Debug, Clone)]
pub struct StyleOptions {
    /// Stylesheet source tree
    pub source_dir: PathBuf,

    /// Directory the artifact and its map are written to
    pub out_dir: PathBuf,

    /// Artifact file name
    pub artifact: String,

    /// Browserslist queries for vendor prefixing
    pub browsers: Vec<String>,

    /// Upgrade per-file syntax errors from logged-and-skipped to fatal.
    /// Production builds set this; interactive development leaves it off so
    /// one broken file does not block a rebuild cycle.
    pub strict: bool,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src/assets/css"),
            out_dir: PathBuf::from("dist/assets/css"),
            artifact: "main.min.css".to_string(),
            browsers: vec!["last 2 versions".to_string()],
            strict: false,
        }
    }
}

/// Outcome of a style compilation run.
#[derive(Debug, Default)]
pub struct StyleReport {
    /// Files compiled into the artifact
    pub compiled: usize,

    /// Files skipped because of syntax errors (non-strict mode)
    pub skipped: usize,
}

/// Errors that can occur while compiling styles.
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error("{0}")]
    Parse(String),

    #[error("Invalid browser targets: {0}")]
    Targets(String),

    #[error("Source map error: {0}")]
    SourceMap(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Compile all stylesheet sources into one minified artifact.
///
/// Per-file syntax errors are logged with file and line context and the
/// file is skipped, unless `strict` is set. The emitted map carries one
/// mapping per input file (each minified file occupies one output line).
pub async fn compile_styles(options: &StyleOptions) -> Result<StyleReport, StyleError> {
    let files = walk_files(&options.source_dir, &["css"]);
    if files.is_empty() {
        tracing::debug!("No stylesheets under {}", options.source_dir.display());
        return Ok(StyleReport::default());
    }

    let browsers = Browsers::from_browserslist(options.browsers.iter().map(String::as_str))
        .map_err(|e| StyleError::Targets(e.to_string()))?;
    let targets = Targets {
        browsers,
        ..Targets::default()
    };

    let map_name = format!("{}.map", options.artifact);
    let mut map = SourceMap::new("/");
    let mut bundle = String::new();
    let mut report = StyleReport::default();

    for file in &files {
        let rel = relative_path(&options.source_dir, file);
        let rel_str = rel.to_string_lossy().replace('\\', "/");

        let source = std::fs::read_to_string(file).map_err(|source| StyleError::Io {
            path: file.clone(),
            source,
        })?;

        let compiled = {
            let parsed = StyleSheet::parse(
                &source,
                ParserOptions {
                    filename: rel_str.clone(),
                    ..ParserOptions::default()
                },
            );

            match parsed {
                Ok(stylesheet) => stylesheet
                    .to_css(PrinterOptions {
                        minify: true,
                        targets,
                        ..PrinterOptions::default()
                    })
                    .map(|out| out.code)
                    .map_err(|e| format!("{}: {}", rel_str, e)),
                Err(e) => Err(match &e.loc {
                    Some(loc) => {
                        format!("{}:{}:{}: {}", rel_str, loc.line + 1, loc.column, e.kind)
                    }
                    None => format!("{}: {}", rel_str, e.kind),
                }),
            }
        };

        match compiled {
            Ok(css) => {
                let line = bundle.lines().count() as u32;
                let source_id = map.add_source(&rel_str);
                let _ = map.set_source_content(source_id as usize, &source);
                map.add_mapping(
                    line,
                    0,
                    Some(OriginalLocation {
                        original_line: 0,
                        original_column: 0,
                        source: source_id,
                        name: None,
                    }),
                );

                bundle.push_str(&css);
                bundle.push('\n');
                report.compiled += 1;
            }
            Err(message) => {
                if options.strict {
                    return Err(StyleError::Parse(message));
                }
                tracing::error!("Stylesheet error (skipping file): {}", message);
                report.skipped += 1;
            }
        }
    }

    bundle.push_str(&format!("/*# sourceMappingURL={} */\n", map_name));

    let map_json = map
        .to_json(None)
        .map_err(|e| StyleError::SourceMap(format!("{:?}", e)))?;

    std::fs::create_dir_all(&options.out_dir).map_err(|source| StyleError::Io {
        path: options.out_dir.clone(),
        source,
    })?;

    let artifact_path = options.out_dir.join(&options.artifact);
    std::fs::write(&artifact_path, &bundle).map_err(|source| StyleError::Io {
        path: artifact_path.clone(),
        source,
    })?;

    let map_path = options.out_dir.join(&map_name);
    std::fs::write(&map_path, map_json).map_err(|source| StyleError::Io {
        path: map_path,
        source,
    })?;

    tracing::info!(
        "Compiled {} stylesheet(s) into {}",
        report.compiled,
        artifact_path.display()
    );

    Ok(report)
}
