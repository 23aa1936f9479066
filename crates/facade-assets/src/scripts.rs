//! Script bundling and minification.
//!
//! Sources are concatenated in lexicographic path order into one bundle with
//! a line-accurate source map, then minified with oxc into a second,
//! separate artifact. A syntax error is fatal to the invocation: nothing is
//! written, so the previous artifacts stay untouched on disk.

use std::io;
use std::path::PathBuf;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use parcel_sourcemap::{OriginalLocation, SourceMap};

use crate::walk::{relative_path, walk_files};

/// Configuration for the script transform task.
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Script source tree
    pub source_dir: PathBuf,

    /// Directory the bundles are written to
    pub out_dir: PathBuf,

    /// Concatenated bundle file name
    pub bundle: String,

    /// Minified bundle file name
    pub minified: String,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src/assets/js"),
            out_dir: PathBuf::from("dist/assets/js"),
            bundle: "bundle.js".to_string(),
            minified: "bundle.min.js".to_string(),
        }
    }
}

/// Outcome of a script bundling run.
#[derive(Debug, Default)]
pub struct ScriptReport {
    /// Source files concatenated
    pub files: usize,

    /// Size of the minified artifact in bytes
    pub minified_bytes: usize,
}

/// Errors that can occur while bundling scripts.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Script syntax error: {0}")]
    Parse(String),

    #[error("Source map error: {0}")]
    SourceMap(String),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Concatenate and minify all script sources.
pub async fn bundle_scripts(options: &ScriptOptions) -> Result<ScriptReport, ScriptError> {
    let files = walk_files(&options.source_dir, &["js"]);
    if files.is_empty() {
        tracing::debug!("No scripts under {}", options.source_dir.display());
        return Ok(ScriptReport::default());
    }

    let map_name = format!("{}.map", options.bundle);
    let mut map = SourceMap::new("/");
    let mut bundle = String::new();
    let mut generated_line: u32 = 0;

    for file in &files {
        let rel = relative_path(&options.source_dir, file);
        let rel_str = rel.to_string_lossy().replace('\\', "/");

        let source = std::fs::read_to_string(file).map_err(|source| ScriptError::Io {
            path: file.clone(),
            source,
        })?;

        let source_id = map.add_source(&rel_str);
        let _ = map.set_source_content(source_id as usize, &source);

        for (line, _) in source.lines().enumerate() {
            map.add_mapping(
                generated_line,
                0,
                Some(OriginalLocation {
                    original_line: line as u32,
                    original_column: 0,
                    source: source_id,
                    name: None,
                }),
            );
            generated_line += 1;
        }

        bundle.push_str(&source);
        if !bundle.ends_with('\n') {
            bundle.push('\n');
        }
    }

    // Minify before touching the destination; a syntax error must leave the
    // previous artifact version on disk.
    let minified = minify_js(&bundle).map_err(ScriptError::Parse)?;

    let map_json = map
        .to_json(None)
        .map_err(|e| ScriptError::SourceMap(format!("{:?}", e)))?;

    std::fs::create_dir_all(&options.out_dir).map_err(|source| ScriptError::Io {
        path: options.out_dir.clone(),
        source,
    })?;

    let bundle_path = options.out_dir.join(&options.bundle);
    let annotated = format!("{}//# sourceMappingURL={}\n", bundle, map_name);
    std::fs::write(&bundle_path, annotated).map_err(|source| ScriptError::Io {
        path: bundle_path.clone(),
        source,
    })?;

    let map_path = options.out_dir.join(&map_name);
    std::fs::write(&map_path, map_json).map_err(|source| ScriptError::Io {
        path: map_path,
        source,
    })?;

    let minified_path = options.out_dir.join(&options.minified);
    std::fs::write(&minified_path, &minified).map_err(|source| ScriptError::Io {
        path: minified_path.clone(),
        source,
    })?;

    tracing::info!(
        "Bundled {} script(s) into {}",
        files.len(),
        minified_path.display()
    );

    Ok(ScriptReport {
        files: files.len(),
        minified_bytes: minified.len(),
    })
}

/// Minify JavaScript source code with oxc.
///
/// Returns the parser diagnostics as the error string when the source does
/// not parse; the minifier has no degraded mode.
fn minify_js(source: &str) -> Result<String, String> {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        let diagnostics: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        return Err(diagnostics.join("; "));
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn options(temp: &std::path::Path) -> ScriptOptions {
        ScriptOptions {
            source_dir: temp.join("js"),
            out_dir: temp.join("dist/assets/js"),
            ..ScriptOptions::default()
        }
    }

    #[tokio::test]
    async fn concatenates_in_lexicographic_order() {
        let temp = tempdir().unwrap();
        let opts = options(temp.path());
        fs::create_dir_all(&opts.source_dir).unwrap();
        fs::write(opts.source_dir.join("b.js"), "console.log('b');\n").unwrap();
        fs::write(opts.source_dir.join("a.js"), "console.log('a');\n").unwrap();

        let report = bundle_scripts(&opts).await.unwrap();
        assert_eq!(report.files, 2);

        let bundle = fs::read_to_string(opts.out_dir.join("bundle.js")).unwrap();
        let a = bundle.find("'a'").unwrap();
        let b = bundle.find("'b'").unwrap();
        assert!(a < b);
        assert!(bundle.contains("sourceMappingURL=bundle.js.map"));

        let map = fs::read_to_string(opts.out_dir.join("bundle.js.map")).unwrap();
        assert!(map.contains("a.js"));
        assert!(map.contains("b.js"));

        assert!(opts.out_dir.join("bundle.min.js").exists());
    }

    #[tokio::test]
    async fn syntax_error_is_fatal_and_writes_nothing() {
        let temp = tempdir().unwrap();
        let opts = options(temp.path());
        fs::create_dir_all(&opts.source_dir).unwrap();

        // First, a good build so previous artifacts exist.
        fs::write(opts.source_dir.join("a.js"), "let x = 1;\n").unwrap();
        bundle_scripts(&opts).await.unwrap();
        let before = fs::read(opts.out_dir.join("bundle.min.js")).unwrap();

        // Now break a source file.
        fs::write(opts.source_dir.join("a.js"), "let x = ;\n").unwrap();
        let err = bundle_scripts(&opts).await.unwrap_err();
        assert!(matches!(err, ScriptError::Parse(_)));

        // Previous artifact version untouched.
        let after = fs::read(opts.out_dir.join("bundle.min.js")).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn minified_bundle_is_smaller() {
        let temp = tempdir().unwrap();
        let opts = options(temp.path());
        fs::create_dir_all(&opts.source_dir).unwrap();
        fs::write(
            opts.source_dir.join("app.js"),
            "const answer = 40 + 2;\nconsole.log(answer);\n",
        )
        .unwrap();

        bundle_scripts(&opts).await.unwrap();

        let bundle = fs::read(opts.out_dir.join("bundle.js")).unwrap();
        let minified = fs::read(opts.out_dir.join("bundle.min.js")).unwrap();
        assert!(minified.len() < bundle.len());
    }

    #[test]
    fn minify_rejects_bad_syntax() {
        assert!(minify_js("function {").is_err());
        assert!(minify_js("const a = 1;").is_ok());
    }
}
