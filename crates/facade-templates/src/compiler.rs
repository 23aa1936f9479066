//! Template compiler.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use minijinja::{path_loader, Environment, Value};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::frontmatter::extract_frontmatter;

/// Configuration for the template compiler.
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    /// Root of the template tree, containing `pages/`, `layouts/`,
    /// `partials/` and `data/`
    pub html_dir: PathBuf,

    /// Output root; each page keeps its path relative to `pages/`
    pub out_dir: PathBuf,

    /// Layout used when a page declares none
    pub default_layout: String,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            html_dir: PathBuf::from("src/html"),
            out_dir: PathBuf::from("dist"),
            default_layout: "default.html".to_string(),
        }
    }
}

/// Outcome of a compile run.
#[derive(Debug, Default)]
pub struct CompileReport {
    /// Pages written
    pub pages: usize,

    /// Pages that failed (isolated; siblings still compile)
    pub failed: usize,
}

/// Errors fatal to a whole compile run. Per-page failures are reported in
/// [`CompileReport::failed`] instead.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Pages directory not found: {0}")]
    PagesDirMissing(PathBuf),

    #[error("Failed to load data file {path}: {message}")]
    Data { path: PathBuf, message: String },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Compiles pages against layouts, partials and data.
///
/// The minijinja environment's loader cache is the template cache: layouts
/// and partials are parsed once and reused across pages and compile runs.
/// Compilation is pure given that cache state, so a change to a layout or
/// partial on disk is not reflected until [`TemplateCompiler::invalidate`]
/// runs. Page sources and data files are read fresh on every run.
///
/// Layouts receive the rendered page as `body` and should emit it with the
/// `safe` filter.
pub struct TemplateCompiler {
    options: TemplateOptions,
    env: Environment<'static>,
}

impl TemplateCompiler {
    pub fn new(options: TemplateOptions) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(&options.html_dir));
        register_helpers(&mut env);
        Self { options, env }
    }

    /// Clear the parsed layout/partial cache.
    ///
    /// Must run after any template-source change and before the next
    /// compile, or stale markup is emitted.
    pub fn invalidate(&mut self) {
        self.env.clear_templates();
        tracing::info!("Cleared template cache");
    }

    /// Compile every page under `pages/` into the output tree.
    pub fn compile_all(&self) -> Result<CompileReport, TemplateError> {
        let pages_dir = self.options.html_dir.join("pages");
        if !pages_dir.exists() {
            return Err(TemplateError::PagesDirMissing(pages_dir));
        }

        let data = self.load_data()?;

        let mut pages: Vec<PathBuf> = WalkDir::new(&pages_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("html"))
            .collect();
        pages.sort();

        std::fs::create_dir_all(&self.options.out_dir).map_err(|source| TemplateError::Io {
            path: self.options.out_dir.clone(),
            source,
        })?;

        let results: Vec<Result<(), String>> = pages
            .par_iter()
            .map(|page| self.compile_page(page, &pages_dir, &data))
            .collect();

        let mut report = CompileReport::default();
        for (page, result) in pages.iter().zip(results) {
            match result {
                Ok(()) => report.pages += 1,
                Err(message) => {
                    tracing::error!("Failed to compile {}: {}", page.display(), message);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Compiled {} page(s) ({} failed)",
            report.pages,
            report.failed
        );

        Ok(report)
    }

    /// Compile one page. Any error here is scoped to the page.
    fn compile_page(
        &self,
        page: &Path,
        pages_dir: &Path,
        data: &Value,
    ) -> Result<(), String> {
        let source = std::fs::read_to_string(page).map_err(|e| e.to_string())?;
        let (meta, body) = extract_frontmatter(&source).map_err(|e| e.to_string())?;
        let meta = meta.unwrap_or_default();

        let rel = page.strip_prefix(pages_dir).unwrap_or(page).to_path_buf();

        let mut vars: BTreeMap<String, Value> = BTreeMap::new();
        vars.insert("data".to_string(), data.clone());
        for (key, value) in &meta.extra {
            vars.insert(key.clone(), Value::from_serialize(value));
        }
        let title = meta.title.clone().unwrap_or_else(|| {
            rel.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Untitled")
                .to_string()
        });
        vars.insert("title".to_string(), Value::from(title));

        let body_html = self
            .env
            .render_str(body, Value::from_serialize(&vars))
            .map_err(|e| e.to_string())?;

        let mut layout = meta
            .layout
            .unwrap_or_else(|| self.options.default_layout.clone());
        if !layout.ends_with(".html") {
            layout.push_str(".html");
        }

        let template = self
            .env
            .get_template(&format!("layouts/{}", layout))
            .map_err(|e| e.to_string())?;

        vars.insert("body".to_string(), Value::from(body_html));
        let html = template
            .render(Value::from_serialize(&vars))
            .map_err(|e| e.to_string())?;

        let out_path = self.options.out_dir.join(&rel);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(&out_path, html).map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Load `data/*.json` into a map keyed by file stem, read fresh on every
    /// compile run.
    fn load_data(&self) -> Result<Value, TemplateError> {
        let data_dir = self.options.html_dir.join("data");
        let mut data: BTreeMap<String, serde_json::Value> = BTreeMap::new();

        if data_dir.exists() {
            let mut files: Vec<PathBuf> = WalkDir::new(&data_dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.path().to_path_buf())
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
                .collect();
            files.sort();

            for file in files {
                let content = std::fs::read_to_string(&file).map_err(|e| TemplateError::Data {
                    path: file.clone(),
                    message: e.to_string(),
                })?;
                let value: serde_json::Value =
                    serde_json::from_str(&content).map_err(|e| TemplateError::Data {
                        path: file.clone(),
                        message: e.to_string(),
                    })?;
                let key = file
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("data")
                    .to_string();
                data.insert(key, value);
            }
        }

        Ok(Value::from_serialize(&data))
    }
}

/// Named helper functions available to all templates.
fn register_helpers(env: &mut Environment<'static>) {
    env.add_function("asset", |path: String| {
        format!("/assets/{}", path.trim_start_matches('/'))
    });
    env.add_function("slug", |text: String| {
        let mut out = String::with_capacity(text.len());
        let mut last_dash = false;
        for c in text.to_lowercase().chars() {
            if c.is_alphanumeric() {
                out.push(c);
                last_dash = false;
            } else if !last_dash && !out.is_empty() {
                out.push('-');
                last_dash = true;
            }
        }
        out.trim_end_matches('-').to_string()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn site(temp: &Path) -> TemplateOptions {
        let html = temp.join("html");
        fs::create_dir_all(html.join("pages")).unwrap();
        fs::create_dir_all(html.join("layouts")).unwrap();
        fs::create_dir_all(html.join("partials")).unwrap();
        fs::create_dir_all(html.join("data")).unwrap();
        fs::write(
            html.join("layouts/default.html"),
            "<html><body>{{ body | safe }}</body></html>",
        )
        .unwrap();
        TemplateOptions {
            html_dir: html,
            out_dir: temp.join("dist"),
            default_layout: "default.html".to_string(),
        }
    }

    #[test]
    fn compiles_page_into_layout_with_partial() {
        let temp = tempdir().unwrap();
        let opts = site(temp.path());
        fs::write(
            opts.html_dir.join("partials/nav.html"),
            "<nav>links</nav>",
        )
        .unwrap();
        fs::write(
            opts.html_dir.join("pages/index.html"),
            "---\ntitle: Home\n---\n{% include \"partials/nav.html\" %}<h1>{{ title }}</h1>",
        )
        .unwrap();

        let compiler = TemplateCompiler::new(opts.clone());
        let report = compiler.compile_all().unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(report.failed, 0);

        let html = fs::read_to_string(opts.out_dir.join("index.html")).unwrap();
        assert!(html.contains("<nav>links</nav>"));
        assert!(html.contains("<h1>Home</h1>"));
        assert!(html.starts_with("<html>"));
    }

    #[test]
    fn missing_partial_fails_only_that_page() {
        let temp = tempdir().unwrap();
        let opts = site(temp.path());
        fs::write(
            opts.html_dir.join("pages/bad.html"),
            "{% include \"partials/missing.html\" %}",
        )
        .unwrap();
        fs::write(opts.html_dir.join("pages/good.html"), "<p>fine</p>").unwrap();

        let compiler = TemplateCompiler::new(opts.clone());
        let report = compiler.compile_all().unwrap();

        assert_eq!(report.pages, 1);
        assert_eq!(report.failed, 1);
        assert!(opts.out_dir.join("good.html").exists());
        assert!(!opts.out_dir.join("bad.html").exists());
    }

    #[test]
    fn layout_change_requires_invalidation() {
        let temp = tempdir().unwrap();
        let opts = site(temp.path());
        fs::write(opts.html_dir.join("pages/index.html"), "<p>x</p>").unwrap();

        let mut compiler = TemplateCompiler::new(opts.clone());
        compiler.compile_all().unwrap();

        // Change the layout on disk. Without invalidation the cached parse
        // still wins.
        fs::write(
            opts.html_dir.join("layouts/default.html"),
            "<html class=\"v2\"><body>{{ body | safe }}</body></html>",
        )
        .unwrap();
        compiler.compile_all().unwrap();
        let stale = fs::read_to_string(opts.out_dir.join("index.html")).unwrap();
        assert!(!stale.contains("v2"));

        // Invalidate, then recompile: the new layout shows up.
        compiler.invalidate();
        compiler.compile_all().unwrap();
        let fresh = fs::read_to_string(opts.out_dir.join("index.html")).unwrap();
        assert!(fresh.contains("v2"));
    }

    #[test]
    fn binds_data_files_into_context() {
        let temp = tempdir().unwrap();
        let opts = site(temp.path());
        fs::write(
            opts.html_dir.join("data/site.json"),
            r#"{"name": "Facade Demo"}"#,
        )
        .unwrap();
        fs::write(
            opts.html_dir.join("pages/index.html"),
            "<h1>{{ data.site.name }}</h1>",
        )
        .unwrap();

        let compiler = TemplateCompiler::new(opts.clone());
        compiler.compile_all().unwrap();

        let html = fs::read_to_string(opts.out_dir.join("index.html")).unwrap();
        assert!(html.contains("Facade Demo"));
    }

    #[test]
    fn preserves_relative_page_paths() {
        let temp = tempdir().unwrap();
        let opts = site(temp.path());
        fs::create_dir_all(opts.html_dir.join("pages/about")).unwrap();
        fs::write(opts.html_dir.join("pages/about/team.html"), "<p>team</p>").unwrap();

        let compiler = TemplateCompiler::new(opts.clone());
        compiler.compile_all().unwrap();

        assert!(opts.out_dir.join("about/team.html").exists());
    }

    #[test]
    fn front_matter_selects_layout() {
        let temp = tempdir().unwrap();
        let opts = site(temp.path());
        fs::write(
            opts.html_dir.join("layouts/bare.html"),
            "<main>{{ body | safe }}</main>",
        )
        .unwrap();
        fs::write(
            opts.html_dir.join("pages/plain.html"),
            "---\nlayout: bare\n---\n<p>hi</p>",
        )
        .unwrap();

        let compiler = TemplateCompiler::new(opts.clone());
        compiler.compile_all().unwrap();

        let html = fs::read_to_string(opts.out_dir.join("plain.html")).unwrap();
        assert!(html.starts_with("<main>"));
    }

    #[test]
    fn helper_functions_are_callable() {
        let temp = tempdir().unwrap();
        let opts = site(temp.path());
        fs::write(
            opts.html_dir.join("pages/index.html"),
            "{{ asset(\"css/main.min.css\") }} {{ slug(\"Hello World!\") }}",
        )
        .unwrap();

        let compiler = TemplateCompiler::new(opts.clone());
        compiler.compile_all().unwrap();

        let html = fs::read_to_string(opts.out_dir.join("index.html")).unwrap();
        assert!(html.contains("/assets/css/main.min.css"));
        assert!(html.contains("hello-world"));
    }
}
