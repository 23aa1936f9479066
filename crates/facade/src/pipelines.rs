//! The build pipelines, expressed as task graphs.
//!
//! `production_graph` is the release pipeline: clean, then styles, then every
//! remaining task concurrently. Concurrency is safe because each task writes
//! a disjoint destination subpath. `dev_graph` runs the same tasks strictly
//! in sequence before the watcher takes over.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use facade_assets::{
    bundle_scripts, clean_dist, compile_styles, copy_fonts, copy_media, generate_icons,
    optimize_images, IconOptions, ImageOptions, ScriptOptions, StyleOptions,
};
use facade_pipeline::{Task, TaskGraph};
use facade_server::{ReloadHub, ReloadMessage};
use facade_templates::{TemplateCompiler, TemplateOptions};

use crate::config::SiteConfig;

/// Everything the tasks need, shared across the graph.
pub struct BuildContext {
    pub styles: StyleOptions,
    pub scripts: ScriptOptions,
    pub images: ImageOptions,
    pub icons: IconOptions,
    pub media_dirs: (PathBuf, PathBuf),
    pub font_dirs: (PathBuf, PathBuf),
    pub output_root: PathBuf,
    pub compiler: Arc<Mutex<TemplateCompiler>>,

    /// Attached in dev mode so tasks can notify connected browsers.
    pub hub: Option<ReloadHub>,

    /// Production builds fail on page compile errors instead of logging.
    pub strict: bool,
}

impl BuildContext {
    pub fn from_config(config: &SiteConfig, strict: bool, hub: Option<ReloadHub>) -> Self {
        let compiler = TemplateCompiler::new(TemplateOptions {
            html_dir: config.html_dir(),
            out_dir: config.output_root(),
            ..TemplateOptions::default()
        });

        Self {
            styles: StyleOptions {
                source_dir: config.styles_dir(),
                out_dir: config.styles_out(),
                browsers: config.styles.browsers.clone(),
                strict,
                ..StyleOptions::default()
            },
            scripts: ScriptOptions {
                source_dir: config.scripts_dir(),
                out_dir: config.scripts_out(),
                ..ScriptOptions::default()
            },
            images: ImageOptions {
                source_dir: config.images_dir(),
                out_dir: config.images_out(),
                cache_dir: config.image_cache_dir(),
            },
            icons: IconOptions {
                source_dir: config.icons_dir(),
                css_out: config.styles_out().join("icons.css"),
                icons_out: config.icons_out(),
                ..IconOptions::default()
            },
            media_dirs: (config.media_dir(), config.media_out()),
            font_dirs: (config.fonts_dir(), config.fonts_out()),
            output_root: config.output_root(),
            compiler: Arc::new(Mutex::new(compiler)),
            hub,
            strict,
        }
    }
}

fn clean_task() -> Task<BuildContext> {
    Task::new("clean", |ctx: Arc<BuildContext>| async move {
        clean_dist(&ctx.output_root)?;
        Ok(())
    })
}

fn styles_task() -> Task<BuildContext> {
    Task::new("styles", |ctx: Arc<BuildContext>| async move {
        let report = compile_styles(&ctx.styles).await?;
        tracing::info!(
            "Compiled {} stylesheets ({} skipped)",
            report.compiled,
            report.skipped
        );
        Ok(())
    })
}

fn scripts_task() -> Task<BuildContext> {
    Task::new("scripts", |ctx: Arc<BuildContext>| async move {
        let report = bundle_scripts(&ctx.scripts).await?;
        tracing::info!(
            "Bundled {} scripts ({} bytes minified)",
            report.files,
            report.minified_bytes
        );
        Ok(())
    })
}

fn images_task() -> Task<BuildContext> {
    Task::new("images", |ctx: Arc<BuildContext>| async move {
        let report = optimize_images(&ctx.images).await?;
        tracing::info!(
            "Images: {} optimized, {} from cache, {} copied",
            report.optimized,
            report.cached,
            report.copied
        );
        Ok(())
    })
}

fn media_task() -> Task<BuildContext> {
    Task::new("media", |ctx: Arc<BuildContext>| async move {
        copy_media(&ctx.media_dirs.0, &ctx.media_dirs.1).await?;
        Ok(())
    })
}

fn fonts_task() -> Task<BuildContext> {
    Task::new("fonts", |ctx: Arc<BuildContext>| async move {
        copy_fonts(&ctx.font_dirs.0, &ctx.font_dirs.1).await?;
        if let Some(hub) = &ctx.hub {
            hub.send(ReloadMessage::InjectCss { files: Vec::new() });
        }
        Ok(())
    })
}

fn icons_task() -> Task<BuildContext> {
    Task::new("icons", |ctx: Arc<BuildContext>| async move {
        generate_icons(&ctx.icons).await?;
        Ok(())
    })
}

fn html_task() -> Task<BuildContext> {
    Task::new("html", |ctx: Arc<BuildContext>| async move {
        let report = ctx.compiler.lock().await.compile_all()?;
        tracing::info!("Compiled {} pages ({} failed)", report.pages, report.failed);
        if ctx.strict && report.failed > 0 {
            return Err(format!("{} pages failed to compile", report.failed).into());
        }
        Ok(())
    })
}

fn reset_templates_task() -> Task<BuildContext> {
    Task::new("reset-templates", |ctx: Arc<BuildContext>| async move {
        ctx.compiler.lock().await.invalidate();
        Ok(())
    })
}

/// The production pipeline.
pub fn production_graph() -> TaskGraph<BuildContext> {
    TaskGraph::new()
        .add(clean_task())
        .add(styles_task().after(&["clean"]))
        .add(scripts_task().after(&["styles"]))
        .add(images_task().after(&["styles"]))
        .add(fonts_task().after(&["styles"]))
        .add(icons_task().after(&["styles"]))
        .add(html_task().after(&["styles"]))
}

/// The dev pipeline: the same tasks run strictly in sequence, ending with a
/// template cache reset so the first watch rebuild starts from fresh sources.
pub fn dev_graph() -> TaskGraph<BuildContext> {
    TaskGraph::new()
        .add(clean_task())
        .add(styles_task().after(&["clean"]))
        .add(fonts_task().after(&["styles"]))
        .add(scripts_task().after(&["fonts"]))
        .add(images_task().after(&["scripts"]))
        .add(html_task().after(&["images"]))
        .add(reset_templates_task().after(&["html"]))
        .add(media_task().after(&["reset-templates"]))
}
