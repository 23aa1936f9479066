//! Watch/reload coordination.
//!
//! Maps filesystem change events to re-invocations of the transform tasks
//! and broadcasts a reload notification after each successful rebuild.
//! Rebuilds are serialized: the coordinator awaits each task before pulling
//! the next event, so overlapping invocations of the same task can never
//! race on the same destination path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use facade_assets::{
    bundle_scripts, compile_styles, copy_fonts, copy_media, optimize_images, ImageOptions,
    ScriptOptions, StyleOptions, FONT_EXTENSIONS, IMAGE_EXTENSIONS,
};
use facade_templates::TemplateCompiler;

use crate::reload::{ReloadHub, ReloadKind, ReloadMessage};
use crate::watcher::FsChange;

type RebuildError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The task a watch registration re-invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildAction {
    Styles,
    Scripts,
    Images,
    Media,
    Fonts,
    /// Invalidate the template cache, then recompile. The only action that
    /// chains two tasks; invalidation must strictly precede the compile.
    Templates,
}

/// Binding from a source category to the task invoked when it changes.
///
/// Created once when the coordinator starts and only consulted afterwards.
#[derive(Debug, Clone)]
pub struct WatchRegistration {
    pub name: &'static str,

    /// Source subtree this registration covers
    pub root: PathBuf,

    /// Extensions that match, lowercase; empty matches every file
    pub extensions: &'static [&'static str],

    pub action: RebuildAction,

    /// Notification broadcast after a successful rebuild
    pub reload: ReloadKind,
}

impl WatchRegistration {
    fn matches(&self, path: &Path) -> bool {
        if !path.starts_with(&self.root) {
            return false;
        }
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }
}

/// Runs the transform tasks on behalf of the coordinator.
pub struct Rebuilder {
    pub styles: StyleOptions,
    pub scripts: ScriptOptions,
    pub images: ImageOptions,
    pub media_dirs: (PathBuf, PathBuf),
    pub font_dirs: (PathBuf, PathBuf),
    pub compiler: Arc<Mutex<TemplateCompiler>>,
}

impl Rebuilder {
    pub async fn run(&self, action: RebuildAction) -> Result<(), RebuildError> {
        match action {
            RebuildAction::Styles => {
                compile_styles(&self.styles).await?;
            }
            RebuildAction::Scripts => {
                bundle_scripts(&self.scripts).await?;
            }
            RebuildAction::Images => {
                optimize_images(&self.images).await?;
            }
            RebuildAction::Media => {
                copy_media(&self.media_dirs.0, &self.media_dirs.1).await?;
            }
            RebuildAction::Fonts => {
                copy_fonts(&self.font_dirs.0, &self.font_dirs.1).await?;
            }
            RebuildAction::Templates => {
                let mut compiler = self.compiler.lock().await;
                compiler.invalidate();
                compiler.compile_all()?;
            }
        }
        Ok(())
    }
}

/// Watch coordinator: consumes change events and re-runs tasks.
pub struct WatchCoordinator {
    registrations: Vec<WatchRegistration>,
    rebuilder: Rebuilder,
    hub: ReloadHub,
}

impl WatchCoordinator {
    pub fn new(registrations: Vec<WatchRegistration>, rebuilder: Rebuilder, hub: ReloadHub) -> Self {
        Self {
            registrations,
            rebuilder,
            hub,
        }
    }

    /// The standard registrations for a source tree layout.
    pub fn standard_registrations(
        scripts_dir: PathBuf,
        styles_dir: PathBuf,
        images_dir: PathBuf,
        media_dir: PathBuf,
        fonts_dir: PathBuf,
        html_dir: PathBuf,
    ) -> Vec<WatchRegistration> {
        vec![
            WatchRegistration {
                name: "scripts",
                root: scripts_dir,
                extensions: &["js"],
                action: RebuildAction::Scripts,
                reload: ReloadKind::Full,
            },
            WatchRegistration {
                name: "styles",
                root: styles_dir,
                extensions: &["css"],
                action: RebuildAction::Styles,
                reload: ReloadKind::InjectCss,
            },
            WatchRegistration {
                name: "images",
                root: images_dir,
                extensions: IMAGE_EXTENSIONS,
                action: RebuildAction::Images,
                reload: ReloadKind::None,
            },
            WatchRegistration {
                name: "media",
                root: media_dir,
                extensions: &[],
                action: RebuildAction::Media,
                reload: ReloadKind::None,
            },
            WatchRegistration {
                name: "fonts",
                root: fonts_dir,
                extensions: FONT_EXTENSIONS,
                action: RebuildAction::Fonts,
                reload: ReloadKind::InjectCss,
            },
            WatchRegistration {
                name: "templates",
                root: html_dir,
                extensions: &["html", "json"],
                action: RebuildAction::Templates,
                reload: ReloadKind::Full,
            },
        ]
    }

    /// Paths the file watcher should cover.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        self.registrations.iter().map(|r| r.root.clone()).collect()
    }

    /// Run until the change channel closes.
    pub async fn run(self, mut rx: mpsc::Receiver<FsChange>) {
        tracing::info!("Watching for changes");

        while let Some(change) = rx.recv().await {
            self.handle(&change).await;
        }
    }

    async fn handle(&self, change: &FsChange) {
        let path = change.path();
        let Some(registration) = self.registrations.iter().find(|r| r.matches(path)) else {
            return;
        };

        tracing::info!(
            "Change in {} ({}), rebuilding",
            path.display(),
            registration.name
        );

        match self.rebuilder.run(registration.action).await {
            Ok(()) => match registration.reload {
                ReloadKind::Full => self.hub.send(ReloadMessage::Reload),
                ReloadKind::InjectCss => self.hub.send(ReloadMessage::InjectCss {
                    files: Vec::new(),
                }),
                ReloadKind::None => {}
            },
            Err(e) => {
                // No broadcast on failure: clients keep the previous,
                // still-valid content instead of a half-written artifact.
                tracing::error!("Rebuild of {} failed: {}", registration.name, e);
            }
        }
    }
}
