//! Development command: build, watch, serve with live reload.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use facade_server::{
    DevServer, DevServerConfig, FileWatcher, Rebuilder, ReloadHub, WatchCoordinator,
};

use crate::config::SiteConfig;
use crate::pipelines::{dev_graph, BuildContext};

/// Run the dev command.
pub async fn run(config_path: &Path, port: Option<u16>, open: bool) -> Result<()> {
    let config = SiteConfig::load(config_path)?;
    let hub = ReloadHub::new();

    // Initial build. A failure here is fatal; there is nothing to serve yet.
    let ctx = Arc::new(BuildContext::from_config(&config, false, Some(hub.clone())));
    dev_graph().run(ctx.clone()).await?;

    let registrations = WatchCoordinator::standard_registrations(
        config.scripts_dir(),
        config.styles_dir(),
        config.images_dir(),
        config.media_dir(),
        config.fonts_dir(),
        config.html_dir(),
    );

    let rebuilder = Rebuilder {
        styles: ctx.styles.clone(),
        scripts: ctx.scripts.clone(),
        images: ctx.images.clone(),
        media_dirs: ctx.media_dirs.clone(),
        font_dirs: ctx.font_dirs.clone(),
        compiler: ctx.compiler.clone(),
    };

    let coordinator = WatchCoordinator::new(registrations, rebuilder, hub.clone());
    let (_watcher, rx) = FileWatcher::new(&coordinator.watch_roots())?;
    tokio::spawn(coordinator.run(rx));

    let server = DevServer::new(
        DevServerConfig {
            root: config.output_root(),
            port: port.unwrap_or(config.server.port),
            host: config.server.host.clone(),
            open,
        },
        hub,
    );

    server.start().await?;

    Ok(())
}
