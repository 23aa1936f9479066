//! Production build command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::config::SiteConfig;
use crate::pipelines::{production_graph, BuildContext};

/// Run the build command.
pub async fn run(config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    tracing::info!("Building site...");

    let mut config = SiteConfig::load(config_path)?;
    if let Some(output) = output {
        config.site.output = output.display().to_string();
    }

    let ctx = Arc::new(BuildContext::from_config(&config, true, None));
    let report = production_graph().run(ctx).await?;

    for timing in &report.completed {
        tracing::debug!("{} finished in {}ms", timing.name, timing.duration.as_millis());
    }

    let total: u128 = report.completed.iter().map(|t| t.duration.as_millis()).sum();
    tracing::info!(
        "Build complete: {} tasks in {}ms",
        report.completed.len(),
        total
    );
    tracing::info!("Output: {}", config.output_root().display());

    Ok(())
}
