//! Site configuration (facade.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

/// Configuration file structure (facade.toml).
#[derive(Debug, Deserialize, Default, Clone)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub styles: StylesSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteSection {
    /// Source tree root
    #[serde(default = "default_source")]
    pub source: String,

    /// Destination tree root
    #[serde(default = "default_output")]
    pub output: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StylesSection {
    /// Browserslist queries for CSS lowering
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_source() -> String {
    "src".to_string()
}
fn default_output() -> String {
    "dist".to_string()
}
fn default_browsers() -> Vec<String> {
    vec!["last 2 versions".to_string()]
}
fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
        }
    }
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            browsers: default_browsers(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl SiteConfig {
    /// Load configuration, falling back to defaults when the file is absent.
    /// A present but malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
            let config: SiteConfig = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            tracing::info!("Loaded config from {}", path.display());
            return Ok(config);
        }
        Ok(SiteConfig::default())
    }

    pub fn source_root(&self) -> PathBuf {
        PathBuf::from(&self.site.source)
    }

    pub fn output_root(&self) -> PathBuf {
        PathBuf::from(&self.site.output)
    }

    // Source tree layout

    pub fn styles_dir(&self) -> PathBuf {
        self.source_root().join("assets/css")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.source_root().join("assets/js")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.source_root().join("assets/img")
    }

    pub fn media_dir(&self) -> PathBuf {
        self.source_root().join("assets/video")
    }

    pub fn fonts_dir(&self) -> PathBuf {
        self.source_root().join("assets/fonts")
    }

    pub fn icons_dir(&self) -> PathBuf {
        self.source_root().join("assets/icons")
    }

    pub fn html_dir(&self) -> PathBuf {
        self.source_root().join("html")
    }

    // Destination tree layout

    pub fn styles_out(&self) -> PathBuf {
        self.output_root().join("assets/css")
    }

    pub fn scripts_out(&self) -> PathBuf {
        self.output_root().join("assets/js")
    }

    pub fn images_out(&self) -> PathBuf {
        self.output_root().join("assets/img")
    }

    pub fn media_out(&self) -> PathBuf {
        self.output_root().join("assets/video")
    }

    pub fn fonts_out(&self) -> PathBuf {
        self.output_root().join("assets/fonts")
    }

    pub fn icons_out(&self) -> PathBuf {
        self.output_root().join("assets/icons")
    }

    /// Cache directory for incremental image optimization.
    pub fn image_cache_dir(&self) -> PathBuf {
        PathBuf::from(".facade-cache/img")
    }
}
