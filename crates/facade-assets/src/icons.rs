//! Icon stylesheet generation.
//!
//! Produces two outputs from the SVG icon set: a generated stylesheet with
//! one class per icon, and copies of the icons themselves. The two halves
//! are spawned as separate tasks and joined, since neither depends on the
//! other.

use std::io;
use std::path::PathBuf;

use crate::walk::{relative_path, walk_files};

/// Configuration for the icon task.
#[derive(Debug, Clone)]
pub struct IconOptions {
    /// SVG icon source tree
    pub source_dir: PathBuf,

    /// Path of the generated stylesheet
    pub css_out: PathBuf,

    /// Destination tree for the copied icons
    pub icons_out: PathBuf,

    /// URL prefix the stylesheet uses to reference the copied icons
    pub url_prefix: String,

    /// Class name prefix
    pub class_prefix: String,
}

impl Default for IconOptions {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src/assets/icons"),
            css_out: PathBuf::from("dist/assets/css/icons.css"),
            icons_out: PathBuf::from("dist/assets/icons"),
            url_prefix: "../icons/".to_string(),
            class_prefix: "icon".to_string(),
        }
    }
}

/// Outcome of an icon generation run.
#[derive(Debug, Default)]
pub struct IconReport {
    pub icons: usize,
}

/// Errors that can occur during icon generation.
#[derive(Debug, thiserror::Error)]
pub enum IconError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Icon task panicked: {0}")]
    Join(String),
}

/// Generate the icon stylesheet and copy the icons.
pub async fn generate_icons(options: &IconOptions) -> Result<IconReport, IconError> {
    let files = walk_files(&options.source_dir, &["svg"]);
    if files.is_empty() {
        return Ok(IconReport::default());
    }

    let icons: Vec<(String, PathBuf)> = files
        .iter()
        .map(|f| {
            let rel = relative_path(&options.source_dir, f);
            let stem = f
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("icon")
                .to_string();
            (stem, rel)
        })
        .collect();

    let stylesheet = {
        let opts = options.clone();
        let icons = icons.clone();
        tokio::task::spawn_blocking(move || write_stylesheet(&opts, &icons))
    };
    let copies = {
        let opts = options.clone();
        let files = files.clone();
        tokio::task::spawn_blocking(move || copy_icons(&opts, &files))
    };

    let (stylesheet, copies) = tokio::try_join!(stylesheet, copies)
        .map_err(|e| IconError::Join(e.to_string()))?;
    stylesheet?;
    copies?;

    tracing::info!(
        "Generated icon stylesheet for {} icon(s) at {}",
        icons.len(),
        options.css_out.display()
    );

    Ok(IconReport { icons: icons.len() })
}

fn write_stylesheet(options: &IconOptions, icons: &[(String, PathBuf)]) -> Result<(), IconError> {
    let mut css = String::from("/* Generated icon classes */\n");
    for (stem, rel) in icons {
        let url = format!(
            "{}{}",
            options.url_prefix,
            rel.to_string_lossy().replace('\\', "/")
        );
        css.push_str(&format!(
            ".{}-{} {{ background-image: url(\"{}\"); background-repeat: no-repeat; background-size: contain; }}\n",
            options.class_prefix, stem, url
        ));
    }

    if let Some(parent) = options.css_out.parent() {
        std::fs::create_dir_all(parent).map_err(|source| IconError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(&options.css_out, css).map_err(|source| IconError::Io {
        path: options.css_out.clone(),
        source,
    })
}

fn copy_icons(options: &IconOptions, files: &[PathBuf]) -> Result<(), IconError> {
    for file in files {
        let rel = relative_path(&options.source_dir, file);
        let dest = options.icons_out.join(&rel);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|source| IconError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::copy(file, &dest).map_err(|source| IconError::Io {
            path: file.clone(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_stylesheet_and_copies_icons() {
        let temp = tempdir().unwrap();
        let opts = IconOptions {
            source_dir: temp.path().join("icons"),
            css_out: temp.path().join("dist/assets/css/icons.css"),
            icons_out: temp.path().join("dist/assets/icons"),
            ..IconOptions::default()
        };
        fs::create_dir_all(&opts.source_dir).unwrap();
        fs::write(opts.source_dir.join("arrow.svg"), "<svg/>").unwrap();
        fs::write(opts.source_dir.join("close.svg"), "<svg/>").unwrap();

        let report = generate_icons(&opts).await.unwrap();

        assert_eq!(report.icons, 2);
        let css = fs::read_to_string(&opts.css_out).unwrap();
        assert!(css.contains(".icon-arrow"));
        assert!(css.contains(".icon-close"));
        assert!(css.contains("../icons/arrow.svg"));
        assert!(opts.icons_out.join("arrow.svg").exists());
        assert!(opts.icons_out.join("close.svg").exists());
    }

    #[tokio::test]
    async fn empty_icon_set_is_a_no_op() {
        let temp = tempdir().unwrap();
        let opts = IconOptions {
            source_dir: temp.path().join("none"),
            css_out: temp.path().join("dist/icons.css"),
            icons_out: temp.path().join("dist/icons"),
            ..IconOptions::default()
        };

        let report = generate_icons(&opts).await.unwrap();

        assert_eq!(report.icons, 0);
        assert!(!opts.css_out.exists());
    }
}
