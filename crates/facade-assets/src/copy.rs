//! Byte-for-byte copy tasks for media and font files.

use std::io;
use std::path::{Path, PathBuf};

use crate::walk::{relative_path, walk_files};

/// Extensions recognized as font files.
pub const FONT_EXTENSIONS: &[&str] = &["eot", "woff", "woff2", "ttf", "otf"];

/// Outcome of a copy run.
#[derive(Debug, Default)]
pub struct CopyReport {
    pub files: usize,
    pub bytes: u64,
}

/// Errors that can occur while copying.
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("Failed to copy {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Copy the media tree into the destination unchanged.
///
/// Round-trip identity is the contract: output bytes equal input bytes.
pub async fn copy_media(source_dir: &Path, out_dir: &Path) -> Result<CopyReport, CopyError> {
    copy_tree(source_dir, out_dir, &[])
}

/// Copy recognized font files into the destination unchanged.
pub async fn copy_fonts(source_dir: &Path, out_dir: &Path) -> Result<CopyReport, CopyError> {
    copy_tree(source_dir, out_dir, FONT_EXTENSIONS)
}

fn copy_tree(
    source_dir: &Path,
    out_dir: &Path,
    extensions: &[&str],
) -> Result<CopyReport, CopyError> {
    let files = walk_files(source_dir, extensions);
    let mut report = CopyReport::default();

    for file in &files {
        let rel = relative_path(source_dir, file);
        let dest = out_dir.join(&rel);

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CopyError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let bytes = std::fs::copy(file, &dest).map_err(|source| CopyError::Io {
            path: file.clone(),
            source,
        })?;

        report.files += 1;
        report.bytes += bytes;
    }

    if report.files > 0 {
        tracing::info!(
            "Copied {} file(s) to {}",
            report.files,
            out_dir.display()
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn media_round_trips_byte_identical() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("video");
        let out = temp.path().join("dist/assets/video");
        fs::create_dir_all(src.join("clips")).unwrap();

        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        fs::write(src.join("clips/intro.mp4"), &payload).unwrap();

        let report = copy_media(&src, &out).await.unwrap();

        assert_eq!(report.files, 1);
        let copied = fs::read(out.join("clips/intro.mp4")).unwrap();
        assert_eq!(copied, payload);
    }

    #[tokio::test]
    async fn fonts_filter_by_extension() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("fonts");
        let out = temp.path().join("dist/assets/fonts");
        fs::create_dir_all(&src).unwrap();

        fs::write(src.join("body.woff2"), b"font bytes").unwrap();
        fs::write(src.join("notes.txt"), b"not a font").unwrap();

        let report = copy_fonts(&src, &out).await.unwrap();

        assert_eq!(report.files, 1);
        assert!(out.join("body.woff2").exists());
        assert!(!out.join("notes.txt").exists());
        assert_eq!(fs::read(out.join("body.woff2")).unwrap(), b"font bytes");
    }

    #[tokio::test]
    async fn empty_source_is_fine() {
        let temp = tempdir().unwrap();
        let report = copy_media(&temp.path().join("missing"), &temp.path().join("out"))
            .await
            .unwrap();
        assert_eq!(report.files, 0);
    }
}
