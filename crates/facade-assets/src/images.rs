//! Image optimization with a content-addressed result cache.

use std::io;
use std::path::PathBuf;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};

use crate::fingerprint::fingerprint;
use crate::walk::{relative_path, walk_files};

/// Extensions recognized as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg"];

/// Configuration for the image transform task.
#[derive(Debug, Clone)]
pub struct ImageOptions {
    /// Image source tree
    pub source_dir: PathBuf,

    /// Destination tree (relative paths preserved)
    pub out_dir: PathBuf,

    /// Cache directory for optimized results, keyed by content fingerprint
    pub cache_dir: PathBuf,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src/assets/img"),
            out_dir: PathBuf::from("dist/assets/img"),
            cache_dir: PathBuf::from(".facade-cache/img"),
        }
    }
}

/// Outcome of an image optimization run.
#[derive(Debug, Default)]
pub struct ImageReport {
    /// Freshly optimized files
    pub optimized: usize,

    /// Files served from the cache
    pub cached: usize,

    /// Files copied through unchanged (no lossless transcoder, or smaller
    /// than the re-encoded form)
    pub copied: usize,
}

/// Errors that can occur during image optimization.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Optimize every recognized image into the destination tree.
///
/// PNGs are decoded and re-encoded at maximum compression with adaptive
/// filtering, which preserves pixels exactly. Other formats copy through
/// unchanged. Results land in the cache keyed by (relative path, content
/// hash); a hit skips the optimizer entirely and is byte-identical to a
/// fresh run because the key is derived from content, not mtime.
pub async fn optimize_images(options: &ImageOptions) -> Result<ImageReport, ImageError> {
    let files = walk_files(&options.source_dir, IMAGE_EXTENSIONS);
    let mut report = ImageReport::default();

    if files.is_empty() {
        return Ok(report);
    }

    std::fs::create_dir_all(&options.cache_dir).map_err(|source| ImageError::Io {
        path: options.cache_dir.clone(),
        source,
    })?;

    for file in &files {
        let rel = relative_path(&options.source_dir, file);
        let bytes = std::fs::read(file).map_err(|source| ImageError::Io {
            path: file.clone(),
            source,
        })?;

        let key = fingerprint(&rel, &bytes);
        let cache_path = options.cache_dir.join(&key);
        let dest = options.out_dir.join(&rel);

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ImageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if cache_path.exists() {
            std::fs::copy(&cache_path, &dest).map_err(|source| ImageError::Io {
                path: dest.clone(),
                source,
            })?;
            report.cached += 1;
            continue;
        }

        let ext = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let output = match ext.as_str() {
            "png" => match recompress_png(&bytes) {
                Some(optimized) => {
                    report.optimized += 1;
                    optimized
                }
                None => {
                    report.copied += 1;
                    bytes
                }
            },
            _ => {
                report.copied += 1;
                bytes
            }
        };

        std::fs::write(&cache_path, &output).map_err(|source| ImageError::Io {
            path: cache_path.clone(),
            source,
        })?;
        std::fs::write(&dest, &output).map_err(|source| ImageError::Io {
            path: dest,
            source,
        })?;
    }

    tracing::info!(
        "Images: {} optimized, {} from cache, {} copied",
        report.optimized,
        report.cached,
        report.copied
    );

    Ok(report)
}

/// Losslessly re-encode a PNG at maximum compression.
///
/// Returns `None` when the input does not decode or the re-encoded form is
/// not smaller; callers fall back to the original bytes. Decode failures
/// are logged, not fatal, matching the degraded-but-continuing policy for
/// non-essential tool errors.
fn recompress_png(bytes: &[u8]) -> Option<Vec<u8>> {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            tracing::warn!("Skipping PNG optimization: {}", e);
            return None;
        }
    };

    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    if let Err(e) = img.write_with_encoder(encoder) {
        tracing::warn!("PNG re-encode failed: {}", e);
        return None;
    }

    (out.len() < bytes.len()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn options(temp: &std::path::Path) -> ImageOptions {
        ImageOptions {
            source_dir: temp.join("img"),
            out_dir: temp.join("dist/assets/img"),
            cache_dir: temp.join("cache"),
        }
    }

    /// A lightly-compressed 64x64 PNG, large enough that Best compression
    /// shrinks it.
    fn sample_png() -> Vec<u8> {
        let img = image::DynamicImage::new_rgb8(64, 64);
        let mut out = Vec::new();
        let encoder = PngEncoder::new_with_quality(
            &mut out,
            CompressionType::Fast,
            FilterType::NoFilter,
        );
        img.write_with_encoder(encoder).unwrap();
        out
    }

    #[tokio::test]
    async fn optimizes_png_and_preserves_relative_path() {
        let temp = tempdir().unwrap();
        let opts = options(temp.path());
        fs::create_dir_all(opts.source_dir.join("icons")).unwrap();
        fs::write(opts.source_dir.join("icons/logo.png"), sample_png()).unwrap();

        let report = optimize_images(&opts).await.unwrap();

        assert_eq!(report.optimized + report.copied, 1);
        assert!(opts.out_dir.join("icons/logo.png").exists());
    }

    #[tokio::test]
    async fn cache_hit_is_byte_identical_to_fresh_run() {
        let temp = tempdir().unwrap();
        let opts = options(temp.path());
        fs::create_dir_all(&opts.source_dir).unwrap();
        fs::write(opts.source_dir.join("a.png"), sample_png()).unwrap();

        optimize_images(&opts).await.unwrap();
        let fresh = fs::read(opts.out_dir.join("a.png")).unwrap();

        // Second run hits the cache.
        let report = optimize_images(&opts).await.unwrap();
        assert_eq!(report.cached, 1);
        let cached = fs::read(opts.out_dir.join("a.png")).unwrap();

        assert_eq!(fresh, cached);

        // Forced fresh run (cold cache) produces the same bytes.
        fs::remove_dir_all(&opts.cache_dir).unwrap();
        optimize_images(&opts).await.unwrap();
        let forced = fs::read(opts.out_dir.join("a.png")).unwrap();
        assert_eq!(fresh, forced);
    }

    #[tokio::test]
    async fn changed_content_misses_the_cache() {
        let temp = tempdir().unwrap();
        let opts = options(temp.path());
        fs::create_dir_all(&opts.source_dir).unwrap();
        fs::write(opts.source_dir.join("a.svg"), "<svg></svg>").unwrap();

        optimize_images(&opts).await.unwrap();
        fs::write(opts.source_dir.join("a.svg"), "<svg><g/></svg>").unwrap();
        let report = optimize_images(&opts).await.unwrap();

        assert_eq!(report.cached, 0);
        let out = fs::read_to_string(opts.out_dir.join("a.svg")).unwrap();
        assert_eq!(out, "<svg><g/></svg>");
    }

    #[tokio::test]
    async fn svg_copies_through_unchanged() {
        let temp = tempdir().unwrap();
        let opts = options(temp.path());
        fs::create_dir_all(&opts.source_dir).unwrap();
        let svg = "<svg xmlns=\"http://www.w3.org/2000/svg\"/>";
        fs::write(opts.source_dir.join("mark.svg"), svg).unwrap();

        let report = optimize_images(&opts).await.unwrap();

        assert_eq!(report.copied, 1);
        let out = fs::read_to_string(opts.out_dir.join("mark.svg")).unwrap();
        assert_eq!(out, svg);
    }
}
