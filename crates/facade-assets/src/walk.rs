//! Deterministic source tree enumeration.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Collect all files under `root` with one of the given extensions, sorted
/// in lexicographic path order. An empty extension list matches every file.
///
/// Concatenation order of style and script bundles follows this ordering,
/// so it must stay stable across runs and platforms.
pub fn walk_files(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| extensions.is_empty() || has_extension(p, extensions))
        .collect();
    files.sort();
    files
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            extensions.iter().any(|e| *e == ext)
        })
        .unwrap_or(false)
}

/// Path of `file` relative to `root`, falling back to the file name.
pub fn relative_path(root: &Path, file: &Path) -> PathBuf {
    file.strip_prefix(root)
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|_| {
            file.file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| file.to_path_buf())
        })
}
