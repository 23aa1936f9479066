//! File watching for the rebuild coordinator.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// A debounced filesystem change.
#[derive(Debug, Clone)]
pub enum FsChange {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl FsChange {
    pub fn path(&self) -> &PathBuf {
        match self {
            FsChange::Created(p) | FsChange::Modified(p) | FsChange::Deleted(p) => p,
        }
    }
}

/// File watcher for detecting source changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Create a new file watcher for the given paths.
    ///
    /// Returns the watcher and a channel of debounced events. Events inside
    /// one debounce window are coalesced per path, not dropped: a multi-file
    /// save emits one change per distinct file, so every affected category
    /// still rebuilds.
    pub fn new(
        paths: &[PathBuf],
    ) -> Result<(Self, async_mpsc::Receiver<FsChange>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.exists() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            } else {
                tracing::warn!(
                    "Watch root {} does not exist; changes there will not be seen",
                    path.display()
                );
            }
        }

        // Forward events onto the async channel with debouncing. Each event
        // opens a window; everything arriving inside it is coalesced per
        // path and the whole set is flushed when the window closes, so no
        // distinct change is ever lost.
        std::thread::spawn(move || {
            let debounce_duration = Duration::from_millis(100);

            while let Ok(event) = sync_rx.recv() {
                let mut pending: Vec<FsChange> = Vec::new();
                collect_changes(event, &mut pending);

                let deadline = Instant::now() + debounce_duration;
                loop {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    match sync_rx.recv_timeout(remaining) {
                        Ok(event) => collect_changes(event, &mut pending),
                        Err(_) => break,
                    }
                }

                for change in pending {
                    let _ = async_tx.blocking_send(change);
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Merge an event into the pending set, one entry per path (latest kind
/// wins).
fn collect_changes(event: notify::Event, pending: &mut Vec<FsChange>) {
    for path in event.paths {
        if let Some(change) = classify_event(path, &event.kind) {
            if let Some(existing) = pending.iter_mut().find(|c| c.path() == change.path()) {
                *existing = change;
            } else {
                pending.push(change);
            }
        }
    }
}

/// Classify a notify event into an FsChange.
fn classify_event(path: PathBuf, kind: &notify::EventKind) -> Option<FsChange> {
    use notify::EventKind;

    match kind {
        EventKind::Create(_) => Some(FsChange::Created(path)),
        EventKind::Remove(_) => Some(FsChange::Deleted(path)),
        EventKind::Modify(_) => Some(FsChange::Modified(path)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn watches_file_changes() {
        let temp = tempdir().unwrap();
        let test_file = temp.path().join("style.css");

        // Create the watcher first (so it catches file creation)
        let (watcher, mut rx) = FileWatcher::new(&[temp.path().to_path_buf()]).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&test_file, ".x { color: red; }").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;

        drop(watcher);

        assert!(event.is_ok(), "timeout waiting for file watch event");
        assert!(event.unwrap().is_some(), "channel should not be closed");
    }

    #[tokio::test]
    async fn rapid_changes_to_distinct_files_all_come_through() {
        let temp = tempdir().unwrap();
        let (watcher, mut rx) = FileWatcher::new(&[temp.path().to_path_buf()]).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Editor-style "save all": two files in different categories, well
        // inside one debounce window.
        fs::write(temp.path().join("a.css"), ".x { color: red; }").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        fs::write(temp.path().join("b.js"), "let x = 1;").unwrap();

        let mut seen = Vec::new();
        while let Ok(Some(change)) =
            tokio::time::timeout(Duration::from_secs(3), rx.recv()).await
        {
            seen.push(change.path().clone());
            if seen.iter().any(|p| p.ends_with("a.css"))
                && seen.iter().any(|p| p.ends_with("b.js"))
            {
                break;
            }
        }

        drop(watcher);

        assert!(
            seen.iter().any(|p| p.ends_with("a.css")),
            "change to a.css was dropped; saw: {:?}",
            seen
        );
        assert!(
            seen.iter().any(|p| p.ends_with("b.js")),
            "change to b.js was dropped; saw: {:?}",
            seen
        );
    }

    #[test]
    fn coalesces_repeated_changes_to_one_path() {
        let make = |kind| notify::Event {
            kind,
            paths: vec![PathBuf::from("a.css")],
            attrs: Default::default(),
        };

        let mut pending = Vec::new();
        collect_changes(
            make(notify::EventKind::Create(notify::event::CreateKind::File)),
            &mut pending,
        );
        collect_changes(
            make(notify::EventKind::Modify(notify::event::ModifyKind::Any)),
            &mut pending,
        );

        assert_eq!(pending.len(), 1);
        assert!(matches!(pending[0], FsChange::Modified(_)));
    }

    #[test]
    fn missing_watch_root_is_not_an_error() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("never-created");

        let result = FileWatcher::new(&[missing]);

        assert!(result.is_ok());
    }

    #[test]
    fn classifies_event_kinds() {
        let p = PathBuf::from("a.css");
        assert!(matches!(
            classify_event(p.clone(), &notify::EventKind::Create(notify::event::CreateKind::File)),
            Some(FsChange::Created(_))
        ));
        assert!(matches!(
            classify_event(p, &notify::EventKind::Remove(notify::event::RemoveKind::File)),
            Some(FsChange::Deleted(_))
        ));
    }
}
