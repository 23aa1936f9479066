//! Development server with live reload.
//!
//! Serves the destination tree, watches the source categories, re-runs the
//! matching transform task on change and broadcasts a reload notification to
//! connected browsers over WebSocket.

pub mod coordinator;
pub mod reload;
pub mod server;
pub mod watcher;

pub use coordinator::{RebuildAction, Rebuilder, WatchCoordinator, WatchRegistration};
pub use reload::{reload_client_script, ReloadHub, ReloadKind, ReloadMessage};
pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, FsChange};
