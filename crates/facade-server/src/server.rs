//! Development server implementation.
//!
//! Serves the destination tree and injects the live-reload client script
//! into every HTML document it serves.

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::reload::{reload_client_script, ReloadHub, ReloadMessage};

const RELOAD_WS_PATH: &str = "/__reload";
const RELOAD_SCRIPT_PATH: &str = "/__reload.js";

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Destination tree to serve
    pub root: PathBuf,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dist"),
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}: {1}")]
    Address(String, String),

    #[error("Failed to bind to {0}: {1}")]
    Bind(SocketAddr, String),
}

/// Shared server state.
struct ServerState {
    root: PathBuf,
    hub: ReloadHub,
}

/// Development file server with a reload notification channel.
pub struct DevServer {
    config: DevServerConfig,
    hub: ReloadHub,
}

impl DevServer {
    pub fn new(config: DevServerConfig, hub: ReloadHub) -> Self {
        Self { config, hub }
    }

    /// Start serving. Runs until the process is terminated.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr_str = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e: std::net::AddrParseError| ServerError::Address(addr_str, e.to_string()))?;

        let state = Arc::new(ServerState {
            root: self.config.root.clone(),
            hub: self.hub,
        });

        let app = Router::new()
            .route(RELOAD_WS_PATH, get(ws_handler))
            .route(RELOAD_SCRIPT_PATH, get(script_handler))
            .fallback(asset_handler)
            .with_state(state);

        tracing::info!("Serving {} at http://{}", self.config.root.display(), addr);

        if self.config.open {
            let url = format!("http://{}", addr);
            let _ = open::that(&url);
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(addr, e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Bind(addr, e.to_string()))?;

        Ok(())
    }
}

/// Handler for the reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Forward reload messages to one connected client.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    let msg = serde_json::to_string(&ReloadMessage::Connected).unwrap();
    if socket.send(Message::Text(msg.into())).await.is_err() {
        return;
    }

    while let Ok(reload_msg) = rx.recv().await {
        let json = serde_json::to_string(&reload_msg).unwrap();
        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}

/// Handler for the reload client script.
async fn script_handler() -> impl IntoResponse {
    let script = reload_client_script(RELOAD_WS_PATH);
    ([(header::CONTENT_TYPE, "application/javascript")], script)
}

/// Serve a file from the destination tree.
async fn asset_handler(uri: Uri, State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let Some(path) = resolve_request_path(&state.root, uri.path()) else {
        return (StatusCode::BAD_REQUEST, "Bad request").into_response();
    };

    let path = if path.is_dir() {
        path.join("index.html")
    } else {
        path
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let content_type = content_type_for(&path);
            let bytes = if content_type == "text/html" {
                inject_reload_script(bytes)
            } else {
                bytes
            };
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Resolve a request path under the served root, rejecting traversal.
fn resolve_request_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    let relative = Path::new(trimmed);

    for component in relative.components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir => {}
            _ => return None,
        }
    }

    Some(root.join(relative))
}

/// Content type from file extension.
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") | Some("mjs") => "application/javascript",
        Some("json") | Some("map") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("eot") => "application/vnd.ms-fontobject",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("xml") => "application/xml",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Append the reload script tag to a served HTML document.
///
/// Inserted before `</body>` when present, appended otherwise, so even
/// partial documents pick up live reload.
fn inject_reload_script(bytes: Vec<u8>) -> Vec<u8> {
    let tag = format!("<script src=\"{}\"></script>", RELOAD_SCRIPT_PATH);

    match String::from_utf8(bytes) {
        Ok(html) => {
            let injected = if let Some(pos) = html.rfind("</body>") {
                let mut out = String::with_capacity(html.len() + tag.len());
                out.push_str(&html[..pos]);
                out.push_str(&tag);
                out.push_str(&html[pos..]);
                out
            } else {
                let mut out = html;
                out.push_str(&tag);
                out
            };
            injected.into_bytes()
        }
        Err(e) => e.into_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_server_with_default_config() {
        let config = DevServerConfig::default();
        let server = DevServer::new(config, ReloadHub::new());
        assert_eq!(server.config.port, 3000);
    }

    #[test]
    fn resolves_paths_under_root() {
        let root = Path::new("/srv/dist");
        assert_eq!(
            resolve_request_path(root, "/assets/css/main.min.css"),
            Some(PathBuf::from("/srv/dist/assets/css/main.min.css"))
        );
        assert_eq!(
            resolve_request_path(root, "/"),
            Some(PathBuf::from("/srv/dist"))
        );
    }

    #[test]
    fn rejects_traversal() {
        let root = Path::new("/srv/dist");
        assert_eq!(resolve_request_path(root, "/../secret"), None);
        assert_eq!(resolve_request_path(root, "/a/../../b"), None);
    }

    #[test]
    fn injects_before_closing_body() {
        let html = b"<html><body><p>hi</p></body></html>".to_vec();
        let out = String::from_utf8(inject_reload_script(html)).unwrap();

        assert!(out.contains("<script src=\"/__reload.js\"></script></body>"));
    }

    #[test]
    fn appends_when_no_body_tag() {
        let html = b"<p>fragment</p>".to_vec();
        let out = String::from_utf8(inject_reload_script(html)).unwrap();

        assert!(out.ends_with("<script src=\"/__reload.js\"></script>"));
    }

    #[test]
    fn maps_content_types() {
        assert_eq!(content_type_for(Path::new("a/index.html")), "text/html");
        assert_eq!(content_type_for(Path::new("main.min.css")), "text/css");
        assert_eq!(
            content_type_for(Path::new("bundle.js.map")),
            "application/json"
        );
        assert_eq!(
            content_type_for(Path::new("video/intro.mp4")),
            "video/mp4"
        );
    }
}
