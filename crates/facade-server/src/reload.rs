//! WebSocket-based reload notifications.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages sent to connected browser sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Full page reload (HTML or script changes)
    Reload,

    /// Swap stylesheets in place without reloading the page. An empty file
    /// list refreshes every linked stylesheet.
    InjectCss {
        /// Artifact file names that changed
        files: Vec<String>,
    },

    /// Connection established
    Connected,
}

/// How a watch registration notifies clients after a successful rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// No notification (images, media)
    None,

    /// Full page reload
    Full,

    /// Hot stylesheet substitution
    InjectCss,
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(msg);
    }

    /// Subscribe to reload messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Number of connected clients.
    pub fn client_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate the client-side reload script.
///
/// The WebSocket URL is derived from the page's own location so the script
/// works regardless of the bound host and port.
pub fn reload_client_script(ws_path: &str) -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const proto = location.protocol === 'https:' ? 'wss://' : 'ws://';
  const ws = new WebSocket(proto + location.host + '{}');

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'inject_css':
        document.querySelectorAll('link[rel="stylesheet"]').forEach(function(link) {{
          const href = link.getAttribute('href').split('?')[0];
          const name = href.split('/').pop();
          if (msg.files.length === 0 || msg.files.indexOf(name) !== -1) {{
            link.setAttribute('href', href + '?t=' + Date.now());
          }}
        }});
        break;

      case 'connected':
        console.log('[facade] live reload connected');
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[facade] live reload disconnected, retrying...');
    setTimeout(function() {{ location.reload(); }}, 1000);
  }};
}})();
"#,
        ws_path
    )
}
