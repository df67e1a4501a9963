//! Hot Reload Message Protocol
//!
//! JSON messages sent over WebSocket to browser clients.
//!
//! # Message Types
//!
//! - `connected`: handshake acknowledgement
//! - `reload`: full page reload
//! - `css`: re-fetch the listed stylesheets without reloading

use serde::{Deserialize, Serialize};

use super::{ReloadEvent, ReloadKind};

/// Hot reload message sent over WebSocket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HotReloadMessage {
    /// Connection established
    Connected,

    /// Full page reload
    Reload,

    /// Stylesheet refresh
    Css {
        /// URL paths of rebuilt stylesheets; empty means all
        paths: Vec<String>,
    },
}

impl HotReloadMessage {
    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}

impl From<&ReloadEvent> for HotReloadMessage {
    fn from(event: &ReloadEvent) -> Self {
        match event.kind {
            ReloadKind::FullReload => Self::Reload,
            ReloadKind::StyleInject => Self::Css {
                paths: event.paths.clone(),
            },
        }
    }
}
