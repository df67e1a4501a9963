//! Live reload for development mode.
//!
//! # Architecture
//!
//! ```text
//! TransformStep / WatchBinding --[ReloadEvent]--> ReloadChannel
//!                                                     |
//!                          broadcaster thread <-------+
//!                                  |
//!                          WebSocket clients (reload.js)
//! ```
//!
//! # Modules
//!
//! - `message` - JSON wire messages (connected, reload, css)
//! - `server` - WebSocket acceptor and broadcaster threads

pub mod message;
pub mod server;

use std::time::Instant;

use tokio::sync::broadcast;

/// Capacity of the in-process event queue per subscriber.
const CHANNEL_CAPACITY: usize = 64;

/// Client-side script served by the development server.
pub const CLIENT_SCRIPT: &str = include_str!("client.js");

/// URL the client script is served under.
pub const CLIENT_SCRIPT_PATH: &str = "/__pagewright/reload.js";

/// How connected clients should react to a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Reload the whole page.
    FullReload,
    /// Swap stylesheets in place, keeping page state.
    StyleInject,
}

/// One completed rebuild, consumed once by every connected client.
#[derive(Debug, Clone)]
pub struct ReloadEvent {
    pub kind: ReloadKind,
    /// URL paths of the changed outputs (used by `StyleInject`).
    pub paths: Vec<String>,
    pub completed_at: Instant,
}

impl ReloadEvent {
    pub fn full() -> Self {
        Self {
            kind: ReloadKind::FullReload,
            paths: Vec::new(),
            completed_at: Instant::now(),
        }
    }

    pub fn styles(paths: Vec<String>) -> Self {
        Self {
            kind: ReloadKind::StyleInject,
            paths,
            completed_at: Instant::now(),
        }
    }
}

/// Process-local broadcast of reload events.
///
/// Subscribers only see events sent after they subscribed; there is no
/// replay. Events reach each subscriber in emission order.
#[derive(Debug, Clone)]
pub struct ReloadChannel {
    tx: broadcast::Sender<ReloadEvent>,
}

impl Default for ReloadChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an event without waiting for delivery.
    pub fn broadcast(&self, event: ReloadEvent) {
        // No subscribers is not an error: nobody is connected yet
        if let Ok(count) = self.tx.send(event) {
            crate::debug!("reload"; "event sent to {} subscriber(s)", count);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }
}
