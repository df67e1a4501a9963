//! WebSocket Server for Live Reload
//!
//! Three std threads share the client list:
//! - acceptor: handshakes new connections, greets them with `connected`
//! - broadcaster: forwards `ReloadChannel` events to every client
//! - reader: drains client frames and drops closed connections

use std::net::{IpAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::message::HotReloadMessage;
use super::{ReloadChannel, ReloadEvent};

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Running WebSocket server.
pub struct ReloadServer {
    port: u16,
    clients: Clients,
    stopped: Arc<AtomicBool>,
}

impl ReloadServer {
    /// Bind on `interface`, trying successive ports from `base_port`, and
    /// start forwarding events from `channel`.
    pub fn start(interface: IpAddr, base_port: u16, channel: &ReloadChannel) -> Result<Self> {
        let (listener, port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
        listener.set_nonblocking(true)?;

        let clients: Clients = Arc::new(Mutex::new(Vec::new()));
        let stopped = Arc::new(AtomicBool::new(false));

        {
            let clients = Arc::clone(&clients);
            let stopped = Arc::clone(&stopped);
            std::thread::spawn(move || accept_loop(&listener, &clients, &stopped));
        }
        {
            let clients = Arc::clone(&clients);
            let stopped = Arc::clone(&stopped);
            std::thread::spawn(move || reader_loop(&clients, &stopped));
        }
        {
            let clients = Arc::clone(&clients);
            let rx = channel.subscribe();
            std::thread::spawn(move || broadcast_loop(rx, &clients));
        }

        crate::debug!("reload"; "ws://{}:{}", interface, port);
        Ok(Self {
            port,
            clients,
            stopped,
        })
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Stop accepting clients and close the open connections.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let mut clients = self.clients.lock();
        for mut ws in clients.drain(..) {
            let _ = ws.close(None);
        }
    }
}

fn accept_loop(listener: &TcpListener, clients: &Clients, stopped: &AtomicBool) {
    while !stopped.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, addr)) => {
                crate::debug!("reload"; "client connected: {}", addr);
                // Set blocking for the handshake
                let _ = stream.set_nonblocking(false);
                add_client(stream, clients);
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                crate::log!("reload"; "accept error: {}", e);
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

fn add_client(stream: TcpStream, clients: &Clients) {
    match tungstenite::accept(stream) {
        Ok(mut ws) => {
            let connected = HotReloadMessage::Connected.to_json();
            if let Err(e) = ws.send(Message::Text(connected.into())) {
                crate::debug!("reload"; "failed to send connected message: {}", e);
                return;
            }
            // Non-blocking for polling reads
            let _ = ws.get_ref().set_nonblocking(true);

            let mut clients = clients.lock();
            clients.push(ws);
            crate::debug!("reload"; "client connected (total: {})", clients.len());
        }
        Err(e) => crate::log!("reload"; "handshake failed: {}", e),
    }
}

/// Poll client frames so closes are noticed and pings answered.
fn reader_loop(clients: &Clients, stopped: &AtomicBool) {
    while !stopped.load(Ordering::SeqCst) {
        std::thread::sleep(POLL_INTERVAL);

        clients.lock().retain_mut(|ws| match ws.read() {
            Ok(Message::Close(_)) => false,
            Ok(Message::Text(text)) => {
                if let Some(message) = HotReloadMessage::from_json(&text) {
                    crate::debug!("reload"; "client sent {:?}", message);
                }
                true
            }
            Ok(_) => true,
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                true
            }
            Err(_) => false,
        });
    }
}

/// Forward events until every channel sender is gone.
fn broadcast_loop(mut rx: broadcast::Receiver<ReloadEvent>, clients: &Clients) {
    loop {
        match rx.blocking_recv() {
            Ok(event) => send_all(clients, &event),
            Err(RecvError::Lagged(skipped)) => {
                crate::debug!("reload"; "skipped {} stale event(s)", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn send_all(clients: &Clients, event: &ReloadEvent) {
    let text = HotReloadMessage::from(event).to_json();
    let mut clients = clients.lock();
    if clients.is_empty() {
        return;
    }

    clients.retain_mut(|ws| match ws.send(Message::Text(text.clone().into())) {
        Ok(()) => true,
        Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
            // Frame is buffered; flushed on the next write
            true
        }
        Err(e) => {
            crate::debug!("reload"; "client disconnected: {}", e);
            false
        }
    });
    crate::debug!("reload"; "{:?} sent to {} client(s)", event.kind, clients.len());
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[test]
    fn test_port_retry_skips_taken_port() {
        let taken = TcpListener::bind((LOCALHOST, 0)).unwrap();
        let port = taken.local_addr().unwrap().port();

        let (_listener, actual) = try_bind_port(LOCALHOST, port, 10).unwrap();
        assert_ne!(actual, port);
    }

    #[test]
    fn test_client_receives_connected_then_events() {
        let channel = ReloadChannel::new();
        let server = ReloadServer::start(LOCALHOST, 0, &channel).unwrap();

        let (mut ws, _) =
            tungstenite::connect(format!("ws://127.0.0.1:{}", server.port())).unwrap();
        let hello = ws.read().unwrap();
        assert_eq!(hello.into_text().unwrap().as_str(), r#"{"type":"connected"}"#);

        // Give the acceptor time to register the client
        std::thread::sleep(Duration::from_millis(50));
        channel.broadcast(ReloadEvent::styles(vec!["/main.css".into()]));
        let msg = ws.read().unwrap();
        assert_eq!(
            msg.into_text().unwrap().as_str(),
            r#"{"type":"css","paths":["/main.css"]}"#
        );

        server.stop();
    }
}
