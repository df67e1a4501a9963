//! Ctrl+C handling.
//!
//! Before a long-running session arms the handler, Ctrl+C exits the process
//! immediately (nothing to tear down). Once armed, Ctrl+C only flips the
//! shutdown signal and the session runs its own teardown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Exit status used when interrupted before a session is armed.
const INTERRUPTED: i32 = 130;

/// Receiving side of the Ctrl+C signal.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
    armed: Arc<AtomicBool>,
}

/// Install the global Ctrl+C handler. Call once at program start.
pub fn setup_shutdown_handler() -> anyhow::Result<Shutdown> {
    let (tx, rx) = watch::channel(false);
    let armed = Arc::new(AtomicBool::new(false));

    let handler_armed = Arc::clone(&armed);
    ctrlc::set_handler(move || {
        if !handler_armed.load(Ordering::SeqCst) {
            std::process::exit(INTERRUPTED);
        }
        crate::log!("serve"; "shutting down...");
        let _ = tx.send(true);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;

    Ok(Shutdown { rx, armed })
}

impl Shutdown {
    /// Route Ctrl+C to [`Shutdown::wait`] instead of exiting.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Resolve once Ctrl+C is received.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|requested| *requested).await;
    }

    #[cfg(test)]
    pub fn manual() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        let shutdown = Self {
            rx,
            armed: Arc::new(AtomicBool::new(true)),
        };
        (tx, shutdown)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Shutdown;

    #[tokio::test(start_paused = true)]
    async fn test_wait_resolves_after_signal() {
        let (tx, mut shutdown) = Shutdown::manual();
        let pending = tokio::time::timeout(Duration::from_millis(100), shutdown.wait()).await;
        assert!(pending.is_err());

        tx.send(true).unwrap();
        shutdown.wait().await;
    }
}
