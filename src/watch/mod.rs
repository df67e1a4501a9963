//! Debounced watch bindings.
//!
//! Each binding owns one filesystem listener and one event loop:
//!
//! ```text
//! notify callback --(rel path, kind)--> loop: Debouncer --> on_trigger()
//! ```
//!
//! At most one trigger runs per binding. Changes arriving while it runs
//! are coalesced into a single queued rerun that starts after it ends.
//! Bindings are independent: a file matched by two bindings fires both.

mod debouncer;

#[cfg(test)]
mod tests;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, OptionFuture, join_all};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::asset::Globs;
use crate::debug;
use crate::utils::path::relative_to;
pub use debouncer::ChangeKind;
use debouncer::{Debouncer, is_temp_file};

/// Work started once per coalesced batch.
pub type Trigger = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

type Change = (PathBuf, ChangeKind);

/// Glob patterns under a base directory, bound to a trigger.
pub struct WatchBinding {
    name: String,
    base: PathBuf,
    globs: Globs,
    debounce: Duration,
    on_trigger: Trigger,
}

impl WatchBinding {
    pub fn new(
        name: impl Into<String>,
        base: impl Into<PathBuf>,
        globs: Globs,
        debounce: Duration,
        on_trigger: Trigger,
    ) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            globs,
            debounce,
            on_trigger,
        }
    }

    /// Attach a recursive listener on the base directory and start the loop.
    ///
    /// A base directory that does not exist yet is not an error; the binding
    /// is idle until the session ends.
    pub fn watch(self) -> notify::Result<WatchHandle> {
        let (tx, rx) = mpsc::unbounded_channel();

        if !self.base.is_dir() {
            debug!("watch"; "{}: {} does not exist, not watching", self.name, self.base.display());
            return Ok(self.spawn(rx, None));
        }

        // Some backends report canonical paths, others the watched one
        let roots = vec![
            self.base.clone(),
            self.base.canonicalize().unwrap_or_else(|_| self.base.clone()),
        ];
        let globs = self.globs.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for change in matched_changes(&event, &roots, &globs) {
                        // Receiver gone means the binding stopped
                        let _ = tx.send(change);
                    }
                }
                Err(e) => crate::log!("watch"; "notify error: {}", e),
            }
        })?;
        watcher.watch(&self.base, RecursiveMode::Recursive)?;

        Ok(self.spawn(rx, Some(watcher)))
    }

    /// Start the event loop over an already-filtered change stream.
    fn spawn(
        self,
        changes: mpsc::UnboundedReceiver<Change>,
        watcher: Option<RecommendedWatcher>,
    ) -> WatchHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let name = self.name.clone();
        let task = tokio::spawn(self.run(changes, stop_rx));
        WatchHandle {
            name,
            stop_tx: Some(stop_tx),
            task,
            watcher,
        }
    }

    async fn run(self, mut changes: mpsc::UnboundedReceiver<Change>, mut stop: oneshot::Receiver<()>) {
        let mut debouncer = Debouncer::new(self.debounce);
        let mut running: Option<BoxFuture<'static, ()>> = None;

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                Some((path, kind)) = changes.recv() => debouncer.add(path, kind),
                Some(()) = OptionFuture::from(running.as_mut()), if running.is_some() => {
                    running = None;
                }
                _ = tokio::time::sleep(debouncer.sleep_duration()),
                    if running.is_none() && debouncer.has_pending() =>
                {
                    if let Some(batch) = debouncer.take_if_ready() {
                        debug!("watch"; "{}: {} changed", self.name, describe(&batch));
                        running = Some((self.on_trigger)());
                    }
                }
            }
        }

        // Queued batches are dropped; the in-flight run ends on its own
        debouncer.clear();
        if let Some(run) = running {
            run.await;
        }
    }
}

/// Paths relative to the first matching root that match `globs`, with
/// their change kind.
fn matched_changes(event: &notify::Event, roots: &[PathBuf], globs: &Globs) -> Vec<Change> {
    let Some(kind) = ChangeKind::from_notify(&event.kind) else {
        return Vec::new();
    };
    event
        .paths
        .iter()
        .filter(|path| !is_temp_file(path))
        .filter_map(|path| roots.iter().find_map(|root| relative_to(path, root)))
        .filter(|rel| globs.is_match(rel))
        .map(|rel| (rel, kind))
        .collect()
}

fn describe(batch: &[Change]) -> String {
    match batch {
        [(path, kind)] => format!("{} {}", path.display(), kind.label()),
        _ => crate::utils::plural_count(batch.len(), "file"),
    }
}

/// Running binding. Dropping it also ends the loop, after the in-flight run.
pub struct WatchHandle {
    name: String,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    watcher: Option<RecommendedWatcher>,
}

impl WatchHandle {
    /// Detach the listener, cancel any queued run and wait for the
    /// in-flight one to finish.
    pub async fn stop(mut self) {
        drop(self.watcher.take());
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            crate::log!("watch"; "{} loop failed: {}", self.name, e);
        }
    }
}

/// Every binding of one `serve` invocation, torn down together.
#[derive(Default)]
pub struct WatchSession {
    handles: Vec<WatchHandle>,
}

impl WatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, binding: WatchBinding) -> notify::Result<()> {
        self.handles.push(binding.watch()?);
        Ok(())
    }

    pub async fn stop(self) {
        join_all(self.handles.into_iter().map(WatchHandle::stop)).await;
    }
}
