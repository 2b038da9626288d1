//! Debounced rescans driven by change notifications
//!
//! Change notifications tend to arrive in bursts (a copy writes the content
//! file and its artwork back to back). The rescan loop waits for a quiet
//! period, scans once, and hands the fresh library to a callback.

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{Library, LibrarySynchronizer};

/// A burst never delays its rescan by more than this many debounce periods.
const MAX_WAIT_FACTOR: u32 = 8;

/// Clonable handle that requests a rescan. Cheap enough to call from a watch
/// callback for every event.
#[derive(Debug, Clone)]
pub struct RescanTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl RescanTrigger {
    pub fn notify(&self) {
        // Closed channel means the loop was shut down; nothing left to wake.
        let _ = self.tx.send(());
    }
}

/// A running rescan loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct RescanLoop {
    trigger: RescanTrigger,
    task: JoinHandle<()>,
}

impl RescanLoop {
    pub fn trigger(&self) -> RescanTrigger {
        self.trigger.clone()
    }

    /// Stops the loop. A scan already running on the blocking pool finishes
    /// but its result is not delivered.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for RescanLoop {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns the rescan loop on `runtime`.
///
/// After a notification the loop waits until `debounce` passes without
/// another one (but no longer than eight debounce periods in total), then
/// scans on the blocking pool and calls `on_library`.
/// Notifications that arrive during a scan schedule exactly one follow-up.
pub fn spawn_rescan_loop<F>(
    runtime: &Handle,
    sync: Arc<LibrarySynchronizer>,
    debounce: Duration,
    on_library: F,
) -> RescanLoop
where
    F: Fn(Library) + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = runtime.spawn(run(rx, sync, debounce, on_library));
    RescanLoop {
        trigger: RescanTrigger { tx },
        task,
    }
}

async fn run<F>(
    mut rx: mpsc::UnboundedReceiver<()>,
    sync: Arc<LibrarySynchronizer>,
    debounce: Duration,
    on_library: F,
) where
    F: Fn(Library) + Send + Sync + 'static,
{
    while rx.recv().await.is_some() {
        let mut coalesced = 1usize;
        let cap = Instant::now() + debounce * MAX_WAIT_FACTOR;
        loop {
            let now = Instant::now();
            if now >= cap {
                tracing::debug!("Change notifications still arriving, rescanning anyway");
                break;
            }
            let quiet = (now + debounce).min(cap);
            match tokio::time::timeout_at(quiet, rx.recv()).await {
                Ok(Some(())) => coalesced += 1,
                // Quiet period elapsed, or every trigger was dropped
                Ok(None) | Err(_) => break,
            }
        }

        tracing::debug!("Rescanning after {} change notifications", coalesced);
        let scanner = sync.clone();
        match tokio::task::spawn_blocking(move || scanner.scan()).await {
            Ok(library) => on_library(library),
            Err(e) => tracing::warn!("Library rescan failed: {}", e),
        }
    }
}
