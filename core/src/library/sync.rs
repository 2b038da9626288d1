//! Library synchronizer: scan, watch, and selection persistence

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use super::scanning::{ExtensionRules, scan_dir};
use super::watch::{ActiveWatch, FsEvent, FsEventSink, NotifyBackend, WatchBackend, WatchError};
use super::Library;
use crate::config::LibraryConfig;
use crate::prefs::Prefs;

/// Owns the canonical [`Library`] for one content directory.
///
/// Scans replace the library atomically; readers holding an older snapshot
/// keep it unchanged. At most one directory watch is active at a time.
pub struct LibrarySynchronizer {
    config: LibraryConfig,
    rules: ExtensionRules,
    current: RwLock<Snapshot>,
    next_ticket: AtomicU64,
    backend: Arc<dyn WatchBackend>,
    watch: Mutex<Option<WatchSlot>>,
    prefs: Mutex<Prefs>,
}

struct Snapshot {
    /// Ticket of the scan that produced `library` (0 = never scanned)
    ticket: u64,
    library: Library,
}

struct WatchSlot {
    guard: Box<dyn ActiveWatch>,
    /// Cleared before the guard is dropped so in-flight events are discarded.
    /// The sink holds the read lock while `on_changed` runs.
    live: Arc<RwLock<bool>>,
}

impl LibrarySynchronizer {
    /// Creates a synchronizer using the native `notify` watcher.
    pub fn new(config: LibraryConfig, prefs: Prefs) -> Self {
        Self::with_backend(config, prefs, Arc::new(NotifyBackend))
    }

    pub fn with_backend(config: LibraryConfig, prefs: Prefs, backend: Arc<dyn WatchBackend>) -> Self {
        let rules = config.extension_rules();
        Self {
            config,
            rules,
            current: RwLock::new(Snapshot {
                ticket: 0,
                library: Library::empty(),
            }),
            next_ticket: AtomicU64::new(1),
            backend,
            watch: Mutex::new(None),
            prefs: Mutex::new(prefs),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    pub fn rules(&self) -> &ExtensionRules {
        &self.rules
    }

    /// Creates the content directory if it does not exist yet.
    ///
    /// Returns `true` if the directory exists afterwards.
    pub fn ensure_directory(&self) -> bool {
        let dir = self.directory();
        if dir.is_dir() {
            return true;
        }

        tracing::info!("Creating library directory: {}", dir.display());
        match std::fs::create_dir_all(dir) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to create library directory {}: {}", dir.display(), e);
                false
            }
        }
    }

    /// Rescans the directory and publishes the result.
    ///
    /// If a scan that started later has already been published, this scan's
    /// result is dropped and the newer library is returned instead.
    pub fn scan(&self) -> Library {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        let library = Library::from(scan_dir(self.directory(), &self.rules));
        self.publish(ticket, library)
    }

    fn publish(&self, ticket: u64, library: Library) -> Library {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if ticket > current.ticket {
            current.ticket = ticket;
            current.library = library;
        } else {
            tracing::debug!("Discarding superseded scan #{}", ticket);
        }
        current.library.clone()
    }

    /// Current library snapshot.
    pub fn library(&self) -> Library {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .library
            .clone()
    }

    /// Starts watching the directory, replacing any previous watch.
    ///
    /// `on_changed` runs for every create/delete/move of a content or artwork
    /// file, on whatever thread the backend delivers events from. Once this
    /// returns, callbacks of the replaced watch have finished and never run
    /// again. `on_changed` must not call back into the watch methods.
    pub fn start_watching<F>(&self, on_changed: F) -> Result<(), WatchError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut slot = self.lock_watch();
        Self::release(&mut slot);

        let live = Arc::new(RwLock::new(true));
        let gate = live.clone();
        let rules = self.rules.clone();
        let sink: FsEventSink = Arc::new(move |event: FsEvent| {
            if !rules.is_relevant(&event.path) {
                return;
            }
            let live = gate.read().unwrap_or_else(PoisonError::into_inner);
            if !*live {
                return;
            }
            tracing::debug!("Library change {:?}: {}", event.kind, event.path.display());
            on_changed();
        });

        match self.backend.watch(self.directory(), sink) {
            Ok(guard) => {
                tracing::info!("Started watching library directory: {}", self.directory().display());
                *slot = Some(WatchSlot { guard, live });
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Cannot watch library directory: {}", e);
                Err(e)
            }
        }
    }

    /// Stops the active watch, if any. The watch is released, and no callback
    /// is running or will run, once this returns.
    pub fn stop_watching(&self) {
        let mut slot = self.lock_watch();
        if Self::release(&mut slot) {
            tracing::info!("Stopped watching library directory: {}", self.directory().display());
        }
    }

    pub fn is_watching(&self) -> bool {
        self.lock_watch().is_some()
    }

    /// Persists `index` as the last confirmed selection.
    ///
    /// Write failures are logged; the in-memory value is still updated.
    pub fn persist_selection(&self, index: usize) {
        let mut prefs = self.lock_prefs();
        let value = i64::try_from(index).unwrap_or(i64::MAX);
        prefs.set_int(&self.config.selection_key, value);
        if let Err(e) = prefs.flush() {
            tracing::warn!(
                "Failed to save selection to {}: {}",
                prefs.path().display(),
                e
            );
        }
    }

    /// Last persisted selection, or 0 if none was ever saved.
    ///
    /// The value is not clamped; see [`super::clamp_index`].
    pub fn restore_selection(&self) -> usize {
        self.lock_prefs()
            .get_int(&self.config.selection_key)
            .and_then(|value| usize::try_from(value).ok())
            .unwrap_or(0)
    }

    fn release(slot: &mut Option<WatchSlot>) -> bool {
        match slot.take() {
            Some(WatchSlot { guard, live }) => {
                // Waits for callbacks already past the gate
                *live.write().unwrap_or_else(PoisonError::into_inner) = false;
                drop(guard);
                true
            }
            None => false,
        }
    }

    fn lock_watch(&self) -> MutexGuard<'_, Option<WatchSlot>> {
        self.watch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_prefs(&self) -> MutexGuard<'_, Prefs> {
        self.prefs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LibrarySynchronizer {
    fn drop(&mut self) {
        Self::release(&mut self.lock_watch());
    }
}

impl std::fmt::Debug for LibrarySynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibrarySynchronizer")
            .field("directory", &self.config.directory)
            .field("titles", &self.library().len())
            .field("watching", &self.is_watching())
            .finish()
    }
}
