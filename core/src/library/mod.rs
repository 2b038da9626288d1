//! Game library management
//!
//! Scans a content directory for playable titles and their artwork, keeps the
//! resulting [`Library`] fresh as files change, and remembers which title was
//! last confirmed.
//!
//! Supported layout: a single flat directory. Each content file
//! (`<id>.sfc`, `<id>.smc`, ...) is one title; `<id>.png` next to it is its
//! artwork. Save data (`<id>.srm`, `<id>.suspend`) lives alongside.

mod operations;
mod rescan;
mod scanning;
mod selection;
mod sync;
mod watch;


use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

pub use operations::{ResetOutcome, SAVE_EXTENSIONS, reset_save_data};
pub use rescan::{RescanLoop, RescanTrigger, spawn_rescan_loop};
pub use scanning::ExtensionRules;
pub use selection::{Selection, clamp_index};
pub use sync::LibrarySynchronizer;
pub use watch::{ActiveWatch, FsEvent, FsEventKind, FsEventSink, NotifyBackend, WatchBackend, WatchError};

/// One playable entry found by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    /// Filename without extension (e.g. "Super_Game")
    pub id: String,
    /// Absolute path to the content file handed to the emulator
    pub content_path: PathBuf,
    /// Absolute path to the matching artwork, if present
    pub artwork_path: Option<PathBuf>,
    /// Display label (id with underscores replaced by spaces)
    pub label: String,
}

impl Title {
    pub fn new(id: impl Into<String>, content_path: PathBuf, artwork_path: Option<PathBuf>) -> Self {
        let id = id.into();
        let label = id.replace('_', " ");
        Self {
            id,
            content_path,
            artwork_path,
            label,
        }
    }

    pub fn has_artwork(&self) -> bool {
        self.artwork_path.is_some()
    }
}

/// Immutable snapshot of the scanned titles, sorted by id (case-insensitive).
///
/// Cloning is cheap; a rescan produces a new snapshot instead of mutating
/// this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library(Arc<[Title]>);

impl Library {
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    pub fn titles(&self) -> &[Title] {
        &self.0
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for Library {
    type Target = [Title];

    fn deref(&self) -> &[Title] {
        &self.0
    }
}

impl From<Vec<Title>> for Library {
    fn from(titles: Vec<Title>) -> Self {
        Self(Arc::from(titles))
    }
}
