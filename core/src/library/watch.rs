//! Library directory watching
//!
//! A [`WatchBackend`] turns a directory into a stream of [`FsEvent`]s delivered
//! to a sink. The returned [`ActiveWatch`] guard owns the native watch: dropping
//! it releases the watch.

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What happened to a path in the watched directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Deleted,
    /// Moved into the directory
    MovedIn,
    /// Moved out of the directory
    MovedOut,
    /// Renamed, direction unknown
    Moved,
}

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
}

/// Receives events from a backend, possibly on a backend-owned thread.
pub type FsEventSink = Arc<dyn Fn(FsEvent) + Send + Sync>;

/// Guard for a running watch. Dropping it stops the watch.
pub trait ActiveWatch: Send {}

/// Source of directory change notifications.
pub trait WatchBackend: Send + Sync {
    /// Starts watching `dir` (non-recursively), delivering events to `sink`.
    fn watch(&self, dir: &Path, sink: FsEventSink) -> Result<Box<dyn ActiveWatch>, WatchError>;
}

/// Error starting a directory watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("library directory not accessible: {}", .0.display())]
    NotAccessible(PathBuf),

    #[error("failed to watch {}: {source}", .path.display())]
    Backend {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Native backend using the platform's recommended `notify` watcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyBackend;

struct NotifyWatch {
    _watcher: RecommendedWatcher,
}

impl ActiveWatch for NotifyWatch {}

impl WatchBackend for NotifyBackend {
    fn watch(&self, dir: &Path, sink: FsEventSink) -> Result<Box<dyn ActiveWatch>, WatchError> {
        if !dir.is_dir() {
            return Err(WatchError::NotAccessible(dir.to_path_buf()));
        }

        let backend_error = |source| WatchError::Backend {
            path: dir.to_path_buf(),
            source,
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let Some(kind) = classify(&event.kind) else {
                    return;
                };
                for path in event.paths {
                    sink(FsEvent { kind, path });
                }
            }
            Err(e) => tracing::warn!("Library watch error: {}", e),
        })
        .map_err(backend_error)?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(backend_error)?;

        Ok(Box::new(NotifyWatch { _watcher: watcher }))
    }
}

/// Maps notify's event kinds onto the create/delete/move events we care about.
fn classify(kind: &EventKind) -> Option<FsEventKind> {
    match kind {
        EventKind::Create(_) => Some(FsEventKind::Created),
        EventKind::Remove(_) => Some(FsEventKind::Deleted),
        EventKind::Modify(ModifyKind::Name(mode)) => Some(match mode {
            RenameMode::To => FsEventKind::MovedIn,
            RenameMode::From => FsEventKind::MovedOut,
            _ => FsEventKind::Moved,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    #[test]
    fn test_classify_create_delete_move() {
        assert_eq!(
            classify(&EventKind::Create(CreateKind::File)),
            Some(FsEventKind::Created)
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::Any)),
            Some(FsEventKind::Deleted)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            Some(FsEventKind::MovedIn)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            Some(FsEventKind::MovedOut)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            Some(FsEventKind::Moved)
        );
    }

    #[test]
    fn test_classify_ignores_content_changes() {
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            None
        );
        assert_eq!(classify(&EventKind::Any), None);
    }

    #[test]
    fn test_notify_backend_rejects_missing_dir() {
        let sink: FsEventSink = Arc::new(|_| {});
        let result = NotifyBackend.watch(Path::new("/nonexistent/library/dir"), sink);
        assert!(matches!(result, Err(WatchError::NotAccessible(_))));
    }
}
