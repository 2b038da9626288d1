//! Focused and confirmed positions in the library

use super::{Library, LibrarySynchronizer, Title};

/// Clamps `index` into `0..len`. An empty library clamps to 0.
pub fn clamp_index(index: usize, len: usize) -> usize {
    if len == 0 { 0 } else { index.min(len - 1) }
}

/// Browsing position within the library.
///
/// `focused` follows the user while browsing and is never persisted on its
/// own; `confirmed` is the last index handed to [`Selection::confirm`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    focused: usize,
    confirmed: usize,
}

impl Selection {
    /// Restores the persisted position, clamped to `library`.
    pub fn restore(sync: &LibrarySynchronizer, library: &Library) -> Self {
        let saved = sync.restore_selection();
        let focused = clamp_index(saved, library.len());
        if focused != saved {
            tracing::debug!("Restored index {} clamped to {}", saved, focused);
        }
        Self {
            focused,
            confirmed: saved,
        }
    }

    pub fn focused(&self) -> usize {
        self.focused
    }

    pub fn confirmed(&self) -> usize {
        self.confirmed
    }

    /// Moves focus to `index`, clamped to the library. Returns the new focus.
    pub fn focus(&mut self, index: usize, library: &Library) -> usize {
        self.focused = clamp_index(index, library.len());
        self.focused
    }

    /// Moves focus by `delta`, stopping at either end.
    pub fn step(&mut self, delta: isize, library: &Library) -> usize {
        let target = self.focused.saturating_add_signed(delta);
        self.focus(target, library)
    }

    /// Keeps focus in bounds after a rescan. Focus only moves if it fell off
    /// the end of the new library.
    pub fn on_library_changed(&mut self, library: &Library) {
        self.focused = clamp_index(self.focused, library.len());
    }

    pub fn focused_title<'a>(&self, library: &'a Library) -> Option<&'a Title> {
        library.get(self.focused)
    }

    /// Persists the focused index and returns the title to launch.
    ///
    /// Returns `None` (and persists nothing) when the library is empty.
    pub fn confirm(&mut self, sync: &LibrarySynchronizer, library: &Library) -> Option<Title> {
        let title = self.focused_title(library)?.clone();
        sync.persist_selection(self.focused);
        self.confirmed = self.focused;
        tracing::info!("Selected {} at index {}", title.label, self.focused);
        Some(title)
    }
}
