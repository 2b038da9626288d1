//! Per-title file operations

use std::fs;
use std::io;
use std::path::PathBuf;

use super::Title;

/// Save-data files stored next to a title's content file: SRAM and
/// suspend state.
pub const SAVE_EXTENSIONS: &[&str] = &["srm", "suspend"];

/// Which save files [`reset_save_data`] removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetOutcome {
    pub removed: Vec<PathBuf>,
}

impl ResetOutcome {
    pub fn any_removed(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Deletes the save data (`<id>.srm`, `<id>.suspend`) of `title`.
///
/// Returns `Ok` with an empty outcome if there was nothing to delete.
pub fn reset_save_data(title: &Title) -> io::Result<ResetOutcome> {
    let mut outcome = ResetOutcome::default();
    let Some(dir) = title.content_path.parent() else {
        return Ok(outcome);
    };

    for ext in SAVE_EXTENSIONS {
        let path = dir.join(format!("{}.{}", title.id, ext));
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Deleted save file: {}", path.display());
                outcome.removed.push(path);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }

    if !outcome.any_removed() {
        tracing::debug!("No save data found for {}", title.label);
    }
    Ok(outcome)
}
