//! Durable key-value preferences (prefs.toml)
//!
//! A flat TOML table of integer values. Writes go to a temp file that is then
//! renamed over the original, so a crash mid-write never leaves a truncated
//! file behind.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Error loading a preferences file.
#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed preferences file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Prefs {
    path: PathBuf,
    values: BTreeMap<String, i64>,
    dirty: bool,
}

impl Prefs {
    /// Creates an empty store backed by `path`. Nothing is read or written.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            values: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Loads `path`, or returns an empty store if the file does not exist.
    pub fn load(path: PathBuf) -> Result<Self, PrefsError> {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new(path)),
            Err(source) => return Err(PrefsError::Io { path, source }),
        };

        match toml::from_str::<BTreeMap<String, i64>>(&content) {
            Ok(values) => Ok(Self {
                path,
                values,
                dirty: false,
            }),
            Err(source) => Err(PrefsError::Parse { path, source }),
        }
    }

    /// Like [`Prefs::load`], but falls back to an empty store on any error.
    pub fn load_or_default(path: PathBuf) -> Self {
        match Self::load(path.clone()) {
            Ok(prefs) => prefs,
            Err(e) => {
                tracing::warn!("{}. Starting with empty preferences.", e);
                Self::new(path)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    pub fn set_int(&mut self, key: &str, value: i64) {
        if self.values.insert(key.to_string(), value) != Some(value) {
            self.dirty = true;
        }
    }

    pub fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.dirty = true;
        }
    }

    /// Writes pending changes to disk. No-op when nothing changed.
    pub fn flush(&mut self) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = match self.path.file_name() {
            Some(name) => {
                let mut tmp_name = OsString::from(name);
                tmp_name.push(".tmp");
                self.path.with_file_name(tmp_name)
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "preferences path has no file name",
                ));
            }
        };

        let content = toml::to_string(&self.values).map_err(io::Error::other)?;

        {
            let mut f = fs::File::create(&tmp_path)?;
            f.write_all(content.as_bytes())?;
            f.sync_all()?;
        }

        #[cfg(windows)]
        {
            if self.path.exists() {
                // Windows rename fails if destination exists.
                fs::remove_file(&self.path)?;
            }
        }

        fs::rename(&tmp_path, &self.path)?;

        self.dirty = false;
        Ok(())
    }
}
