//! Configuration management (config.toml)
//!
//! Handles loading, saving, and providing defaults for launcher settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::gesture::{ButtonId, Combo, ComboFired};
use crate::library::ExtensionRules;

/// Launcher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Content directory and scanning settings
    #[serde(default)]
    pub library: LibraryConfig,
    /// Hold gestures
    #[serde(default)]
    pub input: InputConfig,
}

/// Library scanning and persistence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Directory holding content files and artwork (default: `<data_dir>/roms`)
    #[serde(default = "default_library_dir")]
    pub directory: PathBuf,
    /// Extensions treated as playable content (default: sfc, smc, fig, swc)
    #[serde(default = "default_content_extensions")]
    pub content_extensions: Vec<String>,
    /// Extension of artwork files next to the content (default: png)
    #[serde(default = "default_artwork_extension")]
    pub artwork_extension: String,
    /// Preferences key under which the last confirmed index is stored
    #[serde(default = "default_selection_key")]
    pub selection_key: String,
    /// Quiet period before a change notification triggers a rescan (default: 250)
    #[serde(default = "default_rescan_debounce_ms")]
    pub rescan_debounce_ms: u64,
}

/// Input gesture settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_combos")]
    pub combos: Vec<ComboConfig>,
}

/// A hold gesture as written in the config file.
///
/// ```toml
/// [[input.combos]]
/// name = "system_menu"
/// buttons = ["Select", "Start"]
/// hold_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboConfig {
    pub name: String,
    pub buttons: Vec<ButtonId>,
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
}

/// Name of the combo that opens the system menu.
pub const SYSTEM_MENU_COMBO: &str = "system_menu";
/// Name of the combo that asks to reset the focused game's save data.
pub const RESET_GAME_COMBO: &str = "reset_game";

fn default_library_dir() -> PathBuf {
    data_dir()
        .map(|dir| dir.join("roms"))
        .unwrap_or_else(|| PathBuf::from("roms"))
}
fn default_content_extensions() -> Vec<String> {
    ["sfc", "smc", "fig", "swc"].map(String::from).to_vec()
}
fn default_artwork_extension() -> String {
    "png".to_string()
}
fn default_selection_key() -> String {
    "last_game_index".to_string()
}
fn default_rescan_debounce_ms() -> u64 {
    250
}
fn default_hold_ms() -> u64 {
    1000
}
fn default_combos() -> Vec<ComboConfig> {
    vec![
        ComboConfig {
            name: SYSTEM_MENU_COMBO.to_string(),
            buttons: vec![ButtonId::Select, ButtonId::Start],
            hold_ms: default_hold_ms(),
        },
        ComboConfig {
            name: RESET_GAME_COMBO.to_string(),
            buttons: vec![ButtonId::X],
            hold_ms: default_hold_ms(),
        },
    ]
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            directory: default_library_dir(),
            content_extensions: default_content_extensions(),
            artwork_extension: default_artwork_extension(),
            selection_key: default_selection_key(),
            rescan_debounce_ms: default_rescan_debounce_ms(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            combos: default_combos(),
        }
    }
}

impl LibraryConfig {
    /// Library rooted at `directory` with every other setting at its default.
    pub fn with_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    pub fn extension_rules(&self) -> ExtensionRules {
        ExtensionRules::new(&self.content_extensions, &self.artwork_extension)
    }

    pub fn rescan_debounce(&self) -> Duration {
        Duration::from_millis(self.rescan_debounce_ms)
    }
}

impl ComboConfig {
    pub fn hold(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    /// Builds a registrable combo that invokes `callback` when held.
    pub fn to_combo<F>(&self, callback: F) -> Combo
    where
        F: Fn(&ComboFired) + Send + Sync + 'static,
    {
        Combo::new(
            self.name.clone(),
            self.buttons.iter().copied(),
            self.hold(),
            callback,
        )
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\ezlaunch\config`
/// On macOS: `~/Library/Application Support/io.ezlaunch.ezlaunch`
/// On Linux: `~/.config/ezlaunch`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.ezlaunch", "", "ezlaunch")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Returns the platform-specific data directory.
///
/// This is where the default content directory and `prefs.toml` live.
/// Returns `None` if the home directory cannot be determined.
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.ezlaunch", "", "ezlaunch")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Default location of the config file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Default location of the preferences file.
pub fn prefs_path() -> PathBuf {
    data_dir()
        .map(|dir| dir.join("prefs.toml"))
        .unwrap_or_else(|| PathBuf::from("prefs.toml"))
}

/// Loads the configuration from the platform config directory.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> Config {
    config_path().map(|path| load_from(&path)).unwrap_or_default()
}

/// Loads the configuration from `path`, falling back to defaults.
pub fn load_from(path: &Path) -> Config {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Config::default();
        }
    };

    match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Invalid config {}: {}. Using defaults.", path.display(), e);
            Config::default()
        }
    }
}

/// Saves the configuration to the platform config directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save(config: &Config) -> std::io::Result<()> {
    match config_path() {
        Some(path) => save_to(config, &path),
        None => Ok(()),
    }
}

/// Saves the configuration to `path`, creating parent directories.
pub fn save_to(config: &Config, path: &Path) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(config).map_err(std::io::Error::other)?;
    std::fs::write(path, content)
}
