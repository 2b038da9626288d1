//! ezlaunch core - input gestures and game library synchronization
//!
//! This crate holds everything a console launcher front end needs that is not
//! drawing pixels.
//!
//! # Architecture
//!
//! - [`GestureRecognizer`] - Turns raw button events into hold-to-confirm combos
//! - [`LibrarySynchronizer`] - Scans the content directory, watches it for
//!   changes, and persists the last selected title
//! - [`config`] - `config.toml` loading with defaults
//! - [`prefs`] - Durable key-value preferences
//!
//! The two subsystems are independent; the launcher binary wires them together.

pub mod config;
pub mod gesture;
pub mod library;
pub mod prefs;

pub use config::Config;
pub use gesture::{
    ButtonId, Combo, ComboFired, ComboHandle, ConfigError, GestureRecognizer, UnknownButton,
};
pub use library::{Library, LibrarySynchronizer, Selection, Title};
pub use prefs::{Prefs, PrefsError};
