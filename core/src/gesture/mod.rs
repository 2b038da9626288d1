//! Hold-to-confirm button gestures
//!
//! A [`Combo`] is a set of buttons that must all be held for a hold duration
//! before its callback fires. The [`GestureRecognizer`] tracks press state
//! from raw key events and runs one cancelable timer per fully-held combo.
//!
//! ```rust,ignore
//! let recognizer = GestureRecognizer::new(tokio::runtime::Handle::current());
//! recognizer.register_combo(Combo::new(
//!     "system_menu",
//!     [ButtonId::Select, ButtonId::Start],
//!     Duration::from_millis(1000),
//!     |fired| tracing::info!("{} held", fired.name),
//! ))?;
//! ```

mod button;
mod recognizer;


use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use button::{ButtonId, UnknownButton};
pub use recognizer::GestureRecognizer;

/// Callback invoked when a combo has been held for its full duration.
pub type ComboCallback = Arc<dyn Fn(&ComboFired) + Send + Sync>;

/// Handle identifying a registered combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComboHandle(pub(crate) usize);

impl ComboHandle {
    /// Registration order index of the combo.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Payload handed to a combo callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboFired {
    pub handle: ComboHandle,
    pub name: String,
}

/// Invalid combo definition, rejected at registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("combo '{0}' has no buttons")]
    EmptyCombo(String),

    #[error("combo '{0}' must have a hold duration greater than zero")]
    NonPositiveHold(String),
}

/// A named set of buttons that must be held together for `hold`.
#[derive(Clone)]
pub struct Combo {
    name: String,
    buttons: SmallVec<[ButtonId; 4]>,
    hold: Duration,
    callback: ComboCallback,
}

impl Combo {
    /// Creates a combo. Repeated buttons are collapsed, keeping first-seen order.
    pub fn new<B, F>(name: impl Into<String>, buttons: B, hold: Duration, callback: F) -> Self
    where
        B: IntoIterator<Item = ButtonId>,
        F: Fn(&ComboFired) + Send + Sync + 'static,
    {
        let mut unique: SmallVec<[ButtonId; 4]> = SmallVec::new();
        for button in buttons {
            if !unique.contains(&button) {
                unique.push(button);
            }
        }

        Self {
            name: name.into(),
            buttons: unique,
            hold,
            callback: Arc::new(callback),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buttons(&self) -> &[ButtonId] {
        &self.buttons
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    pub fn contains(&self, button: ButtonId) -> bool {
        self.buttons.contains(&button)
    }

    pub(crate) fn callback(&self) -> &ComboCallback {
        &self.callback
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.buttons.is_empty() {
            return Err(ConfigError::EmptyCombo(self.name.clone()));
        }
        if self.hold.is_zero() {
            return Err(ConfigError::NonPositiveHold(self.name.clone()));
        }
        Ok(())
    }
}

impl fmt::Debug for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Combo")
            .field("name", &self.name)
            .field("buttons", &self.buttons)
            .field("hold", &self.hold)
            .finish_non_exhaustive()
    }
}
