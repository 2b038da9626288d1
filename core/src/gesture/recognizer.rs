//! Gesture recognizer: press state, combo index, and hold timers

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{ButtonId, Combo, ComboFired, ComboHandle, ConfigError};

/// Detects combos held continuously for their hold duration.
///
/// Key events and timer expiry serialize through one mutex. A timer that wakes
/// after its combo was released finds its pending entry gone (or replaced by a
/// newer arm) and exits without firing, so each qualifying hold fires at most
/// once.
///
/// Dropping the recognizer cancels every pending timer.
pub struct GestureRecognizer {
    shared: Arc<Shared>,
    runtime: Handle,
}

struct Shared {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    combos: Vec<Combo>,
    /// Button -> indices of combos that include it
    by_button: HashMap<ButtonId, SmallVec<[usize; 2]>>,
    pressed: HashSet<ButtonId>,
    /// Combo index -> in-flight timer
    pending: HashMap<usize, PendingTrigger>,
    next_generation: u64,
}

struct PendingTrigger {
    generation: u64,
    armed_at: Instant,
    task: JoinHandle<()>,
}

impl State {
    fn rebuild_index(&mut self) {
        self.by_button.clear();
        for (index, combo) in self.combos.iter().enumerate() {
            for &button in combo.buttons() {
                self.by_button.entry(button).or_default().push(index);
            }
        }
    }

    fn fully_held(&self, index: usize) -> bool {
        self.combos[index]
            .buttons()
            .iter()
            .all(|button| self.pressed.contains(button))
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Timer completion for the trigger armed with `generation`.
    fn expire(&self, index: usize, generation: u64) {
        let (callback, fired, armed_at) = {
            let mut state = self.lock();

            let Some(armed_at) = state
                .pending
                .get(&index)
                .filter(|pending| pending.generation == generation)
                .map(|pending| pending.armed_at)
            else {
                return;
            };
            state.pending.remove(&index);

            let combo = &state.combos[index];
            if !state.fully_held(index) {
                tracing::debug!("Combo '{}' released before hold timeout", combo.name());
                return;
            }

            let fired = ComboFired {
                handle: ComboHandle(index),
                name: combo.name().to_string(),
            };
            (combo.callback().clone(), fired, armed_at)
        };

        tracing::info!(
            "Combo '{}' held for {:?} - triggering",
            fired.name,
            armed_at.elapsed()
        );
        callback(&fired);
    }
}

impl GestureRecognizer {
    /// Creates a recognizer whose hold timers run on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
            }),
            runtime,
        }
    }

    /// Adds a combo to the watch set.
    ///
    /// A combo whose buttons are already held when it is registered arms on the
    /// next qualifying key-down, not immediately.
    pub fn register_combo(&self, combo: Combo) -> Result<ComboHandle, ConfigError> {
        combo.validate()?;

        let mut state = self.shared.lock();
        let handle = ComboHandle(state.combos.len());
        tracing::info!(
            "Registered combo '{}' ({} buttons, hold {:?})",
            combo.name(),
            combo.buttons().len(),
            combo.hold()
        );
        state.combos.push(combo);
        state.rebuild_index();
        Ok(handle)
    }

    /// Records `button` as pressed and arms every combo it completes.
    ///
    /// Returns `true` if the button belongs to at least one registered combo.
    pub fn on_key_down(&self, button: ButtonId) -> bool {
        let mut state = self.shared.lock();
        let newly_pressed = state.pressed.insert(button);

        let Some(affected) = state.by_button.get(&button).cloned() else {
            return false;
        };

        if !newly_pressed {
            tracing::trace!("{} already down, ignoring repeat", button);
            return true;
        }

        tracing::debug!("{} down", button);
        for index in affected {
            if !state.pending.contains_key(&index) && state.fully_held(index) {
                self.arm(&mut state, index);
            }
        }
        true
    }

    /// Records `button` as released and cancels every pending combo using it.
    ///
    /// Returns `true` if the button belongs to at least one registered combo.
    pub fn on_key_up(&self, button: ButtonId) -> bool {
        let mut state = self.shared.lock();
        let was_pressed = state.pressed.remove(&button);

        let State {
            by_button,
            pending,
            combos,
            ..
        } = &mut *state;

        let Some(affected) = by_button.get(&button) else {
            return false;
        };

        if !was_pressed {
            return true;
        }

        tracing::debug!("{} up", button);
        for index in affected {
            if let Some(trigger) = pending.remove(index) {
                trigger.task.abort();
                tracing::debug!("Combo '{}' cancelled", combos[*index].name());
            }
        }
        true
    }

    /// Releases every button and cancels all pending triggers.
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        state.pressed.clear();
        for (_, trigger) in state.pending.drain() {
            trigger.task.abort();
        }
    }

    /// Number of combos currently waiting on their hold timer.
    pub fn pending_count(&self) -> usize {
        self.shared.lock().pending.len()
    }

    pub fn is_pressed(&self, button: ButtonId) -> bool {
        self.shared.lock().pressed.contains(&button)
    }

    pub fn combo_count(&self) -> usize {
        self.shared.lock().combos.len()
    }

    fn arm(&self, state: &mut State, index: usize) {
        let generation = state.next_generation;
        state.next_generation += 1;

        let hold = state.combos[index].hold();
        let armed_at = Instant::now();
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep_until(armed_at + hold).await;
            if let Some(shared) = shared.upgrade() {
                shared.expire(index, generation);
            }
        });

        tracing::debug!(
            "Combo '{}' fully held - waiting {:?}",
            state.combos[index].name(),
            hold
        );
        state.pending.insert(
            index,
            PendingTrigger {
                generation,
                armed_at,
                task,
            },
        );
    }
}

impl Drop for GestureRecognizer {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        for (_, trigger) in state.pending.drain() {
            trigger.task.abort();
        }
    }
}

impl std::fmt::Debug for GestureRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("GestureRecognizer")
            .field("combos", &state.combos)
            .field("pressed", &state.pressed)
            .field("pending", &state.pending.len())
            .finish()
    }
}
