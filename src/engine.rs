//! The macro engine: turns key transitions into macro activations.
//!
//! The engine subscribes to the [`EventDispatcher`](crate::input::EventDispatcher)
//! like any other consumer. On every press it looks up the active profile
//! through the [`SettingsStore`], resolves the held key combination in the
//! current memory bank and reports what happened to a [`MacroSink`].
//!
//! # Repeat modes
//!
//! - [`RepeatMode::WhileHeld`]: activated on press, deactivated as soon as
//!   one of its keys is released
//! - [`RepeatMode::Toggle`]: the first press activates, the next deactivates
//! - [`RepeatMode::None`]: activated once per press, never deactivated
//!
//! A lone M1-M3 press with no macro bound to it switches the memory bank.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::device::DeviceInfo;
use crate::error::Result;
use crate::input::{InputConsumer, TransitionEvent};
use crate::keys::{Key, KeySet};
use crate::profile::{Bank, ProfileStore, RepeatMode, ResolvedMacro, resolve};
use crate::settings::{SettingsStore, active_profile};

/// Something the engine did in response to a key transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Activated { bank: Bank, resolved: ResolvedMacro },
    Deactivated { bank: Bank, resolved: ResolvedMacro },
    BankChanged { bank: Bank },
}

/// Receives engine events on the polling thread.
pub trait MacroSink: Send + Sync {
    fn handle(&self, event: EngineEvent);
}

impl<F> MacroSink for F
where
    F: Fn(EngineEvent) + Send + Sync,
{
    fn handle(&self, event: EngineEvent) {
        self(event);
    }
}

#[derive(Debug, Default)]
struct EngineState {
    bank: Option<Bank>,
    /// While-held macros, deactivated when any of their keys goes up.
    held: Vec<(Bank, ResolvedMacro)>,
    /// Toggle macros currently switched on, by bank and key set.
    toggled: BTreeMap<(Bank, KeySet), ResolvedMacro>,
}

/// Input consumer running macros from the active profile.
pub struct MacroEngine {
    device: DeviceInfo,
    store: Arc<ProfileStore>,
    settings: Arc<dyn SettingsStore>,
    sink: Arc<dyn MacroSink>,
    state: Mutex<EngineState>,
}

impl MacroEngine {
    pub fn new(
        device: DeviceInfo,
        store: Arc<ProfileStore>,
        settings: Arc<dyn SettingsStore>,
        sink: Arc<dyn MacroSink>,
    ) -> Self {
        Self {
            device,
            store,
            settings,
            sink,
            state: Mutex::new(EngineState::default()),
        }
    }

    pub const fn device(&self) -> &DeviceInfo {
        &self.device
    }

    /// The selected memory bank. Starts at M1.
    pub fn bank(&self) -> Bank {
        self.lock().bank.unwrap_or(Bank::M1)
    }

    /// Select a memory bank and announce the change.
    pub fn set_bank(&self, bank: Bank) {
        let changed = {
            let mut state = self.lock();
            let changed = state.bank != Some(bank);
            state.bank = Some(bank);
            changed
        };
        if changed {
            info!(device = %self.device.uid, bank = %bank, "Memory bank changed");
            self.sink.handle(EngineEvent::BankChanged { bank });
        }
    }

    /// Number of macros currently active (held or toggled on).
    pub fn active_count(&self) -> usize {
        let state = self.lock();
        state.held.len() + state.toggled.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn find_macro(&self, bank: Bank, keys: &KeySet) -> Result<Option<ResolvedMacro>> {
        let profile = active_profile(&self.store, self.settings.as_ref(), &self.device)?;
        resolve(&self.store.lookup(&self.device), &profile, bank, keys)
    }

    /// Deactivate while-held macros that lost a key. Returns true if any did.
    fn release(&self, released: &KeySet) -> bool {
        let ended: Vec<(Bank, ResolvedMacro)> = {
            let mut state = self.lock();
            let (ended, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.held)
                .into_iter()
                .partition(|(_, r)| r.definition.keys().iter().any(|k| released.contains(k)));
            state.held = kept;
            ended
        };
        for (bank, resolved) in &ended {
            debug!(name = %resolved.definition.name, "Macro released");
            self.sink.handle(EngineEvent::Deactivated {
                bank: *bank,
                resolved: resolved.clone(),
            });
        }
        !ended.is_empty()
    }

    fn activate(&self, bank: Bank, keys: KeySet, resolved: ResolvedMacro) {
        debug!(
            name = %resolved.definition.name,
            mode = %resolved.definition.repeat_mode,
            inherited = resolved.inherited,
            "Macro triggered"
        );
        let event = {
            let mut state = self.lock();
            match resolved.definition.repeat_mode {
                RepeatMode::WhileHeld => {
                    state.held.push((bank, resolved.clone()));
                    EngineEvent::Activated { bank, resolved }
                }
                RepeatMode::None => EngineEvent::Activated { bank, resolved },
                RepeatMode::Toggle => match state.toggled.remove(&(bank, keys.clone())) {
                    Some(previous) => EngineEvent::Deactivated {
                        bank,
                        resolved: previous,
                    },
                    None => {
                        state.toggled.insert((bank, keys), resolved.clone());
                        EngineEvent::Activated { bank, resolved }
                    }
                },
            }
        };
        self.sink.handle(event);
    }
}

/// Keys that take part in macro combinations. The winkey toggle is a lock
/// state rather than a key press.
fn combination_keys(event: &TransitionEvent) -> KeySet {
    event
        .after
        .held()
        .iter()
        .copied()
        .filter(|k| *k != Key::WinKey)
        .collect()
}

impl InputConsumer for MacroEngine {
    fn process(&self, event: &TransitionEvent) -> bool {
        let mut claimed = false;
        if !event.released.is_empty() {
            claimed |= self.release(&event.released);
        }
        if event.pressed.is_empty() || event.pressed.iter().all(|k| *k == Key::WinKey) {
            return claimed;
        }

        let keys = combination_keys(event);
        let bank = self.bank();
        match self.find_macro(bank, &keys) {
            Ok(Some(resolved)) => {
                self.activate(bank, keys, resolved);
                return true;
            }
            Ok(None) => trace!(bank = %bank, ?keys, "No macro for held keys"),
            Err(e) => {
                warn!(error = %e, "Could not resolve macro");
                return claimed;
            }
        }

        // A memory key pressed on its own selects its bank
        if keys.len() == 1 {
            if let Some(n) = keys.iter().next().and_then(|k| k.memory_bank()) {
                if let Ok(bank) = Bank::new(n) {
                    self.set_bank(bank);
                    return true;
                }
            }
        }
        claimed
    }
}
