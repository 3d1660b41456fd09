//! Key state tracking across packets.
//!
//! The tracker remembers which keys are held. Each decoded packet only
//! speaks for the keys of its [`Scope`], so a multimedia report never
//! releases a G-key and a winkey report never touches the media keys.

use serde::Serialize;
use tracing::trace;

use crate::keys::{Key, KeyGroup, KeySet, keys_in_group};

/// The slice of key state a packet reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// G-keys, M-keys, MR and the light switch.
    MacroMemory,
    /// Display navigation keys.
    Navigation,
    /// Multimedia keys other than the winkey toggle.
    Multimedia,
    /// The winkey toggle alone.
    WinKey,
}

impl Scope {
    /// Whether a packet of this scope reports on `key`.
    pub fn covers(self, key: Key) -> bool {
        match self {
            Self::MacroMemory => key.group() == KeyGroup::MacroMemory,
            Self::Navigation => key.group() == KeyGroup::Navigation,
            Self::Multimedia => key.group() == KeyGroup::Multimedia && key != Key::WinKey,
            Self::WinKey => key == Key::WinKey,
        }
    }

    /// Every key this scope reports on.
    pub fn keys(self) -> impl Iterator<Item = Key> {
        let group = match self {
            Self::MacroMemory => KeyGroup::MacroMemory,
            Self::Navigation => KeyGroup::Navigation,
            Self::Multimedia | Self::WinKey => KeyGroup::Multimedia,
        };
        keys_in_group(group).filter(move |k| self.covers(*k))
    }
}

/// Immutable copy of the held keys at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeySnapshot {
    held: KeySet,
}

impl KeySnapshot {
    /// All held keys.
    pub const fn held(&self) -> &KeySet {
        &self.held
    }

    /// Whether `key` is held.
    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Held keys belonging to one group.
    pub fn group(&self, group: KeyGroup) -> KeySet {
        self.held
            .iter()
            .copied()
            .filter(|k| k.group() == group)
            .collect()
    }

    /// Held keys a packet of `scope` would report.
    pub fn scope(&self, scope: Scope) -> KeySet {
        self.held.iter().copied().filter(|k| scope.covers(*k)).collect()
    }
}

/// Keys pressed and released between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionEvent {
    pub before: KeySnapshot,
    pub after: KeySnapshot,
    pub pressed: KeySet,
    pub released: KeySet,
}

impl TransitionEvent {
    /// True when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty() && self.released.is_empty()
    }
}

/// Tracks held keys and produces a transition per decoded packet.
#[derive(Debug, Default)]
pub struct StateTracker {
    held: KeySet,
}

impl StateTracker {
    /// Create a tracker with nothing held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current held keys.
    pub fn snapshot(&self) -> KeySnapshot {
        KeySnapshot {
            held: self.held.clone(),
        }
    }

    /// Replace the held keys of `scope` with `keys` and report the delta.
    ///
    /// Keys in `keys` outside `scope` are ignored.
    pub fn apply(&mut self, scope: Scope, keys: &KeySet) -> TransitionEvent {
        let before = self.snapshot();
        let mut pressed = KeySet::new();
        let mut released = KeySet::new();

        for key in scope.keys() {
            let now = keys.contains(&key);
            let was = self.held.contains(&key);
            if now && !was {
                self.held.insert(key);
                pressed.insert(key);
            } else if !now && was {
                self.held.remove(&key);
                released.insert(key);
            }
        }

        trace!(?scope, ?pressed, ?released, "Applied key state");
        TransitionEvent {
            before,
            after: self.snapshot(),
            pressed,
            released,
        }
    }

    /// Forget every held key.
    pub fn reset(&mut self) {
        self.held.clear();
    }
}
