//! Scripted key source for tests and packet replay.
//!
//! Packets are queued per channel and handed out one per read, exactly as
//! a device would report them.
//!
//! # Example
//!
//! ```rust,ignore
//! use gkm::device::mock::MockKeySource;
//! use gkm::keys::Key;
//!
//! let source = MockKeySource::new();
//! source.hold_macro_keys(&[Key::M1, Key::G1]);
//! source.release_macro_keys();
//! assert_eq!(source.pending(Channel::MacroMemory), 2);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use super::KeySource;
use crate::error::{GkError, Result};
use crate::input::decoder::{
    encode_macro_keys, encode_multimedia_keys, encode_navigation_keys, encode_winkey,
};
use crate::keys::{Channel, Key, KeySet};

/// Recorded read for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    pub channel: Channel,
    pub data: Option<Vec<u8>>,
}

/// Key source fed from in-memory packet queues.
#[derive(Default)]
pub struct MockKeySource {
    macro_memory: Mutex<VecDeque<Vec<u8>>>,
    navigation: Mutex<VecDeque<Vec<u8>>>,
    multimedia: Mutex<VecDeque<Vec<u8>>>,
    read_log: Mutex<Vec<Read>>,
    error_injection: Mutex<Option<GkError>>,
    stop_when_drained: Mutex<Option<Arc<AtomicBool>>>,
}

impl MockKeySource {
    /// Create a source with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from a replay script.
    ///
    /// One packet per line: `<channel> <hex bytes>`, e.g. `gm 02010040`.
    /// Blank lines and lines starting with `#` are skipped. Channel names
    /// are those accepted by [`Channel::from_str`](std::str::FromStr).
    pub fn from_script(script: &str) -> Result<Self> {
        let source = Self::new();
        for (lineno, line) in script.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (channel, data) = line.split_once(char::is_whitespace).ok_or_else(|| {
                GkError::Other(format!("line {}: expected '<channel> <hex>'", lineno + 1))
            })?;
            let channel: Channel = channel.parse()?;
            let hex_text: String = data.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = hex::decode(&hex_text).map_err(|e| {
                GkError::Other(format!("line {}: invalid hex '{hex_text}': {e}", lineno + 1))
            })?;
            source.queue_packet(channel, bytes);
        }
        debug!(
            macro_memory = source.pending(Channel::MacroMemory),
            navigation = source.pending(Channel::Navigation),
            multimedia = source.pending(Channel::Multimedia),
            "Loaded replay script"
        );
        Ok(source)
    }

    fn queue(&self, channel: Channel) -> &Mutex<VecDeque<Vec<u8>>> {
        match channel {
            Channel::MacroMemory => &self.macro_memory,
            Channel::Navigation => &self.navigation,
            Channel::Multimedia => &self.multimedia,
        }
    }

    // === Input Simulation ===

    /// Queue a raw packet.
    pub fn queue_packet(&self, channel: Channel, data: impl Into<Vec<u8>>) {
        self.queue(channel).lock().unwrap().push_back(data.into());
    }

    /// Queue a G/M report with exactly `keys` held.
    pub fn hold_macro_keys(&self, keys: &[Key]) {
        let set: KeySet = keys.iter().copied().collect();
        self.queue_packet(Channel::MacroMemory, encode_macro_keys(&set));
    }

    /// Queue a G/M report with nothing held.
    pub fn release_macro_keys(&self) {
        self.hold_macro_keys(&[]);
    }

    /// Queue a press of `keys` followed by a full release.
    pub fn tap_macro_keys(&self, keys: &[Key]) {
        self.hold_macro_keys(keys);
        self.release_macro_keys();
    }

    /// Queue a navigation report with exactly `keys` held.
    pub fn hold_navigation(&self, keys: &[Key]) {
        let set: KeySet = keys.iter().copied().collect();
        self.queue_packet(Channel::Navigation, encode_navigation_keys(&set));
    }

    /// Queue a multimedia report with exactly `keys` held.
    pub fn hold_multimedia(&self, keys: &[Key]) {
        let set: KeySet = keys.iter().copied().collect();
        self.queue_packet(Channel::Multimedia, encode_multimedia_keys(&set));
    }

    /// Queue a winkey toggle report.
    pub fn set_winkey(&self, on: bool) {
        self.queue_packet(Channel::Multimedia, encode_winkey(on));
    }

    /// Inject an error for the next read.
    pub fn inject_error(&self, error: GkError) {
        *self.error_injection.lock().unwrap() = Some(error);
    }

    /// Set `flag` once a read finds every queue empty.
    pub fn stop_when_drained(&self, flag: Arc<AtomicBool>) {
        *self.stop_when_drained.lock().unwrap() = Some(flag);
    }

    // === Assertions ===

    /// Packets still queued on a channel.
    #[must_use]
    pub fn pending(&self, channel: Channel) -> usize {
        self.queue(channel).lock().unwrap().len()
    }

    /// True when nothing is queued on any channel.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        [Channel::MacroMemory, Channel::Navigation, Channel::Multimedia]
            .into_iter()
            .all(|c| self.pending(c) == 0)
    }

    /// Every read performed so far.
    #[must_use]
    pub fn reads(&self) -> Vec<Read> {
        self.read_log.lock().unwrap().clone()
    }

    // === Internal Helpers ===

    fn read(&self, channel: Channel) -> Result<Option<Vec<u8>>> {
        if let Some(error) = self.error_injection.lock().unwrap().take() {
            return Err(error);
        }

        let data = self.queue(channel).lock().unwrap().pop_front();
        trace!(%channel, ?data, "Mock read");
        self.read_log.lock().unwrap().push(Read {
            channel,
            data: data.clone(),
        });

        if data.is_none() && self.is_drained() {
            if let Some(flag) = self.stop_when_drained.lock().unwrap().as_ref() {
                flag.store(true, Ordering::SeqCst);
            }
        }
        Ok(data)
    }
}

impl KeySource for MockKeySource {
    fn read_macro_and_memory_keys(&self) -> Result<Option<Vec<u8>>> {
        self.read(Channel::MacroMemory)
    }

    fn read_navigation_keys(&self) -> Result<Option<Vec<u8>>> {
        self.read(Channel::Navigation)
    }

    fn read_multimedia_keys(&self) -> Result<Option<Vec<u8>>> {
        self.read(Channel::Multimedia)
    }
}
