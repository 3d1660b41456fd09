//! Polling loop that reads the key channels and dispatches transitions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::decoder::decode;
use super::dispatch::EventDispatcher;
use super::state::{StateTracker, TransitionEvent};
use crate::device::KeySource;
use crate::error::Result;
use crate::keys::Channel;

/// Sleep between cycles that produced no data.
pub const IDLE_SLEEP: Duration = Duration::from_millis(50);

/// Receiver options.
#[derive(Debug, Clone)]
pub struct ReceiverOptions {
    /// Read the multimedia channel (some transports cannot).
    pub multimedia_keys: bool,
    /// Sleep when a cycle produced nothing.
    pub idle_sleep: Duration,
}

impl Default for ReceiverOptions {
    fn default() -> Self {
        Self {
            multimedia_keys: true,
            idle_sleep: IDLE_SLEEP,
        }
    }
}

/// Outcome of one polling cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    /// Packets read from any channel.
    pub packets: usize,
    /// Packets that decoded and were dispatched.
    pub dispatched: usize,
    /// Packets dropped as malformed.
    pub discarded: usize,
}

/// Reads packets from a [`KeySource`], tracks key state and dispatches.
pub struct Receiver<S> {
    source: S,
    tracker: StateTracker,
    dispatcher: Arc<EventDispatcher>,
    options: ReceiverOptions,
}

impl<S: KeySource> Receiver<S> {
    /// Create a receiver delivering to `dispatcher`.
    pub fn new(source: S, dispatcher: Arc<EventDispatcher>) -> Self {
        Self::with_options(source, dispatcher, ReceiverOptions::default())
    }

    /// Create a receiver with explicit options.
    pub fn with_options(
        source: S,
        dispatcher: Arc<EventDispatcher>,
        options: ReceiverOptions,
    ) -> Self {
        Self {
            source,
            tracker: StateTracker::new(),
            dispatcher,
            options,
        }
    }

    /// The dispatcher events go to.
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Current key state.
    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    fn channels(&self) -> &'static [Channel] {
        if self.options.multimedia_keys {
            &[Channel::MacroMemory, Channel::Navigation, Channel::Multimedia]
        } else {
            &[Channel::MacroMemory, Channel::Navigation]
        }
    }

    /// Read each channel once, in order, dispatching whatever decodes.
    ///
    /// Malformed packets are logged and dropped. Transport errors abort the
    /// cycle.
    pub fn poll_once(&mut self) -> Result<CycleStats> {
        let mut stats = CycleStats::default();
        for &channel in self.channels() {
            let Some(data) = self.source.read_channel(channel)? else {
                continue;
            };
            stats.packets += 1;
            debug!(%channel, data = %hex::encode(&data), "Packet received");

            match self.process_packet(channel, &data) {
                Ok(_) => stats.dispatched += 1,
                Err(e) if e.is_packet_error() => {
                    warn!(%channel, error = %e, "Discarding packet");
                    stats.discarded += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(stats)
    }

    /// Decode one packet, update state and dispatch the transition.
    pub fn process_packet(&mut self, channel: Channel, data: &[u8]) -> Result<TransitionEvent> {
        let packet = decode(channel, data)?;
        let event = self.tracker.apply(packet.scope, &packet.keys);
        let claimed = self.dispatcher.dispatch(&event);
        debug!(
            %channel,
            pressed = ?event.pressed,
            released = ?event.released,
            claimed,
            "Transition dispatched"
        );
        Ok(event)
    }

    /// Poll until `stop` is set, sleeping when idle.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        info!(multimedia = self.options.multimedia_keys, "Key receiver started");
        while !stop.load(Ordering::SeqCst) {
            let stats = self.poll_once()?;
            if stats.packets == 0 {
                std::thread::sleep(self.options.idle_sleep);
            }
        }
        info!("Key receiver stopped");
        Ok(())
    }
}
