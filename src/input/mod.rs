//! Input pipeline: raw packets to key transitions to consumers.
//!
//! - `decoder`: packet bytes to key sets (and back, for scripted sources)
//! - `state`: held-key tracking and transition events
//! - `dispatch`: ordered delivery with subscription handles
//! - `receiver`: the polling loop tying the three together

pub mod decoder;
pub mod dispatch;
pub mod receiver;
pub mod state;

pub use decoder::{DecodedPacket, decode};
pub use dispatch::{EventDispatcher, InputConsumer, Subscription};
pub use receiver::{CycleStats, Receiver, ReceiverOptions};
pub use state::{KeySnapshot, Scope, StateTracker, TransitionEvent};
