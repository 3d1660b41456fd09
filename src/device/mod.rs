//! Device abstraction layer for G-series keyboards.
//!
//! The engine never talks to USB directly. A [`KeySource`] hands over raw
//! interrupt packets for each of the three key channels; the transport
//! behind it is supplied by the caller.

mod info;
pub mod mock;

pub use info::{DeviceInfo, DeviceModel};

use std::sync::Arc;

use crate::error::Result;
use crate::keys::Channel;

/// Raw packet source for the three auxiliary key channels.
///
/// Each read is non-blocking: `Ok(None)` means nothing is pending on that
/// channel right now.
///
/// # Implementation Notes
///
/// - Reads are attempted in the order macro/memory, navigation, multimedia
/// - Returned packets are passed to the decoder untouched
/// - Transport failures are reported as [`GkError::DeviceRead`](crate::error::GkError::DeviceRead)
pub trait KeySource {
    /// Read the next G/M key packet, if any.
    fn read_macro_and_memory_keys(&self) -> Result<Option<Vec<u8>>>;

    /// Read the next display navigation key packet, if any.
    fn read_navigation_keys(&self) -> Result<Option<Vec<u8>>>;

    /// Read the next multimedia/winkey packet, if any.
    fn read_multimedia_keys(&self) -> Result<Option<Vec<u8>>>;

    /// Read from the given channel.
    fn read_channel(&self, channel: Channel) -> Result<Option<Vec<u8>>> {
        match channel {
            Channel::MacroMemory => self.read_macro_and_memory_keys(),
            Channel::Navigation => self.read_navigation_keys(),
            Channel::Multimedia => self.read_multimedia_keys(),
        }
    }
}

impl<S: KeySource + ?Sized> KeySource for Arc<S> {
    fn read_macro_and_memory_keys(&self) -> Result<Option<Vec<u8>>> {
        (**self).read_macro_and_memory_keys()
    }

    fn read_navigation_keys(&self) -> Result<Option<Vec<u8>>> {
        (**self).read_navigation_keys()
    }

    fn read_multimedia_keys(&self) -> Result<Option<Vec<u8>>> {
        (**self).read_multimedia_keys()
    }
}
