//! Packet decoder for the three auxiliary key channels.
//!
//! Packet shapes:
//!
//! | Channel | Length | Marker | Payload |
//! |---------|--------|--------|---------|
//! | macro/memory | 4 | byte 0 = `0x02` | bytes 1-3, little-endian 24-bit mask |
//! | navigation | 2 | byte 1 = `0x80` | byte 0, 8 flags |
//! | multimedia | 2 | byte 0 = `0x01` | byte 1, 7 flags |
//! | winkey | 2 | byte 0 = `0x03` | byte 1, `0x01` on / `0x00` off |
//!
//! Decoding is pure. The encoders are the exact inverse and are used by the
//! scripted key source.

use serde::Serialize;

use super::state::Scope;
use crate::error::{GkError, Result};
use crate::keys::{
    Channel, Key, KeySet, MACRO_MEMORY_BITS, MACRO_MEMORY_EMPTY, MULTIMEDIA_BITS,
    NAVIGATION_BITS,
};

const MACRO_MEMORY_MARKER: u8 = 0x02;
const NAVIGATION_MARKER: u8 = 0x80;
const MULTIMEDIA_SUBPROTOCOL: u8 = 0x01;
const WINKEY_SUBPROTOCOL: u8 = 0x03;

/// Keys asserted by one packet, and which part of the key state they cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedPacket {
    pub scope: Scope,
    pub keys: KeySet,
}

/// Decode a packet read from `channel`.
pub fn decode(channel: Channel, data: &[u8]) -> Result<DecodedPacket> {
    match channel {
        Channel::MacroMemory => Ok(DecodedPacket {
            scope: Scope::MacroMemory,
            keys: decode_macro_memory(data)?,
        }),
        Channel::Navigation => Ok(DecodedPacket {
            scope: Scope::Navigation,
            keys: decode_navigation(data)?,
        }),
        Channel::Multimedia => decode_multimedia(data),
    }
}

/// Decode a G/M key packet: `[0x02, mask_lo, mask_mid, mask_hi]`.
///
/// The high byte always carries `0x40` when the packet is well formed, so
/// an idle keyboard reports `[0x02, 0x00, 0x00, 0x40]`.
pub fn decode_macro_memory(data: &[u8]) -> Result<KeySet> {
    let channel = Channel::MacroMemory;
    if data.len() != 4 {
        return Err(malformed(channel, data, format!("expected 4 bytes, got {}", data.len())));
    }
    if data[0] != MACRO_MEMORY_MARKER {
        return Err(malformed(
            channel,
            data,
            format!("expected marker {MACRO_MEMORY_MARKER:#04x}, got {:#04x}", data[0]),
        ));
    }

    let mask = u32::from(data[3]) << 16 | u32::from(data[2]) << 8 | u32::from(data[1]);
    let (keys, residual) = decompose(mask, &MACRO_MEMORY_BITS);
    if residual != MACRO_MEMORY_EMPTY {
        return Err(unknown_bits(channel, data, residual));
    }
    Ok(keys)
}

/// Decode a display navigation key packet: `[mask, 0x80]`.
pub fn decode_navigation(data: &[u8]) -> Result<KeySet> {
    let channel = Channel::Navigation;
    if data.len() != 2 {
        return Err(malformed(channel, data, format!("expected 2 bytes, got {}", data.len())));
    }
    if data[1] != NAVIGATION_MARKER {
        return Err(malformed(
            channel,
            data,
            format!("expected marker {NAVIGATION_MARKER:#04x}, got {:#04x}", data[1]),
        ));
    }

    // A zero mask is the all-released report
    let (keys, residual) = decompose(u32::from(data[0]), &widen(&NAVIGATION_BITS));
    if residual != 0 {
        return Err(unknown_bits(channel, data, residual));
    }
    Ok(keys)
}

/// Decode a multimedia or winkey packet.
pub fn decode_multimedia(data: &[u8]) -> Result<DecodedPacket> {
    let channel = Channel::Multimedia;
    if data.len() != 2 {
        return Err(malformed(channel, data, format!("expected 2 bytes, got {}", data.len())));
    }

    match data[0] {
        MULTIMEDIA_SUBPROTOCOL => {
            let (keys, residual) = decompose(u32::from(data[1]), &widen(&MULTIMEDIA_BITS));
            if residual != 0 {
                return Err(unknown_bits(channel, data, residual));
            }
            Ok(DecodedPacket {
                scope: Scope::Multimedia,
                keys,
            })
        }
        WINKEY_SUBPROTOCOL => {
            let keys = match data[1] {
                0x01 => KeySet::from([Key::WinKey]),
                0x00 => KeySet::new(),
                other => return Err(unknown_bits(channel, data, u32::from(other))),
            };
            Ok(DecodedPacket {
                scope: Scope::WinKey,
                keys,
            })
        }
        other => Err(malformed(
            channel,
            data,
            format!("unknown sub-protocol {other:#04x}"),
        )),
    }
}

/// Build the G/M packet that reports exactly `keys` as held.
///
/// Keys with no bit on this channel are ignored.
pub fn encode_macro_keys(keys: &KeySet) -> [u8; 4] {
    let mask = MACRO_MEMORY_EMPTY | compose(keys, &MACRO_MEMORY_BITS);
    let [lo, mid, hi, _] = mask.to_le_bytes();
    [MACRO_MEMORY_MARKER, lo, mid, hi]
}

/// Build the navigation packet that reports exactly `keys` as held.
pub fn encode_navigation_keys(keys: &KeySet) -> [u8; 2] {
    [compose(keys, &widen(&NAVIGATION_BITS)) as u8, NAVIGATION_MARKER]
}

/// Build the multimedia packet that reports exactly `keys` as held.
pub fn encode_multimedia_keys(keys: &KeySet) -> [u8; 2] {
    [
        MULTIMEDIA_SUBPROTOCOL,
        compose(keys, &widen(&MULTIMEDIA_BITS)) as u8,
    ]
}

/// Build the winkey toggle packet.
pub const fn encode_winkey(on: bool) -> [u8; 2] {
    [WINKEY_SUBPROTOCOL, on as u8]
}

/// Clear every table value fully contained in `mask`, collecting its key.
fn decompose(mut mask: u32, table: &[(u32, Key)]) -> (KeySet, u32) {
    let mut keys = KeySet::new();
    for &(bits, key) in table {
        if mask & bits == bits {
            mask ^= bits;
            keys.insert(key);
        }
    }
    (keys, mask)
}

fn compose(keys: &KeySet, table: &[(u32, Key)]) -> u32 {
    table
        .iter()
        .filter(|(_, key)| keys.contains(key))
        .fold(0, |mask, (bits, _)| mask | bits)
}

fn widen(table: &[(u8, Key)]) -> Vec<(u32, Key)> {
    table.iter().map(|&(b, k)| (u32::from(b), k)).collect()
}

fn malformed(channel: Channel, data: &[u8], reason: String) -> GkError {
    GkError::MalformedPacket {
        channel: channel.name(),
        reason,
        data: hex::encode(data),
    }
}

fn unknown_bits(channel: Channel, data: &[u8], residual: u32) -> GkError {
    GkError::UnknownBitPattern {
        channel: channel.name(),
        residual,
        data: hex::encode(data),
    }
}
