//! PadGrid wire protocol codec
//!
//! Pure functions over the raw bytes of a frame. The transport strips and
//! adds the outer SysEx wrapping; everything here sees only the inner
//! command byte + payload. Frame layouts are fixed and versioned by the
//! protocol version negotiated during the handshake.

pub mod velocity;

use bytes::Bytes;
use tracing::debug;

use crate::controls::{button_from_raw, knob_from_index, ControlId, BUTTONS, PAD_COUNT};

/// Protocol version this build speaks.
pub const PROTOCOL_VERSION: u8 = 3;

// Session commands
pub const CMD_HELLO: u8 = 0x01;
pub const CMD_GOODBYE: u8 = 0x02;

// Inbound events
pub const CMD_BUTTON: u8 = 0x10;
pub const CMD_KNOB: u8 = 0x11;
pub const CMD_PAD: u8 = 0x12;

// Outbound state
pub const CMD_LIGHT_BUTTONS: u8 = 0x20;
pub const CMD_LIGHT_PADS: u8 = 0x21;
pub const CMD_TRACK_STATE: u8 = 0x22;

/// Payload length of the button lighting frame (one byte per button).
pub const BUTTON_FRAME_LEN: usize = BUTTONS.len();

/// Payload length of the pad lighting frame (one byte per pad).
pub const PAD_FRAME_LEN: usize = PAD_COUNT;

/// A successfully decoded inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// Device acknowledged the hello and reports the version it speaks.
    HandshakeAck { version: u8 },
    Button { id: ControlId, down: bool },
    /// Raw relative knob value; convert with [`knob_delta`].
    Knob { id: ControlId, raw: i32 },
    /// Raw pad pressure; 0 means released. Convert with
    /// [`velocity::VelocityCurve`].
    PadPressure { pad: u8, pressure: u32 },
}

/// Decode one inbound frame.
///
/// Total over arbitrary bytes: unknown commands, unmapped button codes and
/// truncated frames all yield `None` and a debug log. Firmware revisions emit
/// codes we have not mapped yet; those must never take the session down.
pub fn decode(frame: &[u8]) -> Option<Decoded> {
    match frame {
        [CMD_HELLO, version] => Some(Decoded::HandshakeAck { version: *version }),
        [CMD_BUTTON, raw, state] => match button_from_raw(*raw) {
            Some(id) => Some(Decoded::Button {
                id,
                down: *state != 0,
            }),
            None => {
                debug!("unmapped button code 0x{:02X} (state {})", raw, state);
                None
            }
        },
        [CMD_KNOB, index, value @ ..] if value.len() == 4 => {
            let id = match knob_from_index(*index) {
                Some(id) => id,
                None => {
                    debug!("knob index {} out of range", index);
                    return None;
                }
            };
            let raw = i32::from_be_bytes([value[0], value[1], value[2], value[3]]);
            Some(Decoded::Knob { id, raw })
        }
        [CMD_PAD, pad, value @ ..] if value.len() == 4 => {
            if *pad as usize >= PAD_COUNT {
                debug!("pad index {} out of range", pad);
                return None;
            }
            let pressure = u32::from_be_bytes([value[0], value[1], value[2], value[3]]);
            Some(Decoded::PadPressure { pad: *pad, pressure })
        }
        _ => {
            debug!("unknown frame: {}", hex::encode(frame));
            None
        }
    }
}

/// Handshake request carrying the protocol version we want to speak.
pub fn encode_hello(version: u8) -> Bytes {
    Bytes::from(vec![CMD_HELLO, version])
}

/// Clean-shutdown notification.
pub fn encode_goodbye() -> Bytes {
    Bytes::from(vec![CMD_GOODBYE])
}

/// Assemble the button lighting frame.
///
/// The output is always exactly `1 + BUTTON_FRAME_LEN` bytes, one device
/// color code per button in [`BUTTONS`] order. Buttons absent from `values`
/// encode as 0 (off); controls without a frame slot (knobs) are skipped.
pub fn encode_button_frame(values: &[(ControlId, u8)]) -> Bytes {
    let mut frame = vec![0u8; 1 + BUTTON_FRAME_LEN];
    frame[0] = CMD_LIGHT_BUTTONS;
    for &(id, code) in values {
        match id.frame_offset() {
            Some(offset) => frame[1 + offset] = code,
            None => debug!("{:?} has no lighting slot, dropped", id),
        }
    }
    Bytes::from(frame)
}

/// Assemble the pad lighting frame: always exactly `1 + PAD_FRAME_LEN` bytes,
/// keyed by physical pad index. Sent as its own frame, never merged with the
/// button frame.
pub fn encode_pad_frame(values: &[(u8, u8)]) -> Bytes {
    let mut frame = vec![0u8; 1 + PAD_FRAME_LEN];
    frame[0] = CMD_LIGHT_PADS;
    for &(pad, code) in values {
        if (pad as usize) < PAD_FRAME_LEN {
            frame[1 + pad as usize] = code;
        } else {
            debug!("pad index {} out of range, dropped", pad);
        }
    }
    Bytes::from(frame)
}

/// Per-channel state write (value plus auxiliary payload, e.g. a display
/// string). The address half of this message is what the value cache keys on.
pub fn encode_track_state(channel: u8, state: u8, value: u8, payload: &[u8]) -> Bytes {
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.push(CMD_TRACK_STATE);
    frame.push(channel);
    frame.push(state);
    frame.push(value);
    frame.extend_from_slice(payload);
    Bytes::from(frame)
}

/// High bits of the raw relative value carry the signed delta.
const DELTA_PAYLOAD_BITS: u32 = 12;
/// Coarse mode shifts further than fine mode; holding Shift selects fine.
const COARSE_STEP_SHIFT: u32 = 6;
const FINE_STEP_SHIFT: u32 = 4;

/// Convert a raw relative knob value into a usable signed step.
///
/// Signed high-order-bits extraction, then a step shift selected by the fine
/// modifier. Negative deltas shift one extra bit: the hardware pads the
/// negative range with an additional flag bit. Both asymmetries are fixed
/// firmware behavior and must not be "simplified".
pub fn knob_delta(raw: i32, fine: bool) -> i32 {
    let hi = raw >> DELTA_PAYLOAD_BITS;
    let shift = if fine { FINE_STEP_SHIFT } else { COARSE_STEP_SHIFT };
    if hi < 0 {
        hi >> (shift + 1)
    } else {
        hi >> shift
    }
}
