//! MIDI byte-pipe to PadGrid hardware
//!
//! PadGrid units enumerate as MIDI-class devices and tunnel their frames
//! through SysEx. Inner frame bytes are 8-bit clean, so the wrapper encodes
//! each byte as two nibbles to stay inside the 7-bit SysEx payload rule.
//! Everything above this module sees only inner frames.

use anyhow::{Context, Result};
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::session::Transport;

const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;

/// Registered manufacturer prefix of PadGrid SysEx traffic.
const MANUFACTURER_ID: [u8; 3] = [0x00, 0x42, 0x19];

/// Wrap an inner frame for the wire.
fn wrap_frame(inner: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + inner.len() * 2);
    out.push(SYSEX_START);
    out.extend_from_slice(&MANUFACTURER_ID);
    for &byte in inner {
        out.push(byte >> 4);
        out.push(byte & 0x0F);
    }
    out.push(SYSEX_END);
    out
}

/// Recover the inner frame from wire bytes.
///
/// Returns None for traffic that is not ours: foreign SysEx, non-SysEx
/// messages, or a truncated/odd-length nibble stream.
fn unwrap_frame(data: &[u8]) -> Option<Vec<u8>> {
    let inner = data
        .strip_prefix(&[SYSEX_START])?
        .strip_prefix(&MANUFACTURER_ID[..])?
        .strip_suffix(&[SYSEX_END])?;
    if inner.len() % 2 != 0 {
        debug!("odd nibble stream ({} bytes), dropped", inner.len());
        return None;
    }
    let mut out = Vec::with_capacity(inner.len() / 2);
    for pair in inner.chunks_exact(2) {
        if pair[0] > 0x0F || pair[1] > 0x0F {
            debug!("invalid nibble in stream, dropped");
            return None;
        }
        out.push((pair[0] << 4) | pair[1]);
    }
    Some(out)
}

/// Case-insensitive substring port match (Windows port names embed indices,
/// exact matching breaks across reboots).
fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(midir::MidiInputPort, String)> {
    for port in midi_in.ports() {
        if let Ok(name) = midi_in.port_name(&port) {
            if name.to_lowercase().contains(&pattern.to_lowercase()) {
                debug!("found input port '{}' matching '{}'", name, pattern);
                return Some((port, name));
            }
        }
    }
    None
}

fn find_output_port(
    midi_out: &MidiOutput,
    pattern: &str,
) -> Option<(midir::MidiOutputPort, String)> {
    for port in midi_out.ports() {
        if let Ok(name) = midi_out.port_name(&port) {
            if name.to_lowercase().contains(&pattern.to_lowercase()) {
                debug!("found output port '{}' matching '{}'", name, pattern);
                return Some((port, name));
            }
        }
    }
    None
}

/// List available MIDI input port names.
pub fn list_input_ports() -> Result<Vec<String>> {
    let midi_in = MidiInput::new("PadGrid-Scanner")?;
    Ok(midi_in
        .ports()
        .iter()
        .filter_map(|p| midi_in.port_name(p).ok())
        .collect())
}

/// List available MIDI output port names.
pub fn list_output_ports() -> Result<Vec<String>> {
    let midi_out = MidiOutput::new("PadGrid-Scanner")?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|p| midi_out.port_name(p).ok())
        .collect())
}

/// Duplex MIDI connection carrying PadGrid frames.
pub struct MidiTransport {
    // Kept alive for the duration of the connection; dropping disconnects.
    _input: MidiInputConnection<()>,
    output: Arc<Mutex<MidiOutputConnection>>,
}

impl MidiTransport {
    /// Connect to the device by port name patterns.
    ///
    /// `on_frame` runs on the MIDI callback thread with each unwrapped inner
    /// frame; keep it short and push real work to the event loop.
    pub fn connect<F>(input_pattern: &str, output_pattern: &str, on_frame: F) -> Result<Self>
    where
        F: Fn(Vec<u8>) + Send + 'static,
    {
        info!(
            "connecting to PadGrid - input: '{}', output: '{}'",
            input_pattern, output_pattern
        );

        let mut midi_in = MidiInput::new("PadGrid-Input").context("failed to create MIDI input")?;
        // SysEx is filtered by default; our entire protocol rides on it.
        midi_in.ignore(midir::Ignore::None);

        let (in_port, in_name) = find_input_port(&midi_in, input_pattern)
            .ok_or_else(|| anyhow::anyhow!("input port '{}' not found", input_pattern))?;
        info!("connecting to input port: {}", in_name);

        let input = midi_in
            .connect(
                &in_port,
                "PadGrid",
                move |_timestamp, data, _| {
                    if let Some(frame) = unwrap_frame(data) {
                        on_frame(frame);
                    } else {
                        debug!("ignoring foreign MIDI: {}", hex::encode(data));
                    }
                },
                (),
            )
            .map_err(|e| anyhow::anyhow!("failed to connect to input port: {}", e))?;

        let midi_out = MidiOutput::new("PadGrid-Output").context("failed to create MIDI output")?;
        let (out_port, out_name) = find_output_port(&midi_out, output_pattern)
            .ok_or_else(|| anyhow::anyhow!("output port '{}' not found", output_pattern))?;
        info!("connecting to output port: {}", out_name);

        let output = midi_out
            .connect(&out_port, "PadGrid")
            .map_err(|e| anyhow::anyhow!("failed to connect to output port: {}", e))?;

        Ok(Self {
            _input: input,
            output: Arc::new(Mutex::new(output)),
        })
    }
}

impl Transport for MidiTransport {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        let wire = wrap_frame(frame);
        let mut conn = self.output.lock();
        conn.send(&wire).context("failed to send frame")?;
        debug!("sent: {}", hex::encode(frame));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let inner = vec![0x20, 0x00, 0xFF, 0x7F, 0x80];
        let wire = wrap_frame(&inner);
        assert_eq!(wire[0], SYSEX_START);
        assert_eq!(*wire.last().unwrap(), SYSEX_END);
        // Every payload byte fits in 7 bits.
        assert!(wire[1..wire.len() - 1].iter().all(|&b| b < 0x80));
        assert_eq!(unwrap_frame(&wire), Some(inner));
    }

    #[test]
    fn test_unwrap_rejects_foreign_traffic() {
        assert_eq!(unwrap_frame(&[0x90, 60, 100]), None); // note on
        assert_eq!(unwrap_frame(&[0xF0, 0x00, 0x00, 0x66, 0x01, 0xF7]), None); // other vendor
        assert_eq!(unwrap_frame(&[]), None);
    }

    #[test]
    fn test_unwrap_rejects_truncated_nibbles() {
        let mut wire = wrap_frame(&[0x20, 0x21]);
        wire.remove(wire.len() - 2); // drop one nibble
        assert_eq!(unwrap_frame(&wire), None);
    }

    #[test]
    fn test_empty_frame_roundtrip() {
        let wire = wrap_frame(&[]);
        assert_eq!(unwrap_frame(&wire), Some(Vec::new()));
    }
}
