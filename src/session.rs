//! Device session — connection lifecycle, inbound dispatch, outbound flush
//!
//! Owns the handshake state machine and the value cache that keeps
//! steady-state wire traffic down to deltas. All decode/flush runs on the
//! session's single event loop; only the handshake acknowledgment arrives on
//! the transport's callback thread, which is why the connection state and
//! cache sit behind a mutex. That mutex is never held across calls into
//! mode/view logic.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::cache::ValueCache;
use crate::controls::{ControlId, InputEvent};
use crate::protocol::velocity::{VelocityCurve, FIXED_ACCENT_VELOCITY};
use crate::protocol::{
    decode, encode_button_frame, encode_goodbye, encode_hello, encode_pad_frame,
    encode_track_state, knob_delta, Decoded, PROTOCOL_VERSION,
};

/// Cache channel used for button-frame slots (not a real track channel).
const CACHE_CHANNEL_BUTTONS: u8 = 0xF0;
/// Cache channel used for pad-frame slots.
const CACHE_CHANNEL_PADS: u8 = 0xF1;

/// Session failures surfaced to the caller. Reconnection is the external
/// transport collaborator's job; the session never retries inline.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport write failed: {0}")]
    Transport(String),
}

/// Opaque duplex byte channel to the physical hardware.
///
/// Writes are fire-and-forget at this boundary; backpressure and retry live
/// behind it. Inbound bytes reach the session through whatever loop the
/// transport's owner runs (see `MidiTransport`).
pub trait Transport: Send {
    fn send(&mut self, frame: &[u8]) -> anyhow::Result<()>;

    /// Release the pipe. Must not fail; teardown never throws.
    fn close(&mut self) {}
}

/// Handshake / connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    HandshakeSent,
    Connected,
}

/// State shared with the transport callback thread.
struct Shared {
    state: ConnectionState,
    version: Option<u8>,
    cache: ValueCache,
}

/// Cloneable handle for acknowledging the handshake from the transport's
/// callback thread. Completing the acknowledgment fully (state flip + cache
/// clear) before any subsequent flush observes the cache is what the mutex
/// guarantees.
#[derive(Clone)]
pub struct AckHandle {
    shared: Arc<Mutex<Shared>>,
}

impl AckHandle {
    pub fn handshake_acknowledged(&self, device_version: u8) {
        let mut shared = self.shared.lock();
        let negotiated = device_version.min(PROTOCOL_VERSION);
        info!(
            "handshake acknowledged: device speaks v{}, negotiated v{}",
            device_version, negotiated
        );
        shared.state = ConnectionState::Connected;
        shared.version = Some(negotiated);
        // The hardware may have just power-cycled; force the next flush to
        // re-send everything.
        shared.cache.clear();
    }
}

/// One physical device's session: handshake, decode, cached flush.
pub struct DeviceSession {
    transport: Box<dyn Transport>,
    shared: Arc<Mutex<Shared>>,
    curve: VelocityCurve,
    fixed_accent: bool,
    /// Bitmask of pads currently held. Event-loop-only state.
    pads_down: u16,
    /// Fine-adjust modifier (Shift) held. Event-loop-only state.
    shift_held: bool,
}

impl DeviceSession {
    pub fn new(transport: Box<dyn Transport>, curve: VelocityCurve, fixed_accent: bool) -> Self {
        Self {
            transport,
            shared: Arc::new(Mutex::new(Shared {
                state: ConnectionState::Disconnected,
                version: None,
                cache: ValueCache::new(),
            })),
            curve,
            fixed_accent,
            pads_down: 0,
            shift_held: false,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    pub fn negotiated_version(&self) -> Option<u8> {
        self.shared.lock().version
    }

    /// Handle for the transport callback thread to complete the handshake.
    pub fn ack_handle(&self) -> AckHandle {
        AckHandle {
            shared: self.shared.clone(),
        }
    }

    /// Send the hello frame and start waiting for the acknowledgment.
    ///
    /// The session stays in `HandshakeSent` until the device answers; there
    /// is no timeout here. Higher layers may surface "not connected".
    pub fn initiate_handshake(&mut self) -> Result<(), SessionError> {
        let hello = encode_hello(PROTOCOL_VERSION);
        self.transport_send(&hello)?;
        self.shared.lock().state = ConnectionState::HandshakeSent;
        info!("handshake sent (requesting v{})", PROTOCOL_VERSION);
        Ok(())
    }

    /// Decode one inbound frame into an abstract input event.
    ///
    /// Handshake acknowledgments are consumed here (or on the ack handle,
    /// whichever path the transport uses) and yield no event. Unknown frames
    /// are logged and ignored.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Option<InputEvent> {
        match decode(frame)? {
            Decoded::HandshakeAck { version } => {
                self.ack_handle().handshake_acknowledged(version);
                None
            }
            Decoded::Button { id, down } => {
                if id == ControlId::Shift {
                    self.shift_held = down;
                }
                Some(if down {
                    InputEvent::ButtonDown(id)
                } else {
                    InputEvent::ButtonUp(id)
                })
            }
            Decoded::Knob { id, raw } => {
                let delta = knob_delta(raw, self.shift_held);
                if delta == 0 {
                    trace!("{:?} raw {} below step threshold", id, raw);
                    return None;
                }
                Some(InputEvent::Knob { knob: id, delta })
            }
            Decoded::PadPressure { pad, pressure } => self.pad_event(pad, pressure),
        }
    }

    fn pad_event(&mut self, pad: u8, pressure: u32) -> Option<InputEvent> {
        let bit = 1u16 << pad;
        let was_down = self.pads_down & bit != 0;

        if pressure == 0 {
            if !was_down {
                return None;
            }
            self.pads_down &= !bit;
            return Some(InputEvent::PadUp { pad });
        }

        if !was_down {
            self.pads_down |= bit;
            let velocity = if self.fixed_accent {
                FIXED_ACCENT_VELOCITY
            } else {
                self.curve.velocity(pressure)
            };
            return Some(InputEvent::PadDown { pad, velocity });
        }

        // Continuous pressure on a held pad. Meaningless in fixed-accent
        // mode, where every strike is already at maximum.
        if self.fixed_accent {
            return None;
        }
        Some(InputEvent::PadAftertouch {
            pad,
            pressure: self.curve.velocity(pressure),
        })
    }

    /// Flush lighting state, deduped through the value cache.
    ///
    /// Suppressed entirely while not `Connected` — there is no point writing
    /// to a device not yet confirmed listening. A frame whose every slot
    /// matches the cache is not sent at all.
    pub fn flush_lighting(
        &mut self,
        buttons: &[(ControlId, u8)],
        pads: &[(u8, u8)],
    ) -> Result<(), SessionError> {
        let button_frame = encode_button_frame(buttons);
        let pad_frame = encode_pad_frame(pads);

        let (send_buttons, send_pads) = {
            let mut shared = self.shared.lock();
            if shared.state != ConnectionState::Connected {
                trace!("flush suppressed: {:?}", shared.state);
                return Ok(());
            }

            let mut send_buttons = false;
            for (offset, &code) in button_frame[1..].iter().enumerate() {
                if !shared
                    .cache
                    .store(CACHE_CHANNEL_BUTTONS, offset as u8, code, &[])
                {
                    send_buttons = true;
                }
            }

            let mut send_pads = false;
            for (pad, &code) in pad_frame[1..].iter().enumerate() {
                if !shared.cache.store(CACHE_CHANNEL_PADS, pad as u8, code, &[]) {
                    send_pads = true;
                }
            }
            (send_buttons, send_pads)
        };

        // The two frames are independent messages; they are never merged.
        if send_buttons {
            self.transport_send(&button_frame)?;
        }
        if send_pads {
            self.transport_send(&pad_frame)?;
        }
        if !send_buttons && !send_pads {
            trace!("lighting unchanged, nothing sent");
        }
        Ok(())
    }

    /// Write one per-channel state value (plus auxiliary payload), deduped.
    pub fn send_track_state(
        &mut self,
        channel: u8,
        state: u8,
        value: u8,
        payload: &[u8],
    ) -> Result<(), SessionError> {
        {
            let mut shared = self.shared.lock();
            if shared.state != ConnectionState::Connected {
                trace!("track state suppressed: {:?}", shared.state);
                return Ok(());
            }
            if shared.cache.store(channel, state, value, payload) {
                return Ok(());
            }
        }
        self.transport_send(&encode_track_state(channel, state, value, payload))
    }

    /// Best-effort goodbye, then release the transport. Never errors:
    /// teardown must not throw.
    pub fn shutdown(&mut self) {
        let state = self.shared.lock().state;
        if state != ConnectionState::Disconnected {
            if let Err(e) = self.transport.send(&encode_goodbye()) {
                debug!("goodbye not delivered: {:#}", e);
            }
        }
        self.transport.close();
        let mut shared = self.shared.lock();
        shared.state = ConnectionState::Disconnected;
        shared.version = None;
        info!("session shut down");
    }

    fn transport_send(&mut self, frame: &[u8]) -> Result<(), SessionError> {
        match self.transport.send(frame) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("transport write failed, session disconnected: {:#}", e);
                self.shared.lock().state = ConnectionState::Disconnected;
                Err(SessionError::Transport(format!("{:#}", e)))
            }
        }
    }
}
