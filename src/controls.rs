//! Abstract control identifiers and input events
//!
//! Maps between device-independent control identifiers and the raw codes the
//! PadGrid wire protocol uses. The raw codes never leak past the codec.

/// Device-independent identifier for a logical button or knob.
///
/// Pads are addressed separately by their grid index (0-15); they have their
/// own lighting frame and event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    // Transport row
    Play,
    Restart,
    Rec,
    Stop,
    // Modifier / edit row
    Shift,
    Erase,
    Grid,
    NoteRepeat,
    // Mode row
    Scene,
    Pattern,
    PadMode,
    Browse,
    Duplicate,
    Select,
    Solo,
    Mute,
    // Knob-mode selectors
    Volume,
    Swing,
    Tempo,
    // Navigation
    TrackLeft,
    TrackRight,
    // Relative encoders (no LED slot in the button frame)
    Knob1,
    Knob2,
    Knob3,
    Knob4,
    Knob5,
    Knob6,
    Knob7,
    Knob8,
}

/// Buttons in button-lighting-frame order. One byte per entry, in this order.
pub const BUTTONS: [ControlId; 21] = [
    ControlId::Play,
    ControlId::Restart,
    ControlId::Rec,
    ControlId::Stop,
    ControlId::Shift,
    ControlId::Erase,
    ControlId::Grid,
    ControlId::NoteRepeat,
    ControlId::Scene,
    ControlId::Pattern,
    ControlId::PadMode,
    ControlId::Browse,
    ControlId::Duplicate,
    ControlId::Select,
    ControlId::Solo,
    ControlId::Mute,
    ControlId::Volume,
    ControlId::Swing,
    ControlId::Tempo,
    ControlId::TrackLeft,
    ControlId::TrackRight,
];

/// Knobs in wire index order (knob event index 0-7).
pub const KNOBS: [ControlId; 8] = [
    ControlId::Knob1,
    ControlId::Knob2,
    ControlId::Knob3,
    ControlId::Knob4,
    ControlId::Knob5,
    ControlId::Knob6,
    ControlId::Knob7,
    ControlId::Knob8,
];

/// Number of pads on the grid (4x4).
pub const PAD_COUNT: usize = 16;

/// Raw wire codes for button events. The codes are fixed by firmware and are
/// not contiguous; never derive them arithmetically from the enum.
const RAW_BUTTON_CODES: &[(u8, ControlId)] = &[
    (0x20, ControlId::Play),
    (0x21, ControlId::Restart),
    (0x22, ControlId::Rec),
    (0x23, ControlId::Stop),
    (0x30, ControlId::Shift),
    (0x31, ControlId::Erase),
    (0x32, ControlId::Grid),
    (0x33, ControlId::NoteRepeat),
    (0x40, ControlId::Scene),
    (0x41, ControlId::Pattern),
    (0x42, ControlId::PadMode),
    (0x43, ControlId::Browse),
    (0x44, ControlId::Duplicate),
    (0x45, ControlId::Select),
    (0x46, ControlId::Solo),
    (0x47, ControlId::Mute),
    (0x50, ControlId::Volume),
    (0x51, ControlId::Swing),
    (0x52, ControlId::Tempo),
    (0x58, ControlId::TrackLeft),
    (0x59, ControlId::TrackRight),
];

impl ControlId {
    /// Offset of this control in the button lighting frame, if it has one.
    pub fn frame_offset(self) -> Option<usize> {
        BUTTONS.iter().position(|&b| b == self)
    }

    /// Wire index for knobs (0-7), None for buttons.
    pub fn knob_index(self) -> Option<u8> {
        KNOBS.iter().position(|&k| k == self).map(|i| i as u8)
    }

    pub fn is_knob(self) -> bool {
        self.knob_index().is_some()
    }
}

/// Resolve a raw button event code to its control identifier.
///
/// Total over all byte values: unknown codes return None (firmware may emit
/// codes we have not mapped yet).
pub fn button_from_raw(raw: u8) -> Option<ControlId> {
    RAW_BUTTON_CODES
        .iter()
        .find(|(code, _)| *code == raw)
        .map(|(_, id)| *id)
}

/// Reverse lookup, used by the probe tool and tests.
pub fn raw_from_button(id: ControlId) -> Option<u8> {
    RAW_BUTTON_CODES
        .iter()
        .find(|(_, mapped)| *mapped == id)
        .map(|(code, _)| *code)
}

/// Resolve a knob event index to its control identifier.
pub fn knob_from_index(index: u8) -> Option<ControlId> {
    KNOBS.get(index as usize).copied()
}

/// Decoded, device-independent input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    ButtonDown(ControlId),
    ButtonUp(ControlId),
    /// Relative knob turn, already converted to a usable signed step.
    Knob { knob: ControlId, delta: i32 },
    /// Pad strike with curved velocity (1-127).
    PadDown { pad: u8, velocity: u8 },
    /// Continuous pressure while a pad is held (aftertouch).
    PadAftertouch { pad: u8, pressure: u8 },
    PadUp { pad: u8 },
}
