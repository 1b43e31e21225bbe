//! Host model boundary
//!
//! The runtime never inspects the host's object graph; it reaches outward
//! only through these narrow accessors, and holds no reference into the host
//! longer than one callback invocation.

use crate::color::Rgb;

/// Tagged union over the bank kinds the surface can display.
///
/// Matched exhaustively wherever the runtime cares; adding a bank kind is a
/// compile error at every match site until handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Bank {
    Tracks(TrackBank),
    DrumPads(DrumPadBank),
}

/// Window of host tracks currently under the surface's controls.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackBank {
    pub tracks: Vec<TrackInfo>,
    pub selected: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub name: String,
    /// Channel volume as 0..=127.
    pub volume: u8,
    pub muted: bool,
    pub color: Rgb,
}

/// Drum machine pads mapped onto the grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrumPadBank {
    pub pads: Vec<DrumPadInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrumPadInfo {
    pub name: String,
    pub color: Rgb,
    pub playing: bool,
}

/// Narrow accessors into the DAW.
///
/// Implemented by the host-integration glue outside this crate; the stub
/// below exists for the probe tool and tests.
pub trait HostModel: Send {
    fn bank(&self) -> Bank;

    fn track_name(&self, index: usize) -> Option<String>;

    /// Current value of a knob-assigned parameter as 0..=127.
    fn parameter_value(&self, index: usize) -> Option<u8>;

    /// Apply a relative change to a knob-assigned parameter.
    fn adjust_parameter(&mut self, index: usize, delta: i32);

    fn is_playing(&self) -> bool;

    fn toggle_playback(&mut self);

    /// Trigger a note/pad strike in the host.
    fn play_pad(&mut self, pad: usize, velocity: u8);

    /// Continuous pressure for a held pad.
    fn pad_aftertouch(&mut self, pad: usize, pressure: u8);

    fn release_pad(&mut self, pad: usize);
}

/// Host stub that accepts everything and reports an empty project.
/// Used by probe mode, where no DAW is attached.
#[derive(Debug, Default)]
pub struct NullHost {
    playing: bool,
}

impl HostModel for NullHost {
    fn bank(&self) -> Bank {
        Bank::Tracks(TrackBank::default())
    }

    fn track_name(&self, _index: usize) -> Option<String> {
        None
    }

    fn parameter_value(&self, _index: usize) -> Option<u8> {
        None
    }

    fn adjust_parameter(&mut self, _index: usize, _delta: i32) {}

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn toggle_playback(&mut self) {
        self.playing = !self.playing;
    }

    fn play_pad(&mut self, _pad: usize, _velocity: u8) {}

    fn pad_aftertouch(&mut self, _pad: usize, _pressure: u8) {}

    fn release_pad(&mut self, _pad: usize) {}
}
