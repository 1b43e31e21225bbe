//! Stock mode/view implementations
//!
//! The interesting behavior lives in the host; these handlers are thin glue
//! between decoded input and the narrow host accessors, plus declared colors
//! for the runtime to translate and flush.

use crate::color::Rgb;
use crate::controls::{ControlId, InputEvent};
use crate::host::{Bank, HostModel};
use crate::modes::{DisplayContent, Mode, ModeId, View, ViewId};

const ACTIVE_GREEN: Rgb = Rgb::new(0, 255, 0);
const RECORD_RED: Rgb = Rgb::new(255, 0, 0);
const SELECTOR_AMBER: Rgb = Rgb::new(255, 165, 0);
const IDLE_GREY: Rgb = Rgb::new(80, 80, 80);

/// Knobs control per-track volume; Play toggles transport.
pub struct VolumeMode;

impl Mode for VolumeMode {
    fn id(&self) -> ModeId {
        ModeId::Volume
    }

    fn handle_event(&mut self, host: &mut dyn HostModel, event: &InputEvent) {
        match event {
            InputEvent::Knob { knob, delta } => {
                if let Some(index) = knob.knob_index() {
                    host.adjust_parameter(index as usize, *delta);
                }
            }
            InputEvent::ButtonDown(ControlId::Play) => host.toggle_playback(),
            _ => {}
        }
    }

    fn button_colors(&self, host: &dyn HostModel) -> Vec<(ControlId, Rgb)> {
        let mut colors = vec![
            (
                ControlId::Play,
                if host.is_playing() { ACTIVE_GREEN } else { IDLE_GREY },
            ),
            (ControlId::Volume, SELECTOR_AMBER),
            (ControlId::TrackLeft, IDLE_GREY),
            (ControlId::TrackRight, IDLE_GREY),
        ];

        match host.bank() {
            Bank::Tracks(bank) => {
                if let Some(selected) = bank.selected.and_then(|i| bank.tracks.get(i)) {
                    colors.push((
                        ControlId::Mute,
                        if selected.muted { RECORD_RED } else { IDLE_GREY },
                    ));
                }
            }
            // Drum banks have no per-track mute row on this mode.
            Bank::DrumPads(_) => {}
        }

        colors
    }

    fn display(&self, host: &dyn HostModel) -> Option<DisplayContent> {
        match host.bank() {
            Bank::Tracks(bank) => Some(DisplayContent {
                lines: bank.tracks.iter().map(|t| t.name.clone()).collect(),
            }),
            Bank::DrumPads(_) => None,
        }
    }
}

/// Pads strike drum pads in the host; colors mirror the drum bank.
pub struct DrumView;

impl View for DrumView {
    fn id(&self) -> ViewId {
        ViewId::Drum
    }

    fn handle_event(&mut self, host: &mut dyn HostModel, event: &InputEvent) {
        match event {
            InputEvent::PadDown { pad, velocity } => host.play_pad(*pad as usize, *velocity),
            InputEvent::PadAftertouch { pad, pressure } => {
                host.pad_aftertouch(*pad as usize, *pressure)
            }
            InputEvent::PadUp { pad } => host.release_pad(*pad as usize),
            _ => {}
        }
    }

    fn pad_colors(&self, host: &dyn HostModel) -> Vec<(u8, Rgb)> {
        match host.bank() {
            Bank::DrumPads(bank) => bank
                .pads
                .iter()
                .enumerate()
                .map(|(i, pad)| (i as u8, if pad.playing { Rgb::WHITE } else { pad.color }))
                .collect(),
            Bank::Tracks(_) => Vec::new(),
        }
    }
}
