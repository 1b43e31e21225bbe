//! Control surface runtime
//!
//! The façade tying everything together: decoded input events route to the
//! active mode (knobs/buttons) or view (pads), declared colors run through
//! the translator, and the session flushes the result. Lighting is always
//! recomputed from whatever is active at flush time — a mode change between
//! two flushes simply wins, there is no queue of stale lighting jobs to
//! cancel.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::color::{ColorTranslator, Palette};
use crate::controls::{ControlId, InputEvent};
use crate::debounce::Debouncer;
use crate::host::{Bank, HostModel};
use crate::modes::{Mode, ModeId, ModeRegistry, View, ViewId, ViewRegistry};
use crate::session::{DeviceSession, SessionError};

// Track-state identifiers understood by the device firmware.
const STATE_VOLUME: u8 = 0x01;
const STATE_NAME: u8 = 0x02;
const STATE_MUTE: u8 = 0x03;

/// Quiet window after the last input event before an event-driven refresh.
const EVENT_SETTLE: Duration = Duration::from_millis(30);

/// Control messages for a running runtime, fed through the command channel
/// (the REPL is one producer; a tray or test harness can be another).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeCommand {
    ActivateMode(ModeId),
    ActivateView(ViewId),
    TemporaryMode(ModeId),
    TemporaryView(ViewId),
    RestoreMode,
    RestoreView,
    Status,
    Shutdown,
}

/// One device's runtime: registries, stacks, translator, session.
pub struct SurfaceRuntime {
    session: DeviceSession,
    translator: ColorTranslator,
    modes: ModeRegistry,
    views: ViewRegistry,
    host: Box<dyn HostModel>,
    refresh_guard: Debouncer,
}

impl SurfaceRuntime {
    pub fn new(
        session: DeviceSession,
        translator: ColorTranslator,
        host: Box<dyn HostModel>,
    ) -> Self {
        let mut modes = ModeRegistry::new();
        modes.add_listener(|prev, new| {
            debug!("mode transition {:?} -> {:?}", prev, new);
        });
        let mut views = ViewRegistry::new();
        views.add_listener(|prev, new| {
            debug!("view transition {:?} -> {:?}", prev, new);
        });

        Self {
            session,
            translator,
            modes,
            views,
            host,
            refresh_guard: Debouncer::new(),
        }
    }

    pub fn register_mode(&mut self, mode: Box<dyn Mode>) {
        self.modes.register(mode.id(), mode);
    }

    pub fn register_view(&mut self, view: Box<dyn View>) {
        self.views.register(view.id(), view);
    }

    pub fn activate_mode(&mut self, id: ModeId) -> Result<()> {
        self.modes.activate(id)
    }

    pub fn activate_view(&mut self, id: ViewId) -> Result<()> {
        self.views.activate(id)
    }

    pub fn temporary_mode(&mut self, id: ModeId) -> Result<()> {
        self.modes.activate_temporary(id)
    }

    pub fn temporary_view(&mut self, id: ViewId) -> Result<()> {
        self.views.activate_temporary(id)
    }

    pub fn restore_mode(&mut self) {
        self.modes.restore();
    }

    pub fn restore_view(&mut self) {
        self.views.restore();
    }

    pub fn active_mode(&self) -> Option<ModeId> {
        self.modes.active_id()
    }

    pub fn active_view(&self) -> Option<ViewId> {
        self.views.active_id()
    }

    pub fn registered_modes(&self) -> Vec<ModeId> {
        self.modes.ids()
    }

    pub fn registered_views(&self) -> Vec<ViewId> {
        self.views.ids()
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    /// Decode one inbound frame and route the resulting event, if any.
    pub fn handle_frame(&mut self, frame: &[u8]) {
        if let Some(event) = self.session.handle_frame(frame) {
            self.handle_event(event);
        }
    }

    /// Route a decoded event to the active mode or view.
    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            // The Select overlay is momentary: held = overlay view active.
            InputEvent::ButtonDown(ControlId::Select)
                if self.views.is_registered(ViewId::Select) =>
            {
                if let Err(e) = self.views.activate_temporary(ViewId::Select) {
                    warn!("select overlay: {:#}", e);
                }
            }
            InputEvent::ButtonUp(ControlId::Select) if self.views.is_temporary() => {
                self.views.restore();
            }
            InputEvent::ButtonDown(_) | InputEvent::ButtonUp(_) | InputEvent::Knob { .. } => {
                if let Some(mode) = self.modes.active_mut() {
                    mode.handle_event(&mut *self.host, &event);
                } else {
                    debug!("no active mode, dropped {:?}", event);
                }
            }
            InputEvent::PadDown { .. }
            | InputEvent::PadAftertouch { .. }
            | InputEvent::PadUp { .. } => {
                if let Some(view) = self.views.active_mut() {
                    view.handle_event(&mut *self.host, &event);
                } else {
                    debug!("no active view, dropped {:?}", event);
                }
            }
        }
    }

    /// Recompute lighting from the currently active mode/view and flush.
    pub fn refresh(&mut self) -> Result<(), SessionError> {
        let button_rgb = self
            .modes
            .active()
            .map(|m| m.button_colors(&*self.host))
            .unwrap_or_default();
        let pad_rgb = self
            .views
            .active()
            .map(|v| v.pad_colors(&*self.host))
            .unwrap_or_default();

        let buttons: Vec<(ControlId, u8)> = button_rgb
            .into_iter()
            .map(|(id, rgb)| (id, self.translator.translate(Palette::Function, rgb)))
            .collect();
        let pads: Vec<(u8, u8)> = pad_rgb
            .into_iter()
            .map(|(pad, rgb)| (pad, self.translator.translate(Palette::Grid, rgb)))
            .collect();

        self.session.flush_lighting(&buttons, &pads)
    }

    /// Push per-track values and names to the device's display hardware.
    /// Deduped by the session's value cache, so calling this every flush
    /// interval costs nothing at steady state.
    pub fn push_track_state(&mut self) -> Result<(), SessionError> {
        match self.host.bank() {
            Bank::Tracks(bank) => {
                for (i, track) in bank.tracks.iter().enumerate() {
                    let channel = i as u8;
                    self.session
                        .send_track_state(channel, STATE_VOLUME, track.volume, &[])?;
                    self.session.send_track_state(
                        channel,
                        STATE_NAME,
                        0,
                        track.name.as_bytes(),
                    )?;
                    self.session
                        .send_track_state(channel, STATE_MUTE, track.muted as u8, &[])?;
                }
            }
            // Drum banks render on the grid, not the channel displays.
            Bank::DrumPads(_) => {}
        }
        Ok(())
    }

    /// Initiate the handshake; the device will answer on the transport's
    /// callback thread via the session's ack handle.
    pub fn connect(&mut self) -> Result<(), SessionError> {
        self.session.initiate_handshake()
    }

    /// Apply one control command. Returns false when the loop should exit.
    pub fn handle_command(&mut self, command: RuntimeCommand) -> bool {
        let outcome = match command {
            RuntimeCommand::ActivateMode(id) => self.activate_mode(id),
            RuntimeCommand::ActivateView(id) => self.activate_view(id),
            RuntimeCommand::TemporaryMode(id) => self.temporary_mode(id),
            RuntimeCommand::TemporaryView(id) => self.temporary_view(id),
            RuntimeCommand::RestoreMode => {
                self.restore_mode();
                Ok(())
            }
            RuntimeCommand::RestoreView => {
                self.restore_view();
                Ok(())
            }
            RuntimeCommand::Status => {
                info!(
                    "session {:?} (v{:?}), mode {:?}, view {:?}",
                    self.session.connection_state(),
                    self.session.negotiated_version(),
                    self.active_mode(),
                    self.active_view()
                );
                Ok(())
            }
            RuntimeCommand::Shutdown => return false,
        };
        if let Err(e) = outcome {
            warn!("command {:?} rejected: {:#}", command, e);
        }
        true
    }

    /// Main loop: inbound frames, control commands, debounced event refresh,
    /// periodic flush, shutdown.
    pub async fn run(
        mut self,
        mut frames: mpsc::Receiver<Vec<u8>>,
        mut commands: mpsc::Receiver<RuntimeCommand>,
        flush_interval: Duration,
        shutdown: impl std::future::Future<Output = ()>,
    ) -> Result<()> {
        let mut ticker = tokio::time::interval(flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        // Input bursts (a knob sweep) re-arm the guard on every event; the
        // refresh runs once, EVENT_SETTLE after the burst ends. The periodic
        // tick below catches host-side changes with no surface input.
        let mut pending: Option<crate::debounce::Generation> = None;

        info!("surface runtime started");
        loop {
            tokio::select! {
                maybe_frame = frames.recv() => {
                    match maybe_frame {
                        Some(frame) => {
                            self.handle_frame(&frame);
                            pending = Some(self.refresh_guard.arm());
                        }
                        None => {
                            info!("transport channel closed");
                            break;
                        }
                    }
                }
                maybe_command = commands.recv() => {
                    match maybe_command {
                        Some(command) => {
                            if !self.handle_command(command) {
                                break;
                            }
                            pending = Some(self.refresh_guard.arm());
                        }
                        None => {
                            info!("command channel closed");
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep(EVENT_SETTLE), if pending.is_some() => {
                    if let Some(token) = pending.take() {
                        // A newer arm means a newer event beat the timer;
                        // its own settle window takes over, do not re-arm.
                        if self.refresh_guard.is_current(token) {
                            if let Err(e) = self.refresh() {
                                warn!("lighting flush failed: {:#}", e);
                            }
                        }
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.refresh() {
                        warn!("lighting flush failed: {:#}", e);
                    }
                    if let Err(e) = self.push_track_state() {
                        warn!("track state flush failed: {:#}", e);
                    }
                }
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
            }
        }

        self.session.shutdown();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::host::{DrumPadBank, DrumPadInfo};
    use crate::modes::builtin::{DrumView, VolumeMode};
    use crate::protocol::velocity::VelocityCurve;
    use crate::protocol::{CMD_HELLO, CMD_LIGHT_PADS, CMD_PAD};
    use crate::session::Transport;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct StubTransport {
        written: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl Transport for StubTransport {
        fn send(&mut self, frame: &[u8]) -> Result<()> {
            self.written.lock().push(frame.to_vec());
            Ok(())
        }
    }

    struct GridHost {
        bank: Bank,
        struck: Arc<Mutex<Vec<(usize, u8)>>>,
    }

    impl GridHost {
        fn new() -> Self {
            Self {
                bank: Bank::DrumPads(DrumPadBank {
                    pads: vec![
                        DrumPadInfo {
                            name: "Kick".into(),
                            color: Rgb::new(250, 0, 0),
                            playing: false,
                        };
                        16
                    ],
                }),
                struck: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl crate::host::HostModel for GridHost {
        fn bank(&self) -> Bank {
            self.bank.clone()
        }

        fn track_name(&self, _index: usize) -> Option<String> {
            None
        }

        fn parameter_value(&self, _index: usize) -> Option<u8> {
            None
        }

        fn adjust_parameter(&mut self, _index: usize, _delta: i32) {}

        fn is_playing(&self) -> bool {
            false
        }

        fn toggle_playback(&mut self) {}

        fn play_pad(&mut self, pad: usize, velocity: u8) {
            self.struck.lock().push((pad, velocity));
        }

        fn pad_aftertouch(&mut self, _pad: usize, _pressure: u8) {}

        fn release_pad(&mut self, _pad: usize) {}
    }

    fn runtime() -> (SurfaceRuntime, StubTransport, Arc<Mutex<Vec<(usize, u8)>>>) {
        let transport = StubTransport::default();
        let session = DeviceSession::new(
            Box::new(transport.clone()),
            VelocityCurve::factory(),
            false,
        );
        let host = GridHost::new();
        let struck = host.struck.clone();
        let mut rt = SurfaceRuntime::new(session, ColorTranslator::factory(), Box::new(host));
        rt.register_mode(Box::new(VolumeMode));
        rt.register_view(Box::new(DrumView));
        rt.activate_mode(ModeId::Volume).unwrap();
        rt.activate_view(ViewId::Drum).unwrap();
        (rt, transport, struck)
    }

    fn connect(rt: &mut SurfaceRuntime) {
        rt.connect().unwrap();
        rt.handle_frame(&[CMD_HELLO, 3]);
    }

    #[test]
    fn test_pad_events_reach_active_view() {
        let (mut rt, _, struck) = runtime();
        connect(&mut rt);

        let pressure = 4095u32.to_be_bytes();
        rt.handle_frame(&[CMD_PAD, 5, pressure[0], pressure[1], pressure[2], pressure[3]]);
        // The strike reached the host through the drum view, at full curve.
        assert_eq!(struck.lock().as_slice(), &[(5, 127)]);
    }

    #[test]
    fn test_refresh_translates_and_flushes() {
        let (mut rt, transport, _) = runtime();
        connect(&mut rt);

        rt.refresh().unwrap();
        let written = transport.written.lock();
        let pad_frame = written
            .iter()
            .find(|f| f[0] == CMD_LIGHT_PADS)
            .expect("pad frame flushed");
        // rgb(250,0,0) is nearest to grid palette red (code 3).
        assert_eq!(pad_frame[1], 3);
        assert_eq!(pad_frame.len(), 1 + crate::protocol::PAD_FRAME_LEN);
    }

    #[test]
    fn test_refresh_without_active_mode_is_harmless() {
        let transport = StubTransport::default();
        let session = DeviceSession::new(
            Box::new(transport.clone()),
            VelocityCurve::factory(),
            false,
        );
        let mut rt = SurfaceRuntime::new(
            session,
            ColorTranslator::factory(),
            Box::new(GridHost::new()),
        );
        connect(&mut rt);
        rt.refresh().unwrap();
        // All-off frames still go out at the fixed length.
        let written = transport.written.lock();
        assert!(written.iter().any(|f| f[0] == CMD_LIGHT_PADS));
    }

    #[test]
    fn test_activate_unregistered_mode_fails() {
        let (mut rt, _, _) = runtime();
        assert!(rt.activate_mode(ModeId::Browse).is_err());
        assert_eq!(rt.active_mode(), Some(ModeId::Volume));
    }
}
