//! Modes, views and their registries
//!
//! A `Mode` owns the knob/button row; a `View` owns the pad grid. The two
//! axes run independent activation stacks on the same device. Per-device
//! variation (palettes, frame layout, raw codes) is injected as data, not
//! expressed as subclass layers.

pub mod builtin;
pub mod stack;

pub use stack::ActivationStack;

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use anyhow::{bail, Result};
use tracing::debug;

use crate::color::Rgb;
use crate::controls::{ControlId, InputEvent};
use crate::host::HostModel;

/// Logical knob/button mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeId {
    Volume,
    Pan,
    Send,
    Device,
    Browse,
}

/// Logical pad-grid mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewId {
    Session,
    Drum,
    Play,
    Select,
}

impl ModeId {
    pub const ALL: [ModeId; 5] = [
        ModeId::Volume,
        ModeId::Pan,
        ModeId::Send,
        ModeId::Device,
        ModeId::Browse,
    ];
}

impl ViewId {
    pub const ALL: [ViewId; 4] = [ViewId::Session, ViewId::Drum, ViewId::Play, ViewId::Select];
}

/// Text content for the device's small display. Rendering is external; the
/// mode only declares what to show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayContent {
    pub lines: Vec<String>,
}

/// A named, stateful handler owning the knob/button row while active.
pub trait Mode: Send {
    fn id(&self) -> ModeId;

    /// React to a button or knob event. Pad events never arrive here.
    fn handle_event(&mut self, host: &mut dyn HostModel, event: &InputEvent);

    /// Declared button colors for the current host state. Buttons absent
    /// from the list render as off.
    fn button_colors(&self, host: &dyn HostModel) -> Vec<(ControlId, Rgb)>;

    fn display(&self, _host: &dyn HostModel) -> Option<DisplayContent> {
        None
    }
}

/// A named, stateful handler owning the pad grid while active.
pub trait View: Send {
    fn id(&self) -> ViewId;

    /// React to a pad event. Button/knob events never arrive here.
    fn handle_event(&mut self, host: &mut dyn HostModel, event: &InputEvent);

    /// Declared pad colors (by grid index) for the current host state.
    fn pad_colors(&self, host: &dyn HostModel) -> Vec<(u8, Rgb)>;
}

/// Registered handlers for one activation axis plus its stack.
///
/// Activating an id that was never registered is a programming error and is
/// rejected loudly rather than ignored at runtime.
pub struct Registry<I, H>
where
    I: Copy + Eq + Hash + Debug,
    H: ?Sized,
{
    items: HashMap<I, Box<H>>,
    stack: ActivationStack<I>,
}

pub type ModeRegistry = Registry<ModeId, dyn Mode>;
pub type ViewRegistry = Registry<ViewId, dyn View>;

impl<I, H> Registry<I, H>
where
    I: Copy + Eq + Hash + Debug,
    H: ?Sized,
{
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            stack: ActivationStack::new(),
        }
    }

    pub fn register(&mut self, id: I, item: Box<H>) {
        debug!("registered {:?}", id);
        self.items.insert(id, item);
    }

    pub fn is_registered(&self, id: I) -> bool {
        self.items.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<I> {
        self.items.keys().copied().collect()
    }

    /// Permanent switch to `id`.
    pub fn activate(&mut self, id: I) -> Result<()> {
        if !self.is_registered(id) {
            bail!("{:?} is not registered", id);
        }
        self.stack.set_active(id);
        Ok(())
    }

    /// Temporary overlay; restore with [`Registry::restore`].
    pub fn activate_temporary(&mut self, id: I) -> Result<()> {
        if !self.is_registered(id) {
            bail!("{:?} is not registered", id);
        }
        self.stack.set_temporary(id);
        Ok(())
    }

    pub fn restore(&mut self) {
        self.stack.restore();
    }

    pub fn active_id(&self) -> Option<I> {
        self.stack.active()
    }

    pub fn is_active(&self, id: I) -> bool {
        self.stack.is_active(id)
    }

    pub fn is_temporary(&self) -> bool {
        self.stack.is_temporary()
    }

    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(Option<I>, I) + Send + 'static,
    {
        self.stack.add_listener(listener);
    }

    pub fn active(&self) -> Option<&H> {
        self.stack.active().and_then(|id| self.items.get(&id)).map(|b| &**b)
    }

    pub fn active_mut(&mut self) -> Option<&mut H> {
        let id = self.stack.active()?;
        self.items.get_mut(&id).map(|b| &mut **b)
    }
}

impl<I, H> Default for Registry<I, H>
where
    I: Copy + Eq + Hash + Debug,
    H: ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;

    struct StaticMode {
        id: ModeId,
    }

    impl Mode for StaticMode {
        fn id(&self) -> ModeId {
            self.id
        }

        fn handle_event(&mut self, host: &mut dyn HostModel, event: &InputEvent) {
            if matches!(event, InputEvent::ButtonDown(ControlId::Play)) {
                host.toggle_playback();
            }
        }

        fn button_colors(&self, _host: &dyn HostModel) -> Vec<(ControlId, Rgb)> {
            vec![(ControlId::Play, Rgb::WHITE)]
        }
    }

    fn registry_with(id: ModeId) -> ModeRegistry {
        let mut reg = ModeRegistry::new();
        reg.register(id, Box::new(StaticMode { id }));
        reg
    }

    #[test]
    fn test_activate_registered() {
        let mut reg = registry_with(ModeId::Volume);
        reg.activate(ModeId::Volume).unwrap();
        assert!(reg.is_active(ModeId::Volume));
        assert_eq!(reg.active().unwrap().id(), ModeId::Volume);
    }

    #[test]
    fn test_activate_unregistered_is_rejected() {
        let mut reg = registry_with(ModeId::Volume);
        assert!(reg.activate(ModeId::Pan).is_err());
        assert!(reg.activate_temporary(ModeId::Pan).is_err());
        // Active mode untouched by the failed activation.
        assert_eq!(reg.active_id(), None);
    }

    #[test]
    fn test_temporary_and_restore_through_registry() {
        let mut reg = registry_with(ModeId::Volume);
        reg.register(
            ModeId::Browse,
            Box::new(StaticMode { id: ModeId::Browse }),
        );

        reg.activate(ModeId::Volume).unwrap();
        reg.activate_temporary(ModeId::Browse).unwrap();
        assert_eq!(reg.active_id(), Some(ModeId::Browse));
        assert!(reg.is_temporary());

        reg.restore();
        assert_eq!(reg.active_id(), Some(ModeId::Volume));
    }

    #[test]
    fn test_events_reach_active_item() {
        let mut reg = registry_with(ModeId::Volume);
        reg.activate(ModeId::Volume).unwrap();

        let mut host = NullHost::default();
        let event = InputEvent::ButtonDown(ControlId::Play);
        if let Some(mode) = reg.active_mut() {
            mode.handle_event(&mut host, &event);
        }
        // The event reached the mode and flowed through to the host.
        assert!(host.is_playing());
        assert_eq!(
            reg.active().unwrap().button_colors(&host),
            vec![(ControlId::Play, Rgb::WHITE)]
        );
    }
}
