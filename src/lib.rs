//! PadGrid control surface runtime
//!
//! Bridges PadGrid RGB pad controllers and a music production host: decoded
//! hardware events route to the active mode/view, declared colors translate
//! to the device palette, and the session keeps wire traffic down to deltas.

pub mod cache;
pub mod cli;
pub mod color;
pub mod config;
pub mod controls;
pub mod debounce;
pub mod host;
pub mod modes;
pub mod probe;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod transport;

pub use color::{ColorTranslator, Rgb};
pub use controls::{ControlId, InputEvent};
pub use runtime::{RuntimeCommand, SurfaceRuntime};
pub use session::{ConnectionState, DeviceSession, Transport};
