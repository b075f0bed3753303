//! Keyboard and mouse input mapped to viewer actions.
//!
//! Raw events go into an [`InputState`]; once per frame the held keys are
//! resolved through [`KeyBindings`] into [`Action`]s, together with the
//! accumulated look and scroll offsets.

mod action;
mod bindings;
mod mouse;
mod state;

pub use action::Action;
pub use bindings::{Key, KeyBindings, UnknownKey};
pub use mouse::MouseLook;
pub use state::{FrameInput, InputEvent, InputState};

pub fn crate_info() -> &'static str {
    concat!("overdrive-input v", env!("CARGO_PKG_VERSION"))
}
