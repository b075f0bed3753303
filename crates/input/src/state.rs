use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Action, Key, KeyBindings, MouseLook};

/// A raw event from the windowing layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    KeyPressed(Key),
    KeyReleased(Key),
    CursorMoved { x: f32, y: f32 },
    Scrolled { y: f32 },
}

/// Input gathered over one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    /// Actions of every key held at the end of the frame.
    pub actions: Vec<Action>,
    /// Accumulated look offset, already y-reversed.
    pub look: (f32, f32),
    pub scroll: f32,
}

impl FrameInput {
    pub fn quit_requested(&self) -> bool {
        self.actions.contains(&Action::Quit)
    }
}

/// Held keys plus per-frame accumulators.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: BTreeSet<Key>,
    mouse: MouseLook,
    look: (f32, f32),
    scroll: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyPressed(key) => {
                self.held.insert(key);
            }
            InputEvent::KeyReleased(key) => {
                self.held.remove(&key);
            }
            InputEvent::CursorMoved { x, y } => {
                if let Some((dx, dy)) = self.mouse.offset(x, y) {
                    self.look.0 += dx;
                    self.look.1 += dy;
                }
            }
            InputEvent::Scrolled { y } => self.scroll += y,
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Resolve held keys through `bindings` and reset the accumulators.
    /// Held keys stay held across frames.
    pub fn end_frame(&mut self, bindings: &KeyBindings) -> FrameInput {
        let frame = FrameInput {
            actions: bindings.actions_for(&self.held),
            look: std::mem::take(&mut self.look),
            scroll: std::mem::take(&mut self.scroll),
        };
        tracing::trace!(?frame, "frame input");
        frame
    }
}
