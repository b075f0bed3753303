use std::path::Path;

use anyhow::Context;
use overdrive_input::{InputEvent, Key};
use serde::{Deserialize, Serialize};

/// One input event delivered at the start of `frame`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub frame: u32,
    pub event: InputEvent,
}

/// Scripted input for a headless fly-through. Steps are kept sorted by frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlyScript {
    steps: Vec<ScriptStep>,
}

impl FlyScript {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        let script: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing script {}", path.display()))?;
        Ok(Self::from_steps(script.steps))
    }

    /// Steps sharing a frame keep their relative order.
    pub fn from_steps(mut steps: Vec<ScriptStep>) -> Self {
        steps.sort_by_key(|s| s.frame);
        Self { steps }
    }

    /// Walk forward the whole time while panning right.
    pub fn walk_and_pan(frames: u32) -> Self {
        let mut steps = vec![ScriptStep {
            frame: 0,
            event: InputEvent::KeyPressed(Key::W),
        }];
        steps.extend((0..frames).map(|frame| ScriptStep {
            frame,
            event: InputEvent::CursorMoved {
                x: 400.0 + frame as f32 * 4.0,
                y: 300.0,
            },
        }));
        Self { steps }
    }

    /// Events for `frame`, in script order.
    pub fn events_at(&self, frame: u32) -> impl Iterator<Item = InputEvent> + '_ {
        let start = self.steps.partition_point(|s| s.frame < frame);
        let end = start + self.steps[start..].partition_point(|s| s.frame == frame);
        self.steps[start..end].iter().map(|s| s.event)
    }
}
