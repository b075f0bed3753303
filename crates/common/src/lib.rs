//! Shared types for the overdrive model viewer.
//!
//! Both the input layer and the render core agree on movement directions
//! and texture roles through these.

mod types;

pub use types::{CameraMovement, TextureKind};
