use overdrive_common::CameraMovement;
use serde::{Deserialize, Serialize};

/// A high-level action produced from raw input.
///
/// The viewer loop consumes actions, never key codes, so bindings can change
/// without touching camera logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    /// Translate the camera while the key is held.
    Move(CameraMovement),
    /// Close the viewer.
    Quit,
}

impl Action {
    pub fn movement(self) -> Option<CameraMovement> {
        match self {
            Action::Move(m) => Some(m),
            Action::Quit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_moves_carry_a_direction() {
        assert_eq!(
            Action::Move(CameraMovement::Left).movement(),
            Some(CameraMovement::Left)
        );
        assert_eq!(Action::Quit.movement(), None);
    }
}
