/// Turns absolute cursor positions into look offsets.
///
/// The first sample only records the position, so the camera does not jump
/// when the cursor enters the window. Later samples return
/// `(x - last_x, last_y - y)`: y is reversed because screen coordinates grow
/// downward while pitch grows upward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouseLook {
    last: Option<(f32, f32)>,
}

impl MouseLook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&mut self, x: f32, y: f32) -> Option<(f32, f32)> {
        let previous = self.last.replace((x, y));
        previous.map(|(last_x, last_y)| (x - last_x, last_y - y))
    }

    /// Forget the last position, e.g. after the cursor was released.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
