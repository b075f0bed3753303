use glam::{Mat4, Vec3};
use overdrive_common::CameraMovement;
use serde::{Deserialize, Serialize};

/// Pitch limit in degrees when constrained, keeping the view off the poles.
pub const PITCH_LIMIT: f32 = 89.0;
/// Zoom (vertical field of view) range in degrees.
pub const ZOOM_MIN: f32 = 1.0;
pub const ZOOM_MAX: f32 = 45.0;

/// Initial camera parameters. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub world_up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Units per second.
    pub speed: f32,
    pub sensitivity: f32,
    pub zoom: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            world_up: Vec3::Y,
            yaw: -90.0,
            pitch: 0.0,
            speed: 2.5,
            sensitivity: 0.1,
            zoom: 45.0,
        }
    }
}

/// First-person camera driven by yaw and pitch.
///
/// The basis vectors are derived state: every write to yaw or pitch goes
/// through [`Camera::update_vectors`], so `front`, `right` and `up` stay
/// orthonormal.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    pub speed: f32,
    pub sensitivity: f32,
    zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl Camera {
    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self {
            position: config.position,
            front: Vec3::NEG_Z,
            up: config.world_up,
            right: Vec3::X,
            world_up: config.world_up.try_normalize().unwrap_or(Vec3::Y),
            yaw: config.yaw,
            pitch: config.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            speed: config.speed,
            sensitivity: config.sensitivity,
            zoom: config.zoom.clamp(ZOOM_MIN, ZOOM_MAX),
        };
        camera.update_vectors();
        camera
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Vertical field of view in degrees.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection using the current zoom as vertical FOV.
    pub fn projection_matrix(&self, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.zoom.to_radians(), aspect, near, far)
    }

    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_seconds: f32) {
        let velocity = self.speed * delta_seconds;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        if x_offset == 0.0 && y_offset == 0.0 {
            return;
        }
        self.yaw += x_offset * self.sensitivity;
        self.pitch += y_offset * self.sensitivity;
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn default_view_looks_down_negative_z() {
        let cam = Camera::default();
        let expected = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, 2.0), Vec3::Y);
        assert!(cam.view_matrix().abs_diff_eq(expected, EPS));
        assert!((cam.front() - Vec3::NEG_Z).length() < EPS);
        assert!((cam.right() - Vec3::X).length() < EPS);
    }

    #[test]
    fn basis_stays_orthonormal() {
        let mut yaw = -180.0;
        while yaw <= 180.0 {
            let mut pitch = -89.0;
            while pitch <= 89.0 {
                let cam = Camera::from_config(&CameraConfig {
                    yaw,
                    pitch,
                    ..Default::default()
                });
                let (f, r, u) = (cam.front(), cam.right(), cam.up());
                for v in [f, r, u] {
                    assert!((v.length() - 1.0).abs() < EPS, "yaw {yaw} pitch {pitch}");
                }
                assert!(f.dot(r).abs() < EPS, "yaw {yaw} pitch {pitch}");
                assert!(f.dot(u).abs() < EPS, "yaw {yaw} pitch {pitch}");
                assert!(r.dot(u).abs() < EPS, "yaw {yaw} pitch {pitch}");
                pitch += 17.8;
            }
            yaw += 22.5;
        }
    }

    #[test]
    fn pitch_clamps_under_large_offsets() {
        let mut cam = Camera::default();
        for _ in 0..1000 {
            cam.process_mouse_movement(0.0, 500.0, true);
        }
        assert_eq!(cam.pitch(), PITCH_LIMIT);
        for _ in 0..1000 {
            cam.process_mouse_movement(0.0, -500.0, true);
        }
        assert_eq!(cam.pitch(), -PITCH_LIMIT);
    }

    #[test]
    fn unconstrained_pitch_is_free() {
        let mut cam = Camera::default();
        cam.process_mouse_movement(0.0, 1000.0, false);
        assert_eq!(cam.pitch(), 100.0);
    }

    #[test]
    fn mouse_movement_scales_by_sensitivity() {
        let mut cam = Camera::default();
        cam.process_mouse_movement(10.0, 5.0, true);
        assert!((cam.yaw() - (-89.0)).abs() < EPS);
        assert!((cam.pitch() - 0.5).abs() < EPS);
    }

    #[test]
    fn zero_offsets_are_noops() {
        let mut cam = Camera::default();
        let before = cam.view_matrix();
        cam.process_mouse_movement(0.0, 0.0, true);
        cam.process_mouse_scroll(0.0);
        assert_eq!(cam.view_matrix(), before);
        assert_eq!(cam.zoom(), 45.0);
    }

    #[test]
    fn zoom_clamps_and_is_idempotent_at_bounds() {
        let mut cam = Camera::default();
        cam.process_mouse_scroll(-10.0);
        assert_eq!(cam.zoom(), ZOOM_MAX);
        cam.process_mouse_scroll(100.0);
        assert_eq!(cam.zoom(), ZOOM_MIN);
        cam.process_mouse_scroll(100.0);
        assert_eq!(cam.zoom(), ZOOM_MIN);
        cam.process_mouse_scroll(4.0);
        assert_eq!(cam.zoom(), ZOOM_MIN);
    }

    #[test]
    fn forward_for_one_second_moves_speed_units() {
        let mut cam = Camera::default();
        let start = cam.position;
        cam.process_keyboard(CameraMovement::Forward, 1.0);
        assert!(((cam.position - start).length() - cam.speed).abs() < EPS);
        assert!((cam.position - Vec3::new(0.0, 0.0, 0.5)).length() < EPS);
    }

    #[test]
    fn strafing_follows_right_vector() {
        let mut cam = Camera::default();
        cam.process_keyboard(CameraMovement::Right, 2.0);
        assert!((cam.position - Vec3::new(5.0, 0.0, 3.0)).length() < EPS);
        cam.process_keyboard(CameraMovement::Left, 2.0);
        cam.process_keyboard(CameraMovement::Backward, 0.4);
        assert!((cam.position - Vec3::new(0.0, 0.0, 4.0)).length() < EPS);
    }

    #[test]
    fn projection_is_finite() {
        let cam = Camera::default();
        let proj = cam.projection_matrix(16.0 / 9.0, 0.1, 100.0);
        assert!(proj.is_finite());
    }
}
