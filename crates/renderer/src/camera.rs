use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

use crate::input::MoveKeys;
use crate::types::CameraSettings;

/// First-person fly camera.
///
/// Yaw rotates about world up; pitch is kept within `[-π/2, π/2]`. Positive
/// pitch looks down, matching how mouse motion maps onto screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    pitch: f32,
    yaw: f32,
    move_speed: f32,
}

impl Camera {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            position: Vec3::from_array(settings.position),
            pitch: 0.0,
            yaw: 0.0,
            move_speed: settings.move_speed,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// `[pitch, yaw]` as uploaded to `u_camera_rotation`.
    pub fn rotation(&self) -> [f32; 2] {
        [self.pitch, self.yaw]
    }

    pub fn forward(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vec3::new(cos_pitch * sin_yaw, -sin_pitch, cos_pitch * cos_yaw)
    }

    pub fn right(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vec3::new(cos_yaw, 0.0, -sin_yaw)
    }

    /// Applies relative mouse motion in pixels.
    pub fn apply_mouse_delta(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.yaw += dx * sensitivity;
        self.pitch = (self.pitch + dy * sensitivity).clamp(-FRAC_PI_2, FRAC_PI_2);
    }

    /// Moves along the view axes for every held key, scaled by `dt` seconds.
    pub fn apply_keyboard(&mut self, keys: MoveKeys, dt: f32) {
        if !keys.any() {
            return;
        }
        let mut direction = Vec3::ZERO;
        if keys.forward {
            direction += self.forward();
        }
        if keys.backward {
            direction -= self.forward();
        }
        if keys.right {
            direction += self.right();
        }
        if keys.left {
            direction -= self.right();
        }
        if keys.up {
            direction += Vec3::Y;
        }
        if keys.down {
            direction -= Vec3::Y;
        }
        self.position += direction * self.move_speed * dt.max(0.0);
    }
}
