//! Orbit camera controls: rotate around a target, screen-space pan, dolly zoom.
//!
//! Input handlers only accumulate deltas; [`OrbitControls::update`] applies
//! them to the camera once per frame. With damping enabled each update
//! consumes `damping_factor` of the pending motion, so the camera keeps
//! gliding for a few frames after the pointer stops.

use std::f32::consts::{PI, TAU};

use crate::Vec3;
use crate::camera::Camera;

/// Keeps the polar angle away from the poles so `look_at` stays defined.
const POLAR_EPS: f32 = 1e-6;
/// Smallest eye-target distance whatever `min_distance` says; at zero the
/// view matrix is undefined and zooming out again is impossible.
const MIN_RADIUS: f32 = 1e-4;

#[derive(Clone, Copy, Debug)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_pan: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    // Pending spherical motion (theta = azimuth, phi = polar).
    delta_theta: f32,
    delta_phi: f32,
    pan_offset: Vec3,
    scale: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: false,
            damping_factor: 0.05,
            enable_pan: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            pan_offset: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    pub fn with_damping(mut self, factor: f32) -> Self {
        self.enable_damping = true;
        self.damping_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Pointer drag in physical pixels; a drag across the full viewport height is one turn.
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let h = viewport_height.max(1.0);
        self.rotate_left(TAU * dx / h * self.rotate_speed);
        self.rotate_up(TAU * dy / h * self.rotate_speed);
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta_phi -= angle;
    }

    /// Screen-space pan: the point under the cursor follows the pointer at target depth.
    pub fn pan_by_pixels(&mut self, dx: f32, dy: f32, camera: &Camera, viewport_height: f32) {
        if !self.enable_pan {
            return;
        }
        let h = viewport_height.max(1.0);
        let target_distance = (camera.eye - self.target).length() * (camera.fov_y_rad * 0.5).tan();
        let left = 2.0 * dx * target_distance / h * self.pan_speed;
        let up = 2.0 * dy * target_distance / h * self.pan_speed;
        self.pan_offset += -camera.right() * left;
        self.pan_offset += camera.local_up() * up;
    }

    /// Positive steps move the camera toward the target.
    pub fn zoom_steps(&mut self, steps: f32) {
        let factor = 0.95_f32.powf(self.zoom_speed * steps.abs());
        if steps > 0.0 {
            self.scale *= factor;
        } else if steps < 0.0 {
            self.scale /= factor;
        }
    }

    /// Drop any motion still in flight (used when the camera is placed programmatically).
    pub fn stop(&mut self) {
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.pan_offset = Vec3::ZERO;
        self.scale = 1.0;
    }

    /// Apply pending motion to the camera. Returns `true` if the eye moved noticeably.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let offset = camera.eye - self.target;
        let mut radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius > 0.0 {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        } else {
            PI * 0.5
        };

        if self.enable_damping {
            theta += self.delta_theta * self.damping_factor;
            phi += self.delta_phi * self.damping_factor;
        } else {
            theta += self.delta_theta;
            phi += self.delta_phi;
        }
        phi = phi.clamp(POLAR_EPS, PI - POLAR_EPS);

        radius = (radius * self.scale)
            .max(self.min_distance)
            .min(self.max_distance)
            .max(MIN_RADIUS);

        if self.enable_damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        let sin_phi = phi.sin();
        let new_offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );

        let previous_eye = camera.eye;
        camera.eye = self.target + new_offset;
        camera.target = self.target;

        if self.enable_damping {
            let keep = 1.0 - self.damping_factor;
            self.delta_theta *= keep;
            self.delta_phi *= keep;
            self.pan_offset *= keep;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        previous_eye.distance_squared(camera.eye) > 1e-12
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3;

    fn camera_at(eye: Vec3) -> Camera {
        Camera::new_perspective(eye, Vec3::ZERO, Vec3::Y, 60f32.to_radians(), 0.01, 1000.0, 1.0)
    }

    #[test]
    fn update_without_input_keeps_pose() {
        let mut cam = camera_at(vec3(154.66, -38.62, 123.34));
        let mut controls = OrbitControls::new(Vec3::ZERO).with_damping(0.06);
        controls.update(&mut cam);
        assert!(cam.eye.distance(vec3(154.66, -38.62, 123.34)) < 1e-3);
        assert_eq!(cam.target, Vec3::ZERO);
    }

    #[test]
    fn zoom_in_shrinks_radius() {
        let mut cam = camera_at(vec3(0.0, 0.0, 10.0));
        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.zoom_steps(1.0);
        controls.update(&mut cam);
        assert!((cam.distance() - 9.5).abs() < 1e-4);
    }

    #[test]
    fn rotation_preserves_radius() {
        let mut cam = camera_at(vec3(0.0, 0.0, 10.0));
        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.rotate_left(0.5);
        controls.update(&mut cam);
        assert!((cam.distance() - 10.0).abs() < 1e-4);
        assert!(cam.eye.x.abs() > 1.0);
    }

    #[test]
    fn damping_spreads_motion_over_frames() {
        let mut cam = camera_at(vec3(0.0, 0.0, 10.0));
        let mut controls = OrbitControls::new(Vec3::ZERO).with_damping(0.5);
        controls.rotate_left(1.0);
        assert!(controls.update(&mut cam));
        let after_first = cam.eye;
        assert!(controls.update(&mut cam));
        assert!(cam.eye.distance(after_first) > 1e-4);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut cam = camera_at(vec3(0.0, 0.0, 10.0));
        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.rotate_up(10.0);
        controls.update(&mut cam);
        assert!(cam.eye.is_finite());
        assert!(cam.eye.y > 9.99);
    }

    #[test]
    fn pan_moves_target_and_eye_together() {
        let mut cam = camera_at(vec3(0.0, 0.0, 10.0));
        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.pan_by_pixels(100.0, 0.0, &cam, 500.0);
        controls.update(&mut cam);
        assert!(controls.target.x < 0.0);
        assert!((cam.distance() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn zoom_in_never_collapses_onto_target() {
        let mut cam = camera_at(vec3(0.0, 0.0, 10.0));
        let mut controls = OrbitControls::new(Vec3::ZERO);
        for _ in 0..50 {
            controls.zoom_steps(100.0);
            controls.update(&mut cam);
        }
        assert!(cam.distance() >= MIN_RADIUS * 0.999);
        assert!(cam.view().is_finite());

        controls.zoom_steps(-10.0);
        let before = cam.distance();
        controls.update(&mut cam);
        assert!(cam.distance() > before);
    }

    #[test]
    fn zoom_respects_distance_limits() {
        let mut cam = camera_at(vec3(0.0, 0.0, 10.0));
        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.min_distance = 2.0;
        controls.max_distance = 20.0;
        controls.zoom_steps(200.0);
        controls.update(&mut cam);
        assert!((cam.distance() - 2.0).abs() < 1e-4);
        controls.zoom_steps(-200.0);
        controls.update(&mut cam);
        assert!((cam.distance() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn pan_disabled_is_ignored() {
        let mut cam = camera_at(vec3(0.0, 0.0, 10.0));
        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.enable_pan = false;
        controls.pan_by_pixels(100.0, 50.0, &cam, 500.0);
        controls.update(&mut cam);
        assert_eq!(controls.target, Vec3::ZERO);
    }
}
