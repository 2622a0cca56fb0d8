//! Orbit camera.
//!
//! Left-drag orbits around the origin, the wheel zooms, and motion is
//! smoothed with exponential damping. While a drag is in progress the
//! camera reports it so the session can pause the cube's idle spin.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::config::OrbitConfig;

/// Pitch is kept this far off the poles to avoid a degenerate up vector.
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.05;

/// Evaluated camera matrices, ready for GPU upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// Inverse of `view_proj`; used for unprojecting pointer rays and for
    /// the equirectangular background lookup.
    pub inv_view_proj: [[f32; 4]; 4],
    /// Camera position in world space (vec4, w unused).
    pub position: [f32; 4],
}

impl CameraUniforms {
    pub fn position_vec3(&self) -> Vec3 {
        Vec3::new(self.position[0], self.position[1], self.position[2])
    }

    pub fn view_proj_mat4(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view_proj)
    }

    pub fn inv_view_proj_mat4(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.inv_view_proj)
    }
}

pub struct OrbitCamera {
    yaw: f32,
    pitch: f32,
    distance: f32,
    target_yaw: f32,
    target_pitch: f32,
    target_distance: f32,
    dragging: bool,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    config: OrbitConfig,
}

impl OrbitCamera {
    pub fn new(config: OrbitConfig) -> Self {
        // Start straight down +Z at 5 units, mid-way through the zoom range.
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 5.0,
            target_yaw: 0.0,
            target_pitch: 0.0,
            target_distance: 5.0,
            dragging: false,
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            config,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Apply a drag delta in pixels.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        self.target_yaw -= dx * self.config.drag_sensitivity;
        self.target_pitch = (self.target_pitch + dy * self.config.drag_sensitivity)
            .clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Apply a zoom step in scroll lines (positive zooms in).
    pub fn zoom(&mut self, lines: f32) {
        self.target_distance = (self.target_distance - lines * self.config.zoom_sensitivity)
            .clamp(self.config.min_distance, self.config.max_distance);
    }

    /// Damped approach toward the drag/zoom targets.
    pub fn update(&mut self, dt: f32) {
        // dampingFactor is a per-frame lerp at 60 fps; make it rate-independent.
        let t = 1.0 - (1.0 - self.config.damping).powf(dt * 60.0);
        self.yaw += (self.target_yaw - self.yaw) * t;
        self.pitch += (self.target_pitch - self.pitch) * t;
        self.distance += (self.target_distance - self.distance) * t;
    }

    pub fn position(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(
            self.distance * sin_yaw * cos_pitch,
            self.distance * sin_pitch,
            self.distance * cos_yaw * cos_pitch,
        )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), aspect, self.near, self.far)
    }

    pub fn to_uniforms(&self, aspect: f32) -> CameraUniforms {
        let view_proj = self.projection_matrix(aspect) * self.view_matrix();
        let position = self.position();
        CameraUniforms {
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            position: [position.x, position.y, position.z, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(OrbitConfig::default())
    }

    #[test]
    fn uniform_size() {
        // Two mat4s plus a vec4; must stay 16-byte aligned for the GPU.
        assert_eq!(std::mem::size_of::<CameraUniforms>(), 144);
    }

    #[test]
    fn starts_on_positive_z() {
        let position = camera().position();
        assert!((position.z - 5.0).abs() < 1e-5);
        assert!(position.x.abs() < 1e-5);
        assert!(position.y.abs() < 1e-5);
    }

    #[test]
    fn origin_is_in_front_of_camera() {
        let camera = camera();
        let view = camera.view_matrix();
        let origin_in_view = view.transform_point3(Vec3::ZERO);
        assert!(origin_in_view.z < 0.0);
    }

    #[test]
    fn zoom_respects_distance_limits() {
        let mut camera = camera();
        for _ in 0..100 {
            camera.zoom(5.0);
        }
        camera.update(10.0);
        assert!(camera.distance >= camera.config.min_distance - 1e-4);

        for _ in 0..100 {
            camera.zoom(-5.0);
        }
        camera.update(10.0);
        assert!(camera.distance <= camera.config.max_distance + 1e-4);
    }

    #[test]
    fn pitch_never_reaches_the_poles() {
        let mut camera = camera();
        camera.drag(0.0, 1.0e6);
        camera.update(10.0);
        assert!(camera.pitch.abs() < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn damping_converges_on_target() {
        let mut camera = camera();
        camera.drag(100.0, 0.0);
        for _ in 0..240 {
            camera.update(1.0 / 60.0);
        }
        assert!((camera.yaw - camera.target_yaw).abs() < 1e-3);
    }
}
