//! Pointer tracking and hit-testing.
//!
//! The pointer position recorded at the last click is turned into a
//! world-space ray each frame while the button is held, and slab-tested
//! against the cube's oriented bounding box.

use glam::{Mat4, Vec2, Vec3};

use crate::camera::CameraUniforms;

/// Press state plus the last recorded click position.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerState {
    pub down: bool,
    /// Last click position in normalized device coordinates, if any click
    /// has happened yet.
    pub ndc: Option<Vec2>,
}

impl PointerState {
    pub fn press(&mut self) {
        self.down = true;
    }

    pub fn release(&mut self) {
        self.down = false;
    }

    /// Record a cursor position in physical pixels.
    pub fn set_position(&mut self, x: f32, y: f32, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let ndc_x = (x / width as f32) * 2.0 - 1.0;
        let ndc_y = -((y / height as f32) * 2.0 - 1.0);
        self.ndc = Some(Vec2::new(ndc_x, ndc_y));
    }
}

/// A world-space ray with a normalized direction.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Build the world-space ray through a pointer position.
pub fn pointer_ray(ndc: Vec2, camera: &CameraUniforms) -> Ray {
    let inv = camera.inv_view_proj_mat4();
    let near = inv.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
    let far = inv.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
    Ray {
        origin: camera.position_vec3(),
        direction: (far - near).normalize(),
    }
}

/// Slab-test a ray against an oriented box.
///
/// `model` carries the box's rotation, scale and translation;
/// `half_extent` is the box's local half size. Returns the entry distance
/// along the ray, or `None` on a miss.
pub fn ray_hits_box(ray: &Ray, model: Mat4, half_extent: Vec3) -> Option<f32> {
    let inv_model = model.inverse();
    let origin = inv_model.transform_point3(ray.origin);
    let direction = inv_model.transform_vector3(ray.direction);

    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        let h = half_extent[axis];
        if d.abs() < 1e-8 {
            // Ray parallel to this slab; must already be inside it.
            if o.abs() > h {
                return None;
            }
        } else {
            let t1 = (-h - o) / d;
            let t2 = (h - o) / d;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
            if t_min > t_max {
                return None;
            }
        }
    }

    if t_max < 0.0 {
        // Box entirely behind the ray.
        return None;
    }
    Some(t_min.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitCamera;
    use crate::config::OrbitConfig;

    const HALF: Vec3 = Vec3::new(0.85, 0.85, 0.85);

    fn default_uniforms() -> CameraUniforms {
        OrbitCamera::new(OrbitConfig::default()).to_uniforms(16.0 / 9.0)
    }

    #[test]
    fn pixel_to_ndc_mapping() {
        let mut pointer = PointerState::default();
        pointer.set_position(400.0, 300.0, 800, 600);
        let ndc = pointer.ndc.unwrap();
        assert!(ndc.x.abs() < 1e-6);
        assert!(ndc.y.abs() < 1e-6);

        pointer.set_position(0.0, 0.0, 800, 600);
        let ndc = pointer.ndc.unwrap();
        assert_eq!(ndc, Vec2::new(-1.0, 1.0));
    }

    #[test]
    fn degenerate_window_keeps_last_position() {
        let mut pointer = PointerState::default();
        pointer.set_position(10.0, 10.0, 800, 600);
        let before = pointer.ndc;
        pointer.set_position(10.0, 10.0, 0, 0);
        assert_eq!(pointer.ndc, before);
    }

    #[test]
    fn center_ray_hits_cube() {
        let ray = pointer_ray(Vec2::ZERO, &default_uniforms());
        let hit = ray_hits_box(&ray, Mat4::IDENTITY, HALF);
        assert!(hit.is_some());
        // Camera sits 5 units out; the near face is at 0.85.
        let t = hit.unwrap();
        assert!((t - 4.15).abs() < 0.01, "entry distance {}", t);
    }

    #[test]
    fn corner_ray_misses_cube() {
        let ray = pointer_ray(Vec2::new(0.95, 0.95), &default_uniforms());
        assert!(ray_hits_box(&ray, Mat4::IDENTITY, HALF).is_none());
    }

    #[test]
    fn rotated_cube_is_still_hit_through_center() {
        let ray = pointer_ray(Vec2::ZERO, &default_uniforms());
        let model = Mat4::from_rotation_y(0.7) * Mat4::from_rotation_x(0.5);
        assert!(ray_hits_box(&ray, model, HALF).is_some());
    }

    #[test]
    fn scaling_widens_the_hit_volume() {
        let ray = Ray {
            origin: Vec3::new(2.0, 0.0, 5.0),
            direction: -Vec3::Z,
        };
        assert!(ray_hits_box(&ray, Mat4::IDENTITY, HALF).is_none());
        assert!(ray_hits_box(&ray, Mat4::from_scale(Vec3::splat(3.0)), HALF).is_some());
    }

    #[test]
    fn box_behind_ray_is_ignored() {
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::Z,
        };
        assert!(ray_hits_box(&ray, Mat4::IDENTITY, HALF).is_none());
    }
}
