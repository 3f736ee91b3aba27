use cubescene_common::CameraConfig;
use glam::{Mat4, Vec3};

/// Fixed camera: view and projection are computed once and held.
///
/// Left-handed look-at with a `[0, 1]` depth-range perspective.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    view: Mat4,
    projection: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 800.0 / 600.0)
    }
}

impl Camera {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self {
            eye: config.eye,
            target: config.target,
            up: config.up,
            fov_y: config.fov_y,
            aspect,
            near: config.near,
            far: config.far,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.rebuild();
        camera
    }

    /// Update the aspect ratio for a new viewport size.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.view = Mat4::look_at_lh(self.eye, self.target, self.up);
        self.projection = Mat4::perspective_lh(self.fov_y, self.aspect, self.near, self.far);
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// World-view-projection for one object: `world × view × projection` in
    /// row-vector order.
    pub fn compose(&self, world: Mat4) -> Mat4 {
        self.projection * self.view * world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;
    use std::f32::consts::PI;

    #[test]
    fn default_projection_matches_perspective_formula() {
        let cam = Camera::default();
        let p = cam.projection_matrix();
        let fov = 0.4 * PI;
        let y_scale = 1.0 / (fov / 2.0).tan();
        let x_scale = y_scale / (800.0 / 600.0);
        assert!((p.col(0).x - x_scale).abs() < 1e-5);
        assert!((p.col(1).y - y_scale).abs() < 1e-5);
    }

    #[test]
    fn target_lands_on_screen_centre() {
        let cam = Camera::default();
        let clip = cam.view_projection() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn near_and_far_map_to_depth_range() {
        let cam = Camera::default();
        let forward = (cam.target - cam.eye).normalize();
        let near = cam.view_projection() * (cam.eye + forward * cam.near).extend(1.0);
        let far = cam.view_projection() * (cam.eye + forward * cam.far).extend(1.0);
        assert!((near.z / near.w).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn compose_is_projection_view_world() {
        let cam = Camera::default();
        let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let expected = cam.projection_matrix() * cam.view_matrix() * world;
        assert!(cam.compose(world).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn viewport_change_updates_aspect() {
        let mut cam = Camera::default();
        cam.set_viewport(1000, 500);
        assert_eq!(cam.aspect, 2.0);
        let y_scale = cam.projection_matrix().col(1).y;
        assert!((cam.projection_matrix().col(0).x - y_scale / 2.0).abs() < 1e-6);
    }
}
