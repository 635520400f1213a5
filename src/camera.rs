//! Perspective look-at camera.

use glam::{Mat4, Vec3};

/// Right-handed perspective camera with cached view and projection matrices.
///
/// The matrices are recomputed only when [`Camera::update`] or
/// [`Camera::update_projection_matrix`] runs, so per-frame reads of
/// [`Camera::view_proj`] stay a single multiply.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Eye position in world space.
    pub eye: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Up direction.
    pub up: Vec3,
    /// Vertical field of view, radians.
    pub fovy: f32,
    /// Near clip distance.
    pub znear: f32,
    /// Far clip distance.
    pub zfar: f32,
    aspect: f32,
    view: Mat4,
    proj: Mat4,
}

impl Camera {
    /// A camera at `eye` looking at `target`, with a 45-degree vertical
    /// field of view and +Y up. Matrices start valid.
    pub fn new(eye: Vec3, target: Vec3) -> Self {
        let mut camera = Self {
            eye,
            target,
            up: Vec3::Y,
            fovy: std::f32::consts::FRAC_PI_4,
            znear: 0.1,
            zfar: 1000.0,
            aspect: 1.0,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
        };
        camera.update();
        camera.update_projection_matrix();
        camera
    }

    /// Recompute the view matrix from the current eye/target/up.
    pub fn update(&mut self) {
        self.view = Mat4::look_at_rh(self.eye, self.target, self.up);
    }

    /// Set the viewport aspect ratio and refresh the projection.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
            self.update_projection_matrix();
        }
    }

    /// Recompute the projection matrix from fovy/aspect/clip planes.
    pub fn update_projection_matrix(&mut self) {
        self.proj =
            Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar);
    }

    /// Combined view-projection matrix.
    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn target_projects_to_the_screen_center() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        camera.set_aspect_ratio(16.0 / 9.0);
        let clip = camera.view_proj() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-6);
        assert!(ndc.y.abs() < 1e-6);
    }

    #[test]
    fn moving_the_eye_requires_update() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let before = camera.view_proj();
        camera.eye = Vec3::new(0.0, 0.0, 10.0);
        assert_eq!(camera.view_proj(), before);
        camera.update();
        assert_ne!(camera.view_proj(), before);
    }

    #[test]
    fn degenerate_aspect_ratios_are_ignored() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        camera.set_aspect_ratio(2.0);
        let before = camera.view_proj();
        camera.set_aspect_ratio(0.0);
        camera.set_aspect_ratio(f32::NAN);
        assert_eq!(camera.view_proj(), before);
    }

    #[test]
    fn nearer_points_land_at_smaller_depth() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        camera.set_aspect_ratio(1.0);
        let depth = |z: f32| {
            let clip = camera.view_proj() * Vec4::new(0.0, 0.0, z, 1.0);
            clip.z / clip.w
        };
        assert!(depth(2.0) < depth(0.0));
    }
}
