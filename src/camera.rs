use std::f32::consts::PI;

use glam::{Mat4, Vec3};

use crate::interaction::MouseState;

/// Fraction of the remaining distance covered each tick.
pub const DEFAULT_EASING: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Initial distance along +Z.
    pub distance: f32,
    pub easing: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: 55.0,
            near: 0.1,
            far: 100_000.0,
            distance: 10.0,
            easing: DEFAULT_EASING,
        }
    }
}

/// Perspective camera orbiting the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    settings: CameraSettings,
    position: Vec3,
    aspect: f32,
    projection: Mat4,
}

impl OrbitCamera {
    pub fn new(settings: CameraSettings, aspect: f32) -> Self {
        let mut camera = Self {
            settings,
            position: Vec3::new(0.0, 0.0, settings.distance),
            aspect: 1.0,
            projection: Mat4::IDENTITY,
        };
        camera.set_aspect(aspect);
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Updates the aspect ratio and rebuilds the projection.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        self.projection = Mat4::perspective_rh(
            self.settings.fov.to_radians(),
            self.aspect,
            self.settings.near,
            self.settings.far,
        );
    }

    /// Moves a fixed fraction of the way toward `target`.
    pub fn ease_toward(&mut self, target: Vec3) {
        self.position += (target - self.position) * self.settings.easing;
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// View matrix looking at the origin.
    pub fn view(&self) -> Mat4 {
        let forward = (-self.position).normalize_or_zero();
        let up = if forward.cross(Vec3::Y).length_squared() < 1e-10 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Mat4::look_at_rh(self.position, Vec3::ZERO, up)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view()
    }
}

/// Orbit position implied by the accumulated drag offset and wheel distance.
pub fn orbit_target(mouse: &MouseState) -> Vec3 {
    let phi = -mouse.offset.y * PI;
    let theta = -mouse.offset.x * PI;
    let radius = mouse.wheel / 100.0 + 1.0;
    Vec3::new(
        -radius * phi.cos() * theta.cos(),
        radius * phi.sin(),
        radius * phi.cos() * theta.sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn resting_mouse_targets_negative_x() {
        let target = orbit_target(&MouseState::default());
        assert!(target.distance(Vec3::new(-4.0, 0.0, 0.0)) < 1e-5);
    }

    #[test]
    fn vertical_offset_lifts_camera() {
        let mouse = MouseState {
            offset: Vec2::new(0.0, -0.25),
            ..MouseState::default()
        };
        let target = orbit_target(&mouse);
        assert!(target.y > 0.0);
        assert!((target.length() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn easing_shrinks_error_by_three_quarters() {
        let mut camera = OrbitCamera::new(CameraSettings::default(), 1.5);
        let target = Vec3::new(-4.0, 1.0, 2.0);
        let mut error = camera.position().distance(target);
        for _ in 0..30 {
            camera.ease_toward(target);
            let next = camera.position().distance(target);
            assert!((next / error - 0.75).abs() < 1e-3);
            error = next;
        }
        assert!(error < 1e-2);
    }

    #[test]
    fn aspect_updates_are_idempotent() {
        let mut camera = OrbitCamera::new(CameraSettings::default(), 1.0);
        camera.set_aspect(16.0 / 9.0);
        let first = camera.projection();
        camera.set_aspect(16.0 / 9.0);
        assert_eq!(first, camera.projection());
        camera.set_aspect(0.0);
        assert_eq!(camera.aspect(), 1.0);
    }

    #[test]
    fn view_is_finite_above_the_pole() {
        let mut camera = OrbitCamera::new(CameraSettings::default(), 1.0);
        for _ in 0..200 {
            camera.ease_toward(Vec3::new(0.0, 4.0, 0.0));
        }
        assert!(camera.view().is_finite());
    }
}
