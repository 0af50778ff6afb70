//! The animated star: a shader-lit sphere and a camera-facing halo that read
//! the same uniform block.

use glam::{Mat3, Mat4, Vec3};

use crate::camera::OrbitCamera;
use crate::frame::Animated;
use crate::mesh::Mesh;
use crate::palette::{parse_hex_color, Palette, Theme};
use crate::uniforms::{SharedUniforms, UniformBlock, UniformValue};

pub const TIME: &str = "time";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarSettings {
    pub theme: Theme,
    pub time_multiplier: f32,
    pub displacement: f32,
    pub clear_color: Vec3,
}

impl Default for StarSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Red,
            time_multiplier: 0.0005,
            displacement: 0.03,
            clear_color: parse_hex_color("#1a0107").unwrap_or(Vec3::ZERO),
        }
    }
}

/// Uniform block shared by the star sphere and halo, in shader slot order.
pub fn star_uniforms(palette: &Palette, settings: &StarSettings) -> UniformBlock {
    let [c1, c2, c3, c4] = palette.colors();
    UniformBlock::new()
        .with("sphere_radius", UniformValue::Float(1.0))
        .with("sphere_position", UniformValue::Vec3(Vec3::ZERO))
        .with(TIME, UniformValue::Float(0.0))
        .with(
            "time_multiplier",
            UniformValue::Float(settings.time_multiplier),
        )
        .with("color_step_1", UniformValue::Color(c1))
        .with("color_step_2", UniformValue::Color(c2))
        .with("color_step_3", UniformValue::Color(c3))
        .with("color_step_4", UniformValue::Color(c4))
        .with("ratio_step_1", UniformValue::Float(0.4))
        .with("ratio_step_2", UniformValue::Float(0.9))
        .with("displacement", UniformValue::Float(settings.displacement))
}

#[derive(Debug, Clone)]
pub struct StarScene {
    pub sphere: Mesh,
    pub halo: Mesh,
    pub settings: StarSettings,
    sphere_uniforms: SharedUniforms,
    halo_uniforms: SharedUniforms,
    halo_rotation: Mat4,
}

impl StarScene {
    pub fn new(settings: StarSettings) -> Self {
        let palette: &'static Palette = settings.theme.palette();
        let uniforms = SharedUniforms::new(star_uniforms(palette, &settings));
        log::info!("star scene using the {} palette", settings.theme.name());
        Self {
            sphere: Mesh::uv_sphere(1.0, 100, 100),
            halo: Mesh::plane(4.0, 4.0, 40, 40),
            settings,
            halo_uniforms: uniforms.clone(),
            sphere_uniforms: uniforms,
            halo_rotation: Mat4::IDENTITY,
        }
    }

    pub fn sphere_uniforms(&self) -> &SharedUniforms {
        &self.sphere_uniforms
    }

    pub fn halo_uniforms(&self) -> &SharedUniforms {
        &self.halo_uniforms
    }

    pub fn sphere_model(&self) -> Mat4 {
        Mat4::IDENTITY
    }

    pub fn halo_model(&self) -> Mat4 {
        self.halo_rotation
    }
}

impl Animated for StarScene {
    fn advance(&mut self, elapsed_ms: f64, camera: &OrbitCamera) {
        self.sphere_uniforms
            .set(TIME, UniformValue::Float(elapsed_ms as f32));
        self.halo_rotation = billboard_rotation(Vec3::ZERO, camera.position());
    }
}

/// Rotation turning an object's +Z axis at `position` toward `target`.
pub fn billboard_rotation(position: Vec3, target: Vec3) -> Mat4 {
    let z = (target - position).normalize_or_zero();
    if z == Vec3::ZERO {
        return Mat4::IDENTITY;
    }
    let up = if z.cross(Vec3::Y).length_squared() < 1e-10 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let x = up.cross(z).normalize();
    let y = z.cross(x);
    Mat4::from_mat3(Mat3::from_cols(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraSettings;

    #[test]
    fn sphere_and_halo_share_one_block() {
        let scene = StarScene::new(StarSettings::default());
        assert!(scene.sphere_uniforms().ptr_eq(scene.halo_uniforms()));
        scene
            .sphere_uniforms()
            .set("displacement", UniformValue::Float(0.1));
        assert_eq!(scene.halo_uniforms().float("displacement"), Some(0.1));
    }

    #[test]
    fn uniforms_follow_shader_slot_order() {
        let block = star_uniforms(Theme::Blue.palette(), &StarSettings::default());
        let names: Vec<&str> = block.names().collect();
        assert_eq!(
            names,
            vec![
                "sphere_radius",
                "sphere_position",
                "time",
                "time_multiplier",
                "color_step_1",
                "color_step_2",
                "color_step_3",
                "color_step_4",
                "ratio_step_1",
                "ratio_step_2",
                "displacement",
            ]
        );
        assert_eq!(
            block.get("color_step_2"),
            Some(UniformValue::Color(Vec3::new(0.0, 114.0 / 255.0, 1.0)))
        );
        assert_eq!(block.to_bytes().len(), 11 * UniformBlock::SLOT_SIZE);
    }

    #[test]
    fn halo_faces_the_camera_after_advance() {
        let mut scene = StarScene::new(StarSettings::default());
        let mut camera = OrbitCamera::new(CameraSettings::default(), 1.0);
        camera.ease_toward(Vec3::new(-4.0, 1.0, 0.0));
        scene.advance(250.0, &camera);

        let facing = scene.halo_model().transform_vector3(Vec3::Z);
        assert!(facing.distance(camera.position().normalize()) < 1e-5);
        assert_eq!(scene.sphere_uniforms().float(TIME), Some(250.0));
    }

    #[test]
    fn billboard_handles_targets_on_the_up_axis() {
        let rotation = billboard_rotation(Vec3::ZERO, Vec3::new(0.0, 5.0, 0.0));
        assert!(rotation.is_finite());
        assert!(rotation.transform_vector3(Vec3::Z).distance(Vec3::Y) < 1e-6);
    }

    #[test]
    fn star_meshes_match_their_builders() {
        let scene = StarScene::new(StarSettings::default());
        assert_eq!(scene.sphere.vertices.len(), 101 * 101);
        assert_eq!(scene.halo.vertices.len(), 41 * 41);
    }
}
