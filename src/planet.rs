//! Planet assembly: the cube-sphere mesh dressed with six baked face
//! materials lit by a movable sun light.

use std::f32::consts::TAU;
use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;

use crate::bake::{bake_all_faces, BakedFace, FaceBaker, TextureHandle, DEFAULT_RESOLUTION};
use crate::camera::OrbitCamera;
use crate::error::FxError;
use crate::frame::Animated;
use crate::mesh::{CubeFace, Mesh};
use crate::normal_map::{height_to_normal_map, NormalMap};
use crate::uniforms::{UniformBlock, UniformValue};

/// Live position of a light. Materials keep a clone and read it every frame,
/// so moving the light moves the shading of everything bound to it.
#[derive(Debug, Clone)]
pub struct LightHandle {
    position: Arc<RwLock<Vec3>>,
}

impl LightHandle {
    pub fn new(position: Vec3) -> Self {
        Self {
            position: Arc::new(RwLock::new(position)),
        }
    }

    pub fn position(&self) -> Vec3 {
        *self.position.read()
    }

    pub fn set_position(&self, position: Vec3) {
        *self.position.write() = position;
    }
}

/// Where the sun light starts its orbit.
pub const SUN_POSITION: Vec3 = Vec3::new(8.0, 3.0, 6.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanetSettings {
    pub resolution: u32,
    pub segments: u32,
    pub radius: f32,
    pub bump_intensity: f32,
    /// Sun orbit speed in radians per millisecond.
    pub light_orbit_speed: f32,
}

impl Default for PlanetSettings {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            segments: 64,
            radius: 2.0,
            bump_intensity: 2.0,
            light_orbit_speed: 0.000_05,
        }
    }
}

/// Material for one cube face: colour texture, derived normal map and the
/// shared light.
#[derive(Debug, Clone)]
pub struct FaceMaterial {
    pub face: CubeFace,
    pub map: TextureHandle,
    pub normal_map: NormalMap,
    pub transparent: bool,
    light: LightHandle,
}

impl FaceMaterial {
    pub fn point_light_position(&self) -> Vec3 {
        self.light.position()
    }

    /// Per-frame uniforms, with the light read at call time.
    pub fn uniforms(&self) -> UniformBlock {
        UniformBlock::new().with(
            "point_light_position",
            UniformValue::Vec3(self.point_light_position()),
        )
    }
}

/// Materials indexed by the mesh's face groups.
#[derive(Debug, Clone)]
pub struct MultiMaterial {
    materials: Vec<FaceMaterial>,
}

impl MultiMaterial {
    /// Derives a normal map from each face's height buffer and binds it with
    /// the face texture and the light. Height buffers are consumed.
    pub fn assemble(faces: Vec<BakedFace>, light: &LightHandle, intensity: f32) -> Self {
        let materials = faces
            .into_iter()
            .map(|baked| FaceMaterial {
                face: baked.face,
                map: baked.texture,
                normal_map: height_to_normal_map(&baked.heights, intensity),
                transparent: true,
                light: light.clone(),
            })
            .collect();
        Self { materials }
    }

    pub fn get(&self, material_index: usize) -> Option<&FaceMaterial> {
        self.materials.get(material_index)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FaceMaterial> {
        self.materials.iter()
    }
}

#[derive(Debug, Clone)]
pub struct Planet {
    pub mesh: Mesh,
    pub materials: MultiMaterial,
}

impl Planet {
    /// Builds the mesh, bakes the six faces and assembles their materials.
    pub async fn generate<B: FaceBaker>(
        baker: &mut B,
        light: &LightHandle,
        settings: &PlanetSettings,
    ) -> Result<Self, FxError> {
        let mesh = Mesh::cube_sphere(settings.segments, settings.radius);
        let faces = bake_all_faces(baker, settings.resolution).await?;
        let materials = MultiMaterial::assemble(faces, light, settings.bump_intensity);
        log::info!(
            "planet ready: {} vertices, {} materials at {}px",
            mesh.vertices.len(),
            materials.len(),
            settings.resolution
        );
        Ok(Self { mesh, materials })
    }
}

/// Planet plus a sun light slowly circling it.
#[derive(Debug, Clone)]
pub struct PlanetScene {
    pub planet: Planet,
    pub light: LightHandle,
    orbit_speed: f32,
    light_origin: Vec3,
}

impl PlanetScene {
    pub fn new(planet: Planet, light: LightHandle, orbit_speed: f32) -> Self {
        let light_origin = light.position();
        Self {
            planet,
            light,
            orbit_speed,
            light_origin,
        }
    }
}

impl Animated for PlanetScene {
    fn advance(&mut self, elapsed_ms: f64, _camera: &OrbitCamera) {
        let angle = (elapsed_ms as f32 * self.orbit_speed) % TAU;
        let (sin, cos) = angle.sin_cos();
        let origin = self.light_origin;
        self.light.set_position(Vec3::new(
            origin.x * cos - origin.z * sin,
            origin.y,
            origin.x * sin + origin.z * cos,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bake::SoftwareFaceBaker;
    use crate::camera::CameraSettings;
    use once_cell::sync::Lazy;

    const SETTINGS: PlanetSettings = PlanetSettings {
        resolution: 32,
        segments: 8,
        radius: 2.0,
        bump_intensity: 2.0,
        light_orbit_speed: 0.001,
    };

    static PLANET: Lazy<Planet> = Lazy::new(|| {
        let mut baker = SoftwareFaceBaker::new();
        let light = LightHandle::new(Vec3::new(5.0, 0.0, 0.0));
        pollster::block_on(Planet::generate(&mut baker, &light, &SETTINGS)).unwrap()
    });

    #[test]
    fn one_material_per_cube_face() {
        assert_eq!(PLANET.materials.len(), 6);
        for (index, material) in PLANET.materials.iter().enumerate() {
            assert_eq!(material.face.index(), index);
            assert_eq!(material.map, TextureHandle(index));
            assert_eq!(material.normal_map.width(), 32);
            assert_eq!(material.normal_map.as_bytes().len(), 32 * 32 * 3);
        }
    }

    #[test]
    fn every_mesh_group_has_a_material() {
        for group in PLANET.mesh.groups() {
            assert!(PLANET.materials.get(group.material_index).is_some());
        }
    }

    #[test]
    fn materials_track_the_live_light() {
        let light = LightHandle::new(Vec3::X);
        let materials = MultiMaterial::assemble(PLANET_FACES.clone(), &light, 1.0);
        light.set_position(Vec3::new(0.0, 3.0, 0.0));
        for material in materials.iter() {
            assert_eq!(material.point_light_position(), Vec3::new(0.0, 3.0, 0.0));
            assert_eq!(
                material.uniforms().get("point_light_position"),
                Some(UniformValue::Vec3(Vec3::new(0.0, 3.0, 0.0)))
            );
        }
    }

    static PLANET_FACES: Lazy<Vec<BakedFace>> = Lazy::new(|| {
        let mut baker = SoftwareFaceBaker::new();
        pollster::block_on(bake_all_faces(&mut baker, 4)).unwrap()
    });

    #[test]
    fn scene_orbits_light_at_constant_distance() {
        let light = LightHandle::new(Vec3::new(6.0, 2.0, 0.0));
        let mut scene = PlanetScene::new(PLANET.clone(), light.clone(), 0.001);
        let camera = OrbitCamera::new(CameraSettings::default(), 1.0);
        scene.advance(1000.0, &camera);
        let moved = light.position();
        assert!((moved.y - 2.0).abs() < 1e-6);
        assert!((Vec3::new(moved.x, 0.0, moved.z).length() - 6.0).abs() < 1e-4);
        assert!(moved.distance(Vec3::new(6.0, 2.0, 0.0)) > 1.0);
    }
}
