use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::FxError;

pub const PLANET: &str = "planet";
pub const PLANET_TEXTURE: &str = "planet-texture";
pub const STAR_SPHERE: &str = "star-sphere";
pub const STAR_HALO: &str = "star-halo";

const PLANET_SOURCE: &str = include_str!("shaders/planet.wgsl");
const PLANET_TEXTURE_SOURCE: &str = concat!(
    include_str!("shaders/noise.wgsl"),
    include_str!("shaders/planet_texture.wgsl")
);
const STAR_SPHERE_SOURCE: &str = concat!(
    include_str!("shaders/noise.wgsl"),
    include_str!("shaders/star_common.wgsl"),
    include_str!("shaders/star_sphere.wgsl")
);
const STAR_HALO_SOURCE: &str = concat!(
    include_str!("shaders/noise.wgsl"),
    include_str!("shaders/star_common.wgsl"),
    include_str!("shaders/star_halo.wgsl")
);

/// WGSL programs addressed by logical name. Each program carries both its
/// `vs_main` and `fs_main` stages.
#[derive(Debug, Clone, Default)]
pub struct ShaderLibrary {
    sources: HashMap<String, Cow<'static, str>>,
}

impl ShaderLibrary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Library holding the programs compiled into the crate.
    pub fn builtin() -> Self {
        let mut library = Self::empty();
        library.insert(PLANET, PLANET_SOURCE);
        library.insert(PLANET_TEXTURE, PLANET_TEXTURE_SOURCE);
        library.insert(STAR_SPHERE, STAR_SPHERE_SOURCE);
        library.insert(STAR_HALO, STAR_HALO_SOURCE);
        library
    }

    /// Registers or replaces a program.
    pub fn insert(&mut self, name: &str, source: impl Into<Cow<'static, str>>) {
        self.sources.insert(name.to_string(), source.into());
    }

    pub fn get(&self, name: &str) -> Result<&str, FxError> {
        self.sources
            .get(name)
            .map(|source| source.as_ref())
            .ok_or_else(|| FxError::MissingShader(name.to_string()))
    }
}
