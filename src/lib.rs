//! Decorative header effects for a website: a procedurally textured planet
//! and an animated star with a mouse-driven orbit camera.
//!
//! Scene state, baking, normal-map generation and the frame driver are plain
//! Rust and run headless, so they can be tested without a GPU. The
//! [`render`] module draws them with wgpu and the `web` module wires them to
//! a page.

pub mod bake;
pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod host;
pub mod interaction;
pub mod mesh;
pub mod normal_map;
pub mod palette;
pub mod planet;
pub mod procedural;
pub mod render;
pub mod shaders;
pub mod star;
pub mod uniforms;
pub mod viewport;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use bake::{bake_all_faces, BakedFace, FaceBaker, SoftwareFaceBaker, TextureHandle};
pub use camera::{CameraSettings, OrbitCamera};
pub use config::{Config, Mode};
pub use error::FxError;
pub use frame::{Animated, FrameDriver, FrameOutcome, FrameRenderer, RenderSurface};
pub use interaction::{Interaction, MouseState, WheelDelta, ZoomMode};
pub use mesh::{CubeFace, Mesh};
pub use normal_map::{height_to_normal_map, HeightBuffer, NormalMap};
pub use palette::{Palette, Theme};
pub use planet::{LightHandle, Planet, PlanetScene, PlanetSettings};
pub use shaders::ShaderLibrary;
pub use star::{StarScene, StarSettings};
pub use uniforms::{SharedUniforms, UniformBlock, UniformValue};
pub use viewport::{SharedViewport, StaticViewport, ViewportProvider};
