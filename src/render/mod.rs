//! wgpu renderers for the two effects. The same code drives WebGPU/WebGL2
//! in the browser and Vulkan/Metal/DX12 natively.

mod bake;
mod common;
mod context;
mod planet;
mod star;

pub use bake::GpuFaceBaker;
pub use context::GpuContext;
pub use planet::PlanetRenderer;
pub use star::StarRenderer;
