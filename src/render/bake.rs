use bytemuck::{Pod, Zeroable};
use futures_intrusive::channel::shared::oneshot_channel;
use glam::{Mat4, Vec3};

use crate::bake::{flip_rows, BakedFace, FaceBaker, TextureHandle};
use crate::error::FxError;
use crate::mesh::{CubeFace, Mesh};
use crate::normal_map::HeightBuffer;
use crate::shaders::{ShaderLibrary, PLANET_TEXTURE};

use super::common::{mesh_pipeline, uniform_buffer, uniform_entry, MeshBuffers, PipelineOptions};

const FACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const CAMERA_Z: f32 = 10.0;
const QUAD_Z: f32 = -10.0;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct BakeUniform {
    view_proj: [[f32; 4]; 4],
    face: [i32; 4],
}

/// Orthographic camera at z = 10 framing a `resolution`-sized quad at z = -10.
fn face_view_proj(resolution: u32) -> Mat4 {
    let half = resolution as f32 / 2.0;
    let projection = Mat4::orthographic_rh(-half, half, -half, half, -100.0, 100.0);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, CAMERA_Z), Vec3::ZERO, Vec3::Y);
    projection * view * Mat4::from_translation(Vec3::new(0.0, 0.0, QUAD_Z))
}

fn align_row(bytes: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    bytes.div_ceil(align) * align
}

/// Rejects face sizes the device cannot allocate as a render target.
fn check_resolution(face: CubeFace, resolution: u32, max_dimension: u32) -> Result<(), FxError> {
    let reason = if resolution == 0 {
        "resolution must be positive".to_string()
    } else if resolution > max_dimension {
        format!("resolution {resolution} exceeds the device limit of {max_dimension}")
    } else {
        return Ok(());
    };
    Err(FxError::Readback {
        face: face.index(),
        reason,
    })
}

/// Bakes cube faces on the GPU with the `planet-texture` program. The colour
/// textures stay on the device for the planet materials.
pub struct GpuFaceBaker<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    textures: Vec<wgpu::Texture>,
}

impl<'a> GpuFaceBaker<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        shaders: &ShaderLibrary,
    ) -> Result<Self, FxError> {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(PLANET_TEXTURE),
            source: wgpu::ShaderSource::Wgsl(shaders.get(PLANET_TEXTURE)?.into()),
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bake-bind-layout"),
            entries: &[uniform_entry(0, std::mem::size_of::<BakeUniform>() as u64)],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bake-pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = mesh_pipeline(
            device,
            &pipeline_layout,
            &module,
            PipelineOptions {
                label: "bake-pipeline",
                format: FACE_FORMAT,
                depth: None,
                blend: None,
            },
        );
        Ok(Self {
            device,
            queue,
            layout,
            pipeline,
            textures: Vec::new(),
        })
    }

    /// Hands the baked colour textures over, indexed by [`TextureHandle`].
    pub fn into_textures(self) -> Vec<wgpu::Texture> {
        self.textures
    }

    async fn read_back(
        &self,
        face: CubeFace,
        texture: &wgpu::Texture,
        resolution: u32,
    ) -> Result<Vec<u8>, FxError> {
        let readback_error = |reason: String| FxError::Readback {
            face: face.index(),
            reason,
        };
        let tight_row = resolution * 4;
        let padded_row = align_row(tight_row);
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bake-readback"),
            size: padded_row as u64 * resolution as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("bake-readback-encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(resolution),
                },
            },
            texture.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .receive()
            .await
            .ok_or_else(|| readback_error("map callback dropped".to_string()))?
            .map_err(|err| readback_error(err.to_string()))?;

        let data = slice.get_mapped_range();
        let mut tight = Vec::with_capacity((tight_row * resolution) as usize);
        for row in data.chunks_exact(padded_row as usize) {
            tight.extend_from_slice(&row[..tight_row as usize]);
        }
        drop(data);
        staging.unmap();
        Ok(tight)
    }
}

impl FaceBaker for GpuFaceBaker<'_> {
    async fn bake_face(&mut self, face: CubeFace, resolution: u32) -> Result<BakedFace, FxError> {
        check_resolution(
            face,
            resolution,
            self.device.limits().max_texture_dimension_2d,
        )?;

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(face.label()),
            size: wgpu::Extent3d {
                width: resolution,
                height: resolution,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FACE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Quad, camera and uniforms only live for this bake.
        let quad = Mesh::plane(resolution as f32, resolution as f32, 1, 1);
        let quad = MeshBuffers::from_mesh(self.device, &quad, "bake-quad");
        let uniform = BakeUniform {
            view_proj: face_view_proj(resolution).to_cols_array_2d(),
            face: [face.index() as i32, 0, 0, 0],
        };
        let buffer = uniform_buffer(self.device, "bake-uniform", bytemuck::bytes_of(&uniform));
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bake-bind-group"),
            layout: &self.layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("bake-encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("bake-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, quad.vertex.slice(..));
            pass.draw(0..quad.vertex_count, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        let pixels = self.read_back(face, &texture, resolution).await?;
        // Render targets read back top row first; height buffers are bottom-up.
        let heights = HeightBuffer::new(resolution, resolution, flip_rows(&pixels, resolution))?;

        let handle = TextureHandle(self.textures.len());
        self.textures.push(texture);
        Ok(BakedFace {
            face,
            texture: handle,
            heights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_fills_the_orthographic_frame() {
        let view_proj = face_view_proj(1024);
        let corner = view_proj.project_point3(Vec3::new(512.0, 512.0, 0.0));
        assert!((corner.x - 1.0).abs() < 1e-5);
        assert!((corner.y - 1.0).abs() < 1e-5);
        assert!((0.0..=1.0).contains(&corner.z));
        let centre = view_proj.project_point3(Vec3::ZERO);
        assert!(centre.truncate().length() < 1e-6);
    }

    #[test]
    fn face_size_is_bounded_by_the_device() {
        let webgl2 = wgpu::Limits::downlevel_webgl2_defaults().max_texture_dimension_2d;
        assert!(check_resolution(CubeFace::PosX, 1024, webgl2).is_ok());
        assert!(check_resolution(CubeFace::PosX, webgl2, webgl2).is_ok());
        assert!(matches!(
            check_resolution(CubeFace::NegY, webgl2 + 1, webgl2),
            Err(FxError::Readback { face: 3, .. })
        ));
        assert!(matches!(
            check_resolution(CubeFace::PosZ, 0, webgl2),
            Err(FxError::Readback { face: 4, .. })
        ));
    }

    #[test]
    fn readback_rows_are_padded_to_copy_alignment() {
        assert_eq!(align_row(1024 * 4), 4096);
        assert_eq!(align_row(8 * 4), 256);
        assert_eq!(align_row(65 * 4), 512);
    }
}
