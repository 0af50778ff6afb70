use bytemuck::bytes_of;
use log::info;

use crate::camera::OrbitCamera;
use crate::error::FxError;
use crate::frame::{FrameRenderer, RenderSurface};
use crate::planet::{FaceMaterial, Planet, PlanetScene};
use crate::shaders::{ShaderLibrary, PLANET};

use super::common::{
    mesh_pipeline, uniform_buffer, uniform_entry, CameraUniform, DepthBuffer, MeshBuffers,
    PipelineOptions,
};
use super::context::GpuContext;

/// Size of the material block: one vec4 slot holding the light position.
const MATERIAL_UNIFORM_SIZE: u64 = 16;

struct MaterialBinding {
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Draws the planet mesh one material group at a time.
pub struct PlanetRenderer {
    context: GpuContext,
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    mesh: MeshBuffers,
    materials: Vec<MaterialBinding>,
    _textures: Vec<wgpu::Texture>,
}

impl PlanetRenderer {
    /// `textures` are the baked face textures, indexed by each material's
    /// [`crate::bake::TextureHandle`].
    pub fn new(
        context: GpuContext,
        shaders: &ShaderLibrary,
        planet: &Planet,
        textures: Vec<wgpu::Texture>,
    ) -> Result<Self, FxError> {
        let device = context.device();
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(PLANET),
            source: wgpu::ShaderSource::Wgsl(shaders.get(PLANET)?.into()),
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("planet-camera-layout"),
            entries: &[uniform_entry(0, std::mem::size_of::<CameraUniform>() as u64)],
        });
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("planet-material-layout"),
            entries: &[
                uniform_entry(0, MATERIAL_UNIFORM_SIZE),
                texture_entry(1),
                texture_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("planet-pipeline-layout"),
            bind_group_layouts: &[&camera_layout, &material_layout],
            push_constant_ranges: &[],
        });
        let pipeline = mesh_pipeline(
            device,
            &pipeline_layout,
            &module,
            PipelineOptions {
                label: "planet-pipeline",
                format: context.format(),
                depth: Some((DepthBuffer::FORMAT, true)),
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            },
        );

        let camera_buffer = uniform_buffer(
            device,
            "planet-camera",
            &[0; std::mem::size_of::<CameraUniform>()],
        );
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("planet-camera-bind-group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("planet-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let mut materials = Vec::with_capacity(planet.materials.len());
        for material in planet.materials.iter() {
            let map = textures.get(material.map.0).ok_or_else(|| {
                FxError::Context(format!(
                    "no baked texture for face {}",
                    material.face.label()
                ))
            })?;
            let map_view = map.create_view(&wgpu::TextureViewDescriptor::default());
            let normal_view = upload_normal_map(&context, material);
            let uniform = uniform_buffer(
                device,
                "planet-material",
                &material.uniforms().to_bytes(),
            );
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(material.face.label()),
                layout: &material_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&map_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&normal_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            });
            materials.push(MaterialBinding {
                uniform,
                bind_group,
            });
        }

        let mesh = MeshBuffers::from_mesh(device, &planet.mesh, "planet");
        info!(
            "planet renderer ready: {} vertices in {} groups",
            mesh.vertex_count,
            mesh.groups.len()
        );

        Ok(Self {
            context,
            pipeline,
            camera_buffer,
            camera_bind_group,
            mesh,
            materials,
            _textures: textures,
        })
    }
}

fn upload_normal_map(context: &GpuContext, material: &FaceMaterial) -> wgpu::TextureView {
    let map = &material.normal_map;
    let size = wgpu::Extent3d {
        width: map.width(),
        height: map.height(),
        depth_or_array_layers: 1,
    };
    let texture = context.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("planet-normal-map"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    context.queue().write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &map.to_rgba(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(map.width() * 4),
            rows_per_image: Some(map.height()),
        },
        size,
    );
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

impl RenderSurface for PlanetRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }
}

impl FrameRenderer<PlanetScene> for PlanetRenderer {
    fn render(&mut self, scene: &PlanetScene, camera: &OrbitCamera) -> Result<(), FxError> {
        let Some(frame) = self.context.acquire()? else {
            return Ok(());
        };
        let queue = self.context.queue();
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytes_of(&CameraUniform::from_camera(camera)),
        );
        // Materials read the live light every frame.
        for (material, binding) in scene.planet.materials.iter().zip(&self.materials) {
            queue.write_buffer(&binding.uniform, 0, &material.uniforms().to_bytes());
        }

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("planet-encoder"),
                });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("planet-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.context.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            pass.set_vertex_buffer(0, self.mesh.vertex.slice(..));
            for group in &self.mesh.groups {
                let Some(material) = self.materials.get(group.material_index) else {
                    continue;
                };
                pass.set_bind_group(1, &material.bind_group, &[]);
                pass.draw(group.start..group.start + group.count, 0..1);
            }
        }
        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
