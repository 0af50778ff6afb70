use bytemuck::bytes_of;

use crate::camera::OrbitCamera;
use crate::error::FxError;
use crate::frame::{FrameRenderer, RenderSurface};
use crate::shaders::{ShaderLibrary, STAR_HALO, STAR_SPHERE};
use crate::star::StarScene;

use super::common::{
    clear_color, mesh_pipeline, uniform_buffer, uniform_entry, CameraUniform, DepthBuffer,
    MeshBuffers, ObjectUniform, PipelineOptions,
};
use super::context::GpuContext;

struct DrawItem {
    mesh: MeshBuffers,
    pipeline: wgpu::RenderPipeline,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
}

/// Draws the star sphere, then the blended halo over it. Both read one star
/// uniform buffer.
pub struct StarRenderer {
    context: GpuContext,
    camera_buffer: wgpu::Buffer,
    star_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    sphere: DrawItem,
    halo: DrawItem,
}

impl StarRenderer {
    pub fn new(
        context: GpuContext,
        shaders: &ShaderLibrary,
        scene: &StarScene,
    ) -> Result<Self, FxError> {
        let device = context.device();
        let star_bytes = scene.sphere_uniforms().to_bytes();

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("star-scene-layout"),
            entries: &[
                uniform_entry(0, std::mem::size_of::<CameraUniform>() as u64),
                uniform_entry(1, star_bytes.len() as u64),
            ],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("star-object-layout"),
            entries: &[uniform_entry(0, std::mem::size_of::<ObjectUniform>() as u64)],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("star-pipeline-layout"),
            bind_group_layouts: &[&scene_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let camera_buffer = uniform_buffer(
            device,
            "star-camera",
            &[0; std::mem::size_of::<CameraUniform>()],
        );
        let star_buffer = uniform_buffer(device, "star-uniforms", &star_bytes);
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("star-scene-bind-group"),
            layout: &scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: star_buffer.as_entire_binding(),
                },
            ],
        });

        let item = |name: &str,
                    mesh: &crate::mesh::Mesh,
                    model: glam::Mat4,
                    depth_write: bool,
                    blend: Option<wgpu::BlendState>|
         -> Result<DrawItem, FxError> {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(name),
                source: wgpu::ShaderSource::Wgsl(shaders.get(name)?.into()),
            });
            let pipeline = mesh_pipeline(
                device,
                &pipeline_layout,
                &module,
                PipelineOptions {
                    label: name,
                    format: context.format(),
                    depth: Some((DepthBuffer::FORMAT, depth_write)),
                    blend,
                },
            );
            let object_buffer = uniform_buffer(device, name, bytes_of(&ObjectUniform::new(model)));
            let object_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(name),
                layout: &object_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: object_buffer.as_entire_binding(),
                }],
            });
            Ok(DrawItem {
                mesh: MeshBuffers::from_mesh(device, mesh, name),
                pipeline,
                object_buffer,
                object_bind_group,
            })
        };
        let sphere = item(STAR_SPHERE, &scene.sphere, scene.sphere_model(), true, None)?;
        let halo = item(
            STAR_HALO,
            &scene.halo,
            scene.halo_model(),
            false,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        )?;

        Ok(Self {
            context,
            camera_buffer,
            star_buffer,
            scene_bind_group,
            sphere,
            halo,
        })
    }
}

impl RenderSurface for StarRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }
}

impl FrameRenderer<StarScene> for StarRenderer {
    fn render(&mut self, scene: &StarScene, camera: &OrbitCamera) -> Result<(), FxError> {
        let Some(frame) = self.context.acquire()? else {
            return Ok(());
        };
        let queue = self.context.queue();
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytes_of(&CameraUniform::from_camera(camera)),
        );
        queue.write_buffer(&self.star_buffer, 0, &scene.sphere_uniforms().to_bytes());
        queue.write_buffer(
            &self.sphere.object_buffer,
            0,
            bytes_of(&ObjectUniform::new(scene.sphere_model())),
        );
        queue.write_buffer(
            &self.halo.object_buffer,
            0,
            bytes_of(&ObjectUniform::new(scene.halo_model())),
        );

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("star-encoder"),
                });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("star-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(scene.settings.clear_color)),
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
            pass.set_bind_group(0, &self.scene_bind_group, &[]);
            for item in [&self.sphere, &self.halo] {
                pass.set_pipeline(&item.pipeline);
                pass.set_bind_group(1, &item.object_bind_group, &[]);
                pass.set_vertex_buffer(0, item.mesh.vertex.slice(..));
                pass.draw(0..item.mesh.vertex_count, 0..1);
            }
        }
        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}
