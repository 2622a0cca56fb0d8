//! GPU renderer.
//!
//! One forward pass (equirect background, cube, score display) into an
//! offscreen target, then the post-processing chain into the caller's
//! output view. Owns the device and queue; the windowed and offline
//! frontends both drive it the same way.

use bytemuck::{Pod, Zeroable};
use image::RgbaImage;

use crate::assets::{self, AssetEvent};
use crate::camera::CameraUniforms;
use crate::gpu::mesh::{self, GpuMesh, Vertex};
use crate::gpu::post_processor::{FrameContext, PostProcessor};
use crate::progression::Effect;
use crate::score_display::{self, PLANE_OFFSET, PLANE_SIZE};
use crate::session::{GameSession, TEXTURE_NAMES};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Dynamic uniform slot stride (WebGPU minimum offset alignment).
const UNIFORM_STRIDE: u64 = 256;

/// Slots: cube, score text, backing plane.
const SLOT_CUBE: u64 = 0;
const SLOT_TEXT: u64 = 1;
const SLOT_PLANE: u64 = 2;
const UNIFORM_SLOTS: u64 = 3;

/// Point light position, up and to the right of the cube.
const LIGHT_POS: [f32; 4] = [2.0, 2.5, 0.0, 1.0];

/// Score text color (0x25272F) and backing plane color (0xf0f0f0).
const TEXT_TINT: [f32; 4] = [0.145, 0.153, 0.184, 1.0];
const PLANE_TINT: [f32; 4] = [0.941, 0.941, 0.941, 1.0];

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct SceneUniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    light_pos: [f32; 4],
    camera_pos: [f32; 4],
    tint: [f32; 4],
    /// x = scroll, y = scroll enabled, z = use texture, w = unlit.
    params: [f32; 4],
    _padding: [f32; 16],
}

impl SceneUniforms {
    fn new(
        camera: &CameraUniforms,
        model: glam::Mat4,
        tint: [f32; 4],
        params: [f32; 4],
    ) -> Self {
        Self {
            view_proj: camera.view_proj,
            model: model.to_cols_array_2d(),
            light_pos: LIGHT_POS,
            camera_pos: camera.position,
            tint,
            params,
            _padding: [0.0; 16],
        }
    }
}

/// An uploaded texture plus its scene-pass bind group.
struct TextureBinding {
    bind_group: wgpu::BindGroup,
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    scene_pipeline: wgpu::RenderPipeline,
    background_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    nearest_sampler: wgpu::Sampler,
    linear_sampler: wgpu::Sampler,
    /// Block textures by index; `None` until the loader delivers one.
    block_textures: Vec<Option<TextureBinding>>,
    placeholder: TextureBinding,
    environment: TextureBinding,
    cube_mesh: GpuMesh,
    score_mesh: GpuMesh,
    plane_mesh: GpuMesh,
    depth_view: wgpu::TextureView,
    post: PostProcessor,
    width: u32,
    height: u32,
}

impl Renderer {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        cube_size: f32,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);

        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Block Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Uniform Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Texture Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniform Buffer"),
            size: UNIFORM_STRIDE * UNIFORM_SLOTS,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<SceneUniforms>() as u64),
                }),
            }],
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Scene pipeline.
        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_scene.wgsl").into()),
        });
        let scene_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Scene Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
                push_constant_ranges: &[],
            });
        let scene_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&scene_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &scene_shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &scene_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Background pipeline: fullscreen triangle at the far plane,
        // depth writes off.
        let background_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Background Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_background.wgsl").into()),
        });
        let background_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Background Pipeline Layout"),
                bind_group_layouts: &[&camera_bind_group_layout, &texture_bind_group_layout],
                push_constant_ranges: &[],
            });
        let background_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Background Pipeline"),
            layout: Some(&background_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &background_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &background_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let placeholder = upload_texture(
            &device,
            &queue,
            &texture_bind_group_layout,
            &nearest_sampler,
            "Placeholder Texture",
            &assets::placeholder_texture(),
        );
        let environment = upload_texture(
            &device,
            &queue,
            &texture_bind_group_layout,
            &linear_sampler,
            "Environment Placeholder",
            &assets::placeholder_environment(),
        );

        let (cube_vertices, cube_indices) = mesh::create_cube_geometry(cube_size);
        let cube_mesh = GpuMesh::upload(&device, "Cube", &cube_vertices, &cube_indices);

        let (text_vertices, text_indices) = score_display::build_score_mesh(0);
        let score_mesh = GpuMesh::upload(&device, "Score Text", &text_vertices, &text_indices);

        let (plane_vertices, plane_indices) =
            mesh::create_quad_geometry(PLANE_SIZE.0, PLANE_SIZE.1);
        let plane_mesh = GpuMesh::upload(&device, "Score Plane", &plane_vertices, &plane_indices);

        let depth_view = create_depth_view(&device, width, height);
        let post = PostProcessor::new(&device, format, width, height);

        log::info!("renderer ready at {}x{}", width, height);

        Self {
            device,
            queue,
            scene_pipeline,
            background_pipeline,
            uniform_buffer,
            uniform_bind_group,
            camera_buffer,
            camera_bind_group,
            texture_bind_group_layout,
            nearest_sampler,
            linear_sampler,
            block_textures: (0..TEXTURE_NAMES.len()).map(|_| None).collect(),
            placeholder,
            environment,
            cube_mesh,
            score_mesh,
            plane_mesh,
            depth_view,
            post,
            width,
            height,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.depth_view = create_depth_view(&self.device, width, height);
        self.post.resize(&self.device, width, height);
    }

    /// Swap placeholders for freshly loaded assets.
    pub fn apply_assets(&mut self, events: Vec<AssetEvent>) {
        for event in events {
            match event {
                AssetEvent::Texture { index, image } => {
                    log::info!("texture ready: {}", TEXTURE_NAMES[index]);
                    self.block_textures[index] = Some(upload_texture(
                        &self.device,
                        &self.queue,
                        &self.texture_bind_group_layout,
                        &self.nearest_sampler,
                        TEXTURE_NAMES[index],
                        &image,
                    ));
                }
                AssetEvent::Environment { image } => {
                    self.environment = upload_texture(
                        &self.device,
                        &self.queue,
                        &self.texture_bind_group_layout,
                        &self.linear_sampler,
                        "Environment",
                        &image,
                    );
                }
            }
        }
    }

    /// Rebuild the score text mesh. The previous buffers drop here.
    pub fn set_score(&mut self, score: u32) {
        let (vertices, indices) = score_display::build_score_mesh(score);
        self.score_mesh = GpuMesh::upload(&self.device, "Score Text", &vertices, &indices);
    }

    /// Draw one frame into `output_view`.
    pub fn render(
        &mut self,
        output_view: &wgpu::TextureView,
        session: &GameSession,
        camera: &CameraUniforms,
        time: f32,
    ) {
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[*camera]));

        let score_height = session.config().score_height;
        let scroll_params = [
            session.scroll(),
            if session.scroll_enabled() { 1.0 } else { 0.0 },
            1.0,
            0.0,
        ];
        let slots = [
            SceneUniforms::new(camera, session.model_matrix(), [1.0; 4], scroll_params),
            SceneUniforms::new(
                camera,
                glam::Mat4::from_translation(glam::Vec3::new(0.0, score_height, 0.0)),
                TEXT_TINT,
                [0.0, 0.0, 0.0, 0.0],
            ),
            SceneUniforms::new(
                camera,
                glam::Mat4::from_translation(glam::Vec3::new(0.0, score_height, PLANE_OFFSET)),
                PLANE_TINT,
                // Unlit backing plane.
                [0.0, 0.0, 0.0, 1.0],
            ),
        ];
        for (slot, uniforms) in slots.iter().enumerate() {
            self.queue.write_buffer(
                &self.uniform_buffer,
                slot as u64 * UNIFORM_STRIDE,
                bytemuck::cast_slice(&[*uniforms]),
            );
        }

        let cube_texture = self.block_textures[session.texture_index()]
            .as_ref()
            .unwrap_or(&self.placeholder);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.post.scene_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.background_pipeline);
            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            pass.set_bind_group(1, &self.environment.bind_group, &[]);
            pass.draw(0..3, 0..1);

            pass.set_pipeline(&self.scene_pipeline);

            let draws: [(&GpuMesh, u64, &TextureBinding); 3] = [
                (&self.cube_mesh, SLOT_CUBE, cube_texture),
                (&self.score_mesh, SLOT_TEXT, &self.placeholder),
                (&self.plane_mesh, SLOT_PLANE, &self.placeholder),
            ];
            for (mesh, slot, texture) in draws {
                pass.set_bind_group(
                    0,
                    &self.uniform_bind_group,
                    &[(slot * UNIFORM_STRIDE) as u32],
                );
                pass.set_bind_group(1, &texture.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..mesh.num_indices, 0, 0..1);
            }
        }

        let chain: Vec<Effect> = session.progression().active().collect();
        let ctx = FrameContext {
            time,
            width: self.width,
            height: self.height,
            near: 0.1,
            far: 1000.0,
        };
        self.post.process(
            &self.device,
            &mut encoder,
            &self.queue,
            output_view,
            &self.depth_view,
            &chain,
            &ctx,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    label: &str,
    image: &RgbaImage,
) -> TextureBinding {
    let size = wgpu::Extent3d {
        width: image.width(),
        height: image.height(),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width()),
            rows_per_image: Some(image.height()),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    TextureBinding { bind_group }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_uniforms_fill_one_slot() {
        assert_eq!(std::mem::size_of::<SceneUniforms>(), UNIFORM_STRIDE as usize);
    }
}
