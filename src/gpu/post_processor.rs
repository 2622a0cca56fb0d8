//! GPU post-processing chain.
//!
//! Renders the scene into an offscreen target, then ping-pongs it through
//! whatever passes the progression has unlocked, finishing on the output
//! view. With an empty chain the scene is blitted straight through.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::gpu::bloom_processor::{BloomProcessor, BloomSettings};
use crate::progression::Effect;

/// Vertex for fullscreen quad rendering.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Two triangles covering NDC.
pub const QUAD_VERTICES: &[QuadVertex] = &[
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [1.0, -1.0], uv: [1.0, 1.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [-1.0, 1.0], uv: [0.0, 0.0] },
];

/// Uniform block shared by every post shader: an effect-specific `params`
/// vec4 plus a per-frame vec4 (what it carries is documented per shader).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct EffectUniforms {
    pub params: [f32; 4],
    pub frame: [f32; 4],
}

/// Per-frame values the passes can consume.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    pub time: f32,
    pub width: u32,
    pub height: u32,
    pub near: f32,
    pub far: f32,
}

struct PassResources {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    /// Bokeh additionally binds the scene depth buffer.
    wants_depth: bool,
}

pub struct PostProcessor {
    /// Ping-pong render targets between passes.
    intermediate_views: [wgpu::TextureView; 2],
    /// The scene renders here before any pass runs.
    scene_view: wgpu::TextureView,
    passes: HashMap<Effect, PassResources>,
    quad_vertex_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    uniform_bind_group_layout: wgpu::BindGroupLayout,
    depth_bind_group_layout: wgpu::BindGroupLayout,
    blit_pipeline: wgpu::RenderPipeline,
    bloom: BloomProcessor,
    bloom_settings: BloomSettings,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
}

impl PostProcessor {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);

        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fullscreen Quad Buffer"),
            contents: bytemuck::cast_slice(QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Post Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let texture_bind_group_layout = texture_sampler_layout(device, "Post Texture Layout");

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Post Uniform Layout"),
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

        let depth_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Post Depth Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                }],
            });

        let (intermediate_views, scene_view) = create_targets(device, format, width, height);

        // Blit pipeline for the empty-chain case.
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_post_blit.wgsl").into()),
        });
        let blit_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&texture_bind_group_layout],
            push_constant_ranges: &[],
        });
        let blit_pipeline = fullscreen_pipeline(device, "Blit", &blit_layout, &blit_shader, format);

        let bloom = BloomProcessor::new(device, format, width, height);

        let mut processor = Self {
            intermediate_views,
            scene_view,
            passes: HashMap::new(),
            quad_vertex_buffer,
            sampler,
            texture_bind_group_layout,
            uniform_bind_group_layout,
            depth_bind_group_layout,
            blit_pipeline,
            bloom,
            bloom_settings: BloomSettings::default(),
            width,
            height,
            format,
        };

        for effect in Effect::ALL {
            if effect.is_pass() && effect != Effect::Bloom {
                processor.create_pass(device, effect);
            }
        }

        processor
    }

    fn create_pass(&mut self, device: &wgpu::Device, effect: Effect) {
        let (source, wants_depth) = match effect {
            Effect::Vignette => (include_str!("shader_post_vignette.wgsl"), false),
            Effect::Glitch => (include_str!("shader_post_glitch.wgsl"), false),
            Effect::Film => (include_str!("shader_post_film.wgsl"), false),
            Effect::DotScreen => (include_str!("shader_post_dot_screen.wgsl"), false),
            Effect::Halftone => (include_str!("shader_post_halftone.wgsl"), false),
            Effect::Bokeh => (include_str!("shader_post_bokeh.wgsl"), true),
            // Bloom runs through its own multi-pass processor; Rainbow is
            // not a pass at all.
            Effect::Bloom | Effect::Rainbow => return,
        };

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("Pass Shader: {}", effect.label())),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let mut layouts: Vec<&wgpu::BindGroupLayout> =
            vec![&self.texture_bind_group_layout, &self.uniform_bind_group_layout];
        if wants_depth {
            layouts.push(&self.depth_bind_group_layout);
        }
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("Pass Pipeline Layout: {}", effect.label())),
            bind_group_layouts: &layouts,
            push_constant_ranges: &[],
        });

        let pipeline = fullscreen_pipeline(
            device,
            effect.label(),
            &pipeline_layout,
            &shader,
            self.format,
        );

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("Pass Uniforms: {}", effect.label())),
            size: std::mem::size_of::<EffectUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Pass Uniform Bind Group: {}", effect.label())),
            layout: &self.uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        self.passes.insert(
            effect,
            PassResources {
                pipeline,
                uniform_buffer,
                uniform_bind_group,
                wants_depth,
            },
        );
    }

    /// Render the scene into this view before calling [`process`].
    pub fn scene_view(&self) -> &wgpu::TextureView {
        &self.scene_view
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width.max(1);
        self.height = height.max(1);
        let (views, scene_view) = create_targets(device, self.format, self.width, self.height);
        self.intermediate_views = views;
        self.scene_view = scene_view;
        self.bloom.resize(device, self.width, self.height);
    }

    /// Built-in tuning for each pass.
    fn pass_uniforms(&self, effect: Effect, ctx: &FrameContext) -> EffectUniforms {
        let frame = [ctx.time, ctx.width as f32, ctx.height as f32, 0.0];
        match effect {
            Effect::Vignette => EffectUniforms { params: [1.0, 1.5, 0.0, 0.0], frame },
            Effect::Glitch => EffectUniforms { params: [0.3, 0.0, 0.0, 0.0], frame },
            Effect::Film => EffectUniforms {
                params: [0.35, 0.25, ctx.height as f32, 0.0],
                frame,
            },
            Effect::DotScreen => EffectUniforms { params: [0.5, 1.57, 0.0, 0.0], frame },
            Effect::Halftone => EffectUniforms { params: [100.0, 0.0, 0.0, 0.0], frame },
            // Bokeh reads near/far from the frame vec4.
            Effect::Bokeh => EffectUniforms {
                params: [8.0, 0.005, 0.018, 0.0],
                frame: [ctx.time, ctx.near, ctx.far, 0.0],
            },
            Effect::Bloom | Effect::Rainbow => EffectUniforms::default(),
        }
    }

    /// Run the active chain from the scene target into `output_view`.
    ///
    /// `chain` is the unlocked pass list in activation order; `depth_view`
    /// is the scene depth buffer, consumed by the bokeh pass.
    pub fn process(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        output_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        chain: &[Effect],
        ctx: &FrameContext,
    ) {
        let chain: Vec<Effect> = chain.iter().copied().filter(|e| e.is_pass()).collect();

        if chain.is_empty() {
            let bind_group = self.input_bind_group(device, &self.scene_view);
            self.blit(encoder, output_view, &bind_group);
            return;
        }

        let mut input_view = &self.scene_view;
        let mut ping = 0usize;

        for (i, effect) in chain.iter().enumerate() {
            let is_last = i == chain.len() - 1;
            let target = if is_last {
                output_view
            } else {
                &self.intermediate_views[ping]
            };

            if *effect == Effect::Bloom {
                self.bloom
                    .process(device, encoder, queue, input_view, target, &self.bloom_settings);
            } else {
                let resources = match self.passes.get(effect) {
                    Some(r) => r,
                    None => {
                        log::warn!("no pass resources for {}", effect.label());
                        continue;
                    }
                };
                queue.write_buffer(
                    &resources.uniform_buffer,
                    0,
                    bytemuck::cast_slice(&[self.pass_uniforms(*effect, ctx)]),
                );

                let texture_bind_group = self.input_bind_group(device, input_view);
                let depth_bind_group = resources.wants_depth.then(|| {
                    device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("Pass Depth Bind Group"),
                        layout: &self.depth_bind_group_layout,
                        entries: &[wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(depth_view),
                        }],
                    })
                });

                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(&format!("Pass: {}", effect.label())),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target,
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
                pass.set_pipeline(&resources.pipeline);
                pass.set_bind_group(0, &texture_bind_group, &[]);
                pass.set_bind_group(1, &resources.uniform_bind_group, &[]);
                if let Some(depth_bind_group) = &depth_bind_group {
                    pass.set_bind_group(2, depth_bind_group, &[]);
                }
                pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
                pass.draw(0..6, 0..1);
            }

            if !is_last {
                input_view = &self.intermediate_views[ping];
                ping = 1 - ping;
            }
        }
    }

    fn input_bind_group(&self, device: &wgpu::Device, view: &wgpu::TextureView) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Post Input Bind Group"),
            layout: &self.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    fn blit(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Blit Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
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
        pass.set_pipeline(&self.blit_pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
        pass.draw(0..6, 0..1);
    }
}

/// Texture + sampler bind group layout shared by the fullscreen passes.
pub fn texture_sampler_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
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
    })
}

/// Fullscreen-quad render pipeline over the shared `QuadVertex` layout.
pub fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{} Pipeline", label)),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[QuadVertex::desc()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
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
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_targets(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> ([wgpu::TextureView; 2], wgpu::TextureView) {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let create = |label: &str| {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
    };

    let view_a = create("Post Target A").create_view(&wgpu::TextureViewDescriptor::default());
    let view_b = create("Post Target B").create_view(&wgpu::TextureViewDescriptor::default());
    let scene_view = create("Scene Target").create_view(&wgpu::TextureViewDescriptor::default());
    ([view_a, view_b], scene_view)
}
