//! Multi-pass bloom.
//!
//! threshold → downsampled blur (horizontal, then vertical) → additive
//! composite. The blur runs at reduced resolution to keep the kernel
//! cheap at large radii.

use wgpu::util::DeviceExt;

use crate::gpu::post_processor::{
    fullscreen_pipeline, texture_sampler_layout, EffectUniforms, QuadVertex, QUAD_VERTICES,
};

/// Blur resolution divisor.
const DOWNSAMPLE: u32 = 2;

/// Hard cap on the blur kernel radius.
pub const MAX_BLOOM_RADIUS: f32 = 32.0;

#[derive(Clone, Debug)]
pub struct BloomSettings {
    pub threshold: f32,
    pub intensity: f32,
    pub radius: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        // Hot on purpose: the glow should read as a reward.
        Self {
            threshold: 0.9,
            intensity: 4.0,
            radius: 20.0,
        }
    }
}

impl BloomSettings {
    fn sanitize(&self) -> Self {
        Self {
            threshold: self.threshold.max(0.0),
            intensity: self.intensity.max(0.0),
            radius: self.radius.clamp(0.0, MAX_BLOOM_RADIUS),
        }
    }
}

struct Stage {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct BloomProcessor {
    threshold_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    threshold_stage: Stage,
    blur_h_stage: Stage,
    blur_v_stage: Stage,
    composite_stage: Stage,
    /// Reduced-resolution ping-pong targets for the blur.
    half_views: [wgpu::TextureView; 2],
    sampler: wgpu::Sampler,
    quad_vertex_buffer: wgpu::Buffer,
    format: wgpu::TextureFormat,
}

impl BloomProcessor {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let texture_bind_group_layout = texture_sampler_layout(device, "Bloom Texture Layout");
        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Bloom Uniform Layout"),
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

        let make_stage = |label: &str| {
            let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("Bloom {} Uniforms", label)),
                size: std::mem::size_of::<EffectUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("Bloom {} Bind Group", label)),
                layout: &uniform_bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });
            Stage {
                uniform_buffer,
                bind_group,
            }
        };

        let threshold_stage = make_stage("Threshold");
        let blur_h_stage = make_stage("Blur H");
        let blur_v_stage = make_stage("Blur V");
        let composite_stage = make_stage("Composite");

        let single_input_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bloom Single Input Layout"),
            bind_group_layouts: &[&texture_bind_group_layout, &uniform_bind_group_layout],
            push_constant_ranges: &[],
        });
        // Composite reads the untouched frame plus the blurred highlights.
        let dual_input_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bloom Dual Input Layout"),
            bind_group_layouts: &[
                &texture_bind_group_layout,
                &uniform_bind_group_layout,
                &texture_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let threshold_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Threshold Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_bloom_threshold.wgsl").into()),
        });
        let blur_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Blur Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_bloom_blur.wgsl").into()),
        });
        let composite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_bloom_composite.wgsl").into()),
        });

        let threshold_pipeline =
            fullscreen_pipeline(device, "Bloom Threshold", &single_input_layout, &threshold_shader, format);
        let blur_pipeline =
            fullscreen_pipeline(device, "Bloom Blur", &single_input_layout, &blur_shader, format);
        let composite_pipeline =
            fullscreen_pipeline(device, "Bloom Composite", &dual_input_layout, &composite_shader, format);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bloom Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bloom Quad Buffer"),
            contents: bytemuck::cast_slice(QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let half_views = create_half_targets(device, format, width, height);

        Self {
            threshold_pipeline,
            blur_pipeline,
            composite_pipeline,
            texture_bind_group_layout,
            threshold_stage,
            blur_h_stage,
            blur_v_stage,
            composite_stage,
            half_views,
            sampler,
            quad_vertex_buffer,
            format,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.half_views = create_half_targets(device, self.format, width, height);
    }

    pub fn process(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        input_view: &wgpu::TextureView,
        output_view: &wgpu::TextureView,
        settings: &BloomSettings,
    ) {
        let settings = settings.sanitize();
        // Radius shrinks with the downsample so the visual size holds.
        let half_radius = (settings.radius / DOWNSAMPLE as f32).max(1.0);

        let write = |stage: &Stage, params: [f32; 4]| {
            queue.write_buffer(
                &stage.uniform_buffer,
                0,
                bytemuck::cast_slice(&[EffectUniforms {
                    params,
                    frame: [0.0; 4],
                }]),
            );
        };
        write(&self.threshold_stage, [settings.threshold, 0.1, 0.0, 0.0]);
        write(&self.blur_h_stage, [1.0, 0.0, half_radius, 0.0]);
        write(&self.blur_v_stage, [0.0, 1.0, half_radius, 0.0]);
        write(&self.composite_stage, [settings.intensity, 0.0, 0.0, 0.0]);

        // Bright extract into half-res A.
        self.run_pass(
            device,
            encoder,
            "Bloom Threshold",
            &self.threshold_pipeline,
            input_view,
            &self.half_views[0],
            &self.threshold_stage,
            None,
        );
        // Separable blur: A -> B -> A.
        self.run_pass(
            device,
            encoder,
            "Bloom Blur H",
            &self.blur_pipeline,
            &self.half_views[0],
            &self.half_views[1],
            &self.blur_h_stage,
            None,
        );
        self.run_pass(
            device,
            encoder,
            "Bloom Blur V",
            &self.blur_pipeline,
            &self.half_views[1],
            &self.half_views[0],
            &self.blur_v_stage,
            None,
        );
        // Composite the highlights over the untouched frame.
        self.run_pass(
            device,
            encoder,
            "Bloom Composite",
            &self.composite_pipeline,
            input_view,
            output_view,
            &self.composite_stage,
            Some(&self.half_views[0]),
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pass(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::RenderPipeline,
        input_view: &wgpu::TextureView,
        output_view: &wgpu::TextureView,
        stage: &Stage,
        extra_input: Option<&wgpu::TextureView>,
    ) {
        let input_bind_group = self.texture_bind_group(device, input_view);
        let extra_bind_group = extra_input.map(|view| self.texture_bind_group(device, view));

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
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
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &input_bind_group, &[]);
        pass.set_bind_group(1, &stage.bind_group, &[]);
        if let Some(extra) = &extra_bind_group {
            pass.set_bind_group(2, extra, &[]);
        }
        pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
        pass.draw(0..6, 0..1);
    }

    fn texture_bind_group(&self, device: &wgpu::Device, view: &wgpu::TextureView) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Input Bind Group"),
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
}

fn create_half_targets(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> [wgpu::TextureView; 2] {
    let size = wgpu::Extent3d {
        width: (width / DOWNSAMPLE).max(1),
        height: (height / DOWNSAMPLE).max(1),
        depth_or_array_layers: 1,
    };
    let create = |label: &str| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    };
    [create("Bloom Half A"), create("Bloom Half B")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_radius_and_negatives() {
        let settings = BloomSettings {
            threshold: -1.0,
            intensity: -2.0,
            radius: 500.0,
        };
        let clean = settings.sanitize();
        assert_eq!(clean.threshold, 0.0);
        assert_eq!(clean.intensity, 0.0);
        assert_eq!(clean.radius, MAX_BLOOM_RADIUS);
    }

    #[test]
    fn defaults_are_the_expected_tuning() {
        let settings = BloomSettings::default();
        assert_eq!(settings.intensity, 4.0);
        assert_eq!(settings.threshold, 0.9);
        assert_eq!(settings.radius, 20.0);
    }
}
