use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use glam::Vec2;

use crate::app::{self, PlayOptions};
use crate::assets::AssetLoader;
use crate::camera::OrbitCamera;
use crate::config::AppConfig;
use crate::gpu::renderer::Renderer;
use crate::interaction::PointerState;
use crate::session::GameSession;

#[derive(Parser)]
#[command(author, version, about = "A clickable, scoreable, progressively glitchier cube", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive window
    Play {
        /// Window width in pixels
        #[arg(long, default_value_t = 1280)]
        width: u32,

        /// Window height in pixels
        #[arg(long, default_value_t = 720)]
        height: u32,

        /// Directory holding textures, hdr.hdr and minecraft.mp3
        #[arg(long, default_value = "assets")]
        assets: PathBuf,

        /// Optional JSON file overriding the default tunables
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seed the session RNG for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Skip the soundtrack
        #[arg(long)]
        mute: bool,
    },

    /// Render a scripted auto-clicking session to numbered PNG frames
    Render {
        /// Output directory for frames
        #[arg(long)]
        out: PathBuf,

        /// Number of frames to render
        #[arg(long, default_value_t = 600)]
        frames: usize,

        /// Frames per second
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// Output width
        #[arg(long, default_value_t = 800)]
        width: u32,

        /// Output height
        #[arg(long, default_value_t = 600)]
        height: u32,

        /// How often the scripted pointer clicks the cube
        #[arg(long, default_value_t = 4.0)]
        clicks_per_second: f32,

        /// Directory holding textures and hdr.hdr
        #[arg(long, default_value = "assets")]
        assets: PathBuf,

        /// Seed the session RNG for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            width,
            height,
            assets,
            config,
            seed,
            mute,
        } => {
            let config = match config {
                Some(path) => AppConfig::load(&path)?,
                None => AppConfig::default(),
            };
            app::run(PlayOptions {
                width,
                height,
                assets_dir: assets,
                config,
                seed,
                mute,
            })
        }
        Commands::Render {
            out,
            frames,
            fps,
            width,
            height,
            clicks_per_second,
            assets,
            seed,
        } => pollster::block_on(render_offline(
            out,
            frames,
            fps,
            width,
            height,
            clicks_per_second,
            assets,
            seed,
        )),
    }
}

/// Headless render of a scripted session: a pointer pressing the screen
/// center at a fixed cadence, so the progression ladder actually climbs.
#[allow(clippy::too_many_arguments)]
async fn render_offline(
    out_dir: PathBuf,
    frames: usize,
    fps: f32,
    width: u32,
    height: u32,
    clicks_per_second: f32,
    assets_dir: PathBuf,
    seed: Option<u64>,
) -> Result<()> {
    std::fs::create_dir_all(&out_dir)?;

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| anyhow::anyhow!("no GPU adapter found"))?;
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default(), None)
        .await?;

    let texture_desc = wgpu::TextureDescriptor {
        label: Some("Offline Target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    };
    let texture = device.create_texture(&texture_desc);
    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    // Readback rows must be 256-byte aligned.
    let bytes_per_pixel = 4u32;
    let unpadded_bytes_per_row = bytes_per_pixel * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
    let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let config = AppConfig::default();
    let cube_size = config.cube_size;
    let camera = OrbitCamera::new(config.orbit.clone());
    let mut session = GameSession::new(config, seed);
    let mut renderer = Renderer::new(device, queue, texture_desc.format, width, height, cube_size);
    let loader = AssetLoader::spawn(assets_dir);

    let dt = 1.0 / fps;
    // At least one released frame between presses, or the latch never
    // re-arms.
    let frames_per_click = ((fps / clicks_per_second) as usize).max(2);
    let aspect = width as f32 / height as f32;
    let camera_uniforms = camera.to_uniforms(aspect);

    log::info!("rendering {} frames to {}", frames, out_dir.display());

    for frame in 0..frames {
        renderer.apply_assets(loader.poll());

        // Scripted clicker: press through the screen center, hold one
        // frame, release; the latch re-arms between clicks.
        let pointer = PointerState {
            down: frame % frames_per_click == 0,
            ndc: Some(Vec2::ZERO),
        };
        let report = session.update(dt, &pointer, &camera_uniforms);
        if report.score_changed {
            renderer.set_score(session.score());
        }
        for effect in &report.unlocked {
            log::info!("frame {}: {} unlocked", frame, effect.label());
        }

        renderer.render(&texture_view, &session, &camera_uniforms, frame as f32 * dt);

        let mut encoder = renderer
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &readback_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            texture_desc.size,
        );
        renderer.queue().submit(Some(encoder.finish()));

        let buffer_slice = readback_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        renderer.device().poll(wgpu::Maintain::Wait);
        rx.recv()??;

        {
            let data = buffer_slice.get_mapped_range();
            let mut pixels = Vec::with_capacity((width * height * bytes_per_pixel) as usize);
            for row in 0..height {
                let start = (row * padded_bytes_per_row) as usize;
                pixels.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
            }
            let frame_path = out_dir.join(format!("frame_{:05}.png", frame));
            image::save_buffer(&frame_path, &pixels, width, height, image::ColorType::Rgba8)?;
        }
        readback_buffer.unmap();
    }

    log::info!("done; final score {}", session.score());
    Ok(())
}
