//! Interactive frontend: window, surface and the per-frame drive.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::assets::AssetLoader;
use crate::audio::Soundtrack;
use crate::camera::OrbitCamera;
use crate::config::AppConfig;
use crate::gpu::renderer::Renderer;
use crate::interaction::PointerState;
use crate::session::GameSession;

pub struct PlayOptions {
    pub width: u32,
    pub height: u32,
    pub assets_dir: PathBuf,
    pub config: AppConfig,
    pub seed: Option<u64>,
    pub mute: bool,
}

struct App {
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    renderer: Renderer,
    session: GameSession,
    camera: OrbitCamera,
    pointer: PointerState,
    soundtrack: Soundtrack,
    loader: AssetLoader,
    mute: bool,
    cursor: PhysicalPosition<f64>,
    started: Instant,
    last_frame: Instant,
}

impl App {
    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            log::warn!("ignoring degenerate resize {}x{}", size.width, size.height);
            return;
        }
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface
            .configure(self.renderer.device(), &self.surface_config);
        self.renderer.resize(size.width, size.height);
    }

    fn aspect(&self) -> f32 {
        self.surface_config.width as f32 / self.surface_config.height.max(1) as f32
    }

    fn press(&mut self) {
        self.pointer.set_position(
            self.cursor.x as f32,
            self.cursor.y as f32,
            self.surface_config.width,
            self.surface_config.height,
        );
        self.pointer.press();
        // Any press also grabs the orbit controls.
        self.camera.begin_drag();
        self.session.set_dragging(true);
    }

    fn release(&mut self) {
        self.pointer.release();
        self.camera.end_drag();
        self.session.set_dragging(false);
    }

    fn cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        if self.camera.is_dragging() {
            let dx = (position.x - self.cursor.x) as f32;
            let dy = (position.y - self.cursor.y) as f32;
            self.camera.drag(dx, dy);
        }
        self.cursor = position;
    }

    fn frame(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;

        self.renderer.apply_assets(self.loader.poll());

        self.camera.update(dt);
        let camera_uniforms = self.camera.to_uniforms(self.aspect());

        let report = self.session.update(dt, &self.pointer, &camera_uniforms);
        for effect in &report.unlocked {
            log::info!("score {}: {} unlocked", self.session.score(), effect.label());
        }
        if report.score_changed {
            self.renderer.set_score(self.session.score());
        }
        if report.start_audio && !self.mute {
            self.soundtrack.ensure_started();
        }

        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface
                    .configure(self.renderer.device(), &self.surface_config);
                return;
            }
            Err(e) => {
                log::error!("surface error: {}", e);
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let time = (now - self.started).as_secs_f32();
        self.renderer
            .render(&view, &self.session, &camera_uniforms, time);
        output.present();
    }
}

pub fn run(options: PlayOptions) -> Result<()> {
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("cubeclick")
            .with_inner_size(PhysicalSize::new(options.width, options.height))
            .build(&event_loop)?,
    );

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let surface = instance.create_surface(window.clone())?;

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: Some(&surface),
        force_fallback_adapter: false,
    }))
    .ok_or_else(|| anyhow!("no compatible GPU adapter found"))?;
    log::info!("adapter: {}", adapter.get_info().name);

    let (device, queue) = pollster::block_on(
        adapter.request_device(&wgpu::DeviceDescriptor::default(), None),
    )?;

    let size = window.inner_size();
    let capabilities = surface.get_capabilities(&adapter);
    let format = capabilities
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .unwrap_or(capabilities.formats[0]);
    let surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode: capabilities.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &surface_config);

    let cube_size = options.config.cube_size;
    let renderer = Renderer::new(
        device,
        queue,
        format,
        surface_config.width,
        surface_config.height,
        cube_size,
    );

    let camera = OrbitCamera::new(options.config.orbit.clone());
    let session = GameSession::new(options.config, options.seed);
    let loader = AssetLoader::spawn(options.assets_dir.clone());
    let soundtrack = Soundtrack::new(options.assets_dir.join("minecraft.mp3"));

    let now = Instant::now();
    let mut app = App {
        surface,
        surface_config,
        renderer,
        session,
        camera,
        pointer: PointerState::default(),
        soundtrack,
        loader,
        mute: options.mute,
        cursor: PhysicalPosition::new(0.0, 0.0),
        started: now,
        last_frame: now,
    };

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => elwt.exit(),
            WindowEvent::Resized(size) => app.resize(size),
            WindowEvent::CursorMoved { position, .. } => app.cursor_moved(position),
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => match state {
                ElementState::Pressed => app.press(),
                ElementState::Released => app.release(),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
                app.camera.zoom(lines);
            }
            WindowEvent::RedrawRequested => app.frame(),
            _ => {}
        },
        Event::AboutToWait => window.request_redraw(),
        _ => {}
    })?;

    Ok(())
}
