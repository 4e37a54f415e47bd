use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use egui::Context as EguiContext;
use meadow_common::SceneConfig;
use meadow_input::{Action, Pointer};
use meadow_render_wgpu::{FrameStats, WgpuRenderer};
use meadow_scene::{AssetChange, SceneContext};
use meadow_tools::{SceneInspector, SceneSummary};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

/// Pixel-delta scroll distance counted as one wheel notch.
const PIXELS_PER_NOTCH: f64 = 50.0;

#[derive(Parser)]
#[command(name = "meadow-desktop", about = "Interactive grass field")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene config (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the grass placement seed
    #[arg(long)]
    seed: Option<u64>,
}

/// Window, device, and everything drawn into the surface.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(event_loop: &ActiveEventLoop, scene: &SceneConfig) -> Result<Self> {
        let window_config = &scene.window;
        let attrs = Window::default_attributes()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no suitable GPU adapter"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("meadow_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| anyhow!("surface reports no formats"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if window_config.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let supported = adapter
            .get_texture_format_features(surface_format)
            .flags
            .sample_count_supported(window_config.msaa_samples);
        let sample_count = if supported {
            window_config.msaa_samples
        } else {
            tracing::warn!(
                requested = window_config.msaa_samples,
                "multisampling unsupported for surface format; disabling"
            );
            1
        };

        let renderer = WgpuRenderer::new(
            &device,
            &queue,
            surface_format,
            (config.width, config.height),
            sample_count,
            &scene.ground,
        );

        let egui_winit = egui_winit::State::new(
            EguiContext::default(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.renderer
            .resize(&self.device, self.config.width, self.config.height);
    }

    fn apply_asset(&mut self, change: &AssetChange) {
        match change {
            AssetChange::GrassMesh(mesh) => self.renderer.set_grass_mesh(&self.device, mesh),
            AssetChange::FollowerMesh(mesh) => {
                self.renderer.set_follower_mesh(&self.device, mesh)
            }
            AssetChange::FloorTexture(texture) => {
                self.renderer
                    .set_floor_texture(&self.device, &self.queue, texture)
            }
            AssetChange::Background(texture) => {
                self.renderer
                    .set_background(&self.device, &self.queue, texture)
            }
            AssetChange::Ambient(_) | AssetChange::DebugTexture(_) => {}
        }
    }
}

/// Application state.
struct App {
    scene: SceneContext,
    pointer: Pointer,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
    last_frame: Instant,
    fps: f32,
    last_stats: FrameStats,
}

impl App {
    fn new(scene: SceneContext) -> Self {
        let window = &scene.config().window;
        let pointer = Pointer::new(window.width, window.height);
        Self {
            scene,
            pointer,
            gpu: None,
            egui_ctx: EguiContext::default(),
            last_frame: Instant::now(),
            fps: 0.0,
            last_stats: FrameStats::default(),
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;
        if dt > 0.0 {
            self.fps = self.fps * 0.9 + (1.0 / dt) * 0.1;
        }

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        for change in self.scene.poll_assets() {
            gpu.apply_asset(&change);
        }
        self.scene.frame(dt);

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let scene = self.scene.render_scene();
        let render_view = self.scene.render_view();
        self.last_stats = gpu
            .renderer
            .render(&gpu.device, &gpu.queue, &view, &scene, &render_view);

        if self.scene.overlay_visible() {
            let summary = SceneInspector::summary(&self.scene);
            let (fps, stats) = (self.fps, self.last_stats);
            let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
            let full_output = self.egui_ctx.run(raw_input, |ctx| {
                draw_hud(ctx, &summary, fps, stats);
            });
            gpu.egui_winit
                .handle_platform_output(&gpu.window, full_output.platform_output);

            let paint_jobs = self
                .egui_ctx
                .tessellate(full_output.shapes, full_output.pixels_per_point);
            let screen_descriptor = egui_wgpu::ScreenDescriptor {
                size_in_pixels: [gpu.config.width, gpu.config.height],
                pixels_per_point: full_output.pixels_per_point,
            };

            for (id, image_delta) in &full_output.textures_delta.set {
                gpu.egui_renderer
                    .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
            }
            let mut encoder = gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("egui_encoder"),
                });
            gpu.egui_renderer.update_buffers(
                &gpu.device,
                &gpu.queue,
                &mut encoder,
                &paint_jobs,
                &screen_descriptor,
            );
            {
                let mut pass = encoder
                    .begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("egui_pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    })
                    .forget_lifetime();
                gpu.egui_renderer
                    .render(&mut pass, &paint_jobs, &screen_descriptor);
            }
            gpu.queue.submit(std::iter::once(encoder.finish()));
            for id in &full_output.textures_delta.free {
                gpu.egui_renderer.free_texture(id);
            }
        }

        output.present();
        gpu.window.request_redraw();
    }
}

fn draw_hud(ctx: &EguiContext, summary: &SceneSummary, fps: f32, stats: FrameStats) {
    egui::SidePanel::left("inspector")
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.heading("Meadow");
            ui.separator();
            ui.label(format!("FPS: {fps:.0}"));
            ui.label(format!("Tick: {}  Frame: {}", summary.tick, summary.frame));
            ui.label(format!("Elapsed: {:.1}s", summary.elapsed));
            ui.separator();

            ui.heading("Grass");
            if summary.grass_built {
                ui.label(format!(
                    "Blades: {} / {}",
                    summary.instance_count, summary.instance_capacity
                ));
                ui.label(format!("Revision: {}", summary.revision));
                ui.label(format!("Shader time: {:.2}", summary.grass_time));
                ui.label(format!(
                    "Drawn: {}  Uploads: {}",
                    stats.grass_drawn, stats.instance_uploads
                ));
            } else {
                ui.label("Waiting for blade mesh");
            }
            ui.separator();

            ui.heading("Player");
            let p = summary.player_position;
            ui.label(format!("Position: ({:.2}, {:.2}, {:.2})", p[0], p[1], p[2]));
            match summary.tracking_target {
                Some(t) => ui.label(format!("Target: ({:.2}, {:.2}, {:.2})", t[0], t[1], t[2])),
                None => ui.label("Target: off the ground"),
            };
            ui.separator();

            ui.label(format!(
                "Assets: {} loaded, {} pending",
                summary.assets_loaded, summary.assets_in_flight
            ));
            ui.separator();
            ui.small("F1: Toggle HUD | Drag: Orbit | Wheel: Zoom | Esc: Quit");
        });
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match Gpu::new(event_loop, self.scene.config()) {
            Ok(gpu) => {
                let size = gpu.window.inner_size();
                self.scene.apply(self.pointer.resize(size.width, size.height));
                self.egui_ctx = gpu.egui_winit.egui_ctx().clone();
                self.gpu = Some(gpu);
                self.last_frame = Instant::now();
            }
            Err(e) => {
                tracing::error!("failed to initialize GPU: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = self.gpu.as_mut() {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
                self.scene
                    .apply(self.pointer.resize(new_size.width, new_size.height));
            }
            WindowEvent::CursorMoved { position, .. } => {
                let (point, orbit) = self.pointer.moved(position.x as f32, position.y as f32);
                self.scene.apply(point);
                if let Some(orbit) = orbit {
                    self.scene.apply(orbit);
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => match state {
                ElementState::Pressed => self.scene.apply(self.pointer.pressed()),
                ElementState::Released => self.pointer.released(),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_NOTCH) as f32,
                };
                self.scene.apply(Action::Zoom(notches));
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match key {
                KeyCode::F1 => self.scene.apply(Action::ToggleOverlay),
                KeyCode::Escape => event_loop.exit(),
                _ => {}
            },
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    tracing::info!("meadow-desktop starting");

    let mut config = match &cli.config {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.grass.seed = seed;
    }

    let mut scene = SceneContext::new(config)?;
    scene.start_loading()?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(scene);
    event_loop.run_app(&mut app)?;

    Ok(())
}
