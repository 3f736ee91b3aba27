use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use cubescene_clock::FrameClock;
use cubescene_common::{ScenePreset, SceneConfig};
use cubescene_render::{FrameComposer, OverlayHandoff, OverlayStatus};
use cubescene_render_wgpu::{RendererOptions, ShaderSource, TextureImage, WgpuRenderer};
use cubescene_scene::SceneState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "cubescene-desktop", about = "Spinning cube scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML scene configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Object layout to start with
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,

    /// PNG or JPEG applied to every cube face
    #[arg(long)]
    texture: Option<PathBuf>,

    /// WGSL file replacing the built-in scene shader
    #[arg(long)]
    shader: Option<PathBuf>,

    /// Do not draw the FPS overlay
    #[arg(long)]
    no_overlay: bool,

    /// Window width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Window height in pixels
    #[arg(long)]
    height: Option<u32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum PresetArg {
    SpinningCube,
    TwoCubes,
}

impl From<PresetArg> for ScenePreset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::SpinningCube => ScenePreset::SpinningCube,
            PresetArg::TwoCubes => ScenePreset::TwoCubes,
        }
    }
}

impl Cli {
    /// Defaults, then the YAML file, then command-line overrides.
    fn scene_config(&self) -> Result<SceneConfig> {
        let mut config = match &self.config {
            Some(path) => SceneConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SceneConfig::default(),
        };
        if let Some(preset) = self.preset {
            config.preset = preset.into();
        }
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.no_overlay {
            config.overlay.enabled = false;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Widest text the overlay is expected to hold.
const OVERLAY_SAMPLE_TEXT: &str = "FPS: 00000";

/// Scene-side state: timing, animation and frame composition.
struct AppState {
    config: SceneConfig,
    clock: FrameClock,
    scene: SceneState,
    composer: FrameComposer,
    overlay: Option<OverlayHandoff>,
    skipped_overlays: u64,
}

impl AppState {
    fn new(config: SceneConfig) -> Result<Self> {
        let scene = SceneState::from_preset(config.preset, config.angular_rate);
        let composer = FrameComposer::new(&config)?;

        let overlay = config.overlay.enabled.then(|| {
            let image = composer.overlay_image_for(OVERLAY_SAMPLE_TEXT);
            OverlayHandoff::new(image, Duration::from_millis(config.overlay.sync_timeout_ms))
        });

        Ok(Self {
            config,
            clock: FrameClock::new(),
            scene,
            composer,
            overlay,
            skipped_overlays: 0,
        })
    }

    /// Clock tick then scene update; returns the overlay text for this frame.
    fn advance(&mut self) -> String {
        let tick = self.clock.tick();
        self.scene.update(tick.dt);
        format!("FPS: {}", tick.fps)
    }
}

/// Window and GPU objects, created on the first `resumed`.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
}

struct GpuApp {
    state: AppState,
    texture: Option<PathBuf>,
    shader: ShaderSource,
    gpu: Option<Gpu>,
    error: Option<anyhow::Error>,
}

impl GpuApp {
    fn new(config: SceneConfig, texture: Option<PathBuf>, shader: ShaderSource) -> Result<Self> {
        Ok(Self {
            state: AppState::new(config)?,
            texture,
            shader,
            gpu: None,
            error: None,
        })
    }

    fn init_gpu(&self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let window_config = &self.state.config.window;
        let attrs = Window::default_attributes()
            .with_title(window_config.title.clone())
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no compatible graphics adapter"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("cubescene_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

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
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let texture = match &self.texture {
            Some(path) => TextureImage::load(path)?,
            None => TextureImage::default(),
        };

        let renderer = WgpuRenderer::new(
            &device,
            &queue,
            RendererOptions {
                surface_format,
                width: config.width,
                height: config.height,
                max_objects: self.state.scene.object_count(),
                texture,
                shader: self.shader.clone(),
            },
        )?;

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Gpu {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn redraw(&mut self) -> Result<()> {
        let text = self.state.advance();

        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return Ok(());
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return Ok(());
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let report = {
            let mut frame = gpu.renderer.frame(&gpu.device, &gpu.queue, &view);
            let overlay = self.state.overlay.as_ref().map(|h| (h, text.as_str()));
            self.state
                .composer
                .draw_frame(&mut frame, &self.state.scene, overlay)?
        };

        if let OverlayStatus::Skipped { .. } = report.overlay {
            self.state.skipped_overlays += 1;
        }

        output.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        gpu.config.width = width.max(1);
        gpu.config.height = height.max(1);
        gpu.surface.configure(&gpu.device, &gpu.config);
        gpu.renderer
            .resize(&gpu.device, gpu.config.width, gpu.config.height);
        self.state
            .composer
            .camera_mut()
            .set_viewport(gpu.config.width, gpu.config.height);
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init_gpu(event_loop) {
            Ok(gpu) => {
                let size = gpu.window.inner_size();
                self.gpu = Some(gpu);
                self.resize(size.width, size.height);
                self.state.clock.start();
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.resize(new_size.width, new_size.height);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }
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
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("cubescene-desktop starting");

    let config = cli.scene_config()?;
    let shader = cli
        .shader
        .clone()
        .map(ShaderSource::File)
        .unwrap_or_default();

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(config, cli.texture.clone(), shader)?;
    event_loop.run_app(&mut app)?;

    tracing::info!(
        frames = app.state.scene.update_count(),
        skipped_overlays = app.state.skipped_overlays,
        "cubescene-desktop exiting"
    );

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
