use anyhow::{Context, Result};
use clap::Parser;
use egui::Context as EguiContext;
use glam::Vec2;
use glint_environment::{EnvironmentLoader, PrefilterConfig};
use glint_render_wgpu::{FrameInput, WgpuRenderer};
use glint_settings::ViewerSettings;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::window::{Window, WindowId};

mod panel;
mod state;

use state::Viewer;

#[derive(Parser)]
#[command(name = "glint", about = "Drag-and-drop glTF viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Settings file, read at startup and written by Ctrl+S
    #[arg(long, default_value = "glint-settings.yaml")]
    settings: PathBuf,

    /// Extra directory searched for environment images
    #[arg(long = "asset-dir")]
    asset_dirs: Vec<PathBuf>,

    /// Model to open at startup
    model: Option<PathBuf>,
}

/// Window and GPU handles, created on the first `resumed`.
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

struct GpuApp {
    viewer: Viewer,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
    modifiers: ModifiersState,
    dragging: bool,
    last_frame: Instant,
}

impl GpuApp {
    fn new(viewer: Viewer) -> Self {
        Self {
            viewer,
            gpu: None,
            egui_ctx: EguiContext::default(),
            modifiers: ModifiersState::empty(),
            dragging: false,
            last_frame: Instant::now(),
        }
    }

    fn init_gpu(&self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let attrs = Window::default_attributes()
            .with_title("Glint")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
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
        .context("no compatible GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("glint_device"),
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
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = WgpuRenderer::new(&device, &queue, surface_format, config.width, config.height);

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
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

        Ok(Gpu {
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

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;
        self.viewer.frame(dt);

        let Some(gpu) = &mut self.gpu else {
            return;
        };

        if let Some(map) = self.viewer.take_shadow_update() {
            gpu.renderer.set_shadow_map(&gpu.device, &gpu.queue, map);
        }

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

        let environment = self.viewer.environment();
        gpu.renderer.render(
            &gpu.device,
            &gpu.queue,
            &view,
            &FrameInput {
                scene: self.viewer.scene(),
                camera: &self.viewer.camera,
                environment: &environment,
                pose: self.viewer.pose(),
                rings: Some(self.viewer.rings()),
            },
        );

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let viewer = &mut self.viewer;
        let full_output = self.egui_ctx.run(raw_input, |ctx| panel::draw(viewer, ctx));
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

        output.present();
        gpu.window.request_redraw();
    }
}

/// Binding name for a physical key: letters drop their `Key` prefix.
fn key_name(code: KeyCode) -> String {
    let name = format!("{code:?}");
    match name.strip_prefix("Key") {
        Some(letter) => letter.to_string(),
        None => name,
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
                self.viewer
                    .camera
                    .set_aspect(size.width as f32 / size.height.max(1) as f32);
                self.gpu = Some(gpu);
            }
            Err(e) => {
                tracing::error!("failed to initialize graphics: {e:#}");
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
        if let Some(gpu) = &mut self.gpu {
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
                if let Some(gpu) = &mut self.gpu {
                    gpu.config.width = new_size.width.max(1);
                    gpu.config.height = new_size.height.max(1);
                    gpu.surface.configure(&gpu.device, &gpu.config);
                    gpu.renderer
                        .resize(&gpu.device, gpu.config.width, gpu.config.height);
                    self.viewer
                        .camera
                        .set_aspect(gpu.config.width as f32 / gpu.config.height as f32);
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        repeat,
                        ..
                    },
                ..
            } => {
                let pressed = key_state == ElementState::Pressed;
                if pressed && repeat {
                    return;
                }
                self.viewer
                    .handle_key(&key_name(key), self.modifiers.control_key(), pressed);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state: btn_state,
                ..
            } => {
                self.dragging = btn_state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 50.0,
                };
                self.viewer.scroll(steps);
            }
            WindowEvent::HoveredFile(_) => {
                self.viewer.hovering_file = true;
            }
            WindowEvent::HoveredFileCancelled => {
                self.viewer.hovering_file = false;
            }
            WindowEvent::DroppedFile(path) => {
                self.viewer.hovering_file = false;
                // Failures are shown in the drop zone.
                let _ = self.viewer.open_model(&path);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if !self.dragging {
                return;
            }
            let height = self
                .gpu
                .as_ref()
                .map_or(720.0, |g| g.config.height as f32);
            self.viewer
                .drag(Vec2::new(delta.0 as f32, delta.1 as f32), height);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn load_settings(path: &Path) -> ViewerSettings {
    if !path.exists() {
        return ViewerSettings::default();
    }
    match ViewerSettings::load(path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("ignoring {}: {e}", path.display());
            ViewerSettings::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    tracing::info!("glint starting");

    let settings = load_settings(&cli.settings);
    let loader = EnvironmentLoader::new(cli.asset_dirs, PrefilterConfig::default());
    let mut viewer = Viewer::new(settings, cli.settings, loader);
    if let Some(model) = &cli.model {
        viewer
            .open_model(model)
            .with_context(|| format!("opening {}", model.display()))?;
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(viewer);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_match_bindings() {
        assert_eq!(key_name(KeyCode::KeyW), "W");
        assert_eq!(key_name(KeyCode::Space), "Space");
        assert_eq!(key_name(KeyCode::Tab), "Tab");
    }

    #[test]
    fn cli_collects_asset_dirs() {
        let cli = Cli::parse_from(["glint", "--asset-dir", "a", "--asset-dir", "b", "car.glb"]);
        assert_eq!(cli.asset_dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(cli.model, Some(PathBuf::from("car.glb")));
        assert_eq!(cli.settings, PathBuf::from("glint-settings.yaml"));
    }

    #[test]
    fn unreadable_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "model_scale: [not, a, number]").unwrap();
        let settings = load_settings(&path);
        assert_eq!(settings.model_scale, ViewerSettings::default().model_scale);
    }
}
