//! Window management via winit.
//!
//! Implements [`ApplicationHandler`] to drive the event loop: window and GPU
//! creation, input forwarding, resize, and one configurator update plus one
//! frame per redraw.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use super::boundary::ErrorBoundary;
use super::gpu::GpuContext;
use super::input::{Input, KeyCode, MouseButton, Pointer};
use super::lighting::{LightRig, LightUniform, clear_color_linear};
use super::orbit::OrbitCamera;
use super::renderer::MeshRenderer;
use super::{SurfaceError, ViewerError};
use crate::capability::{CONSTRAINED_TEXTURE_DIMENSION, RenderingCapabilityProfile};
use crate::config::Settings;
use crate::configurator::Configurator;
use crate::watch::SettingsWatcher;

/// Background of the error screen.
const ERROR_CLEAR: [f64; 4] = [0.35, 0.08, 0.08, 1.0];

/// Open the viewer and block until the window closes.
///
/// With a `settings_path`, the file is watched and the table is rebuilt
/// whenever it changes.
pub fn run(settings: Settings, settings_path: Option<PathBuf>) -> Result<(), ViewerError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(settings, settings_path);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct ViewerApp {
    settings: Settings,
    watcher: Option<SettingsWatcher>,

    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    renderer: Option<MeshRenderer>,
    configurator: Option<Configurator>,

    camera: OrbitCamera,
    lights: LightUniform,
    keys: Input<KeyCode>,
    buttons: Input<MouseButton>,
    pointer: Pointer,

    boundary: ErrorBoundary,
    shown_status: Option<String>,
    fatal: Option<ViewerError>,
}

impl ViewerApp {
    fn new(settings: Settings, settings_path: Option<PathBuf>) -> Self {
        let camera = OrbitCamera::configurator_default(settings.viewer.fov_degrees);
        Self {
            watcher: settings_path.as_deref().map(SettingsWatcher::new),
            settings,
            window: None,
            gpu: None,
            renderer: None,
            configurator: None,
            camera,
            lights: LightRig::showroom().to_uniform(),
            keys: Input::new(),
            buttons: Input::new(),
            pointer: Pointer::default(),
            boundary: ErrorBoundary::new(),
            shown_status: None,
            fatal: None,
        }
    }

    fn capability(&self) -> RenderingCapabilityProfile {
        match (&self.configurator, &self.gpu) {
            (Some(c), _) => *c.capability(),
            (None, Some(gpu)) => RenderingCapabilityProfile::resolve(gpu.max_texture_dimension(), &self.settings.capability),
            (None, None) => {
                log::warn!("No GPU yet; using the memory-constrained texture cap");
                RenderingCapabilityProfile::resolve(CONSTRAINED_TEXTURE_DIMENSION, &self.settings.capability)
            }
        }
    }

    /// Create the GPU context (if missing) and the renderer.
    fn init_gpu(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };
        self.renderer = None;

        if self.gpu.is_none() {
            match GpuContext::new(window, self.settings.viewer.vsync) {
                Ok(gpu) => self.gpu = Some(gpu),
                Err(e) => {
                    self.boundary.fail(e.to_string());
                    return;
                }
            }
        }

        let capability = self.capability();
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        gpu.reconfigure();
        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let renderer = MeshRenderer::new(gpu, &capability);
        match pollster::block_on(gpu.device.pop_error_scope()) {
            None => self.renderer = Some(renderer),
            Some(e) => self.boundary.fail(SurfaceError::Validation(e.to_string()).to_string()),
        }
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();

        if let (Some(watcher), Some(configurator)) = (self.watcher.as_mut(), self.configurator.as_mut()) {
            if let Some(Ok(settings)) = watcher.poll(now) {
                configurator.reload(&settings, now);
                self.settings = settings;
            }
        }

        if self.keys.just_pressed(KeyCode::Escape) {
            log::info!("Escape pressed, exiting.");
            event_loop.exit();
            return;
        }
        if self.keys.just_pressed(KeyCode::KeyR) && self.boundary.request_retry() {
            log::info!("Retrying renderer setup");
        }
        if self.boundary.take_retry() {
            self.init_gpu();
        }

        if let Some(configurator) = self.configurator.as_mut() {
            configurator.update(now);
        }

        let height = self.gpu.as_ref().map_or(1, |g| g.surface_size().1) as f32;
        self.pointer.drive(&mut self.camera, &self.buttons, height);
        self.keys.clear_just();
        self.buttons.clear_just();

        self.draw();
        self.update_title();
    }

    fn draw(&mut self) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        if self.boundary.is_failed() {
            if let Err(e) = MeshRenderer::clear_only(gpu, ERROR_CLEAR) {
                log::debug!("Error screen not presented: {e:?}");
            }
            return;
        }

        let (Some(renderer), Some(configurator)) = (self.renderer.as_mut(), self.configurator.as_ref()) else {
            return;
        };

        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let result = renderer.render(gpu, configurator.scene(), &self.camera, &self.lights, clear_color_linear());
        let validation = pollster::block_on(gpu.device.pop_error_scope());

        match (result, validation) {
            (Ok(()), None) => self.boundary.frame_ok(),
            (Ok(()), Some(e)) => self.boundary.fail(SurfaceError::Validation(e.to_string()).to_string()),
            (Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated), _) => {
                if self.boundary.surface_lost() {
                    gpu.reconfigure();
                }
            }
            (Err(wgpu::SurfaceError::Timeout), _) => log::warn!("Surface timed out; skipping frame"),
            (Err(wgpu::SurfaceError::OutOfMemory), _) => {
                log::error!("Out of GPU memory!");
                self.renderer = None;
                self.boundary.fail("out of GPU memory");
            }
            (Err(e), _) => self.boundary.fail(format!("{e:?}")),
        }
    }

    fn update_title(&mut self) {
        let status = self.boundary.status_line();
        if status == self.shown_status {
            return;
        }
        if let Some(window) = &self.window {
            let title = match &status {
                Some(s) => format!("{} - {s}", self.settings.viewer.title),
                None => self.settings.viewer.title.clone(),
            };
            window.set_title(&title);
        }
        self.shown_status = status;
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let viewer = &self.settings.viewer;
            let attrs = Window::default_attributes()
                .with_title(&viewer.title)
                .with_inner_size(winit::dpi::LogicalSize::new(viewer.width as f64, viewer.height as f64));
            match event_loop.create_window(attrs) {
                Ok(window) => self.window = Some(Arc::new(window)),
                Err(e) => {
                    log::error!("Failed to create window: {e}");
                    self.fatal = Some(e.into());
                    event_loop.exit();
                    return;
                }
            }
            self.init_gpu();
        }

        if self.configurator.is_none() {
            let capability = self.capability();
            match Configurator::with_standard_io(&self.settings, capability, Instant::now()) {
                Ok(configurator) => {
                    for (label, value) in configurator.summary() {
                        log::info!("{label}: {value}");
                    }
                    self.configurator = Some(configurator);
                }
                Err(e) => {
                    log::error!("Failed to start the configurator: {e}");
                    self.fatal = Some(e.into());
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Window close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(size.width, size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key_code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.keys.press(key_code),
                        ElementState::Released => self.keys.release(key_code),
                    }
                }
            }

            WindowEvent::MouseInput { button, state, .. } => match state {
                ElementState::Pressed => self.buttons.press(button),
                ElementState::Released => self.buttons.release(button),
            },

            WindowEvent::CursorMoved { position, .. } => {
                self.pointer.moved_to(position.x as f32, position.y as f32);
            }

            WindowEvent::CursorLeft { .. } => self.pointer.left_window(),

            WindowEvent::MouseWheel { delta, .. } => match delta {
                MouseScrollDelta::LineDelta(_, y) => self.pointer.scrolled_lines(y),
                MouseScrollDelta::PixelDelta(pos) => self.pointer.scrolled_pixels(pos.y as f32),
            },

            WindowEvent::RedrawRequested => {
                self.frame(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
