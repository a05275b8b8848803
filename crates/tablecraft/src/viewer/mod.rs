//! # Viewer — A Window Around the Configurator
//!
//! The viewer shell owns everything that touches the screen:
//!
//! ```text
//! ┌ window (winit) ───────────────────────────────────────────┐
//! │  ViewerApp                                                │
//! │   ├─ GpuContext ── device, queue, surface                 │
//! │   ├─ MeshRenderer ── pipeline, uniforms, GPU meshes       │
//! │   ├─ OrbitCamera ◄── Pointer ◄── mouse drag / wheel       │
//! │   ├─ LightRig ── showroom lights                          │
//! │   ├─ ErrorBoundary ── surface failures, R to retry        │
//! │   ├─ SettingsWatcher ── hot reload of the settings file   │
//! │   └─ Configurator ── textures + composer (kept on error)  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Controls: left drag orbits, right or middle drag pans, the wheel zooms,
//! R retries after a render error and Escape quits.
//!
//! ## Module Layout
//!
//! - [`gpu`]: device and surface setup.
//! - [`renderer`]: the forward pass over the composed scene.
//! - [`lighting`]: the light rig and the GPU uniform structs.
//! - [`orbit`]: turntable camera math.
//! - [`input`]: key, button and pointer state.
//! - [`boundary`]: the render error state machine.
//! - [`window`]: the winit event loop tying it together.

pub mod boundary;
pub mod gpu;
pub mod input;
pub mod lighting;
pub mod orbit;
pub mod renderer;
pub mod window;

pub use boundary::{BoundaryState, ErrorBoundary};
pub use lighting::LightRig;
pub use orbit::{OrbitBounds, OrbitCamera};
pub use window::run;

/// Render-surface and device failures. These are the only errors the
/// customer ever sees.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("cannot create a render surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("GPU device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("the surface supports no texture formats")]
    NoFormats,
    #[error("GPU validation failed: {0}")]
    Validation(String),
}

/// Errors that end the viewer.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("cannot open a window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("cannot start texture loading: {0}")]
    Texture(#[from] crate::texture::TextureError),
}
