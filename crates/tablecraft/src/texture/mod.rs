//! # Texture Pipeline — Stone Photos to GPU-Ready Pixels
//!
//! A surface texture goes through up to four stages on a worker thread:
//!
//! ```text
//!   request(selector)
//!        │  resolve through the catalog (None → solid color, done)
//!        ▼
//!   Fetching ──► Converting ──► Decoding ──► Ready
//!      │          (HEIC only,     │
//!      │           with timeout)  │
//!      └──────────────┴───────────┴──► Failed (→ solid color)
//! ```
//!
//! The main thread calls [`TexturePipeline::poll`] once per frame. Only the
//! newest request can commit, and the previously committed image stays on
//! screen until its replacement is ready.
//!
//! ## Module Layout
//!
//! - [`source`]: where bytes come from (bundled files, HTTP).
//! - [`convert`]: detection and conversion of legacy camera photos.
//! - [`surface`]: decoding, resolution capping and mip generation.
//! - [`pipeline`]: the per-slot state machine tying them together.

pub mod convert;
pub mod pipeline;
pub mod source;
pub mod surface;

use std::time::Duration;

pub use convert::{CommandConverter, LegacyConverter, is_legacy_photo};
pub use pipeline::{LoadPhase, TexturePipeline};
pub use source::{ImageSource, StandardImageSource};
pub use surface::{MipLevel, SurfaceImage, decode_surface};

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("request for {url} failed: {reason}")]
    Http { url: String, reason: String },
    #[error("remote texture {0} needs the `remote` feature")]
    RemoteDisabled(String),
    #[error("legacy photo conversion failed: {0}")]
    Conversion(String),
    #[error("legacy photo conversion timed out after {0:?}")]
    ConversionTimeout(Duration),
    #[error("image decoding failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("load canceled")]
    Canceled,
    #[error("could not start a worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
