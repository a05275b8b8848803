//! Rendering capability profile.
//!
//! Resolved once at startup from the GPU adapter's limits and the user's
//! settings, then passed explicitly to everything that needs to scale its
//! work down on weaker devices: the texture pipeline (resolution cap,
//! mipmaps, anisotropy) and the solid builder (curve and bevel density).

use serde::{Deserialize, Serialize};

/// Texture side length cap on memory-constrained devices.
pub const CONSTRAINED_TEXTURE_DIMENSION: u32 = 2048;

/// Settings that feed into [`RenderingCapabilityProfile::resolve`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    /// Treat the device as memory-constrained regardless of adapter limits.
    pub memory_constrained: bool,
    /// Optional extra cap on texture side length.
    pub max_texture_dimension: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderingCapabilityProfile {
    pub memory_constrained: bool,
    /// Largest texture side length the pipeline will upload.
    pub max_texture_dimension: u32,
    pub mipmaps: bool,
    /// Sampler anisotropy clamp (1 = off).
    pub anisotropy: u16,
    /// Flattening density for a full circle of outline.
    pub curve_segments: u32,
    pub max_bevel_segments: u32,
}

impl RenderingCapabilityProfile {
    pub fn desktop(adapter_max_dimension: u32) -> Self {
        Self {
            memory_constrained: false,
            max_texture_dimension: adapter_max_dimension.max(1),
            mipmaps: true,
            anisotropy: 16,
            curve_segments: 128,
            max_bevel_segments: 64,
        }
    }

    pub fn memory_constrained(adapter_max_dimension: u32) -> Self {
        Self {
            memory_constrained: true,
            max_texture_dimension: adapter_max_dimension.clamp(1, CONSTRAINED_TEXTURE_DIMENSION),
            mipmaps: false,
            anisotropy: 1,
            curve_segments: 64,
            max_bevel_segments: 16,
        }
    }

    pub fn resolve(adapter_max_dimension: u32, config: &CapabilityConfig) -> Self {
        let mut profile = if config.memory_constrained {
            Self::memory_constrained(adapter_max_dimension)
        } else {
            Self::desktop(adapter_max_dimension)
        };
        if let Some(cap) = config.max_texture_dimension {
            profile.max_texture_dimension = profile.max_texture_dimension.min(cap.max(1));
        }
        log::info!(
            "Rendering profile: {} (textures ≤ {} px, mipmaps {}, anisotropy {}x)",
            if profile.memory_constrained { "memory-constrained" } else { "desktop" },
            profile.max_texture_dimension,
            if profile.mipmaps { "on" } else { "off" },
            profile.anisotropy,
        );
        profile
    }
}

impl Default for RenderingCapabilityProfile {
    fn default() -> Self {
        Self::desktop(8192)
    }
}
