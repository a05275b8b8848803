//! Decoding, resolution capping and mip generation.

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

use super::TextureError;
use crate::capability::RenderingCapabilityProfile;
use crate::task::CancelToken;

/// One level of a mip chain, tightly packed RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// A decoded surface texture. `levels[0]` is full resolution; further levels
/// halve down to 1×1 when the capability profile allows mipmaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceImage {
    pub levels: Vec<MipLevel>,
}

impl SurfaceImage {
    pub fn width(&self) -> u32 {
        self.levels.first().map_or(0, |l| l.width)
    }

    pub fn height(&self) -> u32 {
        self.levels.first().map_or(0, |l| l.height)
    }

    pub fn mip_count(&self) -> u32 {
        self.levels.len() as u32
    }
}

/// Decode `bytes`, cap the resolution to the profile's limit, and build mips.
pub fn decode_surface(
    bytes: &[u8],
    capability: &RenderingCapabilityProfile,
    token: &CancelToken,
) -> Result<SurfaceImage, TextureError> {
    let decoded = image::load_from_memory(bytes)?;
    if token.is_canceled() {
        return Err(TextureError::Canceled);
    }

    let capped = cap_resolution(decoded, capability.max_texture_dimension);
    let base = capped.to_rgba8();
    let mut levels = vec![to_level(&base)];

    if capability.mipmaps {
        let mut current = base;
        while current.width() > 1 || current.height() > 1 {
            if token.is_canceled() {
                return Err(TextureError::Canceled);
            }
            let w = (current.width() / 2).max(1);
            let h = (current.height() / 2).max(1);
            current = image::imageops::resize(&current, w, h, FilterType::Triangle);
            levels.push(to_level(&current));
        }
    }

    Ok(SurfaceImage { levels })
}

fn cap_resolution(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let max_dimension = max_dimension.max(1);
    if image.width() <= max_dimension && image.height() <= max_dimension {
        return image;
    }
    log::debug!(
        "Resampling {}x{} texture to fit {max_dimension} px",
        image.width(),
        image.height()
    );
    image.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

fn to_level(image: &RgbaImage) -> MipLevel {
    MipLevel {
        width: image.width(),
        height: image.height(),
        pixels: image.as_raw().clone(),
    }
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 7) as u8, (y * 13) as u8, 128, 255])
    });
    let mut out = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desktop_keeps_resolution_and_builds_full_chain() {
        let img = decode_surface(&png_bytes(64, 32), &RenderingCapabilityProfile::desktop(8192), &CancelToken::new())
            .unwrap();
        assert_eq!((img.width(), img.height()), (64, 32));
        // 64x32, 32x16, 16x8, 8x4, 4x2, 2x1, 1x1
        assert_eq!(img.mip_count(), 7);
        let last = img.levels.last().unwrap();
        assert_eq!((last.width, last.height), (1, 1));
        for level in &img.levels {
            assert_eq!(level.pixels.len() as u32, level.width * level.height * 4);
        }
    }

    #[test]
    fn constrained_profile_caps_and_skips_mips() {
        let mut lean = RenderingCapabilityProfile::memory_constrained(8192);
        lean.max_texture_dimension = 16;
        let img = decode_surface(&png_bytes(64, 32), &lean, &CancelToken::new()).unwrap();
        assert_eq!((img.width(), img.height()), (16, 8), "aspect ratio preserved");
        assert_eq!(img.mip_count(), 1, "no mip chain when mipmaps are off");
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let result = decode_surface(b"not an image", &RenderingCapabilityProfile::default(), &CancelToken::new());
        assert!(matches!(result, Err(TextureError::Decode(_))));
    }

    #[test]
    fn canceled_decode_stops() {
        let token = CancelToken::new();
        token.cancel();
        let result = decode_surface(&png_bytes(8, 8), &RenderingCapabilityProfile::default(), &token);
        assert!(matches!(result, Err(TextureError::Canceled)));
    }
}
