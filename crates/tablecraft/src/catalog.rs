//! # Catalog — Static Product Tables
//!
//! Everything the configurator can offer is listed here: base styles and
//! their model files, top models per shape, stone materials with their
//! texture files and fallback colors, and the small table of textures that
//! ship with the application.
//!
//! ```text
//!   SurfaceSelector::Named("carrara") ─► MATERIALS ─► Remote(".../carrara-white.jpg")
//!   SurfaceSelector::Local(3)         ─► LOCAL_TEXTURES ─► Bundled("<root>/textures/…")
//!   anything else                     ─► None (solid-color fallback)
//! ```
//!
//! Remote texture URLs are built from [`AssetConfig::texture_base_url`], which
//! swaps in a development proxy prefix when one is configured.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::AssetConfig;
use crate::math::Rgb;

/// Color used when a surface has no texture and no catalog color.
pub const DEFAULT_SURFACE_COLOR: Rgb = Rgb::hex(0x8B7355);

/// Sub-path of the texture host holding the compressed stone photos.
pub const REMOTE_TEXTURE_DIR: &str = "images/textures/min";

/// Sub-directory of the asset root holding the glTF models.
pub const MODEL_DIR: &str = "models";

// ── Shapes and top models ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    Round,
    Square,
    #[default]
    Rectangular,
    Oval,
    /// Only available as a modelled top; there is no generated outline.
    CurvedRectangular,
}

impl ShapeKind {
    pub const ALL: [Self; 5] = [
        Self::Rectangular,
        Self::Square,
        Self::Round,
        Self::Oval,
        Self::CurvedRectangular,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Round => "round",
            Self::Square => "square",
            Self::Rectangular => "rectangular",
            Self::Oval => "oval",
            Self::CurvedRectangular => "curved-rectangular",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Round => "Round",
            Self::Square => "Square",
            Self::Rectangular => "Rectangular",
            Self::Oval => "Oval",
            Self::CurvedRectangular => "Curved Rectangular",
        }
    }

    /// Model file for the modelled version of this top.
    pub fn top_model_file(self) -> &'static str {
        match self {
            Self::Rectangular => "RectangleTable21.glb",
            Self::Round => "RoundTable.glb",
            Self::Oval => "OvalTable.glb",
            Self::Square => "SquareTable.glb",
            Self::CurvedRectangular => "CurvedRectangle21X.glb",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| CatalogError::UnknownShape(s.to_string()))
    }
}

// ── Base styles ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaseStyle {
    #[default]
    Pedestal,
    Trestle,
    Legs,
    Metal,
    Cylindric,
    Twin,
    XInclined,
    XParallel,
    TwinLeaner,
    Semicircle,
    Africa,
    Valhalla,
}

impl BaseStyle {
    pub const ALL: [Self; 12] = [
        Self::Pedestal,
        Self::Trestle,
        Self::Legs,
        Self::Metal,
        Self::Cylindric,
        Self::Twin,
        Self::XInclined,
        Self::XParallel,
        Self::TwinLeaner,
        Self::Semicircle,
        Self::Africa,
        Self::Valhalla,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pedestal => "pedestal",
            Self::Trestle => "trestle",
            Self::Legs => "legs",
            Self::Metal => "metal",
            Self::Cylindric => "cylindric",
            Self::Twin => "twin",
            Self::XInclined => "x-inclined",
            Self::XParallel => "x-parallel",
            Self::TwinLeaner => "twin-leaner",
            Self::Semicircle => "semicircle",
            Self::Africa => "africa",
            Self::Valhalla => "valhalla",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Pedestal => "Pedestal",
            Self::Trestle => "Trestle Base",
            Self::Legs => "Classic Legs",
            Self::Metal => "Metal Base",
            Self::Cylindric => "Cylindrical Base",
            Self::Twin => "Twin Base",
            Self::XInclined => "Inclined X Base",
            Self::XParallel => "Parallel X Base",
            Self::TwinLeaner => "Twin Leaner Base",
            Self::Semicircle => "Semicircle Base",
            Self::Africa => "Africa Base",
            Self::Valhalla => "Valhalla Base",
        }
    }

    pub fn model_file(self) -> &'static str {
        match self {
            Self::Pedestal => "BaseMonolithCurveX.glb",
            Self::Trestle => "TieBaseX.glb",
            Self::Legs => "XSoloBaseX.glb",
            Self::Metal => "XCrossBaseX.glb",
            Self::Cylindric => "CylindricWoodBaseX.glb",
            Self::Twin => "SquareTwinBaseX.glb",
            Self::XInclined => "XBaseInclinedX.glb",
            Self::XParallel => "XCrossParalelX.glb",
            Self::TwinLeaner => "TwinLeanerBaseX.glb",
            Self::Semicircle => "SemiCircleBaseX.glb",
            Self::Africa => "AfricaX.glb",
            Self::Valhalla => "ValhallaX.glb",
        }
    }
}

impl fmt::Display for BaseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaseStyle {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s.trim())
            .ok_or_else(|| CatalogError::UnknownBase(s.to_string()))
    }
}

/// Path of a model file under the asset root.
pub fn model_path(asset_root: &Path, file: &str) -> PathBuf {
    asset_root.join(MODEL_DIR).join(file)
}

// ── Materials and textures ──────────────────────────────────────────────

/// A stone material sold under a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialEntry {
    pub key: &'static str,
    pub display_name: &'static str,
    pub texture_file: &'static str,
    pub fallback_color: Rgb,
}

pub const MATERIALS: &[MaterialEntry] = &[
    MaterialEntry {
        key: "carrara",
        display_name: "Carrara Marble",
        texture_file: "carrara-white.jpg",
        fallback_color: Rgb::hex(0xE8E6E1),
    },
    MaterialEntry {
        key: "calacatta",
        display_name: "Calacatta Marble",
        texture_file: "white-calacatta.jpg",
        fallback_color: Rgb::hex(0xF5F3ED),
    },
    MaterialEntry {
        key: "statuario",
        display_name: "Statuario Marble",
        texture_file: "eternal-staturio.jpg",
        fallback_color: Rgb::hex(0xF0EDE4),
    },
    MaterialEntry {
        key: "granite-white",
        display_name: "White Granite",
        texture_file: "white-calacatta.jpg",
        fallback_color: Rgb::hex(0xF5F5F0),
    },
    MaterialEntry {
        key: "granite-dark",
        display_name: "Dark Granite",
        texture_file: "5100-vanilla-noir.jpg",
        fallback_color: Rgb::hex(0x1A1A1A),
    },
    MaterialEntry {
        key: "granite-gray",
        display_name: "Gray Granite",
        texture_file: "macchia-vecchia.jpg",
        fallback_color: Rgb::hex(0x6B6B6B),
    },
];

/// A texture bundled with the application, picked by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTexture {
    pub index: u32,
    pub display_name: &'static str,
    /// Path relative to the asset root.
    pub path: &'static str,
    pub fallback_color: Rgb,
}

pub const LOCAL_TEXTURES: &[LocalTexture] = &[
    LocalTexture { index: 1, display_name: "Bianco Carrara", path: "textures/bianco-carrara.jpg", fallback_color: Rgb::hex(0xE8E6E1) },
    LocalTexture { index: 2, display_name: "Calacatta Oro", path: "textures/calacatta-oro.jpg", fallback_color: Rgb::hex(0xF5F3ED) },
    LocalTexture { index: 3, display_name: "Statuario Venato", path: "textures/statuario-venato.jpg", fallback_color: Rgb::hex(0xF0EDE4) },
    LocalTexture { index: 4, display_name: "Nero Marquina", path: "textures/nero-marquina.jpg", fallback_color: Rgb::hex(0x1C1C1C) },
    LocalTexture { index: 5, display_name: "Nero Assoluto", path: "textures/nero-assoluto.jpg", fallback_color: Rgb::hex(0x101010) },
    LocalTexture { index: 6, display_name: "Natural Granite", path: "textures/natural-granite.jpg", fallback_color: Rgb::hex(0x8A8178) },
    LocalTexture { index: 7, display_name: "Travertine", path: "textures/travertine.png", fallback_color: Rgb::hex(0xD8CBB3) },
    LocalTexture { index: 8, display_name: "Showroom Sample", path: "textures/showroom-sample.heic", fallback_color: Rgb::hex(0xBFB8AE) },
];

/// Which surface the customer picked.
///
/// Serialized as a bare number (bundled texture index) or a string
/// (material key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SurfaceSelector {
    Local(u32),
    Named(String),
}

impl SurfaceSelector {
    pub fn named(key: impl Into<String>) -> Self {
        Self::Named(key.into())
    }

    pub fn material(&self) -> Option<&'static MaterialEntry> {
        match self {
            Self::Named(key) => MATERIALS.iter().find(|m| m.key == key.as_str()),
            Self::Local(_) => None,
        }
    }

    pub fn local(&self) -> Option<&'static LocalTexture> {
        match *self {
            Self::Local(index) => LOCAL_TEXTURES.iter().find(|t| t.index == index),
            Self::Named(_) => None,
        }
    }

    /// Color to show while no texture is committed.
    pub fn fallback_color(&self) -> Rgb {
        self.material()
            .map(|m| m.fallback_color)
            .or_else(|| self.local().map(|t| t.fallback_color))
            .unwrap_or(DEFAULT_SURFACE_COLOR)
    }

    pub fn display_name(&self) -> String {
        if let Some(m) = self.material() {
            return m.display_name.to_string();
        }
        if let Some(t) = self.local() {
            return t.display_name.to_string();
        }
        match self {
            Self::Local(i) => format!("Texture #{i}"),
            Self::Named(key) => key.clone(),
        }
    }
}

impl Default for SurfaceSelector {
    fn default() -> Self {
        Self::named("carrara")
    }
}

impl fmt::Display for SurfaceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(i) => write!(f, "#{i}"),
            Self::Named(key) => f.write_str(key),
        }
    }
}

/// Where a texture's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureLocation {
    Bundled(PathBuf),
    Remote(String),
}

impl TextureLocation {
    /// Lowercased file extension, used as a format hint.
    pub fn extension(&self) -> Option<String> {
        let name = match self {
            Self::Bundled(path) => path.file_name()?.to_str()?,
            Self::Remote(url) => url.rsplit('/').next()?,
        };
        let name = name.split(['?', '#']).next().unwrap_or(name);
        name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

impl fmt::Display for TextureLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bundled(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

/// Resolve a selector to the one place its texture lives, if any.
pub fn resolve_surface(selector: &SurfaceSelector, assets: &AssetConfig) -> Option<TextureLocation> {
    if let Some(m) = selector.material() {
        let base = assets.texture_base_url();
        return Some(TextureLocation::Remote(format!(
            "{}/{REMOTE_TEXTURE_DIR}/{}",
            base.trim_end_matches('/'),
            m.texture_file
        )));
    }
    selector
        .local()
        .map(|t| TextureLocation::Bundled(assets.asset_root.join(t.path)))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown table shape `{0}`")]
    UnknownShape(String),
    #[error("unknown base style `{0}`")]
    UnknownBase(String),
}
