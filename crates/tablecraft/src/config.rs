//! # Configuration — Settings Files and Configurator Parameters
//!
//! All runtime configuration lives in one JSON document:
//!
//! ```json
//! {
//!   "viewer":     { "width": 1280, "height": 800, "title": "Tablecraft" },
//!   "table":      { "shape": "round", "radius": 90, "edge_profile": "bullnose" },
//!   "assets":     { "asset_root": "assets", "dev_proxy_prefix": null },
//!   "capability": { "memory_constrained": false }
//! }
//! ```
//!
//! Every field is optional. Missing fields take the configurator's shop
//! defaults (a 200×100 cm Carrara rectangle on a pedestal), so `{}` is a
//! valid file.
//!
//! ## Units
//!
//! Table dimensions are centimeters as a customer enters them; thickness is
//! millimeters. The geometry layer converts to meters.
//!
//! ## Hot Reload
//!
//! The viewer watches the settings file (see [`crate::watch`]) and rebuilds
//! the table whenever the `table` section changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capability::CapabilityConfig;
use crate::catalog::{BaseStyle, ShapeKind, SurfaceSelector};
use crate::geometry::EdgeProfile;

/// Production host for catalog texture photos.
pub const PRODUCTION_TEXTURE_BASE_URL: &str = "https://www.allinstone.co.uk/assets/v-5/configurator-new";

/// Panel thicknesses the workshop cuts, in millimeters.
pub const STANDARD_THICKNESSES_MM: [f32; 2] = [20.0, 30.0];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub viewer: ViewerConfig,
    pub table: ConfiguratorParams,
    pub assets: AssetConfig,
    pub capability: CapabilityConfig,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub vsync: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "Tablecraft".into(),
            width: 1280,
            height: 800,
            fov_degrees: 50.0,
            vsync: true,
        }
    }
}

/// Where models and textures come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding `models/` and `textures/`.
    pub asset_root: PathBuf,
    pub texture_base_url: String,
    /// Replaces `texture_base_url` during development (e.g. a local proxy
    /// that adds CORS headers or serves a mirror).
    pub dev_proxy_prefix: Option<String>,
    /// Load tops from their glTF models instead of generating them.
    pub modelled_tops: bool,
}

impl AssetConfig {
    pub fn texture_base_url(&self) -> &str {
        self.dev_proxy_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.texture_base_url)
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            texture_base_url: PRODUCTION_TEXTURE_BASE_URL.into(),
            dev_proxy_prefix: None,
            modelled_tops: false,
        }
    }
}

/// What the customer chose. Dimensions in centimeters, thickness in mm.
///
/// Each shape reads only its own dimensions: `radius` for round tops,
/// `square_length` for squares, `length`/`width` for rectangles, and the two
/// diameters for ovals. `border_radius` rounds square and rectangular corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfiguratorParams {
    pub material: SurfaceSelector,
    pub shape: ShapeKind,
    pub radius: f32,
    pub square_length: f32,
    pub length: f32,
    pub width: f32,
    pub largest_diameter: f32,
    pub smallest_diameter: f32,
    pub border_radius: f32,
    pub thickness_mm: f32,
    pub edge_profile: EdgeProfile,
    /// `null` means the top stands on the floor without a base.
    pub base_style: Option<BaseStyle>,
}

impl Default for ConfiguratorParams {
    fn default() -> Self {
        Self {
            material: SurfaceSelector::default(),
            shape: ShapeKind::Rectangular,
            radius: 100.0,
            square_length: 150.0,
            length: 200.0,
            width: 100.0,
            largest_diameter: 200.0,
            smallest_diameter: 120.0,
            border_radius: 5.0,
            thickness_mm: 20.0,
            edge_profile: EdgeProfile::Standard,
            base_style: Some(BaseStyle::Pedestal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_shop_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
        let table = &settings.table;
        assert_eq!(table.shape, ShapeKind::Rectangular);
        assert_eq!((table.length, table.width), (200.0, 100.0));
        assert_eq!(table.thickness_mm, 20.0);
        assert_eq!(table.material, SurfaceSelector::named("carrara"));
        assert_eq!(table.base_style, Some(BaseStyle::Pedestal));
    }

    #[test]
    fn partial_table_section_keeps_other_defaults() {
        let settings = Settings::from_json(
            r#"{ "table": { "shape": "round", "radius": 90, "edge_profile": "bull-nose", "material": 5, "base_style": null } }"#,
        )
        .unwrap();
        assert_eq!(settings.table.shape, ShapeKind::Round);
        assert_eq!(settings.table.radius, 90.0);
        assert_eq!(settings.table.edge_profile, EdgeProfile::Bullnose);
        assert_eq!(settings.table.material, SurfaceSelector::Local(5));
        assert_eq!(settings.table.base_style, None);
        assert_eq!(settings.table.square_length, 150.0);
        assert_eq!(settings.viewer, ViewerConfig::default());
    }

    #[test]
    fn dev_proxy_overrides_base_url() {
        let mut assets = AssetConfig::default();
        assert_eq!(assets.texture_base_url(), PRODUCTION_TEXTURE_BASE_URL);
        assets.dev_proxy_prefix = Some("http://localhost:8080/allinstone".into());
        assert_eq!(assets.texture_base_url(), "http://localhost:8080/allinstone");
        assets.dev_proxy_prefix = Some(String::new());
        assert_eq!(assets.texture_base_url(), PRODUCTION_TEXTURE_BASE_URL, "empty prefix is ignored");
    }

    #[test]
    fn settings_survive_a_save_and_load() {
        let dir = std::env::temp_dir().join(format!("tablecraft-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");

        let mut settings = Settings::default();
        settings.table.shape = ShapeKind::Oval;
        settings.capability.memory_constrained = true;
        std::fs::write(&path, settings.to_json().unwrap()).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_reports_path_on_errors() {
        let missing = Settings::load(Path::new("/no/such/settings.json"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let dir = std::env::temp_dir().join(format!("tablecraft-config-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"), "error names the file: {err}");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
