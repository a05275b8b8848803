//! From customer parameters to a [`TableAssembly`].
//!
//! An assembly is rebuilt from scratch on every parameter change. The
//! composer compares [`PlacementKey`]s to decide whether the old placement
//! still applies.

use std::path::PathBuf;

use crate::catalog::{BaseStyle, ShapeKind, SurfaceSelector, model_path};
use crate::config::{AssetConfig, ConfiguratorParams, STANDARD_THICKNESSES_MM};
use crate::geometry::{EdgeProfile, MM_PER_M, ShapeSpec};

/// Everything needed to build one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableAssembly {
    pub shape_kind: ShapeKind,
    /// `None` when the shape has no generated outline.
    pub shape: Option<ShapeSpec>,
    /// Requested footprint for scaling a modelled top. Curved rectangles
    /// use their length and width.
    pub top_dimensions: ShapeSpec,
    pub thickness_mm: f32,
    pub edge_profile: EdgeProfile,
    pub surface: SurfaceSelector,
    pub base_style: Option<BaseStyle>,
    pub base_path: Option<PathBuf>,
    /// Set when the top comes from a model file instead of the generator.
    pub top_path: Option<PathBuf>,
}

/// The inputs whose change invalidates a measured placement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlacementKey {
    pub shape_kind: ShapeKind,
    pub top_path: Option<PathBuf>,
    pub base_path: Option<PathBuf>,
}

impl TableAssembly {
    pub fn from_params(params: &ConfiguratorParams, assets: &AssetConfig) -> Self {
        if !STANDARD_THICKNESSES_MM.contains(&params.thickness_mm) {
            log::warn!(
                "Panel thickness {} mm is not a standard cut ({:?} mm); building it anyway",
                params.thickness_mm,
                STANDARD_THICKNESSES_MM
            );
        }

        let shape = shape_spec(params);
        let top_path = (assets.modelled_tops || shape.is_none())
            .then(|| model_path(&assets.asset_root, params.shape.top_model_file()));

        Self {
            shape_kind: params.shape,
            shape,
            top_dimensions: shape.unwrap_or(ShapeSpec::Rectangular {
                length: params.length,
                width: params.width,
                corner_radius: params.border_radius,
            }),
            thickness_mm: params.thickness_mm,
            edge_profile: params.edge_profile,
            surface: params.material.clone(),
            base_style: params.base_style,
            base_path: params
                .base_style
                .map(|b| model_path(&assets.asset_root, b.model_file())),
            top_path,
        }
    }

    /// Panel thickness in meters.
    pub fn thickness(&self) -> f32 {
        self.thickness_mm / MM_PER_M
    }

    pub fn placement_key(&self) -> PlacementKey {
        PlacementKey {
            shape_kind: self.shape_kind,
            top_path: self.top_path.clone(),
            base_path: self.base_path.clone(),
        }
    }

    /// Human-readable configuration summary, one `label: value` line each.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Material", self.surface.display_name()),
            ("Shape", self.shape_kind.display_name().to_string()),
            ("Dimensions", self.dimensions_text()),
            ("Thickness", format!("{} mm", self.thickness_mm)),
            ("Edge", self.edge_profile.display_name().to_string()),
            (
                "Base",
                self.base_style
                    .map_or_else(|| "None".to_string(), |b| b.display_name().to_string()),
            ),
        ]
    }

    fn dimensions_text(&self) -> String {
        match self.shape {
            Some(ShapeSpec::Round { radius }) => format!("Ø {} cm", radius * 2.0),
            Some(ShapeSpec::Square { side_length, corner_radius }) => {
                with_corners(format!("{side_length} × {side_length} cm"), corner_radius)
            }
            Some(ShapeSpec::Rectangular { length, width, corner_radius }) => {
                with_corners(format!("{length} × {width} cm"), corner_radius)
            }
            Some(ShapeSpec::Oval { major_diameter, minor_diameter }) => {
                format!("{major_diameter} × {minor_diameter} cm")
            }
            None => "As modelled".to_string(),
        }
    }
}

fn with_corners(text: String, corner_radius: f32) -> String {
    if corner_radius > 0.0 {
        format!("{text}, {corner_radius} cm corners")
    } else {
        text
    }
}

/// The generated outline's parameters, or `None` for model-only shapes.
pub fn shape_spec(params: &ConfiguratorParams) -> Option<ShapeSpec> {
    match params.shape {
        ShapeKind::Round => Some(ShapeSpec::Round { radius: params.radius }),
        ShapeKind::Square => Some(ShapeSpec::Square {
            side_length: params.square_length,
            corner_radius: params.border_radius,
        }),
        ShapeKind::Rectangular => Some(ShapeSpec::Rectangular {
            length: params.length,
            width: params.width,
            corner_radius: params.border_radius,
        }),
        ShapeKind::Oval => Some(ShapeSpec::Oval {
            major_diameter: params.largest_diameter,
            minor_diameter: params.smallest_diameter,
        }),
        ShapeKind::CurvedRectangular => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets() -> AssetConfig {
        AssetConfig {
            asset_root: PathBuf::from("/srv/tablecraft"),
            ..AssetConfig::default()
        }
    }

    #[test]
    fn defaults_build_a_generated_rectangle_on_a_pedestal() {
        let assembly = TableAssembly::from_params(&ConfiguratorParams::default(), &assets());
        assert_eq!(
            assembly.shape,
            Some(ShapeSpec::Rectangular {
                length: 200.0,
                width: 100.0,
                corner_radius: 5.0
            })
        );
        assert_eq!(assembly.top_path, None, "tops are generated by default");
        assert_eq!(
            assembly.base_path,
            Some(PathBuf::from("/srv/tablecraft/models/BaseMonolithCurveX.glb"))
        );
        assert!((assembly.thickness() - 0.02).abs() < 1e-7);
    }

    #[test]
    fn curved_rectangle_uses_its_model() {
        let params = ConfiguratorParams {
            shape: ShapeKind::CurvedRectangular,
            ..ConfiguratorParams::default()
        };
        let assembly = TableAssembly::from_params(&params, &assets());
        assert_eq!(assembly.shape, None);
        assert!(matches!(assembly.top_dimensions, ShapeSpec::Rectangular { length, .. } if length == 200.0));
        assert_eq!(
            assembly.top_path,
            Some(PathBuf::from("/srv/tablecraft/models/CurvedRectangle21X.glb"))
        );
    }

    #[test]
    fn modelled_tops_switch_every_shape_to_its_model() {
        let config = AssetConfig {
            modelled_tops: true,
            ..assets()
        };
        let params = ConfiguratorParams {
            shape: ShapeKind::Round,
            base_style: None,
            ..ConfiguratorParams::default()
        };
        let assembly = TableAssembly::from_params(&params, &config);
        assert_eq!(assembly.top_path, Some(PathBuf::from("/srv/tablecraft/models/RoundTable.glb")));
        assert_eq!(assembly.base_path, None);
        assert!(assembly.shape.is_some(), "model tops still carry dimensions for scaling");
    }

    #[test]
    fn placement_key_ignores_dimensions_and_surface() {
        let a = TableAssembly::from_params(&ConfiguratorParams::default(), &assets());
        let b = TableAssembly::from_params(
            &ConfiguratorParams {
                length: 240.0,
                material: SurfaceSelector::Local(3),
                thickness_mm: 30.0,
                ..ConfiguratorParams::default()
            },
            &assets(),
        );
        assert_eq!(a.placement_key(), b.placement_key());

        let c = TableAssembly::from_params(
            &ConfiguratorParams {
                base_style: Some(BaseStyle::Trestle),
                ..ConfiguratorParams::default()
            },
            &assets(),
        );
        assert_ne!(a.placement_key(), c.placement_key(), "new base means new measurement");
    }

    #[test]
    fn summary_lists_the_configuration() {
        let params = ConfiguratorParams {
            shape: ShapeKind::Round,
            radius: 60.0,
            edge_profile: EdgeProfile::Bullnose,
            base_style: None,
            ..ConfiguratorParams::default()
        };
        let summary = TableAssembly::from_params(&params, &assets()).summary();
        let get = |label: &str| {
            summary
                .iter()
                .find(|(l, _)| *l == label)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("Material"), "Carrara Marble");
        assert_eq!(get("Shape"), "Round");
        assert_eq!(get("Dimensions"), "Ø 120 cm");
        assert_eq!(get("Thickness"), "20 mm");
        assert_eq!(get("Edge"), EdgeProfile::Bullnose.display_name());
        assert_eq!(get("Base"), "None");
    }
}
