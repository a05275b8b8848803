//! # Geometry — From Parameters to a Table-Top Mesh
//!
//! ```text
//!   ShapeSpec ──► generate_outline ──► PlanarOutline ─┐
//!                                                      ├─► extrude ──► Solid
//!   EdgeProfile ─► profile_to_bevel ─► BevelDescriptor ┘
//! ```
//!
//! Everything in here is pure: the same inputs always give the same mesh.
//! Failures surface as [`GeometryError`] from the `try_` functions; the
//! public entry points turn them into the fallback box instead.

pub mod extrude;
pub mod mesh;
pub mod outline;
pub mod profile;
pub mod shapes;

pub use extrude::{Solid, extrude, try_extrude};
pub use mesh::{Mesh, MeshVertex};
pub use outline::{PlanarOutline, Segment, ShapeSpec, generate_outline};
pub use profile::{BevelDescriptor, EdgeProfile, profile_to_bevel};

use crate::capability::RenderingCapabilityProfile;

/// Millimeters per meter. Panel thickness is given in millimeters.
pub const MM_PER_M: f32 = 1000.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("panel thickness {0} is not a positive finite length")]
    InvalidThickness(f32),
    #[error("outline is not closed")]
    OpenOutline,
    #[error("outline has {0} distinct points, need at least 3")]
    TooFewPoints(usize),
    #[error("outline encloses no area")]
    ZeroArea,
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
    #[error("bevel depth {bevel_thickness} m does not fit a {thickness} m panel")]
    BevelTooDeep { bevel_thickness: f32, thickness: f32 },
    #[error("bevel inset of {0} m turns the outline inside out")]
    InsetCollapse(f32),
}

/// Build the generated top for `shape` (`None` = no outline available).
///
/// `thickness_mm` is the panel thickness in millimeters.
pub fn build_top_solid(
    shape: Option<&ShapeSpec>,
    thickness_mm: f32,
    profile: EdgeProfile,
    capability: &RenderingCapabilityProfile,
) -> Solid {
    let thickness = thickness_mm / MM_PER_M;
    let outline = shape.and_then(generate_outline);
    let bevel = profile_to_bevel(profile, thickness);
    extrude(outline.as_ref(), thickness, &bevel, capability)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_shape_builds_fallback() {
        let solid = build_top_solid(None, 20.0, EdgeProfile::Standard, &RenderingCapabilityProfile::default());
        assert!(solid.is_fallback);
    }

    #[test]
    fn thickness_is_converted_from_millimeters() {
        let solid = build_top_solid(
            Some(&ShapeSpec::Round { radius: 100.0 }),
            30.0,
            EdgeProfile::Eased,
            &RenderingCapabilityProfile::default(),
        );
        let size = solid.mesh.bounds().size();
        assert!((size.y - 0.03).abs() < 1e-6, "30 mm panel, got {}", size.y);
        assert!((size.x - 2.0).abs() < 1e-4, "1 m radius, got {}", size.x);
    }
}
