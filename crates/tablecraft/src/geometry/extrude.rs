//! # Solid Builder — Bevelled Extrusion
//!
//! Sweeps a [`PlanarOutline`] straight up into a slab and rounds off the top
//! and bottom edges according to a [`BevelDescriptor`]. The result is a
//! closed triangle mesh centered vertically on the origin, spanning
//! `y ∈ [−t/2, t/2]`, with the outline's silhouette unchanged.
//!
//! ## Cross Section
//!
//! Every outline point becomes a *column* of vertices. Walking up a column
//! gives the edge profile:
//!
//! ```text
//!        inset ─►│◄ size
//!   y = +t/2 ─── ╭───────── top cap
//!                │╲  θ = 90°
//!                │ ╲        quarter ellipse, `segments` steps
//!            ── ─┤  ) θ = 0
//!                │  │       straight wall
//!            ── ─┤  )
//!                │ ╱        mirrored bottom bevel
//!   y = −t/2 ─── ╰───────── bottom cap
//! ```
//!
//! At parameter θ the column is pulled in by `size · (1 − cos θ)` and sits
//! `depth · sin θ` above the start of the bevel. Normals follow the curve:
//! horizontal at θ = 0 (flush with the wall), vertical at θ = 90° (flush with
//! the cap), so the rounded edge shades smoothly into both.
//!
//! ## Sharp Corners
//!
//! A smooth outline (circle, oval, rounded corners) shares one vertex per
//! column with an averaged normal. Where the outline turns by more than 30°
//! the column is duplicated: one copy carries the incoming edge's normal, the
//! other the outgoing edge's, so a square corner stays crisp. Insets move
//! along the miter direction so both adjoining edges pull in by the same
//! distance.
//!
//! ## UVs
//!
//! UVs are a planar top-down projection, remapped so the solid's UV bounding
//! box is exactly the unit square. A 2 m top and a 60 cm top both show the
//! whole texture once.
//!
//! ## Failure
//!
//! [`extrude`] never fails. Anything [`try_extrude`] rejects (open or
//! degenerate outline, bevel deeper than half the panel, inset that turns the
//! outline inside out, non-finite input) is logged and replaced by a flat
//! 2 m × t × 1 m box.
//!
//! ## Comparison
//!
//! - **three.js**: `ExtrudeGeometry` with `bevelEnabled`, `bevelSize`,
//!   `bevelThickness`, `bevelSegments`. Its bevel grows the silhouette
//!   outward; this one insets so the requested size is the real size.
//! - **CAD kernels**: a true fillet on a B-rep edge. Much more general, and
//!   much heavier than a table top needs.

use std::f32::consts::FRAC_PI_2;

use super::GeometryError;
use super::mesh::{Mesh, MeshVertex};
use super::outline::{PlanarOutline, signed_area};
use super::profile::BevelDescriptor;
use super::shapes::cuboid;
use crate::capability::RenderingCapabilityProfile;
use crate::math::{Vec2, Vec3};

/// Size of the stand-in box used when extrusion fails (x, z), in meters.
pub const FALLBACK_FOOTPRINT: Vec2 = Vec2::new(2.0, 1.0);

/// Thickness used for the stand-in box when the requested one is unusable.
pub const DEFAULT_THICKNESS: f32 = 0.02;

/// cos(30°): turns sharper than this split the column.
const SHARP_TURN_COS: f32 = 0.866_025_4;

const EPSILON: f32 = 1e-6;

/// A built table-top solid.
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    pub mesh: Mesh,
    /// True when this is the stand-in box rather than the requested shape.
    pub is_fallback: bool,
}

impl Solid {
    /// The flat stand-in box for a panel `thickness` meters thick.
    pub fn fallback(thickness: f32) -> Self {
        let t = if thickness.is_finite() && thickness > 0.0 {
            thickness
        } else {
            DEFAULT_THICKNESS
        };
        Self {
            mesh: cuboid(Vec3::new(FALLBACK_FOOTPRINT.x, t, FALLBACK_FOOTPRINT.y)),
            is_fallback: true,
        }
    }
}

/// Extrude `outline` into a bevelled solid, or the fallback box on failure.
///
/// `None` stands for "no outline could be generated"; it yields the fallback
/// box without a warning since the caller already knows.
pub fn extrude(
    outline: Option<&PlanarOutline>,
    thickness: f32,
    bevel: &BevelDescriptor,
    capability: &RenderingCapabilityProfile,
) -> Solid {
    let Some(outline) = outline else {
        return Solid::fallback(thickness);
    };
    match try_extrude(outline, thickness, bevel, capability) {
        Ok(mesh) => Solid {
            mesh,
            is_fallback: false,
        },
        Err(e) => {
            log::warn!("Extrusion failed ({e}), using a flat box instead");
            Solid::fallback(thickness)
        }
    }
}

/// One vertical column of the solid's side.
#[derive(Debug, Clone, Copy)]
struct Column {
    point: Vec2,
    /// Direction (outward) along which insets are applied, scaled so that
    /// moving by `inset` pulls both adjoining edges in by `inset`.
    miter: Vec2,
    /// Outward shading normal in the outline plane.
    normal: Vec2,
}

/// One step along the edge profile.
#[derive(Debug, Clone, Copy)]
struct ProfileSample {
    y: f32,
    inset: f32,
    /// Horizontal weight of the normal (multiplies the column normal).
    horizontal: f32,
    vertical: f32,
}

pub fn try_extrude(
    outline: &PlanarOutline,
    thickness: f32,
    bevel: &BevelDescriptor,
    capability: &RenderingCapabilityProfile,
) -> Result<Mesh, GeometryError> {
    if !thickness.is_finite() || thickness <= 0.0 {
        return Err(GeometryError::InvalidThickness(thickness));
    }
    if !outline.is_closed() {
        return Err(GeometryError::OpenOutline);
    }

    let mut points = outline.flatten(capability.curve_segments);
    if points.iter().any(|p| !p.is_finite()) {
        return Err(GeometryError::NonFinite("outline"));
    }
    if points.len() < 3 {
        return Err(GeometryError::TooFewPoints(points.len()));
    }
    let area = signed_area(&points);
    if area.abs() <= EPSILON {
        return Err(GeometryError::ZeroArea);
    }
    if area < 0.0 {
        points.reverse();
    }

    let bevel = fit_bevel(bevel, thickness, capability)?;
    let columns = build_columns(&points);
    if bevel.bevel_size > 0.0 {
        check_inset(&columns, bevel.bevel_size)?;
    }
    let samples = profile_samples(thickness, &bevel);

    let mut mesh = Mesh::default();
    push_walls(&mut mesh, &columns, &samples);
    let (first, last) = (samples[0], samples[samples.len() - 1]);
    push_cap(&mut mesh, &columns, first.y, first.inset, false);
    push_cap(&mut mesh, &columns, last.y, last.inset, true);

    if mesh
        .vertices
        .iter()
        .any(|v| !Vec3::from(v.position).is_finite() || !Vec3::from(v.normal).is_finite())
    {
        return Err(GeometryError::NonFinite("mesh"));
    }
    mesh.normalize_uvs();
    Ok(mesh)
}

fn fit_bevel(
    bevel: &BevelDescriptor,
    thickness: f32,
    capability: &RenderingCapabilityProfile,
) -> Result<BevelDescriptor, GeometryError> {
    if bevel.is_flat() {
        return Ok(BevelDescriptor::FLAT);
    }
    if !bevel.bevel_size.is_finite() || !bevel.bevel_thickness.is_finite() {
        return Err(GeometryError::NonFinite("bevel"));
    }
    if 2.0 * bevel.bevel_thickness > thickness + EPSILON {
        return Err(GeometryError::BevelTooDeep {
            bevel_thickness: bevel.bevel_thickness,
            thickness,
        });
    }
    Ok(BevelDescriptor {
        bevel_size: bevel.bevel_size,
        bevel_thickness: bevel.bevel_thickness.min(thickness * 0.5),
        bevel_segments: bevel
            .bevel_segments
            .min(capability.max_bevel_segments)
            .max(1),
    })
}

fn build_columns(points: &[Vec2]) -> Vec<Column> {
    let n = points.len();
    let edge_normal = |i: usize| {
        let d = (points[(i + 1) % n] - points[i]).normalize_or_zero();
        Vec2::new(d.y, -d.x)
    };

    let mut columns = Vec::with_capacity(n + 8);
    for (i, &point) in points.iter().enumerate() {
        let n_in = edge_normal((i + n - 1) % n);
        let n_out = edge_normal(i);
        let bisector = (n_in + n_out).normalize_or_zero();
        let cos_half = bisector.dot(n_out);
        let miter = if cos_half > 1e-3 { bisector / cos_half } else { n_out };

        if n_in.dot(n_out) < SHARP_TURN_COS {
            columns.push(Column { point, miter, normal: n_in });
            columns.push(Column { point, miter, normal: n_out });
        } else {
            columns.push(Column { point, miter, normal: bisector });
        }
    }
    columns
}

/// Reject insets that would reverse any edge (the outline turning inside out).
fn check_inset(columns: &[Column], inset: f32) -> Result<(), GeometryError> {
    let m = columns.len();
    for j in 0..m {
        let (a, b) = (columns[j], columns[(j + 1) % m]);
        let edge = b.point - a.point;
        if edge.length_squared() <= EPSILON * EPSILON {
            continue;
        }
        let inner = (b.point - b.miter * inset) - (a.point - a.miter * inset);
        if inner.dot(edge) <= 0.0 {
            return Err(GeometryError::InsetCollapse(inset));
        }
    }
    Ok(())
}

fn profile_samples(thickness: f32, bevel: &BevelDescriptor) -> Vec<ProfileSample> {
    let half = thickness * 0.5;
    if bevel.is_flat() {
        let wall = |y| ProfileSample {
            y,
            inset: 0.0,
            horizontal: 1.0,
            vertical: 0.0,
        };
        return vec![wall(-half), wall(half)];
    }

    let (size, depth) = (bevel.bevel_size, bevel.bevel_thickness);
    let steps = bevel.bevel_segments;
    let mut samples = Vec::with_capacity(2 * steps as usize + 2);

    for s in 0..=steps {
        let theta = FRAC_PI_2 * (1.0 - s as f32 / steps as f32);
        let (sin, cos) = theta.sin_cos();
        samples.push(ProfileSample {
            y: -(half - depth) - depth * sin,
            inset: size * (1.0 - cos),
            horizontal: depth * cos,
            vertical: -size * sin,
        });
    }
    for s in 0..=steps {
        let theta = FRAC_PI_2 * s as f32 / steps as f32;
        let (sin, cos) = theta.sin_cos();
        samples.push(ProfileSample {
            y: (half - depth) + depth * sin,
            inset: size * (1.0 - cos),
            horizontal: depth * cos,
            vertical: size * sin,
        });
    }

    // A bevel exactly half the panel deep leaves no straight wall.
    samples.dedup_by(|a, b| (a.y - b.y).abs() < EPSILON && (a.inset - b.inset).abs() < EPSILON);
    for s in &mut samples {
        let len = (s.horizontal * s.horizontal + s.vertical * s.vertical).sqrt();
        if len > 0.0 {
            s.horizontal /= len;
            s.vertical /= len;
        }
    }
    samples
}

fn to_world(p: Vec2, y: f32) -> Vec3 {
    Vec3::new(p.x, y, p.y)
}

fn planar_uv(p: Vec2) -> [f32; 2] {
    [p.x, p.y]
}

fn push_walls(mesh: &mut Mesh, columns: &[Column], samples: &[ProfileSample]) {
    let m = columns.len();
    let base = mesh.vertices.len() as u32;

    for s in samples {
        for c in columns {
            let p = c.point - c.miter * s.inset;
            let n = c.normal * s.horizontal;
            mesh.vertices.push(MeshVertex::new(
                to_world(p, s.y),
                Vec3::new(n.x, s.vertical, n.y).normalize_or_zero(),
                planar_uv(p),
            ));
        }
    }

    for k in 0..samples.len() - 1 {
        for j in 0..m {
            let jn = (j + 1) % m;
            if columns[j].point.distance(columns[jn].point) <= EPSILON {
                continue;
            }
            let idx = |ring: usize, col: usize| base + (ring * m + col) as u32;
            let (a, b) = (idx(k, j), idx(k, jn));
            let (c, d) = (idx(k + 1, jn), idx(k + 1, j));
            mesh.indices.extend_from_slice(&[a, c, b, a, d, c]);
        }
    }
}

/// Fan-triangulate a cap from its centroid. Outlines here are convex.
fn push_cap(mesh: &mut Mesh, columns: &[Column], y: f32, inset: f32, top: bool) {
    let mut rim: Vec<Vec2> = Vec::with_capacity(columns.len());
    for c in columns {
        let p = c.point - c.miter * inset;
        if rim.last().is_none_or(|last| last.distance(p) > EPSILON) {
            rim.push(p);
        }
    }
    if rim.len() > 1 && rim[0].distance(rim[rim.len() - 1]) <= EPSILON {
        rim.pop();
    }

    let normal = if top { Vec3::Y } else { Vec3::NEG_Y };
    let centroid = rim.iter().copied().sum::<Vec2>() / rim.len() as f32;
    let center = mesh.vertices.len() as u32;
    mesh.vertices
        .push(MeshVertex::new(to_world(centroid, y), normal, planar_uv(centroid)));
    for p in &rim {
        mesh.vertices.push(MeshVertex::new(to_world(*p, y), normal, planar_uv(*p)));
    }

    let n = rim.len() as u32;
    for i in 0..n {
        let curr = center + 1 + i;
        let next = center + 1 + (i + 1) % n;
        if top {
            mesh.indices.extend_from_slice(&[center, next, curr]);
        } else {
            mesh.indices.extend_from_slice(&[center, curr, next]);
        }
    }
}
