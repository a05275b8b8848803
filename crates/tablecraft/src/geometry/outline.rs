//! # Shape Generator — Closed Table Outlines
//!
//! Every generated table top starts life as a closed 2D outline in the
//! horizontal plane. This module turns a [`ShapeSpec`] (centimeters) into a
//! [`PlanarOutline`] (meters) made of straight lines, circular arcs, and cubic
//! Bézier curves.
//!
//! ## Coordinates
//!
//! The outline lives in a 2D `(x, y)` plane centered on the origin. The solid
//! builder maps it onto the world floor as `(x, z)`. Outlines are always
//! counter-clockwise in that 2D plane.
//!
//! ```text
//!          y
//!          ▲     ╭──────────────╮
//!          │     │              │   rounded rectangle:
//!          │     │      ·───────┼─► x   4 lines + 4 quarter arcs
//!          │     │              │
//!                ╰──────────────╯
//! ```
//!
//! ## Corner Radius Clamp
//!
//! Square and rectangular tops accept a corner radius, clamped to a quarter of
//! the shortest side. A requested radius above the clamp simply uses the
//! clamp value, so a 200×100 cm top with a 30 cm request gets 25 cm corners.
//!
//! ## Ovals
//!
//! An ellipse can't be drawn exactly with circular arcs, so ovals use the
//! standard four-cubic approximation: each quarter has control points pulled
//! out along the tangents by κ ≈ 0.5523 times the semi-axis. The radial
//! error is under 0.03%.
//!
//! ## Comparison
//!
//! - **three.js**: `THREE.Shape` with `absarc`, `lineTo`, `bezierCurveTo`,
//!   then `getPoints(divisions)` to flatten.
//! - **lyon / kurbo**: `BezPath` with `PathEl::{LineTo, CurveTo}` and a
//!   tolerance-based flattener.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Cubic Bézier handle length for a quarter ellipse, relative to the semi-axis.
pub const KAPPA: f32 = 0.552_284_75;

/// Centimeters per meter. Parameters come in centimeters, geometry is in meters.
pub const CM_PER_M: f32 = 100.0;

const CLOSE_EPSILON: f32 = 1e-5;

/// A parametric table-top shape. All dimensions are centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ShapeSpec {
    Round { radius: f32 },
    Square { side_length: f32, corner_radius: f32 },
    Rectangular { length: f32, width: f32, corner_radius: f32 },
    Oval { major_diameter: f32, minor_diameter: f32 },
}

impl ShapeSpec {
    /// The largest corner radius the shape accepts, in centimeters.
    pub fn corner_radius_limit(&self) -> f32 {
        match *self {
            Self::Square { side_length, .. } => side_length / 4.0,
            Self::Rectangular { length, width, .. } => length.min(width) / 4.0,
            Self::Round { .. } | Self::Oval { .. } => 0.0,
        }
    }

    /// The corner radius actually used, in centimeters: the request clamped to
    /// `[0, limit]`. Negative or non-finite requests mean sharp corners.
    pub fn effective_corner_radius(&self) -> f32 {
        let requested = match *self {
            Self::Square { corner_radius, .. } | Self::Rectangular { corner_radius, .. } => {
                corner_radius
            }
            Self::Round { .. } | Self::Oval { .. } => return 0.0,
        };
        if !requested.is_finite() || requested <= 0.0 {
            return 0.0;
        }
        requested.min(self.corner_radius_limit())
    }

    /// Full footprint along outline x and y, in meters.
    pub fn footprint(&self) -> Vec2 {
        let cm = match *self {
            Self::Round { radius } => Vec2::splat(radius * 2.0),
            Self::Square { side_length, .. } => Vec2::splat(side_length),
            Self::Rectangular { length, width, .. } => Vec2::new(length, width),
            Self::Oval {
                major_diameter,
                minor_diameter,
            } => Vec2::new(major_diameter, minor_diameter),
        };
        cm / CM_PER_M
    }

    fn has_valid_dimensions(&self) -> bool {
        let dims = match *self {
            Self::Round { radius } => [radius, radius],
            Self::Square { side_length, .. } => [side_length, side_length],
            Self::Rectangular { length, width, .. } => [length, width],
            Self::Oval {
                major_diameter,
                minor_diameter,
            } => [major_diameter, minor_diameter],
        };
        dims.iter().all(|d| d.is_finite() && *d > 0.0)
    }
}

/// One piece of an outline, continuing from the previous segment's end point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line {
        to: Vec2,
    },
    /// Counter-clockwise circular arc from `start_angle` to `end_angle` (radians).
    Arc {
        center: Vec2,
        radius: f32,
        start_angle: f32,
        end_angle: f32,
    },
    Cubic {
        ctrl1: Vec2,
        ctrl2: Vec2,
        to: Vec2,
    },
}

impl Segment {
    pub fn end_point(&self) -> Vec2 {
        match *self {
            Self::Line { to } | Self::Cubic { to, .. } => to,
            Self::Arc {
                center,
                radius,
                end_angle,
                ..
            } => center + Vec2::from_angle(end_angle) * radius,
        }
    }
}

/// A closed planar outline in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarOutline {
    start: Vec2,
    segments: Vec<Segment>,
}

impl PlanarOutline {
    pub fn start(&self) -> Vec2 {
        self.start
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn end_point(&self) -> Vec2 {
        self.segments.last().map_or(self.start, Segment::end_point)
    }

    pub fn is_closed(&self) -> bool {
        !self.segments.is_empty() && self.end_point().distance(self.start) < CLOSE_EPSILON
    }

    /// Flatten into a polygon without a repeated closing point.
    ///
    /// A full circle gets `curve_segments` points; shorter arcs get a
    /// proportional share (at least 4). Each cubic gets a quarter of
    /// `curve_segments`, so a four-cubic oval matches a circle's density.
    pub fn flatten(&self, curve_segments: u32) -> Vec<Vec2> {
        let curve_segments = curve_segments.max(8);
        let mut points = vec![self.start];
        let mut cursor = self.start;

        for segment in &self.segments {
            match *segment {
                Segment::Line { to } => points.push(to),
                Segment::Arc {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                } => {
                    let sweep = end_angle - start_angle;
                    let steps = ((curve_segments as f32 * sweep.abs() / TAU).ceil() as u32).max(4);
                    for i in 1..=steps {
                        let angle = start_angle + sweep * i as f32 / steps as f32;
                        points.push(center + Vec2::from_angle(angle) * radius);
                    }
                }
                Segment::Cubic { ctrl1, ctrl2, to } => {
                    let steps = (curve_segments / 4).max(4);
                    for i in 1..=steps {
                        let t = i as f32 / steps as f32;
                        points.push(cubic_point(cursor, ctrl1, ctrl2, to, t));
                    }
                }
            }
            cursor = segment.end_point();
        }

        points.dedup_by(|a, b| a.distance(*b) < CLOSE_EPSILON);
        if points.len() > 1
            && points
                .last()
                .is_some_and(|last| last.distance(points[0]) < CLOSE_EPSILON)
        {
            points.pop();
        }
        points
    }

    /// Axis-aligned bounds of the flattened outline as `(min, max)`.
    pub fn bounds(&self) -> (Vec2, Vec2) {
        self.flatten(256).iter().fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(lo, hi), p| (lo.min(*p), hi.max(*p)),
        )
    }
}

fn cubic_point(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
}

/// Signed area of a polygon; positive for counter-clockwise winding.
pub fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum::<f32>()
        * 0.5
}

/// Build the closed outline for `shape`, or `None` if any dimension is
/// missing, non-positive or non-finite.
pub fn generate_outline(shape: &ShapeSpec) -> Option<PlanarOutline> {
    if !shape.has_valid_dimensions() {
        return None;
    }
    let half = shape.footprint() * 0.5;
    let outline = match *shape {
        ShapeSpec::Round { .. } => circle(half.x),
        ShapeSpec::Square { .. } | ShapeSpec::Rectangular { .. } => {
            rounded_rect(half, shape.effective_corner_radius() / CM_PER_M)
        }
        ShapeSpec::Oval { .. } => ellipse(half),
    };
    Some(outline)
}

fn circle(radius: f32) -> PlanarOutline {
    PlanarOutline {
        start: Vec2::new(radius, 0.0),
        segments: vec![Segment::Arc {
            center: Vec2::ZERO,
            radius,
            start_angle: 0.0,
            end_angle: TAU,
        }],
    }
}

fn rounded_rect(half: Vec2, radius: f32) -> PlanarOutline {
    let (hx, hy) = (half.x, half.y);
    if radius <= 0.0 {
        return PlanarOutline {
            start: Vec2::new(-hx, -hy),
            segments: vec![
                Segment::Line { to: Vec2::new(hx, -hy) },
                Segment::Line { to: Vec2::new(hx, hy) },
                Segment::Line { to: Vec2::new(-hx, hy) },
                Segment::Line { to: Vec2::new(-hx, -hy) },
            ],
        };
    }

    let r = radius;
    let corner = |center: Vec2, start_angle: f32| Segment::Arc {
        center,
        radius: r,
        start_angle,
        end_angle: start_angle + FRAC_PI_2,
    };
    PlanarOutline {
        start: Vec2::new(-hx + r, -hy),
        segments: vec![
            Segment::Line { to: Vec2::new(hx - r, -hy) },
            corner(Vec2::new(hx - r, -hy + r), -FRAC_PI_2),
            Segment::Line { to: Vec2::new(hx, hy - r) },
            corner(Vec2::new(hx - r, hy - r), 0.0),
            Segment::Line { to: Vec2::new(-hx + r, hy) },
            corner(Vec2::new(-hx + r, hy - r), FRAC_PI_2),
            Segment::Line { to: Vec2::new(-hx, -hy + r) },
            corner(Vec2::new(-hx + r, -hy + r), PI),
        ],
    }
}

fn ellipse(half: Vec2) -> PlanarOutline {
    let (a, b) = (half.x, half.y);
    let (ka, kb) = (KAPPA * a, KAPPA * b);
    PlanarOutline {
        start: Vec2::new(a, 0.0),
        segments: vec![
            Segment::Cubic {
                ctrl1: Vec2::new(a, kb),
                ctrl2: Vec2::new(ka, b),
                to: Vec2::new(0.0, b),
            },
            Segment::Cubic {
                ctrl1: Vec2::new(-ka, b),
                ctrl2: Vec2::new(-a, kb),
                to: Vec2::new(-a, 0.0),
            },
            Segment::Cubic {
                ctrl1: Vec2::new(-a, -kb),
                ctrl2: Vec2::new(-ka, -b),
                to: Vec2::new(0.0, -b),
            },
            Segment::Cubic {
                ctrl1: Vec2::new(ka, -b),
                ctrl2: Vec2::new(a, -kb),
                to: Vec2::new(a, 0.0),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32, what: &str) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "{what}: expected {expected}, got {actual}"
        );
    }

    fn sample_shapes() -> Vec<ShapeSpec> {
        vec![
            ShapeSpec::Round { radius: 100.0 },
            ShapeSpec::Square { side_length: 150.0, corner_radius: 5.0 },
            ShapeSpec::Square { side_length: 150.0, corner_radius: 0.0 },
            ShapeSpec::Rectangular { length: 200.0, width: 100.0, corner_radius: 30.0 },
            ShapeSpec::Oval { major_diameter: 200.0, minor_diameter: 120.0 },
        ]
    }

    #[test]
    fn round_radius_100_is_one_meter_circle() {
        let outline = generate_outline(&ShapeSpec::Round { radius: 100.0 }).unwrap();
        assert!(outline.is_closed());
        assert_eq!(outline.segments().len(), 1, "one exact arc");
        let (lo, hi) = outline.bounds();
        assert_close(lo.x, -1.0, "min x");
        assert_close(hi.x, 1.0, "max x");
        assert_close(lo.y, -1.0, "min y");
        assert_close(hi.y, 1.0, "max y");
        for p in outline.flatten(128) {
            assert_close(p.length(), 1.0, "circle point radius");
        }
    }

    #[test]
    fn rectangular_radius_is_clamped_to_quarter_of_short_side() {
        let shape = ShapeSpec::Rectangular { length: 200.0, width: 100.0, corner_radius: 30.0 };
        assert_close(shape.effective_corner_radius(), 25.0, "effective radius");

        let outline = generate_outline(&shape).unwrap();
        let arc_radii: Vec<f32> = outline
            .segments()
            .iter()
            .filter_map(|s| match s {
                Segment::Arc { radius, .. } => Some(*radius),
                _ => None,
            })
            .collect();
        assert_eq!(arc_radii.len(), 4, "one arc per corner");
        for r in arc_radii {
            assert_close(r, 0.25, "arc radius in meters");
        }
    }

    #[test]
    fn rounded_corners_keep_the_silhouette_size() {
        let outline = generate_outline(&ShapeSpec::Rectangular {
            length: 200.0,
            width: 100.0,
            corner_radius: 5.0,
        })
        .unwrap();
        let (lo, hi) = outline.bounds();
        assert_close(hi.x - lo.x, 2.0, "length");
        assert_close(hi.y - lo.y, 1.0, "width");
    }

    #[test]
    fn zero_radius_gives_four_sharp_corners() {
        let outline = generate_outline(&ShapeSpec::Square { side_length: 150.0, corner_radius: 0.0 }).unwrap();
        assert_eq!(outline.segments().len(), 4);
        assert!(outline.segments().iter().all(|s| matches!(s, Segment::Line { .. })));
        assert_eq!(outline.flatten(128).len(), 4, "closing point is not repeated");
    }

    #[test]
    fn oval_spans_both_diameters() {
        let outline = generate_outline(&ShapeSpec::Oval { major_diameter: 200.0, minor_diameter: 120.0 }).unwrap();
        let (lo, hi) = outline.bounds();
        assert_close(lo.x, -1.0, "major semi-axis");
        assert_close(hi.x, 1.0, "major semi-axis");
        assert_close(lo.y, -0.6, "minor semi-axis");
        assert_close(hi.y, 0.6, "minor semi-axis");
    }

    #[test]
    fn outlines_are_closed_and_counter_clockwise() {
        for shape in sample_shapes() {
            let outline = generate_outline(&shape).unwrap();
            assert!(outline.is_closed(), "{shape:?} should be closed");
            let points = outline.flatten(128);
            assert!(signed_area(&points) > 0.0, "{shape:?} should wind CCW");
        }
    }

    #[test]
    fn flatten_has_no_repeated_points() {
        for shape in sample_shapes() {
            let points = generate_outline(&shape).unwrap().flatten(64);
            for i in 0..points.len() {
                let next = points[(i + 1) % points.len()];
                assert!(points[i].distance(next) > 1e-6, "{shape:?}: repeated point at {i}");
            }
        }
    }

    #[test]
    fn invalid_dimensions_yield_none() {
        assert!(generate_outline(&ShapeSpec::Round { radius: 0.0 }).is_none());
        assert!(generate_outline(&ShapeSpec::Round { radius: f32::NAN }).is_none());
        assert!(
            generate_outline(&ShapeSpec::Rectangular { length: 200.0, width: -1.0, corner_radius: 0.0 })
                .is_none()
        );
    }

    #[test]
    fn negative_corner_radius_means_sharp() {
        let shape = ShapeSpec::Square { side_length: 100.0, corner_radius: -3.0 };
        assert_eq!(shape.effective_corner_radius(), 0.0);
    }

    #[test]
    fn generation_is_pure() {
        for shape in sample_shapes() {
            assert_eq!(generate_outline(&shape), generate_outline(&shape));
        }
    }
}
