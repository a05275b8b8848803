//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so callers don't need to
//! depend on it directly. [`Transform`] places scene nodes and
//! [`BoundingExtent`] is the axis-aligned box the composer measures assets
//! with before stacking one on top of another.

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// A 3D transform: position, rotation, and (possibly non-uniform) scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform (origin, no rotation, uniform scale of 1).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a transform at the given position.
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Self::IDENTITY
        }
    }

    /// Return a copy rotated about the vertical axis by `angle` radians.
    pub fn with_yaw(mut self, angle: f32) -> Self {
        self.rotation = Quat::from_rotation_y(angle) * self.rotation;
        self
    }

    /// Return a copy with a per-axis scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Compute the 4x4 model matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// An 8-bit sRGB color, as written in `#rrggbb` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Self = Self(255, 255, 255);

    /// Build from `0xRRGGBB`.
    pub const fn hex(value: u32) -> Self {
        Self((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }

    /// Linear-light RGBA with alpha 1, for shading.
    pub fn to_linear(self) -> Vec4 {
        fn channel(c: u8) -> f32 {
            let c = c as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        Vec4::new(channel(self.0), channel(self.1), channel(self.2), 1.0)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// An axis-aligned bounding box in world or local space.
///
/// Starts out [empty](Self::EMPTY) (min = +∞, max = −∞) so that including
/// the first point makes it exactly that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingExtent {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingExtent {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut extent = Self::EMPTY;
        for p in points {
            extent.include(p);
        }
        extent
    }

    pub fn include(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// True when nothing has been included yet (any min component above its max).
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// True when the box can't be used for placement: empty, non-finite, or
    /// collapsed to a single point.
    pub fn is_degenerate(&self) -> bool {
        self.is_empty()
            || !self.min.is_finite()
            || !self.max.is_finite()
            || self.size().max_element() <= f32::EPSILON
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Transform all eight corners and re-fit an axis-aligned box around them.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let (lo, hi) = (self.min, self.max);
        Self::from_points((0..8).map(|i| {
            let corner = Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            matrix.transform_point3(corner)
        }))
    }
}

impl Default for BoundingExtent {
    fn default() -> Self {
        Self::EMPTY
    }
}
