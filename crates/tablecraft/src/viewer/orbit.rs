//! # Orbit Camera — Turntable Controls Around the Table
//!
//! The camera sits on a sphere around a target point. Dragging moves it over
//! the sphere, scrolling changes the sphere's radius, and panning slides the
//! target sideways:
//!
//! ```text
//!              +Y
//!               │   polar angle θ (from +Y, ≤ 85°)
//!               │  ╱
//!               │ ╱  eye
//!               │╱ ● ─ ─ distance (2 m .. 10 m)
//!     target ───●──────────── +X
//!              ╱
//!             ╱ azimuth φ (around +Y, from +Z)
//!           +Z
//! ```
//!
//! The polar bound keeps the eye above the floor plane, so customers never
//! look at the underside of the base.
//!
//! ## Comparison
//!
//! - **three.js `OrbitControls`**: the same spherical model, with
//!   `minDistance`/`maxDistance`/`maxPolarAngle` and damping.
//! - **Our approach**: no damping; every input applies immediately and the
//!   state is plain data, so the clamps are unit-testable.

use crate::math::{Mat4, Vec3};

/// Radians of rotation per pixel of drag, relative to the viewport height.
const ROTATE_SPEED: f32 = 1.0;
/// Distance factor per scroll line.
const ZOOM_STEP: f32 = 0.95;
/// Keeps the eye off the pole, where `look_at` degenerates.
const MIN_POLAR: f32 = 0.01;

const NEAR_PLANE: f32 = 0.05;
const FAR_PLANE: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitBounds {
    pub min_distance: f32,
    pub max_distance: f32,
    /// Largest angle between the view direction from above and +Y.
    pub max_polar: f32,
}

impl Default for OrbitBounds {
    fn default() -> Self {
        Self {
            min_distance: 2.0,
            max_distance: 10.0,
            max_polar: 85f32.to_radians(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    /// Rotation around +Y, zero when the eye is on +Z.
    pub azimuth: f32,
    /// Angle from +Y.
    pub polar: f32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub bounds: OrbitBounds,
}

impl OrbitCamera {
    /// Place the eye at `eye` looking at `target`, then apply the bounds.
    pub fn looking_at(eye: Vec3, target: Vec3, fov_degrees: f32, bounds: OrbitBounds) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(f32::EPSILON);
        let mut camera = Self {
            target,
            distance,
            azimuth: offset.x.atan2(offset.z),
            polar: (offset.y / distance).clamp(-1.0, 1.0).acos(),
            fov_y: fov_degrees.to_radians(),
            bounds,
        };
        camera.clamp();
        camera
    }

    /// The configurator's opening view: eye at (0, 1, 3) looking at the origin.
    pub fn configurator_default(fov_degrees: f32) -> Self {
        Self::looking_at(Vec3::new(0.0, 1.0, 3.0), Vec3::ZERO, fov_degrees, OrbitBounds::default())
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_p, cos_p) = self.polar.sin_cos();
        let (sin_a, cos_a) = self.azimuth.sin_cos();
        self.target + Vec3::new(sin_p * sin_a, cos_p, sin_p * cos_a) * self.distance
    }

    /// Drag by a pixel delta in a viewport `viewport_height` pixels tall.
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let scale = std::f32::consts::TAU * ROTATE_SPEED / viewport_height.max(1.0);
        self.azimuth -= dx * scale;
        self.polar -= dy * scale;
        self.clamp();
    }

    /// Positive `lines` moves closer.
    pub fn zoom(&mut self, lines: f32) {
        self.distance *= ZOOM_STEP.powf(lines);
        self.clamp();
    }

    /// Slide the target so the scene follows the cursor.
    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let world_per_pixel = 2.0 * self.distance * (self.fov_y * 0.5).tan() / viewport_height.max(1.0);
        let forward = (self.target - self.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        self.target += (up * dy - right * dx) * world_per_pixel;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect.max(f32::EPSILON), NEAR_PLANE, FAR_PLANE)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    fn clamp(&mut self) {
        let b = &self.bounds;
        self.distance = self.distance.clamp(b.min_distance, b.max_distance);
        self.polar = self.polar.clamp(MIN_POLAR, b.max_polar.max(MIN_POLAR));
    }
}
