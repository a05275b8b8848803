//! # Lighting — The Showroom Rig and GPU Uniforms
//!
//! The configurator lights every table the same way a photo studio would:
//! a soft ambient fill, a key light, a weaker back light and a lamp above.
//!
//! ```text
//!                       point (0,10,0) 0.5
//!                             ●
//!   back (−5,5,−5) 0.5 ●      │      ● key (5,5,5) 1.0
//!                        ╲    │    ╱
//!                         ╲   │   ╱
//!                     ┌────────────┐
//!                     │   table    │   ambient 0.5 everywhere
//!                     └────────────┘
//! ```
//!
//! Directional lights shine from their position towards the origin.
//!
//! ## Uniform Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Group 0 — Camera (per frame)         view_proj + eye   80 B │
//! │ Group 1 — Lights (per frame)                          416 B │
//! │   ambient 16 B, 4 directional × 32 B, 8 point × 32 B,       │
//! │   counts 16 B                                               │
//! │ Group 2 — Material (per node)        color + params    32 B │
//! │ Group 3 — Model (per node, dynamic)  model + normal   128 B │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every struct is `#[repr(C)]` with explicit padding so each `vec3` starts
//! on a 16-byte boundary, matching WGSL's uniform layout rules.

use bytemuck::{Pod, Zeroable};

use crate::math::{Mat4, Rgb, Vec3};

pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;
pub const MAX_POINT_LIGHTS: usize = 8;

/// Background behind the table.
pub const CLEAR_COLOR: Rgb = Rgb::hex(0xF5F5F5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Where the light comes from; it points at the origin.
    pub position: Vec3,
    pub color: Rgb,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Rgb,
    pub intensity: f32,
    /// Cutoff distance; zero means unlimited.
    pub range: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightRig {
    pub ambient_color: Rgb,
    pub ambient_intensity: f32,
    pub directional: Vec<DirectionalLight>,
    pub points: Vec<PointLight>,
}

impl LightRig {
    pub fn showroom() -> Self {
        Self {
            ambient_color: Rgb::WHITE,
            ambient_intensity: 0.5,
            directional: vec![
                DirectionalLight {
                    position: Vec3::new(5.0, 5.0, 5.0),
                    color: Rgb::WHITE,
                    intensity: 1.0,
                },
                DirectionalLight {
                    position: Vec3::new(-5.0, 5.0, -5.0),
                    color: Rgb::WHITE,
                    intensity: 0.5,
                },
            ],
            points: vec![PointLight {
                position: Vec3::new(0.0, 10.0, 0.0),
                color: Rgb::WHITE,
                intensity: 0.5,
                range: 0.0,
            }],
        }
    }

    /// Pack for upload. Lights beyond the fixed capacity are dropped with a
    /// warning.
    pub fn to_uniform(&self) -> LightUniform {
        if self.directional.len() > MAX_DIRECTIONAL_LIGHTS || self.points.len() > MAX_POINT_LIGHTS {
            log::warn!(
                "Light rig has {} directional and {} point lights; only {MAX_DIRECTIONAL_LIGHTS} and {MAX_POINT_LIGHTS} are drawn",
                self.directional.len(),
                self.points.len()
            );
        }

        let mut uniform = LightUniform::zeroed();
        uniform.ambient_color = linear_rgb(self.ambient_color);
        uniform.ambient_intensity = self.ambient_intensity;

        for (slot, light) in uniform.directional.iter_mut().zip(&self.directional) {
            *slot = DirectionalLightData {
                direction: (-light.position).normalize_or_zero().to_array(),
                intensity: light.intensity,
                color: linear_rgb(light.color),
                _pad: 0.0,
            };
        }
        for (slot, light) in uniform.point_lights.iter_mut().zip(&self.points) {
            *slot = PointLightData {
                position: light.position.to_array(),
                radius: light.range,
                color: linear_rgb(light.color),
                intensity: light.intensity,
            };
        }
        uniform.directional_count = self.directional.len().min(MAX_DIRECTIONAL_LIGHTS) as u32;
        uniform.point_light_count = self.points.len().min(MAX_POINT_LIGHTS) as u32;
        uniform
    }
}

impl Default for LightRig {
    fn default() -> Self {
        Self::showroom()
    }
}

fn linear_rgb(color: Rgb) -> [f32; 3] {
    color.to_linear().truncate().to_array()
}

/// [`CLEAR_COLOR`] in linear light, for an sRGB render target.
pub fn clear_color_linear() -> [f64; 4] {
    let c = CLEAR_COLOR.to_linear();
    [c.x as f64, c.y as f64, c.z as f64, 1.0]
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4], // 64 bytes
    pub camera_pos: [f32; 3],     // 12 bytes
    pub _padding: f32,            // 4 bytes → total 80
}

impl CameraUniform {
    pub fn new(view_proj: Mat4, eye: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_pos: eye.to_array(),
            _padding: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct DirectionalLightData {
    pub direction: [f32; 3], // 12 bytes
    pub intensity: f32,      // 4 bytes
    pub color: [f32; 3],     // 12 bytes
    pub _pad: f32,           // 4 bytes → 32
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct PointLightData {
    pub position: [f32; 3], // 12 bytes
    pub radius: f32,        // 4 bytes
    pub color: [f32; 3],    // 12 bytes
    pub intensity: f32,     // 4 bytes → 32
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct LightUniform {
    pub ambient_color: [f32; 3], // 12 bytes
    pub ambient_intensity: f32,  // 4 bytes → 16

    pub directional: [DirectionalLightData; MAX_DIRECTIONAL_LIGHTS], // 128 bytes
    pub point_lights: [PointLightData; MAX_POINT_LIGHTS],            // 256 bytes

    pub directional_count: u32, // 4 bytes
    pub point_light_count: u32, // 4 bytes
    pub _pad: [u32; 2],         // 8 bytes → 16
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4], // 16 bytes
    pub metallic: f32,        // 4 bytes
    pub roughness: f32,       // 4 bytes
    pub _pad: [f32; 2],       // 8 bytes → 32
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],         // 64 bytes
    pub normal_matrix: [[f32; 4]; 4], // 64 bytes → total 128
}

impl ModelUniform {
    pub fn new(model: Mat4) -> Self {
        let normal = if model.determinant().abs() > f32::EPSILON {
            model.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal.to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_match_the_shader() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
        assert_eq!(std::mem::size_of::<LightUniform>(), 416);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 32);
        assert_eq!(std::mem::size_of::<ModelUniform>(), 128);
    }

    #[test]
    fn showroom_rig_packs_all_lights() {
        let uniform = LightRig::showroom().to_uniform();
        assert_eq!(uniform.ambient_intensity, 0.5);
        assert_eq!(uniform.directional_count, 2);
        assert_eq!(uniform.point_light_count, 1);
        assert_eq!(uniform.directional[0].intensity, 1.0);
        assert_eq!(uniform.directional[1].intensity, 0.5);
        assert_eq!(uniform.point_lights[0].position, [0.0, 10.0, 0.0]);
    }

    #[test]
    fn directional_lights_point_at_the_origin() {
        let uniform = LightRig::showroom().to_uniform();
        let key = Vec3::from(uniform.directional[0].direction);
        assert!((key - Vec3::splat(-1.0).normalize()).length() < 1e-6);
        assert!((key.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn excess_lights_are_dropped() {
        let mut rig = LightRig::showroom();
        rig.points = vec![rig.points[0]; MAX_POINT_LIGHTS + 3];
        assert_eq!(rig.to_uniform().point_light_count, MAX_POINT_LIGHTS as u32);
    }

    #[test]
    fn clear_color_is_a_light_gray() {
        let [r, g, b, a] = clear_color_linear();
        assert!((r - g).abs() < 1e-9 && (g - b).abs() < 1e-9);
        assert!(r > 0.9 && r < 1.0, "#f5f5f5 is about 0.91 in linear light, got {r}");
        assert_eq!(a, 1.0);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let uniform = ModelUniform::new(model);
        assert_eq!(uniform.normal_matrix[0][0], 0.5);
        assert_eq!(uniform.normal_matrix[1][1], 1.0);
    }
}
