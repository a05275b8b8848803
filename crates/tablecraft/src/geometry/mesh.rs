//! CPU-side triangle meshes.
//!
//! [`MeshVertex`] matches the GPU vertex layout byte for byte (position,
//! normal, UV = 32 bytes), so a [`Mesh`] uploads with a single
//! `bytemuck::cast_slice`. Triangles wind counter-clockwise when seen from
//! the side their normals point to.

use bytemuck::{Pod, Zeroable};

use crate::math::{BoundingExtent, Mat4, Vec3};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        }
    }
}

/// An indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> BoundingExtent {
        BoundingExtent::from_points(self.vertices.iter().map(|v| Vec3::from(v.position)))
    }

    /// Append another mesh, offsetting its indices.
    pub fn append(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Bake `matrix` into positions and normals.
    pub fn transform(&mut self, matrix: &Mat4) {
        let normal_matrix = matrix.inverse().transpose();
        for v in &mut self.vertices {
            v.position = matrix.transform_point3(Vec3::from(v.position)).to_array();
            v.normal = normal_matrix
                .transform_vector3(Vec3::from(v.normal))
                .normalize_or_zero()
                .to_array();
        }
        // A mirroring transform flips the winding.
        if matrix.determinant() < 0.0 {
            for tri in self.indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }
    }

    /// Remap UVs so their bounding box becomes exactly `[0, 1]²`.
    ///
    /// An axis with no extent maps to 0.
    pub fn normalize_uvs(&mut self) {
        if self.vertices.is_empty() {
            return;
        }
        let mut lo = [f32::INFINITY; 2];
        let mut hi = [f32::NEG_INFINITY; 2];
        for v in &self.vertices {
            for axis in 0..2 {
                lo[axis] = lo[axis].min(v.uv[axis]);
                hi[axis] = hi[axis].max(v.uv[axis]);
            }
        }
        for v in &mut self.vertices {
            for axis in 0..2 {
                let range = hi[axis] - lo[axis];
                v.uv[axis] = if range > f32::EPSILON {
                    (v.uv[axis] - lo[axis]) / range
                } else {
                    0.0
                };
            }
        }
    }

    /// Per-triangle geometric normals (unnormalized cross products).
    pub fn face_normals(&self) -> impl Iterator<Item = (usize, Vec3)> + '_ {
        self.indices.chunks_exact(3).enumerate().map(|(i, tri)| {
            let p = |k: usize| Vec3::from(self.vertices[tri[k] as usize].position);
            (i, (p(1) - p(0)).cross(p(2) - p(0)))
        })
    }
}
