//! # Shapes — Placeholder Primitives
//!
//! When something can't be built or loaded the configurator still has to
//! show *something* of the right rough size: a flat box stands in for a top
//! whose outline was invalid, a thin cylinder stands in for a base asset
//! that failed to load.
//!
//! ## Winding Order and Normals
//!
//! All triangles use counter-clockwise (CCW) winding when viewed from the
//! front face, matching the renderer's `FrontFace::Ccw` with back-face
//! culling. Flat faces get their own vertices so that an edge shared by two
//! faces can carry two different normals.
//!
//! For a box, each face needs its own set of 4 vertices (24 total) even
//! though a box has only 8 unique positions.

use std::f32::consts::TAU;

use super::mesh::{Mesh, MeshVertex};
use crate::math::Vec3;

/// A box centered at the origin with the given full extents.
///
/// 24 vertices, 36 indices. Each face maps the full `[0,1]²` UV square.
pub fn cuboid(size: Vec3) -> Mesh {
    let half = size * 0.5;
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    // (normal, u direction, v direction) with u × v = normal.
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let corners = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    for (normal, u_dir, v_dir) in faces {
        let base = vertices.len() as u32;
        for (corner, uv) in corners.iter().zip(uvs) {
            let offset = normal + u_dir * corner[0] + v_dir * corner[1];
            vertices.push(MeshVertex::new(offset * half, normal, uv));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh::new(vertices, indices)
}

/// A closed cylinder around the Y axis, centered at the origin.
///
/// Side quads have smooth radial normals; each cap is a center fan with a
/// flat normal.
pub fn cylinder(radius: f32, height: f32, segments: u32) -> Mesh {
    let seg = segments.max(3);
    let half = height * 0.5;
    let mut vertices = Vec::with_capacity(((seg + 1) * 2 + (seg + 1) * 2) as usize);
    let mut indices = Vec::with_capacity((seg * 12) as usize);

    // Angle runs from +X toward −Z so the sequence is CCW seen from above.
    let ring = |i: u32| {
        let theta = i as f32 / seg as f32 * TAU;
        Vec3::new(theta.cos(), 0.0, -theta.sin())
    };

    for i in 0..=seg {
        let dir = ring(i);
        let u = i as f32 / seg as f32;
        vertices.push(MeshVertex::new(dir * radius + Vec3::Y * half, dir, [u, 0.0]));
        vertices.push(MeshVertex::new(dir * radius - Vec3::Y * half, dir, [u, 1.0]));
    }
    for i in 0..seg {
        let top0 = i * 2;
        let bot0 = top0 + 1;
        let top1 = top0 + 2;
        let bot1 = top0 + 3;
        indices.extend_from_slice(&[top0, bot0, bot1, top0, bot1, top1]);
    }

    for (y, normal) in [(half, Vec3::Y), (-half, Vec3::NEG_Y)] {
        let center = vertices.len() as u32;
        vertices.push(MeshVertex::new(Vec3::Y * y, normal, [0.5, 0.5]));
        for i in 0..seg {
            let dir = ring(i);
            vertices.push(MeshVertex::new(
                dir * radius + Vec3::Y * y,
                normal,
                [0.5 + dir.x * 0.5, 0.5 + dir.z * 0.5],
            ));
        }
        for i in 0..seg {
            let curr = center + 1 + i;
            let next = center + 1 + (i + 1) % seg;
            if normal.y > 0.0 {
                indices.extend_from_slice(&[center, curr, next]);
            } else {
                indices.extend_from_slice(&[center, next, curr]);
            }
        }
    }

    Mesh::new(vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_faces_match_normals(mesh: &Mesh) {
        for (i, face) in mesh.face_normals() {
            let tri = &mesh.indices[i * 3..i * 3 + 3];
            let n = Vec3::from(mesh.vertices[tri[0] as usize].normal);
            assert!(face.dot(n) > 0.0, "triangle {i} winds against its normal");
        }
    }

    #[test]
    fn cuboid_has_correct_counts() {
        let mesh = cuboid(Vec3::ONE);
        assert_eq!(mesh.vertices.len(), 24, "4 vertices per face");
        assert_eq!(mesh.indices.len(), 36, "6 indices per face");
    }

    #[test]
    fn cuboid_extents_match_size() {
        let b = cuboid(Vec3::new(2.0, 0.02, 1.0)).bounds();
        assert!((b.size() - Vec3::new(2.0, 0.02, 1.0)).length() < 1e-6);
        assert!(b.center().length() < 1e-6, "centered at origin");
    }

    #[test]
    fn cuboid_winding_faces_outward() {
        assert_faces_match_normals(&cuboid(Vec3::new(2.0, 0.1, 1.0)));
    }

    #[test]
    fn cylinder_indices_in_range() {
        let mesh = cylinder(0.1, 1.0, 32);
        for &idx in &mesh.indices {
            assert!((idx as usize) < mesh.vertices.len(), "index {idx} out of range");
        }
        assert_eq!(mesh.indices.len(), 32 * 12);
    }

    #[test]
    fn cylinder_winding_faces_outward() {
        assert_faces_match_normals(&cylinder(0.1, 1.0, 16));
    }

    #[test]
    fn cylinder_normals_are_unit_length() {
        for v in &cylinder(0.5, 0.5, 16).vertices {
            let len = Vec3::from(v.normal).length();
            assert!((len - 1.0).abs() < 1e-5, "normal should be unit length, got {len}");
        }
    }
}
