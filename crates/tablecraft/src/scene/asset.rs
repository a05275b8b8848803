//! # Assets — Loading Base and Top Models
//!
//! Bases (and optionally tops) are glTF 2.0 models, usually single-file
//! `.glb`. Only geometry is extracted; every mesh gets a material chosen by
//! the composer, so embedded images and materials are ignored.
//!
//! ## What We Extract
//!
//! For each triangle primitive reachable from the default scene:
//! - **Positions**: `POSITION` → `MeshVertex.position` (required)
//! - **Normals**: `NORMAL`, or smooth normals computed from the faces
//! - **UVs**: `TEXCOORD_0`, or `[0, 0]`
//! - **Indices**: the index accessor, or `0..n` for non-indexed primitives
//!
//! Node transforms are baked into the vertices, so an [`AssetTemplate`] is a
//! flat list of meshes in model space. Its [`bounds`](AssetTemplate::bounds)
//! are what the composer measures.
//!
//! ## Comparison
//!
//! - **three.js**: `GLTFLoader` returns the full scene graph; the box is
//!   computed by traversing it (`Box3.setFromObject`).
//! - **Our approach**: flatten once at load time. The template never
//!   changes afterwards, so measuring is a fold over vertex positions.

use std::path::{Path, PathBuf};

use crate::geometry::{Mesh, MeshVertex};
use crate::math::{BoundingExtent, Mat4, Vec3};
use crate::task::CancelToken;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid glTF: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("model has no triangle geometry")]
    NoGeometry,
    #[error("mesh `{0}` has no positions")]
    MissingPositions(String),
    #[error("asset load canceled")]
    Canceled,
    #[error("cannot start loader thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// A loaded model: meshes with node transforms already applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetTemplate {
    pub parts: Vec<Mesh>,
}

impl AssetTemplate {
    pub fn from_meshes(parts: Vec<Mesh>) -> Self {
        Self { parts }
    }

    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes, path.parent())
    }

    /// Parse a `.glb` or `.gltf` held in memory. External buffers resolve
    /// against `base_dir`.
    pub fn from_slice(bytes: &[u8], base_dir: Option<&Path>) -> Result<Self, AssetError> {
        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
        let buffers = gltf::import_buffers(&document, base_dir, blob)?;

        let mut parts = Vec::new();
        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => {
                for node in scene.nodes() {
                    collect_node(&node, Mat4::IDENTITY, &buffers, &mut parts)?;
                }
            }
            // No scene: take every mesh as-is.
            None => {
                for mesh in document.meshes() {
                    collect_mesh(&mesh, &Mat4::IDENTITY, &buffers, &mut parts)?;
                }
            }
        }

        if parts.iter().all(Mesh::is_empty) {
            return Err(AssetError::NoGeometry);
        }
        Ok(Self { parts })
    }

    pub fn bounds(&self) -> BoundingExtent {
        self.parts
            .iter()
            .map(Mesh::bounds)
            .fold(BoundingExtent::EMPTY, BoundingExtent::union)
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|m| m.vertices.len()).sum()
    }
}

fn collect_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    parts: &mut Vec<Mesh>,
) -> Result<(), AssetError> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, &world, buffers, parts)?;
    }
    for child in node.children() {
        collect_node(&child, world, buffers, parts)?;
    }
    Ok(())
}

fn collect_mesh(
    mesh: &gltf::Mesh<'_>,
    world: &Mat4,
    buffers: &[gltf::buffer::Data],
    parts: &mut Vec<Mesh>,
) -> Result<(), AssetError> {
    let name = mesh.name().unwrap_or("<unnamed>");
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::debug!("Skipping non-triangle primitive in mesh `{name}`");
            continue;
        }
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| AssetError::MissingPositions(name.to_string()))?
            .collect();
        let uvs: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|iter| iter.into_f32().collect())
            .unwrap_or_default();
        let normals: Vec<[f32; 3]> = reader.read_normals().map(Iterator::collect).unwrap_or_default();
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        let count = positions.len() as u32;
        if indices.iter().any(|&i| i >= count) {
            log::warn!("Mesh `{name}` has out-of-range indices; skipping primitive");
            continue;
        }

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, &position)| MeshVertex {
                position,
                normal: normals.get(i).copied().unwrap_or([0.0, 0.0, 0.0]),
                uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect();
        let mut part = Mesh::new(vertices, indices);
        if normals.len() != positions.len() {
            smooth_normals(&mut part);
        }
        part.transform(world);
        parts.push(part);
    }
    Ok(())
}

/// Area-weighted vertex normals from the triangle faces.
fn smooth_normals(mesh: &mut Mesh) {
    let mut sums = vec![Vec3::ZERO; mesh.vertices.len()];
    let faces: Vec<_> = mesh.face_normals().collect();
    for (face, normal) in faces {
        for &i in &mesh.indices[face * 3..face * 3 + 3] {
            sums[i as usize] += normal;
        }
    }
    for (vertex, sum) in mesh.vertices.iter_mut().zip(sums) {
        vertex.normal = sum.try_normalize().unwrap_or(Vec3::Y).to_array();
    }
}

/// Loads model files for the composer's background slots.
pub trait AssetLoader: Send + Sync {
    fn load(&self, path: &Path, token: &CancelToken) -> Result<AssetTemplate, AssetError>;
}

/// Reads glTF/GLB files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfFileLoader;

impl AssetLoader for GltfFileLoader {
    fn load(&self, path: &Path, token: &CancelToken) -> Result<AssetTemplate, AssetError> {
        if token.is_canceled() {
            return Err(AssetError::Canceled);
        }
        let template = AssetTemplate::load(path)?;
        log::info!(
            "Loaded {} ({} meshes, {} vertices)",
            path.display(),
            template.parts.len(),
            template.vertex_count()
        );
        Ok(template)
    }
}
