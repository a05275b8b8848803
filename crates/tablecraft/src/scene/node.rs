//! What the viewer draws: a flat list of meshes with materials.

use std::sync::Arc;

use crate::geometry::Mesh;
use crate::math::{BoundingExtent, Mat4, Rgb, Vec4};
use crate::texture::SurfaceImage;

/// PBR material parameters, following glTF's metallic-roughness model.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Linear RGBA, multiplied with the texture when there is one.
    pub base_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
    pub texture: Option<Arc<SurfaceImage>>,
    /// Revision of the surface slot `texture` came from. The renderer
    /// re-uploads when it changes.
    pub texture_revision: u64,
}

impl Material {
    pub fn solid(color: Rgb, metallic: f32, roughness: f32) -> Self {
        Self {
            base_color: color.to_linear(),
            metallic,
            roughness,
            texture: None,
            texture_revision: 0,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::solid(Rgb::WHITE, 0.0, 0.5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Base,
    Top,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub role: NodeRole,
    pub mesh: Arc<Mesh>,
    pub transform: Mat4,
    pub material: Material,
}

impl SceneNode {
    /// World-space bounds of this node.
    pub fn bounds(&self) -> BoundingExtent {
        self.mesh.bounds().transformed(&self.transform)
    }
}

/// The composed table, ready to draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    /// False while the top is waiting for its placement; the viewer hides
    /// the top until then.
    pub positioned: bool,
    /// Bumped whenever nodes, transforms or materials change.
    pub revision: u64,
}

impl Scene {
    pub fn nodes_with_role(&self, role: NodeRole) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter().filter(move |n| n.role == role)
    }

    pub fn bounds(&self) -> BoundingExtent {
        self.nodes
            .iter()
            .map(SceneNode::bounds)
            .fold(BoundingExtent::EMPTY, BoundingExtent::union)
    }
}
