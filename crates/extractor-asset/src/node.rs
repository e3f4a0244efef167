use glam::{Mat4, Quat, Vec3};

use crate::mesh::MeshAttribute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecomposedTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for DecomposedTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl From<DecomposedTransform> for Mat4 {
    fn from(value: DecomposedTransform) -> Self {
        Mat4::from_scale_rotation_translation(value.scale, value.rotation, value.translation)
    }
}

/// Skeleton attribute of a node. The node's own name is the bone name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkeletonAttribute;

#[derive(Debug, Clone, Default)]
pub enum NodeAttribute {
    #[default]
    Null,
    Skeleton(SkeletonAttribute),
    Mesh(MeshAttribute),
}

impl NodeAttribute {
    pub fn is_skeleton(&self) -> bool {
        matches!(self, NodeAttribute::Skeleton(_))
    }

    pub fn as_mesh(&self) -> Option<&MeshAttribute> {
        match self {
            NodeAttribute::Mesh(mesh) => Some(mesh),
            NodeAttribute::Null | NodeAttribute::Skeleton(_) => None,
        }
    }
}
