use std::{error::Error, path::Path};

use glam::Mat4;

use crate::{
    animation::AnimationStackInfo,
    node::{NodeAttribute, NodeId},
    time::{SceneTime, TimeMode},
    topology::TopologyError,
};

/// Up axis of a scene's coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AxisConvention {
    #[default]
    YUp,
    ZUp,
}

impl AxisConvention {
    /// Rotation carrying content authored in `self` into `target`.
    pub fn conversion_to(self, target: AxisConvention) -> Mat4 {
        match (self, target) {
            (AxisConvention::YUp, AxisConvention::ZUp) => {
                Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2)
            }
            (AxisConvention::ZUp, AxisConvention::YUp) => {
                Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2)
            }
            _ => Mat4::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImportOptions {
    /// Only animation data is wanted; geometry may be dropped by the importer.
    pub only_animation: bool,
    /// Axis convention the imported scene is converted to.
    pub axis: AxisConvention,
}

/// Read-only view over a hierarchical scene, plus the few mesh-level
/// operations an extraction needs to repair geometry in place.
pub trait SceneGraph {
    fn root(&self) -> NodeId;
    fn name(&self, node: NodeId) -> &str;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn children(&self, node: NodeId) -> &[NodeId];
    fn attribute(&self, node: NodeId) -> &NodeAttribute;

    /// Split every polygon of the node's mesh into triangles.
    fn triangulate(&mut self, node: NodeId) -> Result<(), TopologyError>;

    /// Replace the node's mesh normals with generated ones, mapped by polygon
    /// vertex.
    fn generate_normals(&mut self, node: NodeId) -> Result<(), TopologyError>;

    fn animation_stacks(&self) -> &[AnimationStackInfo];

    /// Make a stack the one [`SceneGraph::evaluate_local_transform`] reads.
    /// Out of range indices leave the scene in rest pose.
    fn set_current_stack(&mut self, index: usize);

    fn time_mode(&self) -> TimeMode;

    fn evaluate_local_transform(&self, node: NodeId, time: SceneTime) -> Mat4;
}

/// Scene provider, created once and reused for several imports.
pub trait SceneImporter {
    type Scene: SceneGraph;
    type Error: Error;

    fn import(&mut self, path: &Path, options: &ImportOptions) -> Result<Self::Scene, Self::Error>;
}
