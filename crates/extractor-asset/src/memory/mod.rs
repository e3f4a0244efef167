//! In-memory scene graph.
//!
//! [`MemoryScene`] is an arena of nodes below an attribute-less root node.
//! It is what the GLTF importer produces and what synthetic scenes are
//! assembled with.

use glam::Mat4;
use log::debug;

use crate::{
    animation::{AnimationStack, AnimationStackInfo},
    mesh::MeshAttribute,
    node::{DecomposedTransform, NodeAttribute, NodeId},
    scene::{AxisConvention, SceneGraph},
    time::{SceneTime, TimeMode},
    topology::{self, TopologyError},
};

mod importer;

pub use importer::{MemoryImportError, MemoryImporter};

#[derive(Debug, Clone)]
struct MemoryNode {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attribute: NodeAttribute,
    transform: DecomposedTransform,
}

#[derive(Debug, Clone)]
pub struct MemoryScene {
    nodes: Vec<MemoryNode>,
    stacks: Vec<AnimationStack>,
    stack_infos: Vec<AnimationStackInfo>,
    current_stack: Option<usize>,
    time_mode: TimeMode,
    axis: AxisConvention,
    axis_correction: Mat4,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    pub fn new() -> Self {
        Self {
            nodes: vec![MemoryNode {
                name: String::from("RootNode"),
                parent: None,
                children: Vec::new(),
                attribute: NodeAttribute::Null,
                transform: DecomposedTransform::default(),
            }],
            stacks: Vec::new(),
            stack_infos: Vec::new(),
            current_stack: None,
            time_mode: TimeMode::default(),
            axis: AxisConvention::default(),
            axis_correction: Mat4::IDENTITY,
        }
    }

    pub fn with_time_mode(mut self, time_mode: TimeMode) -> Self {
        self.time_mode = time_mode;
        self
    }

    /// Declare the axis convention the scene content was authored in.
    pub fn with_axis(mut self, axis: AxisConvention) -> Self {
        self.axis = axis;
        self
    }

    pub fn add_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        attribute: NodeAttribute,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(MemoryNode {
            name: name.into(),
            parent: Some(parent),
            children: Vec::new(),
            attribute,
            transform: DecomposedTransform::default(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn set_transform(&mut self, node: NodeId, transform: DecomposedTransform) {
        self.nodes[node.0].transform = transform;
    }

    pub fn add_animation_stack(&mut self, stack: AnimationStack) -> usize {
        self.stack_infos.push(stack.info());
        self.stacks.push(stack);
        self.stacks.len() - 1
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First node in creation order carrying the given name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(NodeId)
    }

    pub fn axis(&self) -> AxisConvention {
        self.axis
    }

    /// Re-orient the scene to `target`. The correction applies to the local
    /// transforms of the root's direct children, animated or not.
    pub fn convert_axis(&mut self, target: AxisConvention) {
        if self.axis == target {
            return;
        }
        debug!("Converting scene axis from {:?} to {:?}", self.axis, target);
        self.axis_correction = self.axis.conversion_to(target) * self.axis_correction;
        self.axis = target;
    }

    /// Drop every mesh attribute, leaving the nodes in place.
    pub fn strip_meshes(&mut self) {
        for node in &mut self.nodes {
            if let NodeAttribute::Mesh(_) = node.attribute {
                node.attribute = NodeAttribute::Null;
            }
        }
    }

    fn mesh_mut(&mut self, node: NodeId) -> Result<&mut MeshAttribute, TopologyError> {
        let node = &mut self.nodes[node.0];
        let name = &node.name;
        match &mut node.attribute {
            NodeAttribute::Mesh(mesh) => Ok(mesh),
            NodeAttribute::Null | NodeAttribute::Skeleton(_) => {
                Err(TopologyError::NotAMesh(name.clone()))
            }
        }
    }
}

impl SceneGraph for MemoryScene {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].name
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    fn attribute(&self, node: NodeId) -> &NodeAttribute {
        &self.nodes[node.0].attribute
    }

    fn triangulate(&mut self, node: NodeId) -> Result<(), TopologyError> {
        let mesh = self.mesh_mut(node)?;
        topology::triangulate(mesh)
    }

    fn generate_normals(&mut self, node: NodeId) -> Result<(), TopologyError> {
        let mesh = self.mesh_mut(node)?;
        let normals = topology::calculate_normals(mesh)?;
        mesh.normals = Some(normals);
        Ok(())
    }

    fn animation_stacks(&self) -> &[AnimationStackInfo] {
        &self.stack_infos
    }

    fn set_current_stack(&mut self, index: usize) {
        self.current_stack = (index < self.stacks.len()).then_some(index);
    }

    fn time_mode(&self) -> TimeMode {
        self.time_mode
    }

    fn evaluate_local_transform(&self, node: NodeId, time: SceneTime) -> Mat4 {
        let rest = self.nodes[node.0].transform;
        let transform = match self.current_stack.map(|index| &self.stacks[index]) {
            Some(stack) => stack.evaluate(node, rest, time.seconds() as f32),
            None => rest,
        };
        let matrix = Mat4::from(transform);
        if self.nodes[node.0].parent == Some(self.root()) {
            self.axis_correction * matrix
        } else {
            matrix
        }
    }
}
