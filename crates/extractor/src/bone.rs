use extractor_asset::{node::NodeId, scene::SceneGraph};
use log::trace;

use crate::traverse::skeleton_nodes;

/// Parent index of a bone without a skeleton parent.
pub const NO_PARENT: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bone {
    pub name: String,
    pub order_index: usize,
    pub parent_index: i32,
}

/// Bones in discovery order, with a name lookup for clusters and tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneHierarchy {
    bones: Vec<Bone>,
}

impl BoneHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover every skeleton node of the scene, parents before children.
    pub fn from_scene<S: SceneGraph + ?Sized>(scene: &S) -> Self {
        let mut hierarchy = Self::new();
        for node in skeleton_nodes(scene) {
            hierarchy.add_skeleton_node(scene, node);
        }
        hierarchy
    }

    /// Append a skeleton node. Its parent resolves to a bone only when the
    /// parent node itself carries a skeleton attribute; a skeleton under any
    /// other node becomes a root.
    pub fn add_skeleton_node<S: SceneGraph + ?Sized>(&mut self, scene: &S, node: NodeId) -> usize {
        let parent_name = scene
            .parent(node)
            .filter(|parent| scene.attribute(*parent).is_skeleton())
            .map(|parent| scene.name(parent));
        self.push(scene.name(node), parent_name)
    }

    pub fn push(&mut self, name: &str, parent_name: Option<&str>) -> usize {
        let parent_index = parent_name
            .and_then(|parent| self.index_of(parent))
            .map(|index| index as i32)
            .unwrap_or(NO_PARENT);
        let order_index = self.bones.len();
        trace!("Bone #{} {:?}, parent {}", order_index, name, parent_index);
        self.bones.push(Bone {
            name: name.to_string(),
            order_index,
            parent_index,
        });
        order_index
    }

    /// Case-sensitive exact name lookup.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn parent_indices(&self) -> Vec<i32> {
        self.bones.iter().map(|bone| bone.parent_index).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.bones.iter().map(|bone| bone.name.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.bones.clear();
    }
}
