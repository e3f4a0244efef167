use extractor_asset::{
    node::{NodeAttribute, NodeId},
    scene::SceneGraph,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    Continue,
    Stop,
}

/// Depth-first, pre-order walk from the scene root. Returns the node the
/// visitor stopped at, if it did.
pub fn walk<S: SceneGraph + ?Sized>(
    scene: &S,
    mut visit: impl FnMut(NodeId) -> Walk,
) -> Option<NodeId> {
    let mut stack = vec![scene.root()];
    while let Some(node) = stack.pop() {
        if visit(node) == Walk::Stop {
            return Some(node);
        }
        stack.extend(scene.children(node).iter().rev());
    }
    None
}

/// Every node carrying a skeleton attribute, in discovery order.
pub fn skeleton_nodes<S: SceneGraph + ?Sized>(scene: &S) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    walk(scene, |node| {
        match scene.attribute(node) {
            NodeAttribute::Skeleton(_) => nodes.push(node),
            NodeAttribute::Null | NodeAttribute::Mesh(_) => {}
        }
        Walk::Continue
    });
    nodes
}

/// The first node carrying a mesh attribute; later meshes are ignored.
pub fn first_mesh_node<S: SceneGraph + ?Sized>(scene: &S) -> Option<NodeId> {
    walk(scene, |node| match scene.attribute(node) {
        NodeAttribute::Mesh(_) => Walk::Stop,
        NodeAttribute::Null | NodeAttribute::Skeleton(_) => Walk::Continue,
    })
}
