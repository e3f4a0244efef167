use extractor_asset::{mesh::MeshAttribute, skin::ClusterLinkMode};
use glam::Mat4;
use log::warn;

use crate::bone::BoneHierarchy;

/// One (bone, weight) pair acting on a control point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Influence {
    pub bone_index: u32,
    pub weight: f32,
}

impl Influence {
    pub fn new(bone_index: u32, weight: f32) -> Self {
        Self { bone_index, weight }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinWeights {
    /// Influences of every control point, in cluster discovery order.
    pub control_points: Vec<Vec<Influence>>,
    /// Whether the last resolved cluster links in normalize mode. It stands
    /// for the whole mesh and is reported only; weights are rescaled either
    /// way.
    pub normalize_link_mode: bool,
    /// Number of clusters resolved against the skeleton.
    pub resolved_clusters: usize,
}

impl SkinWeights {
    pub fn has_influences(&self) -> bool {
        self.control_points.iter().any(|influences| !influences.is_empty())
    }
}

/// Gather skin influences of `mesh` from every cluster of every skin
/// deformer, and store the inverse bind matrix of each linked bone into
/// `offsets` at the bone's order index. Clusters linking to no known bone
/// are skipped.
pub fn extract_skin_weights(
    mesh: &MeshAttribute,
    bones: &BoneHierarchy,
    offsets: &mut [Mat4],
) -> SkinWeights {
    let mut weights = SkinWeights {
        control_points: vec![Vec::new(); mesh.control_points.len()],
        ..Default::default()
    };

    for skin in mesh.skin_deformers() {
        for cluster in &skin.clusters {
            let Some(bone_index) = cluster
                .link
                .as_deref()
                .and_then(|name| bones.index_of(name))
            else {
                warn!("Cluster link {:?} not in skeleton, skipped", cluster.link);
                continue;
            };

            if let Some(offset) = offsets.get_mut(bone_index) {
                *offset = cluster.transform_link.inverse() * cluster.transform;
            }

            for (control_point, weight) in cluster.influences() {
                match weights.control_points.get_mut(control_point as usize) {
                    Some(influences) => influences.push(Influence::new(bone_index as u32, weight)),
                    None => warn!(
                        "Cluster {:?} references control point {} of {}",
                        cluster.link,
                        control_point,
                        mesh.control_points.len()
                    ),
                }
            }

            weights.normalize_link_mode = cluster.link_mode == ClusterLinkMode::Normalize;
            weights.resolved_clusters += 1;
        }
    }

    weights
}
