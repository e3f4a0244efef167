use crate::{
    bone::BoneHierarchy,
    result::ExtractionResult,
    skin::Influence,
    weight::MAX_INFLUENCES,
};

/// State of one extraction, threaded through every pass and cleared before
/// the next import.
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    pub bones: BoneHierarchy,
    /// Normalized influences of every control point of the skinned mesh.
    pub control_point_weights: Vec<[Influence; MAX_INFLUENCES]>,
    /// Link mode of the last resolved cluster.
    pub skin_link_normalized: bool,
    pub has_mesh: bool,
    pub has_uv: bool,
    pub result: ExtractionResult,
}

impl ExtractionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
            && self.control_point_weights.is_empty()
            && !self.has_mesh
            && self.result.is_empty()
    }

    pub fn into_result(self) -> ExtractionResult {
        self.result
    }
}
