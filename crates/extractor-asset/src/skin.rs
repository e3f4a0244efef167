use glam::Mat4;

/// How the weights of a cluster combine with those of the other clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterLinkMode {
    #[default]
    Normalize,
    Additive,
    TotalOne,
}

/// Binding between one bone and the control points it influences.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Name of the linked bone node, if the link survived import.
    pub link: Option<String>,
    pub link_mode: ClusterLinkMode,
    pub indices: Vec<u32>,
    pub weights: Vec<f32>,
    /// Global transform of the mesh at bind time.
    pub transform: Mat4,
    /// Global transform of the linked bone at bind time.
    pub transform_link: Mat4,
}

impl Cluster {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: Some(link.into()),
            link_mode: ClusterLinkMode::default(),
            indices: Vec::new(),
            weights: Vec::new(),
            transform: Mat4::IDENTITY,
            transform_link: Mat4::IDENTITY,
        }
    }

    pub fn with_influence(mut self, control_point: u32, weight: f32) -> Self {
        self.indices.push(control_point);
        self.weights.push(weight);
        self
    }

    pub fn with_bind_pose(mut self, transform: Mat4, transform_link: Mat4) -> Self {
        self.transform = transform;
        self.transform_link = transform_link;
        self
    }

    /// Pairs of control point index and weight, truncated to the shorter
    /// of both arrays.
    pub fn influences(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.weights.iter().copied())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinDeformer {
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Deformer {
    Skin(SkinDeformer),
    /// Shape deformers are carried through but never extracted.
    BlendShape,
}
