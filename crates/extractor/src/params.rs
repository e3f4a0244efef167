/// What a control point whose influences sum to zero receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZeroWeightPolicy {
    /// Full weight on bone 0, the first discovered root.
    #[default]
    RootBone,
    /// Keep the four zeroed slots; the vertex stays unskinned.
    Leave,
}

/// What happens when two animation stacks share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClipNamePolicy {
    /// The later stack replaces the earlier clip.
    #[default]
    Overwrite,
    /// The earlier clip is kept and the later stack dropped.
    KeepFirst,
    /// The later clip is stored as `name#2`, `name#3`, ...
    Suffix,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractParams {
    pub zero_weight: ZeroWeightPolicy,
    pub clip_name_collision: ClipNamePolicy,
    /// Store `1 - v` instead of `v`.
    pub flip_v: bool,
    /// UV given to every vertex of a mesh without texture coordinates.
    pub default_uv: [f32; 2],
    /// Generate normals when they are missing or not mapped by polygon
    /// vertex; otherwise such meshes fail validation.
    pub generate_missing_normals: bool,
}

impl Default for ExtractParams {
    fn default() -> Self {
        Self {
            zero_weight: ZeroWeightPolicy::default(),
            clip_name_collision: ClipNamePolicy::default(),
            flip_v: true,
            default_uv: [0.5, 0.5],
            generate_missing_normals: true,
        }
    }
}
