use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display, Formatter},
};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

/// Tolerance on the sum of a vertex's skin weights.
pub const WEIGHT_SUM_EPSILON: f32 = 1e-5;

/// One flattened polygon vertex, laid out for direct upload.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub weight: [f32; 4],
    pub bone_index: [u32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyframe {
    /// Seconds on the scene timeline.
    pub time_pos: f32,
    pub scale: Vec3,
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Keyframe {
    pub fn from_local_transform(time_pos: f32, transform: Mat4) -> Self {
        let (scale, rotation, translation) = transform.to_scale_rotation_translation();
        Self {
            time_pos,
            scale,
            rotation,
            translation,
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Sampled keyframes of one bone within one clip.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneAnimationTrack {
    keyframes: Vec<Keyframe>,
}

impl BoneAnimationTrack {
    pub fn new(keyframes: Vec<Keyframe>) -> Self {
        Self { keyframes }
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub(crate) fn push(&mut self, keyframe: Keyframe) {
        self.keyframes.push(keyframe);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationClip {
    pub name: String,
    /// One track per bone, in bone order.
    pub bone_tracks: Vec<BoneAnimationTrack>,
}

impl AnimationClip {
    /// Time between the earliest and the latest sampled keyframe.
    pub fn duration(&self) -> f32 {
        let times = self
            .bone_tracks
            .iter()
            .flat_map(|track| track.keyframes().iter().map(|keyframe| keyframe.time_pos));
        let (start, end) = times.fold((f32::INFINITY, f32::NEG_INFINITY), |(start, end), time| {
            (start.min(time), end.max(time))
        });
        if end >= start {
            end - start
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvariantError {
    BoneArrays {
        names: usize,
        parents: usize,
        offsets: usize,
    },
    ParentOrder {
        bone: usize,
        parent: i32,
    },
    WeightSum {
        vertex: usize,
        sum: f32,
    },
    TrackCount {
        clip: String,
        tracks: usize,
        bones: usize,
    },
}

impl Display for InvariantError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InvariantError::BoneArrays {
                names,
                parents,
                offsets,
            } => write!(
                f,
                "Bone arrays disagree: {} names, {} parents, {} offsets",
                names, parents, offsets
            ),
            InvariantError::ParentOrder { bone, parent } => {
                write!(f, "Bone #{} has parent {} not discovered before it", bone, parent)
            }
            InvariantError::WeightSum { vertex, sum } => {
                write!(f, "Weights of vertex #{} sum to {}", vertex, sum)
            }
            InvariantError::TrackCount {
                clip,
                tracks,
                bones,
            } => write!(
                f,
                "Clip {:?} has {} tracks for {} bones",
                clip, tracks, bones
            ),
        }
    }
}

impl Error for InvariantError {}

/// Everything one import produces.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractionResult {
    pub vertices: Vec<Vertex>,
    pub bone_names: Vec<String>,
    /// Parent of every bone in bone order, `-1` for roots.
    pub bone_parent_indices: Vec<i32>,
    pub offset_matrices: Vec<Mat4>,
    pub animation_clips: HashMap<String, AnimationClip>,
}

impl ExtractionResult {
    pub fn bone_count(&self) -> usize {
        self.bone_parent_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
            && self.bone_names.is_empty()
            && self.bone_parent_indices.is_empty()
            && self.offset_matrices.is_empty()
            && self.animation_clips.is_empty()
    }

    /// Check the structural guarantees of an extraction: consistent bone
    /// arrays, parents discovered before children, weights summing to one
    /// (or zero for unskinned vertices), one track per bone in every clip.
    pub fn validate(&self) -> Result<(), InvariantError> {
        let bones = self.bone_parent_indices.len();
        if self.bone_names.len() != bones || self.offset_matrices.len() != bones {
            return Err(InvariantError::BoneArrays {
                names: self.bone_names.len(),
                parents: bones,
                offsets: self.offset_matrices.len(),
            });
        }

        for (bone, parent) in self.bone_parent_indices.iter().enumerate() {
            if *parent != -1 && !(0..bone as i32).contains(parent) {
                return Err(InvariantError::ParentOrder {
                    bone,
                    parent: *parent,
                });
            }
        }

        for (index, vertex) in self.vertices.iter().enumerate() {
            let sum: f32 = vertex.weight.iter().sum();
            if sum != 0.0 && (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
                return Err(InvariantError::WeightSum { vertex: index, sum });
            }
        }

        for clip in self.animation_clips.values() {
            if clip.bone_tracks.len() != bones {
                return Err(InvariantError::TrackCount {
                    clip: clip.name.clone(),
                    tracks: clip.bone_tracks.len(),
                    bones,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use glam::{Mat4, Quat, Vec3};

    use super::{
        AnimationClip, BoneAnimationTrack, ExtractionResult, InvariantError, Keyframe, Vertex,
    };

    fn keyframe(time_pos: f32) -> Keyframe {
        Keyframe {
            time_pos,
            scale: Vec3::ONE,
            rotation: Quat::IDENTITY,
            translation: Vec3::ZERO,
        }
    }

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 64);
        let vertices = [Vertex::default(); 2];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 128);
    }

    #[test]
    fn test_keyframe_decomposes_local_transform() {
        let transform = Mat4::from_scale_rotation_translation(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(0.5),
            Vec3::new(4.0, 5.0, 6.0),
        );
        let keyframe = Keyframe::from_local_transform(0.25, transform);
        assert!(keyframe.scale.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-5));
        assert!(keyframe.translation.abs_diff_eq(Vec3::new(4.0, 5.0, 6.0), 1e-5));
        assert!(keyframe.to_matrix().abs_diff_eq(transform, 1e-5));
    }

    #[test]
    fn test_clip_duration() {
        let clip = AnimationClip {
            name: String::from("Idle"),
            bone_tracks: vec![
                BoneAnimationTrack::new(vec![keyframe(0.0), keyframe(0.5)]),
                BoneAnimationTrack::new(vec![keyframe(0.0), keyframe(1.5)]),
            ],
        };
        assert_eq!(clip.duration(), 1.5);
        assert_eq!(AnimationClip::default().duration(), 0.0);
    }

    #[test]
    fn test_validate_rejects_forward_parent() {
        let result = ExtractionResult {
            bone_names: vec![String::from("a"), String::from("b")],
            bone_parent_indices: vec![1, -1],
            offset_matrices: vec![Mat4::IDENTITY; 2],
            ..Default::default()
        };
        assert_eq!(
            result.validate(),
            Err(InvariantError::ParentOrder { bone: 0, parent: 1 })
        );
    }

    #[test]
    fn test_validate_rejects_partial_weights() {
        let result = ExtractionResult {
            vertices: vec![Vertex {
                weight: [0.5, 0.25, 0.0, 0.0],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(
            result.validate(),
            Err(InvariantError::WeightSum { vertex: 0, .. })
        ));
    }
}
