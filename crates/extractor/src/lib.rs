//! Extract skinned-mesh and skeletal-animation data from a scene graph.
//!
//! One import walks the scene three times: skeleton nodes become an ordered
//! bone hierarchy, the first mesh is triangulated, validated and flattened
//! into a vertex buffer carrying up to four normalized skin influences, and
//! every animation stack is sampled frame by frame into per-bone tracks.
//! See [`Extractor`] for the importer-driven entry point and [`extract`] for
//! scenes already in hand.
//!
mod animation;
pub mod bone;
mod context;
pub mod error;
mod extractor;
pub mod mesh;
pub mod params;
pub mod result;
pub mod skin;
pub mod traverse;
pub mod weight;

pub use animation::{sample_animation_stacks, sample_stack};
pub use context::ExtractionContext;
pub use error::{ExtractError, LayerKind, ValidationError};
pub use extractor::{extract, Extractor};
pub use extractor_asset;
pub use params::{ClipNamePolicy, ExtractParams, ZeroWeightPolicy};
pub use result::{
    AnimationClip, BoneAnimationTrack, ExtractionResult, InvariantError, Keyframe, Vertex,
};
