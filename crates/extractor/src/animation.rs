use std::collections::HashMap;

use extractor_asset::{
    animation::AnimationStackInfo,
    node::NodeId,
    scene::SceneGraph,
    time::SceneTime,
};
use log::{debug, trace, warn};

use crate::{
    error::ValidationError,
    params::ClipNamePolicy,
    result::{AnimationClip, BoneAnimationTrack, Keyframe},
    traverse::skeleton_nodes,
};

/// Most frames a single stack may be sampled at.
pub const MAX_STACK_FRAMES: i64 = 1 << 20;

/// Sample every animation stack with at least one layer into a clip keyed
/// by the stack name. Each clip holds one track per skeleton node, in bone
/// order.
pub fn sample_animation_stacks<S: SceneGraph + ?Sized>(
    scene: &mut S,
    policy: ClipNamePolicy,
) -> Result<HashMap<String, AnimationClip>, ValidationError> {
    let stacks = scene.animation_stacks().to_vec();
    let bones = skeleton_nodes(scene);
    let mut clips = HashMap::new();

    for (index, info) in stacks.iter().enumerate() {
        if info.layer_count == 0 {
            warn!("Animation stack {:?} has no layers, skipped", info.name);
            continue;
        }
        scene.set_current_stack(index);
        let clip = sample_stack(scene, &bones, info)?;
        insert_clip(&mut clips, clip, policy);
    }

    Ok(clips)
}

/// Sample the current stack at every frame in `[start, stop)` of the
/// scene's time mode. Spans that are not finite or longer than
/// [`MAX_STACK_FRAMES`] are rejected.
pub fn sample_stack<S: SceneGraph + ?Sized>(
    scene: &S,
    bones: &[NodeId],
    info: &AnimationStackInfo,
) -> Result<AnimationClip, ValidationError> {
    let mode = scene.time_mode();
    let seconds = info.span.stop.seconds() - info.span.start.seconds();
    let frames = seconds * mode.frames_per_second();
    if !frames.is_finite() || frames > MAX_STACK_FRAMES as f64 {
        return Err(ValidationError::FrameRange {
            stack: info.name.clone(),
            start: info.span.start.seconds(),
            stop: info.span.stop.seconds(),
        });
    }
    let start = info.span.start.frame_count(mode);
    let stop = info.span.stop.frame_count(mode);
    debug!(
        "Sampling stack {:?}: frames {}..{} at {}, {} bones",
        info.name,
        start,
        stop,
        mode,
        bones.len()
    );

    let bone_tracks = bones
        .iter()
        .map(|&node| {
            let mut track = BoneAnimationTrack::default();
            for frame in start..stop {
                let time = SceneTime::from_frame(frame, mode);
                let transform = scene.evaluate_local_transform(node, time);
                trace!("{} frame {}: {:?}", scene.name(node), frame, transform);
                track.push(Keyframe::from_local_transform(time.seconds() as f32, transform));
            }
            track
        })
        .collect();

    Ok(AnimationClip {
        name: info.name.clone(),
        bone_tracks,
    })
}

fn insert_clip(clips: &mut HashMap<String, AnimationClip>, mut clip: AnimationClip, policy: ClipNamePolicy) {
    if !clips.contains_key(&clip.name) {
        clips.insert(clip.name.clone(), clip);
        return;
    }

    match policy {
        ClipNamePolicy::Overwrite => {
            warn!("Animation clip {:?} replaced by a later stack", clip.name);
            clips.insert(clip.name.clone(), clip);
        }
        ClipNamePolicy::KeepFirst => {
            warn!("Animation clip {:?} already exists, later stack dropped", clip.name);
        }
        ClipNamePolicy::Suffix => {
            let mut suffix = 2;
            let mut name = format!("{}#{}", clip.name, suffix);
            while clips.contains_key(&name) {
                suffix += 1;
                name = format!("{}#{}", clip.name, suffix);
            }
            warn!("Animation clip {:?} already exists, stored as {:?}", clip.name, name);
            clip.name = name.clone();
            clips.insert(name, clip);
        }
    }
}
