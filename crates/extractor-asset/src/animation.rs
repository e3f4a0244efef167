use std::{
    collections::HashMap,
    fmt::Debug,
    ops::{Add, Mul},
};

use glam::{Quat, Vec3};

use crate::{
    node::{DecomposedTransform, NodeId},
    time::TimeSpan,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationKeyFrame<T: Debug + Clone> {
    pub time: f32,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationKeyFrames<T: Debug + Clone> {
    Linear(Vec<AnimationKeyFrame<T>>),
    Step(Vec<AnimationKeyFrame<T>>),
    // in, val, out
    CubicSpline(Vec<AnimationKeyFrame<(T, T, T)>>),
}

pub trait Interpolate {
    fn linear(a: Self, b: Self, t: f32) -> Self;
    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self;
}

impl<T> Interpolate for T
where
    T: Mul<f32, Output = T> + Add<T, Output = T>,
{
    fn linear(a: Self, b: Self, t: f32) -> Self {
        a * (1.0 - t) + b * t
    }

    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self {
        let t3 = t.powi(3);
        let t2 = t.powi(2);
        let first = vk * (2.0 * t3 - 3.0 * t2 + 1.0);
        let second = bk * (td * (t3 - 2.0 * t2 + t));
        let third = vk_1 * (-2.0 * t3 + 3.0 * t2);
        let forth = ak_1 * (td * (t3 - t2));
        first + second + third + forth
    }
}

/// Locate the segment around `time`: index of the key at or before it, and
/// the progress toward the next key. Times outside the keyed range clamp to
/// the first or last key.
fn find_segment<T: Debug + Clone>(
    time: f32,
    keyframes: &[AnimationKeyFrame<T>],
) -> Option<(usize, f32)> {
    let last = keyframes.len().checked_sub(1)?;
    if time <= keyframes[0].time {
        return Some((0, 0.0));
    }
    if time >= keyframes[last].time {
        return Some((last, 0.0));
    }
    let next = keyframes.partition_point(|keyframe| keyframe.time <= time);
    let current = next - 1;
    let span = keyframes[next].time - keyframes[current].time;
    let progress = if span > 0.0 {
        (time - keyframes[current].time) / span
    } else {
        0.0
    };
    Some((current, progress.clamp(0.0, 1.0)))
}

impl<T: Debug + Clone + Interpolate> AnimationKeyFrames<T> {
    pub fn sample(&self, time: f32) -> Option<T> {
        self.sample_with(time, T::linear)
    }

    /// Sample the curve, blending linear segments with `linear`.
    pub fn sample_with(&self, time: f32, linear: impl Fn(T, T, f32) -> T) -> Option<T> {
        match self {
            AnimationKeyFrames::Linear(keyframes) => {
                let (index, progress) = find_segment(time, keyframes)?;
                let current = keyframes[index].value.clone();
                match keyframes.get(index + 1) {
                    Some(next) if progress > 0.0 => {
                        Some(linear(current, next.value.clone(), progress))
                    }
                    _ => Some(current),
                }
            }
            AnimationKeyFrames::Step(keyframes) => {
                let (index, _) = find_segment(time, keyframes)?;
                Some(keyframes[index].value.clone())
            }
            AnimationKeyFrames::CubicSpline(keyframes) => {
                let (index, progress) = find_segment(time, keyframes)?;
                let current = &keyframes[index];
                match keyframes.get(index + 1) {
                    Some(next) if progress > 0.0 => {
                        let delta = next.time - current.time;
                        Some(T::cubic_spline(
                            current.value.1.clone(),
                            current.value.2.clone(),
                            next.value.1.clone(),
                            next.value.0.clone(),
                            progress,
                            delta,
                        ))
                    }
                    _ => Some(current.value.1.clone()),
                }
            }
        }
    }
}

impl<T: Debug + Clone> AnimationKeyFrames<T> {
    pub fn len(&self) -> usize {
        match self {
            AnimationKeyFrames::Linear(keyframes) | AnimationKeyFrames::Step(keyframes) => {
                keyframes.len()
            }
            AnimationKeyFrames::CubicSpline(keyframes) => keyframes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Time of the last key, or zero without keys.
    pub fn length(&self) -> f32 {
        fn last_time<V: Debug + Clone>(keyframes: &[AnimationKeyFrame<V>]) -> f32 {
            keyframes
                .iter()
                .map(|keyframe| keyframe.time)
                .max_by(f32::total_cmp)
                .unwrap_or(0.0)
        }
        match self {
            AnimationKeyFrames::Linear(keyframes) | AnimationKeyFrames::Step(keyframes) => {
                last_time(keyframes)
            }
            AnimationKeyFrames::CubicSpline(keyframes) => last_time(keyframes),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationChannel {
    Rotation(AnimationKeyFrames<Quat>),
    Translation(AnimationKeyFrames<Vec3>),
    Scale(AnimationKeyFrames<Vec3>),
}

impl AnimationChannel {
    /// Override the animated component of `transform` with the curve value
    /// at `time`.
    pub fn apply(&self, time: f32, transform: &mut DecomposedTransform) {
        match self {
            AnimationChannel::Rotation(keyframes) => {
                if let Some(rotation) = keyframes.sample_with(time, |a, b, t| a.slerp(b, t)) {
                    transform.rotation = rotation.normalize();
                }
            }
            AnimationChannel::Translation(keyframes) => {
                if let Some(translation) = keyframes.sample(time) {
                    transform.translation = translation;
                }
            }
            AnimationChannel::Scale(keyframes) => {
                if let Some(scale) = keyframes.sample(time) {
                    transform.scale = scale;
                }
            }
        }
    }

    pub fn length(&self) -> f32 {
        match self {
            AnimationChannel::Rotation(keyframes) => keyframes.length(),
            AnimationChannel::Translation(keyframes) | AnimationChannel::Scale(keyframes) => {
                keyframes.length()
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationLayer {
    pub name: Option<String>,
    pub channels: HashMap<NodeId, Vec<AnimationChannel>>,
}

impl AnimationLayer {
    pub fn add_channel(&mut self, node: NodeId, channel: AnimationChannel) {
        self.channels.entry(node).or_default().push(channel);
    }

    pub fn length(&self) -> f32 {
        self.channels
            .values()
            .flatten()
            .map(AnimationChannel::length)
            .fold(0.0, f32::max)
    }
}

/// A named animation take.
#[derive(Debug, Clone)]
pub struct AnimationStack {
    pub name: String,
    pub span: TimeSpan,
    pub layers: Vec<AnimationLayer>,
}

impl AnimationStack {
    pub fn info(&self) -> AnimationStackInfo {
        AnimationStackInfo {
            name: self.name.clone(),
            layer_count: self.layers.len(),
            span: self.span,
        }
    }

    /// Evaluate a node's local transform, starting from its rest pose; every
    /// layer overrides the components it animates, in layer order.
    pub fn evaluate(
        &self,
        node: NodeId,
        rest: DecomposedTransform,
        time: f32,
    ) -> DecomposedTransform {
        let mut transform = rest;
        for layer in &self.layers {
            if let Some(channels) = layer.channels.get(&node) {
                channels
                    .iter()
                    .for_each(|channel| channel.apply(time, &mut transform));
            }
        }
        transform
    }
}

/// What the scene reports about one of its animation stacks.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationStackInfo {
    pub name: String,
    pub layer_count: usize,
    pub span: TimeSpan,
}
