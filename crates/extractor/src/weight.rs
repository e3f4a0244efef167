use log::warn;

use crate::{params::ZeroWeightPolicy, skin::Influence};

/// Influences kept per vertex.
pub const MAX_INFLUENCES: usize = 4;

/// Slot filler for control points with fewer than four influences.
pub const PADDING: Influence = Influence {
    bone_index: 0,
    weight: 0.0,
};

/// Reduce a control point's influences to the four heaviest, padded with
/// [`PADDING`] when fewer exist, rescaled so that the weights sum to one.
/// Equal weights keep their discovery order. When the weights sum to zero,
/// `policy` decides the slots and the returned flag is set.
pub fn normalize_influences(
    influences: &[Influence],
    policy: ZeroWeightPolicy,
) -> ([Influence; MAX_INFLUENCES], bool) {
    let mut sorted = influences.to_vec();
    if sorted.len() > MAX_INFLUENCES {
        sorted.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        sorted.truncate(MAX_INFLUENCES);
    }

    let mut kept = [PADDING; MAX_INFLUENCES];
    kept[..sorted.len()].copy_from_slice(&sorted);

    let sum: f32 = kept.iter().map(|influence| influence.weight).sum();
    if sum > 0.0 {
        kept.iter_mut().for_each(|influence| influence.weight /= sum);
        return (kept, false);
    }

    let kept = match policy {
        ZeroWeightPolicy::RootBone => {
            let mut root = [PADDING; MAX_INFLUENCES];
            root[0] = Influence::new(0, 1.0);
            root
        }
        ZeroWeightPolicy::Leave => [PADDING; MAX_INFLUENCES],
    };
    (kept, true)
}

/// Normalize every control point of a mesh.
pub fn normalize_control_points(
    control_points: &[Vec<Influence>],
    policy: ZeroWeightPolicy,
) -> Vec<[Influence; MAX_INFLUENCES]> {
    let mut zero_sums = 0;
    let normalized = control_points
        .iter()
        .map(|influences| {
            let (kept, zero) = normalize_influences(influences, policy);
            if zero {
                zero_sums += 1;
            }
            kept
        })
        .collect();
    if zero_sums > 0 {
        warn!(
            "{} of {} control points carry no skin weight, applied {:?}",
            zero_sums,
            control_points.len(),
            policy
        );
    }
    normalized
}
