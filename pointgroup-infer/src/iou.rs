//! Pairwise mask overlap

use ndarray::{Array2, Axis};
use pointgroup_core::{PointMask, Proposal};
use rayon::prelude::*;

/// `(P, P)` matrix of mask IoUs.
///
/// IoU(a, b) = |a∩b| / (|a| + |b| - |a∩b|); a pair of empty masks yields 0.
pub fn iou_matrix(masks: &[&PointMask]) -> Array2<f32> {
    let n = masks.len();
    let counts: Vec<usize> = masks.iter().map(|m| m.count()).collect();
    let mut ious = Array2::<f32>::zeros((n, n));

    ious.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            for j in 0..n {
                let inter = masks[i].intersection_count(masks[j]);
                let union = counts[i] + counts[j] - inter;
                row[j] = if union == 0 {
                    0.0
                } else {
                    inter as f32 / union as f32
                };
            }
        });

    ious
}

pub fn proposal_iou_matrix(proposals: &[Proposal]) -> Array2<f32> {
    let masks: Vec<&PointMask> = proposals.iter().map(|p| &p.mask).collect();
    iou_matrix(&masks)
}
