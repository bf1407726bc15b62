//! Sigmoid focal loss for dense classification

use crate::cross_entropy::bce_with_logits;
use crate::reduction::{LossOutput, ReduceOptions};
use ndarray::{Array1, ArrayView2};
use pointgroup_core::{Error, Result};

pub const DEFAULT_GAMMA: f32 = 2.0;
pub const DEFAULT_ALPHA: f32 = 0.25;

/// Sigmoid focal loss of `[n, classes]` logits.
///
/// `labels[i] == classes` marks a background row. The loss is element-wise
/// over all `n * classes` logits; `opts.weight` is per row.
pub fn sigmoid_focal_loss(
    pred: ArrayView2<f32>,
    labels: &[usize],
    gamma: f32,
    alpha: f32,
    opts: &ReduceOptions,
) -> Result<LossOutput> {
    let (n, num_classes) = pred.dim();
    if labels.len() != n {
        return Err(Error::shape("focal loss labels", n, labels.len()));
    }
    if let Some(&bad) = labels.iter().find(|&&l| l > num_classes) {
        return Err(Error::InvalidData(format!("label {} outside 0..={}", bad, num_classes)));
    }

    let loss: Array1<f32> = pred
        .indexed_iter()
        .map(|((i, c), &x)| {
            let target = if labels[i] == c { 1.0 } else { 0.0 };
            let p = 1.0 / (1.0 + (-x).exp());
            let pt = (1.0 - p) * target + p * (1.0 - target);
            let focal_weight = (alpha * target + (1.0 - alpha) * (1.0 - target)) * pt.powf(gamma);
            bce_with_logits(x, target) * focal_weight
        })
        .collect();

    opts.apply_per_row(loss, num_classes)
}
