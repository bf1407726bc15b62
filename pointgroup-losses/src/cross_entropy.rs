//! Softmax and sigmoid cross-entropy

use crate::reduction::{LossOutput, ReduceOptions};
use ndarray::{Array1, ArrayView1, ArrayView2, ArrayView3};
use pointgroup_core::{Error, Result};

/// Label value skipped by the cross-entropy losses
pub const IGNORE_INDEX: i64 = -100;

fn log_softmax(row: ArrayView1<f32>) -> Array1<f32> {
    let max = row.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
    let log_sum = max + row.iter().map(|&x| (x - max).exp()).sum::<f32>().ln();
    row.mapv(|x| x - log_sum)
}

/// Numerically stable BCE on a logit
pub(crate) fn bce_with_logits(x: f32, target: f32) -> f32 {
    x.max(0.0) - x * target + (-x.abs()).exp().ln_1p()
}

fn check_class_weight(class_weight: Option<&[f32]>, num_classes: usize) -> Result<()> {
    match class_weight {
        Some(w) if w.len() != num_classes => Err(Error::shape("class weight", num_classes, w.len())),
        _ => Ok(()),
    }
}

/// Softmax cross-entropy, one loss per row of `pred` (`[n, classes]` logits).
///
/// Rows labelled `ignore_index` contribute 0 but still count towards the
/// mean. `opts.weight` is per row.
pub fn cross_entropy(
    pred: ArrayView2<f32>,
    labels: &[i64],
    class_weight: Option<&[f32]>,
    ignore_index: i64,
    opts: &ReduceOptions,
) -> Result<LossOutput> {
    let (n, num_classes) = pred.dim();
    if labels.len() != n {
        return Err(Error::shape("cross entropy labels", n, labels.len()));
    }
    check_class_weight(class_weight, num_classes)?;

    let loss = pred
        .rows()
        .into_iter()
        .zip(labels)
        .map(|(row, &label)| -> Result<f32> {
            if label == ignore_index {
                return Ok(0.0);
            }
            let class = usize::try_from(label)
                .ok()
                .filter(|&c| c < num_classes)
                .ok_or_else(|| Error::InvalidData(format!("label {} outside 0..{}", label, num_classes)))?;
            let w = class_weight.map_or(1.0, |w| w[class]);
            Ok(-w * log_softmax(row)[class])
        })
        .collect::<Result<Array1<f32>>>()?;

    opts.apply(loss)
}

/// Sigmoid cross-entropy of `[n, classes]` logits against per-row labels.
///
/// Labels are expanded to one-hot rows; a label equal to the number of
/// classes means background (all zeros). Negative labels and
/// `ignore_index` mask their whole row out. `opts.weight` is per row.
pub fn binary_cross_entropy(
    pred: ArrayView2<f32>,
    labels: &[i64],
    class_weight: Option<&[f32]>,
    ignore_index: i64,
    opts: &ReduceOptions,
) -> Result<LossOutput> {
    let (n, num_classes) = pred.dim();
    if labels.len() != n {
        return Err(Error::shape("binary cross entropy labels", n, labels.len()));
    }
    check_class_weight(class_weight, num_classes)?;

    let mut loss = Array1::zeros(n * num_classes);
    for (i, (row, &label)) in pred.rows().into_iter().zip(labels).enumerate() {
        if label < 0 || label == ignore_index {
            continue;
        }
        for (c, &x) in row.iter().enumerate() {
            let target = if label as usize == c { 1.0 } else { 0.0 };
            let w = class_weight.map_or(1.0, |w| w[c]);
            loss[i * num_classes + c] = w * bce_with_logits(x, target);
        }
    }

    opts.apply_per_row(loss, num_classes)
}

/// Mean sigmoid cross-entropy between the mask logits of each row's target
/// class (`pred` is `[n, classes, points]`) and binary `target` masks.
pub fn mask_cross_entropy(pred: ArrayView3<f32>, target: ArrayView2<f32>, labels: &[usize]) -> Result<f32> {
    let (n, num_classes, num_points) = pred.dim();
    if labels.len() != n {
        return Err(Error::shape("mask labels", n, labels.len()));
    }
    if target.dim() != (n, num_points) {
        return Err(Error::shape("mask target points", num_points, target.ncols()));
    }
    if n == 0 || num_points == 0 {
        return Ok(0.0);
    }

    let mut total = 0.0;
    for (i, &label) in labels.iter().enumerate() {
        if label >= num_classes {
            return Err(Error::InvalidData(format!("label {} outside 0..{}", label, num_classes)));
        }
        total += pred
            .slice(ndarray::s![i, label, ..])
            .iter()
            .zip(target.row(i))
            .map(|(&x, &t)| bce_with_logits(x, t))
            .sum::<f32>();
    }
    Ok(total / (n * num_points) as f32)
}
