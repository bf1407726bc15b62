//! Per-point semantic decoding

use ndarray::{ArrayView2, Axis};
use pointgroup_core::labels::semantic_to_label_id;
use pointgroup_core::{Error, PointMask, Result};

/// Class index of the highest score for every point.
///
/// Ties resolve to the lowest class index.
pub fn argmax_rows(scores: ArrayView2<f32>) -> Vec<usize> {
    scores
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |(best, best_v), (i, &v)| {
                    if v > best_v {
                        (i, v)
                    } else {
                        (best, best_v)
                    }
                })
                .0
        })
        .collect()
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Most frequent semantic class among the points of `mask`, mapped to its
/// NYU40 id. Ties resolve to the lowest class index.
///
/// Returns `Ok(None)` for an empty mask. A majority class without an NYU40 id
/// or a mask point outside `semantic_pred` is an error.
pub fn majority_label(mask: &PointMask, semantic_pred: &[usize]) -> Result<Option<u32>> {
    let mut counts: Vec<usize> = Vec::new();
    for idx in mask.iter_ones() {
        let class = *semantic_pred
            .get(idx)
            .ok_or_else(|| Error::shape("semantic_pred", mask.len(), semantic_pred.len()))?;
        if class >= counts.len() {
            counts.resize(class + 1, 0);
        }
        counts[class] += 1;
    }

    let best = counts
        .iter()
        .enumerate()
        .filter(|(_, &c)| c > 0)
        .fold(None, |best: Option<(usize, usize)>, (i, &c)| match best {
            Some((_, bc)) if bc >= c => best,
            _ => Some((i, c)),
        });

    match best {
        None => Ok(None),
        Some((class, _)) => semantic_to_label_id(class).map(Some).ok_or_else(|| {
            Error::InvalidData(format!("majority semantic class {} has no label id", class))
        }),
    }
}
