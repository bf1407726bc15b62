//! Top-k classification accuracy

use ndarray::ArrayView2;
use pointgroup_core::{Error, Result};

/// Top-k classification accuracy in percent, one value per entry of `topk`.
///
/// With `thresh`, a hit also needs a score strictly above it.
pub fn accuracy(
    pred: ArrayView2<f32>,
    target: &[usize],
    topk: &[usize],
    thresh: Option<f32>,
) -> Result<Vec<f32>> {
    let maxk = topk
        .iter()
        .copied()
        .max()
        .ok_or_else(|| Error::InvalidData("topk cannot be empty".to_string()))?;
    let (n, num_classes) = pred.dim();
    if target.len() != n {
        return Err(Error::shape("accuracy target", n, target.len()));
    }
    if n == 0 {
        return Ok(vec![0.0; topk.len()]);
    }
    if maxk > num_classes {
        return Err(Error::InvalidData(format!(
            "top-{} accuracy needs at least {} classes, got {}",
            maxk, maxk, num_classes
        )));
    }

    // rank of the target among the top maxk scores of each row, if a hit
    let ranks: Vec<Option<usize>> = pred
        .rows()
        .into_iter()
        .zip(target)
        .map(|(row, &label)| {
            let mut order: Vec<usize> = (0..num_classes).collect();
            order.sort_by(|&a, &b| row[b].total_cmp(&row[a]));
            order.iter().take(maxk).position(|&c| {
                c == label && thresh.map_or(true, |t| row[c] > t)
            })
        })
        .collect();

    Ok(topk
        .iter()
        .map(|&k| {
            let correct = ranks.iter().filter(|r| matches!(r, Some(rank) if *rank < k)).count();
            correct as f32 * 100.0 / n as f32
        })
        .collect())
}

pub fn top1_accuracy(pred: ArrayView2<f32>, target: &[usize]) -> Result<f32> {
    Ok(accuracy(pred, target, &[1], None)?[0])
}
