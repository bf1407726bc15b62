//! Greedy mask non-maximum suppression

use crate::iou::proposal_iou_matrix;
use ndarray::ArrayView2;
use pointgroup_core::{Error, InstancePrediction, Proposal, Result};
use tracing::debug;

/// Indices ordered by descending score.
///
/// Equal scores keep the order of reversing a stable ascending sort, so the
/// later index comes first.
pub fn descending_order(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    order.reverse();
    order
}

/// Greedy NMS over a precomputed IoU matrix.
///
/// Returns the picked indices in selection order. A candidate is removed when
/// its IoU with a picked index is strictly above `threshold`. The matrix must
/// be square with one row per score.
pub fn non_max_suppression(ious: ArrayView2<f32>, scores: &[f32], threshold: f32) -> Result<Vec<usize>> {
    if ious.nrows() != scores.len() {
        return Err(Error::shape("IoU rows", scores.len(), ious.nrows()));
    }
    if ious.ncols() != scores.len() {
        return Err(Error::shape("IoU columns", scores.len(), ious.ncols()));
    }
    Ok(greedy_pick(ious, scores, threshold))
}

fn greedy_pick(ious: ArrayView2<f32>, scores: &[f32], threshold: f32) -> Vec<usize> {
    let mut remaining = descending_order(scores);
    let mut pick = Vec::with_capacity(remaining.len());

    while let Some((&i, rest)) = remaining.split_first() {
        pick.push(i);
        remaining = rest
            .iter()
            .copied()
            // NaN overlaps never suppress
            .filter(|&j| !(ious[[i, j]] > threshold))
            .collect();
    }

    pick
}

/// Run NMS on filtered proposals and emit the survivors in selection order
pub fn suppress_proposals(proposals: Vec<Proposal>, threshold: f32) -> Vec<InstancePrediction> {
    if proposals.is_empty() {
        return Vec::new();
    }

    let ious = proposal_iou_matrix(&proposals);
    let scores: Vec<f32> = proposals.iter().map(|p| p.score).collect();
    // the matrix is built from the same proposals, so shapes agree
    let pick = greedy_pick(ious.view(), &scores, threshold);
    debug!("NMS kept {}/{} proposals", pick.len(), proposals.len());

    let mut slots: Vec<Option<Proposal>> = proposals.into_iter().map(Some).collect();
    pick.into_iter()
        .filter_map(|i| slots[i].take())
        .map(InstancePrediction::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pointgroup_core::PointMask;

    #[test]
    fn test_descending_order_ties() {
        assert_eq!(descending_order(&[0.2, 0.9, 0.5]), vec![1, 2, 0]);
        assert_eq!(descending_order(&[0.5, 0.5, 0.1]), vec![1, 0, 2]);
        assert!(descending_order(&[]).is_empty());
    }

    #[test]
    fn test_nms_matrix() {
        let ious = array![[1.0f32, 0.8, 0.1], [0.8, 1.0, 0.2], [0.1, 0.2, 1.0]];
        let scores = [0.9, 0.95, 0.3];
        // 1 wins, suppresses 0; 2 overlaps 1 by 0.2 only
        assert_eq!(non_max_suppression(ious.view(), &scores, 0.3).unwrap(), vec![1, 2]);
        // nothing is above 0.8 strictly
        assert_eq!(non_max_suppression(ious.view(), &scores, 0.8).unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn test_nms_empty() {
        let ious = ndarray::Array2::<f32>::zeros((0, 0));
        assert!(non_max_suppression(ious.view(), &[], 0.3).unwrap().is_empty());
        assert!(suppress_proposals(Vec::new(), 0.3).is_empty());
    }

    #[test]
    fn test_nms_rejects_mismatched_shapes() {
        let ious = ndarray::Array2::<f32>::zeros((3, 3));
        assert!(matches!(
            non_max_suppression(ious.view(), &[0.5, 0.4], 0.3),
            Err(Error::ShapeMismatch { .. })
        ));
        let ious = ndarray::Array2::<f32>::zeros((2, 3));
        assert!(non_max_suppression(ious.view(), &[0.5, 0.4], 0.3).is_err());
    }

    #[test]
    fn test_suppress_proposals() {
        let m = |idx: &[usize]| PointMask::from_indices(10, idx.iter().copied()).unwrap();
        let proposals = vec![
            Proposal::new(m(&[0, 1, 2, 3]), 0.6, 3),
            Proposal::new(m(&[0, 1, 2, 3, 4]), 0.9, 5),
            Proposal::new(m(&[7, 8, 9]), 0.4, 7),
        ];
        let kept = suppress_proposals(proposals, 0.3);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].label_id, 5);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].label_id, 7);
    }

    #[test]
    fn test_identical_masks_keep_one() {
        let mask = PointMask::from_indices(5, [0, 1]).unwrap();
        let proposals = vec![
            Proposal::new(mask.clone(), 0.5, 3),
            Proposal::new(mask.clone(), 0.5, 4),
        ];
        let kept = suppress_proposals(proposals, 0.99);
        assert_eq!(kept.len(), 1);
        // tie goes to the later proposal
        assert_eq!(kept[0].label_id, 4);
    }
}
