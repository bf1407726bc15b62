//! Scan-level assignment of predictions to ground-truth instances

use crate::gt::gt_instances;
use pointgroup_core::labels::{instance_class_index, is_instance_label, GT_LABEL_DIVISOR, INSTANCE_LABEL_IDS};
use pointgroup_core::{Error, GtInstance, InstancePrediction, PointMask, Result};
use tracing::debug;

/// A prediction seen from a ground-truth instance
#[derive(Debug, Clone, PartialEq)]
pub struct PredOverlap {
    pub pred_id: usize,
    pub vert_count: usize,
    pub confidence: f32,
    pub intersection: usize,
}

/// A ground-truth instance seen from a prediction
#[derive(Debug, Clone, PartialEq)]
pub struct GtOverlap {
    pub gt: GtInstance,
    pub intersection: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GtMatch {
    pub gt: GtInstance,
    pub matched_pred: Vec<PredOverlap>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredMatch {
    /// Index among the accepted predictions of the scan
    pub pred_id: usize,
    pub label_id: u32,
    pub vert_count: usize,
    pub confidence: f32,
    /// Points on unannotated or non-instance ground truth
    pub void_intersection: usize,
    pub matched_gt: Vec<GtOverlap>,
}

/// Both directions of the assignment, indexed by instance class
#[derive(Debug, Clone)]
pub struct ScanMatches {
    pub scene_name: String,
    pub gt: Vec<Vec<GtMatch>>,
    pub pred: Vec<Vec<PredMatch>>,
    /// Number of accepted predictions (upper bound of `pred_id`)
    pub num_predictions: usize,
}

/// Assign the predictions of one scan to its ground truth.
///
/// Predictions with a non-instance label, or with fewer than
/// `min_region_size` points, are dropped before matching.
pub fn assign_instances_for_scan(
    scene_name: &str,
    predictions: &[InstancePrediction],
    gt_ids: &[u32],
    min_region_size: usize,
) -> Result<ScanMatches> {
    let n_classes = INSTANCE_LABEL_IDS.len();

    let mut gt2pred: Vec<Vec<GtMatch>> = gt_instances(gt_ids)
        .into_iter()
        .map(|class| {
            class
                .into_iter()
                .map(|gt| GtMatch {
                    gt,
                    matched_pred: Vec::new(),
                })
                .collect()
        })
        .collect();

    // One mask per GT instance, built once per scan
    let gt_masks: Vec<Vec<PointMask>> = gt2pred
        .iter()
        .map(|class| {
            class
                .iter()
                .map(|m| PointMask::from_bools(&gt_ids.iter().map(|&id| id == m.gt.instance_id).collect::<Vec<_>>()))
                .collect()
        })
        .collect();

    let void_mask = PointMask::from_bools(
        &gt_ids
            .iter()
            .map(|&id| !is_instance_label(id / GT_LABEL_DIVISOR))
            .collect::<Vec<_>>(),
    );

    let mut pred2gt: Vec<Vec<PredMatch>> = vec![Vec::new(); n_classes];
    let mut num_predictions = 0;

    for pred in predictions {
        let Some(class) = instance_class_index(pred.label_id) else {
            continue;
        };

        if pred.mask.len() != gt_ids.len() {
            return Err(Error::shape(
                format!("prediction mask of {}", scene_name),
                gt_ids.len(),
                pred.mask.len(),
            ));
        }

        let vert_count = pred.mask.count();
        if vert_count < min_region_size {
            continue;
        }

        let pred_id = num_predictions;
        let mut matched_gt = Vec::new();
        for (gt_match, gt_mask) in gt2pred[class].iter_mut().zip(&gt_masks[class]) {
            let intersection = gt_mask.intersection_count(&pred.mask);
            if intersection > 0 {
                matched_gt.push(GtOverlap {
                    gt: gt_match.gt.clone(),
                    intersection,
                });
                gt_match.matched_pred.push(PredOverlap {
                    pred_id,
                    vert_count,
                    confidence: pred.score,
                    intersection,
                });
            }
        }

        pred2gt[class].push(PredMatch {
            pred_id,
            label_id: pred.label_id,
            vert_count,
            confidence: pred.score,
            void_intersection: void_mask.intersection_count(&pred.mask),
            matched_gt,
        });
        num_predictions += 1;
    }

    debug!(
        "Assigned {}/{} predictions of {}",
        num_predictions,
        predictions.len(),
        scene_name
    );

    Ok(ScanMatches {
        scene_name: scene_name.to_string(),
        gt: gt2pred,
        pred: pred2gt,
        num_predictions,
    })
}
