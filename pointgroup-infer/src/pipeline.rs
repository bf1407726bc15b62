//! Scan post-processing pipeline

use crate::nms::suppress_proposals;
use crate::proposals::{decode_proposals, filter_by_score, filter_by_size};
use crate::raw::RawModelOutput;
use crate::semantic::argmax_rows;
use pointgroup_core::labels::SEMANTIC_LABEL_IDS;
use pointgroup_core::{Error, InstancePrediction, Proposal, Result, TestConfig};
use tracing::debug;

/// Thresholds applied to the proposals of every scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessor {
    pub score_thresh: f32,
    pub npoint_thresh: usize,
    pub nms_thresh: f32,
    /// Number of semantic classes a raw dump must carry
    pub classes: usize,
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self::from_config(&TestConfig::default())
    }
}

/// Post-processed output of one scan
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub scene_name: String,
    /// Per-point semantic class index
    pub semantic_pred: Vec<usize>,
    /// Instances in NMS selection order
    pub instances: Vec<InstancePrediction>,
}

impl ScanResult {
    pub fn num_points(&self) -> usize {
        self.semantic_pred.len()
    }
}

impl PostProcessor {
    pub fn new(score_thresh: f32, npoint_thresh: usize, nms_thresh: f32) -> Self {
        Self {
            score_thresh,
            npoint_thresh,
            nms_thresh,
            classes: SEMANTIC_LABEL_IDS.len(),
        }
    }

    pub fn with_classes(mut self, classes: usize) -> Self {
        self.classes = classes;
        self
    }

    pub fn from_config(config: &TestConfig) -> Self {
        Self::new(config.score_thresh, config.npoint_thresh, config.nms_thresh)
    }

    /// Threshold, then suppress overlapping proposals
    pub fn process(&self, proposals: Vec<Proposal>) -> Vec<InstancePrediction> {
        let proposals = filter_by_score(proposals, self.score_thresh);
        let proposals = filter_by_size(proposals, self.npoint_thresh);
        suppress_proposals(proposals, self.nms_thresh)
    }

    /// Decode a raw dump into semantic predictions and final instances.
    ///
    /// With `with_proposals` unset (or a dump without a proposal branch) only
    /// the semantic predictions are produced. The dump is validated first and
    /// must score exactly `classes` classes per point.
    pub fn process_raw(&self, raw: &RawModelOutput, with_proposals: bool) -> Result<ScanResult> {
        raw.validate()?;
        if raw.num_points() > 0 && raw.num_classes() != self.classes {
            return Err(Error::shape(
                format!("semantic classes of {}", raw.scene_name),
                self.classes,
                raw.num_classes(),
            ));
        }

        let semantic_pred = argmax_rows(raw.semantic_matrix()?.view());

        let instances = if with_proposals && raw.has_proposals() {
            let proposals = decode_proposals(raw, &semantic_pred)?;
            self.process(proposals)
        } else {
            Vec::new()
        };

        debug!(
            "Post-processed {}: {} points, {} instances",
            raw.scene_name,
            semantic_pred.len(),
            instances.len()
        );

        Ok(ScanResult {
            scene_name: raw.scene_name.clone(),
            semantic_pred,
            instances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores_for(class: usize) -> Vec<f32> {
        let mut row = vec![0.0; 20];
        row[class] = 1.0;
        row
    }

    fn raw() -> RawModelOutput {
        // 6 points: 0..3 chairs (class 4), 3..6 tables (class 6)
        let semantic_scores = (0..6).map(|i| scores_for(if i < 3 { 4 } else { 6 })).collect();
        RawModelOutput {
            scene_name: "scene0002_00".to_string(),
            semantic_scores,
            pt_offsets: vec![[0.0; 3]; 6],
            coords: None,
            // sigmoid: 0.88, 0.73, 0.27, 0.05
            proposal_scores: vec![2.0, 1.0, -1.0, -3.0],
            proposals_idx: vec![
                [0, 0], [0, 1], [0, 2],
                [1, 0], [1, 1],
                [2, 3], [2, 4], [2, 5],
                [3, 3], [3, 4], [3, 5],
            ],
            proposals_offset: vec![0, 3, 5, 8, 11],
        }
    }

    #[test]
    fn test_process_raw() {
        let processor = PostProcessor::new(0.09, 1, 0.3);
        let result = processor.process_raw(&raw(), true).unwrap();

        assert_eq!(result.num_points(), 6);
        assert_eq!(result.semantic_pred, vec![4, 4, 4, 6, 6, 6]);
        // proposal 1 is suppressed by 0, proposal 3 is under the score threshold
        assert_eq!(result.instances.len(), 2);
        assert_eq!(result.instances[0].label_id, 5);
        assert_eq!(result.instances[1].label_id, 7);
        assert!(result.instances[0].score > result.instances[1].score);
    }

    #[test]
    fn test_process_raw_semantic_only() {
        let processor = PostProcessor::default();
        let result = processor.process_raw(&raw(), false).unwrap();
        assert!(result.instances.is_empty());
        assert_eq!(result.semantic_pred.len(), 6);
    }

    #[test]
    fn test_size_threshold_removes_everything() {
        let processor = PostProcessor::new(0.0, 3, 0.3);
        let result = processor.process_raw(&raw(), true).unwrap();
        assert!(result.instances.is_empty());
    }

    #[test]
    fn test_default_matches_config() {
        let processor = PostProcessor::default();
        assert_eq!(processor.score_thresh, 0.09);
        assert_eq!(processor.npoint_thresh, 100);
        assert_eq!(processor.nms_thresh, 0.3);
        assert_eq!(processor.classes, 20);
    }

    #[test]
    fn test_extra_semantic_class_is_rejected() {
        let mut raw = raw();
        for row in &mut raw.semantic_scores {
            row.push(0.0);
        }
        // most points of proposal 0 predict the extra class 20
        raw.semantic_scores[0][20] = 5.0;
        raw.semantic_scores[1][20] = 5.0;
        assert!(raw.validate().is_ok());

        let err = PostProcessor::new(0.0, 1, 0.3).process_raw(&raw, true).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch { expected: 20, actual: 21, .. }
        ));
    }

    #[test]
    fn test_configured_class_count() {
        let mut raw = raw();
        for row in &mut raw.semantic_scores {
            row.truncate(10);
        }
        assert!(PostProcessor::default().process_raw(&raw, false).is_err());
        let result = PostProcessor::default().with_classes(10).process_raw(&raw, false).unwrap();
        assert_eq!(result.semantic_pred, vec![4, 4, 4, 6, 6, 6]);
    }

    #[test]
    fn test_unvalidated_offsets_are_an_error() {
        let mut raw = raw();
        raw.proposals_offset = vec![0, 3, 5, 8, 12];
        assert!(matches!(
            PostProcessor::default().process_raw(&raw, true),
            Err(Error::ShapeMismatch { .. })
        ));

        raw.proposals_offset = vec![0, 3];
        raw.proposal_scores = vec![1.0];
        raw.proposals_idx = vec![[0, 0]];
        assert!(PostProcessor::default().process_raw(&raw, true).is_err());
    }
}
