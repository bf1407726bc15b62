//! Instance proposals, predictions and ground-truth records

use crate::labels::GT_LABEL_DIVISOR;
use crate::mask::PointMask;
use serde::{Deserialize, Serialize};

/// Candidate instance produced by the network's clustering stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub mask: PointMask,
    /// Confidence in `[0, 1]`
    pub score: f32,
    /// NYU40 id of the proposal's semantic class
    pub semantic_id: u32,
}

impl Proposal {
    pub fn new(mask: PointMask, score: f32, semantic_id: u32) -> Self {
        Self {
            mask,
            score,
            semantic_id,
        }
    }

    pub fn point_count(&self) -> usize {
        self.mask.count()
    }
}

/// Final instance kept by NMS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstancePrediction {
    pub mask: PointMask,
    pub score: f32,
    pub label_id: u32,
}

impl From<Proposal> for InstancePrediction {
    fn from(p: Proposal) -> Self {
        Self {
            mask: p.mask,
            score: p.score,
            label_id: p.semantic_id,
        }
    }
}

/// One annotated instance of a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GtInstance {
    /// Encoded id, `label_id * 1000 + instance_index`
    pub instance_id: u32,
    pub label_id: u32,
    pub vert_count: usize,
    pub med_dist: f32,
    pub dist_conf: f32,
}

impl GtInstance {
    pub fn new(instance_id: u32, vert_count: usize) -> Self {
        Self {
            instance_id,
            label_id: instance_id / GT_LABEL_DIVISOR,
            vert_count,
            med_dist: -1.0,
            dist_conf: 0.0,
        }
    }

    /// Ids below 1000 carry no semantic label and are ignored in AP
    pub fn is_labelled(&self) -> bool {
        self.instance_id >= GT_LABEL_DIVISOR
    }
}
