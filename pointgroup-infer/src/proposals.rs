//! Proposal decoding and thresholding

use crate::raw::RawModelOutput;
use crate::semantic::sigmoid;
use pointgroup_core::labels::semantic_to_label_id;
use pointgroup_core::{Error, PointMask, Proposal, Result};
use tracing::debug;

/// Build one [`Proposal`] per cluster of the raw output.
///
/// The semantic class of a proposal is the prediction at its first listed
/// point; scores go through a sigmoid.
pub fn decode_proposals(raw: &RawModelOutput, semantic_pred: &[usize]) -> Result<Vec<Proposal>> {
    let n = raw.num_points();
    if semantic_pred.len() != n {
        return Err(Error::shape("semantic_pred", n, semantic_pred.len()));
    }

    raw.proposals_offset
        .windows(2)
        .zip(&raw.proposal_scores)
        .enumerate()
        .map(|(p, (window, &logit))| -> Result<Proposal> {
            let entries = raw
                .proposals_idx
                .get(window[0] as usize..window[1] as usize)
                .ok_or_else(|| {
                    Error::InvalidData(format!(
                        "proposal {} spans {}..{} beyond {} index entries",
                        p,
                        window[0],
                        window[1],
                        raw.proposals_idx.len()
                    ))
                })?;
            let mask = PointMask::from_indices(n, entries.iter().map(|&[_, point]| point as usize))?;

            let semantic_id = match entries.first() {
                Some(&[_, first]) => {
                    let class = *semantic_pred.get(first as usize).ok_or_else(|| {
                        Error::InvalidData(format!("proposal {} point {} out of range", p, first))
                    })?;
                    semantic_to_label_id(class).ok_or_else(|| {
                        Error::InvalidData(format!(
                            "semantic class {} of proposal {} has no label id",
                            class, p
                        ))
                    })?
                }
                // Empty clusters cannot survive the size threshold anyway
                None => 0,
            };

            Ok(Proposal::new(mask, sigmoid(logit), semantic_id))
        })
        .collect()
}

/// Keep proposals with `score > thresh`
pub fn filter_by_score(proposals: Vec<Proposal>, thresh: f32) -> Vec<Proposal> {
    let before = proposals.len();
    let kept: Vec<Proposal> = proposals.into_iter().filter(|p| p.score > thresh).collect();
    debug!("Score threshold {} kept {}/{} proposals", thresh, kept.len(), before);
    kept
}

/// Keep proposals with more than `min_points` points
pub fn filter_by_size(proposals: Vec<Proposal>, min_points: usize) -> Vec<Proposal> {
    let before = proposals.len();
    let kept: Vec<Proposal> = proposals
        .into_iter()
        .filter(|p| p.point_count() > min_points)
        .collect();
    debug!("Size threshold {} kept {}/{} proposals", min_points, kept.len(), before);
    kept
}
