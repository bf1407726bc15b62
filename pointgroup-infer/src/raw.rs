//! Raw network output for one scan

use ndarray::Array2;
use pointgroup_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Per-scan output of the network, as dumped by the inference step.
///
/// Proposals are stored in CSR form: `proposals_idx` holds
/// `(cluster_id, point_idx)` pairs grouped by cluster and
/// `proposals_offset[p]..proposals_offset[p + 1]` is the slice of cluster `p`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawModelOutput {
    pub scene_name: String,
    /// `(N, classes)` per-point class scores
    pub semantic_scores: Vec<Vec<f32>>,
    /// `(N, 3)` per-point offsets to the instance center
    pub pt_offsets: Vec<[f32; 3]>,
    /// `(N, 3)` point coordinates, only needed to dump offsets
    #[serde(default)]
    pub coords: Option<Vec<[f32; 3]>>,
    /// `(P)` proposal scores before the sigmoid
    #[serde(default)]
    pub proposal_scores: Vec<f32>,
    #[serde(default)]
    pub proposals_idx: Vec<[u32; 2]>,
    /// `(P + 1)` offsets into `proposals_idx`
    #[serde(default)]
    pub proposals_offset: Vec<u32>,
}

impl RawModelOutput {
    /// Read and validate a JSON dump
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let raw: RawModelOutput = serde_json::from_reader(reader)?;
        raw.validate()?;
        debug!(
            "Loaded raw output for {} ({} points, {} proposals) from {:?}",
            raw.scene_name,
            raw.num_points(),
            raw.num_proposals(),
            path
        );
        Ok(raw)
    }

    pub fn num_points(&self) -> usize {
        self.semantic_scores.len()
    }

    pub fn num_proposals(&self) -> usize {
        self.proposals_offset.len().saturating_sub(1)
    }

    /// Whether the dump carries the proposal branch at all
    pub fn has_proposals(&self) -> bool {
        !self.proposals_offset.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.semantic_scores.first().map_or(0, |row| row.len())
    }

    /// Check that all arrays agree on N and P
    pub fn validate(&self) -> Result<()> {
        let n = self.num_points();
        let classes = self.num_classes();

        if let Some((i, row)) = self
            .semantic_scores
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != classes)
        {
            return Err(Error::shape(
                format!("semantic_scores row {}", i),
                classes,
                row.len(),
            ));
        }

        if self.pt_offsets.len() != n {
            return Err(Error::shape("pt_offsets", n, self.pt_offsets.len()));
        }

        if let Some(coords) = &self.coords {
            if coords.len() != n {
                return Err(Error::shape("coords", n, coords.len()));
            }
        }

        if !self.has_proposals() {
            if !self.proposal_scores.is_empty() || !self.proposals_idx.is_empty() {
                return Err(Error::InvalidData(
                    "proposal scores or indices given without proposals_offset".to_string(),
                ));
            }
            return Ok(());
        }

        let p = self.num_proposals();
        if self.proposal_scores.len() != p {
            return Err(Error::shape("proposal_scores", p, self.proposal_scores.len()));
        }

        if self.proposals_offset[0] != 0 {
            return Err(Error::InvalidData(
                "proposals_offset must start at 0".to_string(),
            ));
        }

        if self.proposals_offset.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::InvalidData(
                "proposals_offset must be non-decreasing".to_string(),
            ));
        }

        let total = self.proposals_offset[p] as usize;
        if total != self.proposals_idx.len() {
            return Err(Error::shape("proposals_idx", total, self.proposals_idx.len()));
        }

        for (p_id, window) in self.proposals_offset.windows(2).enumerate() {
            for &[cluster, point] in &self.proposals_idx[window[0] as usize..window[1] as usize] {
                if cluster as usize != p_id {
                    return Err(Error::InvalidData(format!(
                        "proposal entry for cluster {} found in the slice of cluster {}",
                        cluster, p_id
                    )));
                }
                if point as usize >= n {
                    return Err(Error::InvalidData(format!(
                        "proposal point index {} out of range for {} points",
                        point, n
                    )));
                }
            }
        }

        Ok(())
    }

    /// Semantic scores as an `(N, classes)` matrix
    pub fn semantic_matrix(&self) -> Result<Array2<f32>> {
        let n = self.num_points();
        let classes = self.num_classes();
        let flat: Vec<f32> = self.semantic_scores.iter().flatten().copied().collect();
        Array2::from_shape_vec((n, classes), flat)
            .map_err(|e| Error::InvalidData(format!("semantic_scores: {}", e)))
    }
}
