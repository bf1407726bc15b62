//! Loss weighting and reduction

use ndarray::{Array1, ArrayView1};
use pointgroup_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    None,
    #[default]
    Mean,
    Sum,
}

impl FromStr for Reduction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Reduction::None),
            "mean" => Ok(Reduction::Mean),
            "sum" => Ok(Reduction::Sum),
            other => Err(Error::InvalidData(format!("unknown reduction '{}'", other))),
        }
    }
}

/// Loss after reduction
#[derive(Debug, Clone, PartialEq)]
pub enum LossOutput {
    Elementwise(Array1<f32>),
    Reduced(f32),
}

impl LossOutput {
    pub fn scalar(&self) -> Option<f32> {
        match self {
            LossOutput::Reduced(v) => Some(*v),
            LossOutput::Elementwise(_) => None,
        }
    }

    pub fn elementwise(&self) -> Option<&Array1<f32>> {
        match self {
            LossOutput::Elementwise(loss) => Some(loss),
            LossOutput::Reduced(_) => None,
        }
    }

    /// The reduced value, or the sum of an element-wise loss
    pub fn total(&self) -> f32 {
        match self {
            LossOutput::Reduced(v) => *v,
            LossOutput::Elementwise(loss) => loss.sum(),
        }
    }
}

/// Reduce an element-wise loss. The mean of an empty loss is 0.
pub fn reduce_loss(loss: Array1<f32>, reduction: Reduction) -> LossOutput {
    match reduction {
        Reduction::None => LossOutput::Elementwise(loss),
        Reduction::Mean if loss.is_empty() => LossOutput::Reduced(0.0),
        Reduction::Mean => LossOutput::Reduced(loss.sum() / loss.len() as f32),
        Reduction::Sum => LossOutput::Reduced(loss.sum()),
    }
}

/// Apply element weights, then reduce.
///
/// With `avg_factor` the mean divides by that factor instead of the number
/// of elements; it cannot be combined with `Sum`.
pub fn weight_reduce_loss(
    loss: Array1<f32>,
    weight: Option<ArrayView1<f32>>,
    reduction: Reduction,
    avg_factor: Option<f32>,
) -> Result<LossOutput> {
    let loss = match weight {
        Some(w) if w.len() != loss.len() => return Err(Error::shape("loss weight", loss.len(), w.len())),
        Some(w) => loss * &w,
        None => loss,
    };

    match (avg_factor, reduction) {
        (None, reduction) => Ok(reduce_loss(loss, reduction)),
        (Some(factor), Reduction::Mean) => Ok(LossOutput::Reduced(loss.sum() / factor)),
        (Some(_), Reduction::None) => Ok(LossOutput::Elementwise(loss)),
        (Some(_), Reduction::Sum) => Err(Error::InvalidData(
            "avg_factor can not be used with reduction 'sum'".to_string(),
        )),
    }
}

/// Weighting and reduction shared by every loss function
#[derive(Debug, Clone, Copy, Default)]
pub struct ReduceOptions<'a> {
    pub weight: Option<ArrayView1<'a, f32>>,
    pub reduction: Reduction,
    pub avg_factor: Option<f32>,
}

impl<'a> ReduceOptions<'a> {
    pub fn new(reduction: Reduction) -> Self {
        Self {
            reduction,
            ..Self::default()
        }
    }

    pub fn with_weight(mut self, weight: ArrayView1<'a, f32>) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_avg_factor(mut self, avg_factor: f32) -> Self {
        self.avg_factor = Some(avg_factor);
        self
    }

    pub fn apply(&self, loss: Array1<f32>) -> Result<LossOutput> {
        weight_reduce_loss(loss, self.weight, self.reduction, self.avg_factor)
    }

    /// Apply a per-row weight to a row-major loss with `cols` entries per row
    pub(crate) fn apply_per_row(&self, loss: Array1<f32>, cols: usize) -> Result<LossOutput> {
        let Some(weight) = self.weight else {
            return weight_reduce_loss(loss, None, self.reduction, self.avg_factor);
        };
        if weight.len() * cols != loss.len() {
            return Err(Error::shape("loss weight", loss.len() / cols.max(1), weight.len()));
        }
        let expanded: Array1<f32> = weight
            .iter()
            .flat_map(|&w| std::iter::repeat(w).take(cols))
            .collect();
        weight_reduce_loss(loss, Some(expanded.view()), self.reduction, self.avg_factor)
    }
}
