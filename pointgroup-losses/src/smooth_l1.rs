//! Smooth L1 and L1 regression losses

use crate::reduction::{LossOutput, ReduceOptions};
use ndarray::{Array1, ArrayView1, Zip};
use pointgroup_core::{Error, Result};

pub const DEFAULT_BETA: f32 = 1.0;

fn check_pair(pred: &ArrayView1<f32>, target: &ArrayView1<f32>) -> Result<()> {
    if pred.len() != target.len() {
        return Err(Error::shape("regression target", pred.len(), target.len()));
    }
    Ok(())
}

/// Smooth L1: quadratic below `beta`, linear above
pub fn smooth_l1_loss(
    pred: ArrayView1<f32>,
    target: ArrayView1<f32>,
    beta: f32,
    opts: &ReduceOptions,
) -> Result<LossOutput> {
    if !(beta > 0.0) {
        return Err(Error::InvalidData(format!("smooth L1 beta must be positive, got {}", beta)));
    }
    check_pair(&pred, &target)?;

    let loss: Array1<f32> = Zip::from(&pred).and(&target).map_collect(|&p, &t| {
        let diff = (p - t).abs();
        if diff < beta {
            0.5 * diff * diff / beta
        } else {
            diff - 0.5 * beta
        }
    });
    opts.apply(loss)
}

pub fn l1_loss(pred: ArrayView1<f32>, target: ArrayView1<f32>, opts: &ReduceOptions) -> Result<LossOutput> {
    check_pair(&pred, &target)?;
    let loss = Zip::from(&pred).and(&target).map_collect(|&p, &t| (p - t).abs());
    opts.apply(loss)
}
