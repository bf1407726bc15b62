//! IoU-family losses for axis-aligned boxes and soft masks

use crate::reduction::{LossOutput, ReduceOptions};
use ndarray::{Array1, ArrayView2};
use pointgroup_core::{Error, Result};

pub const IOU_EPS: f32 = 1e-6;
pub const BOUNDED_IOU_BETA: f32 = 0.2;
pub const BOUNDED_IOU_EPS: f32 = 1e-3;

/// Axis-aligned box in `D` dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAlignedBox<const D: usize> {
    pub min: [f32; D],
    pub max: [f32; D],
}

impl<const D: usize> AxisAlignedBox<D> {
    pub fn new(min: [f32; D], max: [f32; D]) -> Self {
        Self { min, max }
    }

    /// Boxes from the rows of a `[n, 2 * D]` array laid out as `min.., max..`
    pub fn from_rows(rows: ArrayView2<f32>) -> Result<Vec<Self>> {
        if rows.ncols() != 2 * D {
            return Err(Error::shape("box columns", 2 * D, rows.ncols()));
        }
        Ok(rows
            .rows()
            .into_iter()
            .map(|r| {
                let mut b = Self::new([0.0; D], [0.0; D]);
                for d in 0..D {
                    b.min[d] = r[d];
                    b.max[d] = r[D + d];
                }
                b
            })
            .collect())
    }

    pub fn extent(&self, axis: usize) -> f32 {
        self.max[axis] - self.min[axis]
    }

    pub fn center(&self, axis: usize) -> f32 {
        (self.min[axis] + self.max[axis]) * 0.5
    }

    /// Product of the extents, negative extents clamped to 0
    pub fn volume(&self) -> f32 {
        (0..D).map(|d| self.extent(d).max(0.0)).product()
    }

    pub fn intersection(&self, other: &Self) -> f32 {
        (0..D)
            .map(|d| (self.max[d].min(other.max[d]) - self.min[d].max(other.min[d])).max(0.0))
            .product()
    }

    /// Smallest box containing both
    pub fn enclosing(&self, other: &Self) -> Self {
        let mut b = *self;
        for d in 0..D {
            b.min[d] = self.min[d].min(other.min[d]);
            b.max[d] = self.max[d].max(other.max[d]);
        }
        b
    }

    /// IoU with the union clamped below by `eps`
    pub fn iou(&self, other: &Self, eps: f32) -> f32 {
        let overlap = self.intersection(other);
        let union = (self.volume() + other.volume() - overlap).max(eps);
        overlap / union
    }
}

fn check_pairs<T>(pred: &[T], target: &[T]) -> Result<()> {
    if pred.len() != target.len() {
        return Err(Error::shape("box targets", pred.len(), target.len()));
    }
    Ok(())
}

/// `-ln(IoU)` per box pair, IoU clamped below by `eps`
pub fn iou_loss<const D: usize>(
    pred: &[AxisAlignedBox<D>],
    target: &[AxisAlignedBox<D>],
    eps: f32,
    opts: &ReduceOptions,
) -> Result<LossOutput> {
    check_pairs(pred, target)?;
    let loss: Array1<f32> = pred
        .iter()
        .zip(target)
        .map(|(p, t)| -p.iou(t, IOU_EPS).max(eps).ln())
        .collect();
    opts.apply(loss)
}

/// Bounded IoU loss, smoothed with `beta`.
///
/// Produces `2 * D` terms per box: the center terms of every axis followed
/// by the extent terms. `opts.weight` is per box.
pub fn bounded_iou_loss<const D: usize>(
    pred: &[AxisAlignedBox<D>],
    target: &[AxisAlignedBox<D>],
    beta: f32,
    eps: f32,
    opts: &ReduceOptions,
) -> Result<LossOutput> {
    check_pairs(pred, target)?;

    let mut loss = Vec::with_capacity(pred.len() * 2 * D);
    for (p, t) in pred.iter().zip(target) {
        let mut row = Vec::with_capacity(2 * D);
        for d in 0..D {
            let delta = (t.center(d) - p.center(d)).abs();
            let t_ext = t.extent(d);
            row.push(1.0 - ((t_ext - 2.0 * delta) / (t_ext + 2.0 * delta + eps)).max(0.0));
        }
        for d in 0..D {
            let (p_ext, t_ext) = (p.extent(d), t.extent(d));
            row.push(1.0 - (t_ext / (p_ext + eps)).min(p_ext / (t_ext + eps)));
        }
        loss.extend(row.into_iter().map(|v| {
            if v < beta {
                0.5 * v * v / beta
            } else {
                v - 0.5 * beta
            }
        }));
    }

    opts.apply_per_row(Array1::from(loss), 2 * D)
}

/// `1 - GIoU` per box pair
pub fn giou_loss<const D: usize>(
    pred: &[AxisAlignedBox<D>],
    target: &[AxisAlignedBox<D>],
    eps: f32,
    opts: &ReduceOptions,
) -> Result<LossOutput> {
    check_pairs(pred, target)?;
    let loss: Array1<f32> = pred
        .iter()
        .zip(target)
        .map(|(p, t)| {
            let overlap = p.intersection(t);
            let union = p.volume() + t.volume() - overlap + eps;
            let enclose = p.enclosing(t).volume() + eps;
            let giou = overlap / union - (enclose - union) / enclose;
            1.0 - giou
        })
        .collect();
    opts.apply(loss)
}

/// `1 - soft IoU` per row of `[n, points]` membership probabilities
pub fn soft_iou_loss(
    pred: ArrayView2<f32>,
    target: ArrayView2<f32>,
    eps: f32,
    opts: &ReduceOptions,
) -> Result<LossOutput> {
    if pred.dim() != target.dim() {
        return Err(Error::shape("soft IoU target points", pred.ncols(), target.ncols()));
    }
    let loss: Array1<f32> = pred
        .rows()
        .into_iter()
        .zip(target.rows())
        .map(|(p, t)| {
            let inter: f32 = p.iter().zip(t).map(|(&a, &b)| a * b).sum();
            let union: f32 = p.iter().zip(t).map(|(&a, &b)| a + b - a * b).sum();
            1.0 - inter / (union + eps)
        })
        .collect();
    opts.apply(loss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduction::Reduction;
    use ndarray::array;

    fn square(x0: f32, y0: f32, x1: f32, y1: f32) -> AxisAlignedBox<2> {
        AxisAlignedBox::new([x0, y0], [x1, y1])
    }

    #[test]
    fn test_box_geometry() {
        let a = square(0.0, 0.0, 2.0, 2.0);
        let b = square(1.0, 1.0, 3.0, 3.0);
        assert_eq!(a.volume(), 4.0);
        assert_eq!(a.intersection(&b), 1.0);
        assert_eq!(a.enclosing(&b), square(0.0, 0.0, 3.0, 3.0));
        assert!((a.iou(&b, IOU_EPS) - 1.0 / 7.0).abs() < 1e-6);

        let cube = AxisAlignedBox::<3>::new([0.0; 3], [1.0; 3]);
        assert_eq!(cube.volume(), 1.0);
    }

    #[test]
    fn test_from_rows() {
        let rows = array![[0.0, 0.0, 0.0, 1.0, 2.0, 3.0]];
        let boxes = AxisAlignedBox::<3>::from_rows(rows.view()).unwrap();
        assert_eq!(boxes[0].max, [1.0, 2.0, 3.0]);
        assert!(AxisAlignedBox::<2>::from_rows(rows.view()).is_err());
    }

    #[test]
    fn test_iou_loss() {
        let a = [square(0.0, 0.0, 2.0, 2.0), square(0.0, 0.0, 1.0, 1.0)];
        let b = [square(0.0, 0.0, 2.0, 2.0), square(5.0, 5.0, 6.0, 6.0)];
        let out = iou_loss(&a, &b, IOU_EPS, &ReduceOptions::new(Reduction::None)).unwrap();
        let loss = out.elementwise().unwrap();
        assert!(loss[0].abs() < 1e-6);
        // disjoint boxes hit the eps clamp
        assert!((loss[1] + IOU_EPS.ln()).abs() < 1e-3);
    }

    #[test]
    fn test_giou_loss() {
        let a = [square(0.0, 0.0, 1.0, 1.0)];
        let same = [square(0.0, 0.0, 1.0, 1.0)];
        let far = [square(2.0, 0.0, 3.0, 1.0)];
        let opts = ReduceOptions::default();
        assert!(giou_loss(&a, &same, IOU_EPS, &opts).unwrap().total() < 1e-5);
        // IoU 0, enclosing area 3, union 2: GIoU = -1/3
        let far_loss = giou_loss(&a, &far, IOU_EPS, &opts).unwrap().total();
        assert!((far_loss - 4.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_bounded_iou_loss() {
        let a = [square(0.0, 0.0, 2.0, 2.0)];
        let opts = ReduceOptions::new(Reduction::None);
        let out = bounded_iou_loss(&a, &a, BOUNDED_IOU_BETA, BOUNDED_IOU_EPS, &opts).unwrap();
        let loss = out.elementwise().unwrap();
        assert_eq!(loss.len(), 4);
        assert!(loss.iter().all(|&v| v < 1e-5));

        let shifted = [square(1.0, 0.0, 3.0, 2.0)];
        let out = bounded_iou_loss(&shifted, &a, BOUNDED_IOU_BETA, BOUNDED_IOU_EPS, &opts).unwrap();
        let loss = out.elementwise().unwrap();
        // x center term: 1 - (2 - 2) / (2 + 2) = 1
        assert!((loss[0] - (1.0 - 0.5 * BOUNDED_IOU_BETA)).abs() < 1e-3);
        assert!(loss[1] < 1e-5);
    }

    #[test]
    fn test_soft_iou_loss() {
        let pred = array![[1.0, 1.0, 0.0, 0.0], [0.5, 0.5, 0.0, 0.0]];
        let target = array![[1.0, 1.0, 0.0, 0.0], [1.0, 1.0, 0.0, 0.0]];
        let out = soft_iou_loss(pred.view(), target.view(), IOU_EPS, &ReduceOptions::new(Reduction::None)).unwrap();
        let loss = out.elementwise().unwrap();
        assert!(loss[0].abs() < 1e-5);
        assert!((loss[1] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_mismatched_pairs() {
        let a = [square(0.0, 0.0, 1.0, 1.0)];
        assert!(iou_loss(&a, &[], IOU_EPS, &ReduceOptions::default()).is_err());
    }
}
