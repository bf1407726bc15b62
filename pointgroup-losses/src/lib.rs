//! pointgroup-losses: forward values of the PointGroup training losses
//!
//! Every loss produces an element-wise [`ndarray::Array1`] which is then
//! weighted and reduced through [`ReduceOptions`]. No gradients are
//! computed; these are for reporting loss values offline.

pub mod reduction;
pub mod accuracy;
pub mod cross_entropy;
pub mod focal;
pub mod smooth_l1;
pub mod iou;

pub use reduction::{reduce_loss, weight_reduce_loss, LossOutput, ReduceOptions, Reduction};
pub use accuracy::{accuracy, top1_accuracy};
pub use cross_entropy::{binary_cross_entropy, cross_entropy, mask_cross_entropy, IGNORE_INDEX};
pub use focal::sigmoid_focal_loss;
pub use smooth_l1::{l1_loss, smooth_l1_loss};
pub use iou::{bounded_iou_loss, giou_loss, iou_loss, soft_iou_loss, AxisAlignedBox};
