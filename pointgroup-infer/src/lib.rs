//! pointgroup-infer: instance post-processing for PointGroup outputs
//!
//! Turns the raw network output of a scan (per-point semantic scores and
//! clustered instance proposals) into a set of non-overlapping instance
//! masks: score threshold, size threshold, mask IoU and greedy NMS. The
//! results are written in the ScanNet benchmark layout.

pub mod raw;
pub mod semantic;
pub mod proposals;
pub mod iou;
pub mod nms;
pub mod pipeline;
pub mod writer;

pub use raw::RawModelOutput;
pub use iou::{iou_matrix, proposal_iou_matrix};
pub use nms::{non_max_suppression, suppress_proposals};
pub use pipeline::{PostProcessor, ScanResult};
pub use writer::ResultWriter;
