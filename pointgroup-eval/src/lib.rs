//! pointgroup-eval: ScanNet-style instance segmentation evaluation
//!
//! Matches predicted instance masks against ground-truth instance ids and
//! reports average precision per class and overlap threshold.

pub mod gt;
pub mod matching;
pub mod ap;
pub mod predictions;
pub mod report;
pub mod evaluator;

pub use ap::{average_precision, compute_averages, evaluate_matches, ApScores, Averages, ClassAverages};
pub use evaluator::{evaluate_directory, Evaluation, Evaluator};
pub use matching::{assign_instances_for_scan, ScanMatches};
pub use predictions::{list_scenes, load_scene_predictions};
pub use report::{write_csv, write_json};
