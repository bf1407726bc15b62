//! Accumulates scan matches and turns them into AP statistics

use crate::ap::{compute_averages, evaluate_matches, ApScores, Averages};
use crate::gt::load_gt_ids;
use crate::matching::{assign_instances_for_scan, ScanMatches};
use crate::predictions::{list_scenes, load_scene_predictions};
use pointgroup_core::{Error, EvalConfig, InstancePrediction, Result};
use std::path::Path;
use tracing::{debug, info};

/// Result of an evaluation run
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub scores: ApScores,
    pub averages: Averages,
}

pub struct Evaluator {
    config: EvalConfig,
    scans: Vec<ScanMatches>,
}

impl Evaluator {
    pub fn new(config: EvalConfig) -> Self {
        Self {
            config,
            scans: Vec::new(),
        }
    }

    pub fn num_scans(&self) -> usize {
        self.scans.len()
    }

    /// Match the predictions of one scan against its ground-truth ids
    pub fn add_scan(
        &mut self,
        scene_name: &str,
        predictions: &[InstancePrediction],
        gt_ids: &[u32],
    ) -> Result<()> {
        let matches =
            assign_instances_for_scan(scene_name, predictions, gt_ids, self.config.min_region_size)?;
        self.scans.push(matches);
        debug!("scans processed: {}", self.scans.len());
        Ok(())
    }

    /// Like [`Evaluator::add_scan`], reading the ground truth from `gt_file`
    pub fn add_scan_file(
        &mut self,
        scene_name: &str,
        predictions: &[InstancePrediction],
        gt_file: impl AsRef<Path>,
    ) -> Result<()> {
        let gt_ids = load_gt_ids(gt_file)?;
        self.add_scan(scene_name, predictions, &gt_ids)
    }

    pub fn evaluate(&self) -> Evaluation {
        info!("Evaluating {} scans...", self.scans.len());
        let scores = evaluate_matches(&self.scans, &self.config);
        let averages = compute_averages(&scores);
        Evaluation { scores, averages }
    }
}

/// Evaluate every scene of a result directory against `<gt_dir>/<scene>.txt`
pub fn evaluate_directory(
    pred_dir: impl AsRef<Path>,
    gt_dir: impl AsRef<Path>,
    config: EvalConfig,
) -> Result<Evaluation> {
    let pred_dir = pred_dir.as_ref();
    let gt_dir = gt_dir.as_ref();

    let scenes = list_scenes(pred_dir)?;
    if scenes.is_empty() {
        return Err(Error::InvalidData(format!(
            "no prediction files in {}",
            pred_dir.display()
        )));
    }

    let mut evaluator = Evaluator::new(config);
    for (i, scene) in scenes.iter().enumerate() {
        let gt_file = gt_dir.join(format!("{}.txt", scene));
        if !gt_file.is_file() {
            return Err(Error::InvalidData(format!(
                "prediction {} has no ground truth file {}",
                scene,
                gt_file.display()
            )));
        }
        let predictions = load_scene_predictions(pred_dir, scene)?;
        evaluator.add_scan_file(scene, &predictions, &gt_file)?;
        info!("scans processed: {}/{}", i + 1, scenes.len());
    }

    Ok(evaluator.evaluate())
}
