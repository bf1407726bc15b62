//! Average precision over matched scans

use crate::matching::{GtMatch, ScanMatches};
use ndarray::Array2;
use pointgroup_core::labels::{INSTANCE_CLASS_NAMES, INSTANCE_LABEL_IDS};
use pointgroup_core::{EvalConfig, GtInstance};
use serde::Serialize;

/// AP per instance class (rows) and overlap threshold (columns).
///
/// NaN marks a class without ground truth.
#[derive(Debug, Clone)]
pub struct ApScores {
    pub overlaps: Vec<f32>,
    pub ap: Array2<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassAverages {
    pub name: String,
    pub label_id: u32,
    pub ap: f64,
    pub ap50: f64,
    pub ap25: f64,
}

/// Summary statistics of an evaluation run
#[derive(Debug, Clone, Serialize)]
pub struct Averages {
    pub all_ap: f64,
    pub all_ap_50: f64,
    pub all_ap_25: f64,
    pub classes: Vec<ClassAverages>,
}

struct GtFilter {
    min_region_size: usize,
    distance_thresh: f32,
    distance_conf: f32,
}

impl GtFilter {
    fn new(config: &EvalConfig) -> Self {
        Self {
            min_region_size: config.min_region_size,
            distance_thresh: config.distance_thresh.unwrap_or(f32::INFINITY),
            distance_conf: config.distance_conf.unwrap_or(f32::NEG_INFINITY),
        }
    }

    fn in_range(&self, gt: &GtInstance) -> bool {
        gt.vert_count >= self.min_region_size
            && gt.med_dist <= self.distance_thresh
            && gt.dist_conf >= self.distance_conf
    }

    fn accepts(&self, gt: &GtInstance) -> bool {
        gt.is_labelled() && self.in_range(gt)
    }
}

fn overlap(intersection: usize, gt_count: usize, pred_count: usize) -> f64 {
    let union = gt_count + pred_count - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// AP for every instance class and overlap threshold
pub fn evaluate_matches(matches: &[ScanMatches], config: &EvalConfig) -> ApScores {
    let filter = GtFilter::new(config);
    let n_classes = INSTANCE_LABEL_IDS.len();
    let mut ap = Array2::from_elem((n_classes, config.overlaps.len()), f64::NAN);

    for (oi, &overlap_th) in config.overlaps.iter().enumerate() {
        let overlap_th = overlap_th as f64;
        let mut pred_visited: Vec<Vec<bool>> = matches
            .iter()
            .map(|m| vec![false; m.num_predictions])
            .collect();

        for li in 0..n_classes {
            let mut y_true: Vec<f64> = Vec::new();
            let mut y_score: Vec<f64> = Vec::new();
            let mut hard_false_negatives = 0usize;
            let mut has_gt = false;
            let mut has_pred = false;

            for (mi, scan) in matches.iter().enumerate() {
                let pred_instances = &scan.pred[li];
                let gt_instances: Vec<&GtMatch> = scan.gt[li]
                    .iter()
                    .filter(|g| filter.accepts(&g.gt))
                    .collect();

                has_gt |= !gt_instances.is_empty();
                has_pred |= !pred_instances.is_empty();

                let mut cur_true = vec![1.0f64; gt_instances.len()];
                let mut cur_score = vec![f64::NEG_INFINITY; gt_instances.len()];
                let mut cur_match = vec![false; gt_instances.len()];

                for (gti, gt) in gt_instances.iter().enumerate() {
                    let mut found_match = false;
                    for pred in &gt.matched_pred {
                        if pred_visited[mi][pred.pred_id] {
                            continue;
                        }
                        let ov = overlap(pred.intersection, gt.gt.vert_count, pred.vert_count);
                        if ov <= overlap_th {
                            continue;
                        }

                        let confidence = pred.confidence as f64;
                        if cur_match[gti] {
                            // already matched: the weaker one counts as a false positive
                            let max_score = cur_score[gti].max(confidence);
                            let min_score = cur_score[gti].min(confidence);
                            cur_score[gti] = max_score;
                            cur_true.push(0.0);
                            cur_score.push(min_score);
                            cur_match.push(true);
                        } else {
                            found_match = true;
                            cur_match[gti] = true;
                            cur_score[gti] = confidence;
                            pred_visited[mi][pred.pred_id] = true;
                        }
                    }
                    if !found_match {
                        hard_false_negatives += 1;
                    }
                }

                for ((t, s), matched) in cur_true.into_iter().zip(cur_score).zip(cur_match) {
                    if matched {
                        y_true.push(t);
                        y_score.push(s);
                    }
                }

                for pred in pred_instances {
                    let found_gt = pred
                        .matched_gt
                        .iter()
                        .any(|g| overlap(g.intersection, g.gt.vert_count, pred.vert_count) > overlap_th);
                    if found_gt {
                        continue;
                    }

                    let mut num_ignore = pred.void_intersection;
                    for g in &pred.matched_gt {
                        if !g.gt.is_labelled() {
                            num_ignore += g.intersection;
                        }
                        if !filter.in_range(&g.gt) {
                            num_ignore += g.intersection;
                        }
                    }

                    let proportion_ignore = num_ignore as f64 / pred.vert_count as f64;
                    if proportion_ignore <= overlap_th {
                        y_true.push(0.0);
                        y_score.push(pred.confidence as f64);
                    }
                }
            }

            ap[[li, oi]] = if has_gt && has_pred {
                average_precision(&y_true, &y_score, hard_false_negatives)
            } else if has_gt {
                0.0
            } else {
                f64::NAN
            };
        }
    }

    ApScores {
        overlaps: config.overlaps.clone(),
        ap,
    }
}

/// Area under the precision/recall curve sampled at every distinct score
pub fn average_precision(y_true: &[f64], y_score: &[f64], hard_false_negatives: usize) -> f64 {
    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));
    let scores: Vec<f64> = order.iter().map(|&i| y_score[i]).collect();

    let cumsum: Vec<f64> = order
        .iter()
        .scan(0.0, |acc, &i| {
            *acc += y_true[i];
            Some(*acc)
        })
        .collect();

    // first index of every distinct score
    let unique: Vec<usize> = (0..scores.len())
        .filter(|&i| i == 0 || scores[i] != scores[i - 1])
        .collect();

    let num_examples = scores.len() as f64;
    let num_true = cumsum.last().copied().unwrap_or(0.0);
    let hard_fn = hard_false_negatives as f64;

    let mut precision = vec![0.0; unique.len() + 1];
    let mut recall = vec![0.0; unique.len() + 1];
    for (r, &idx) in unique.iter().enumerate() {
        let below = if idx == 0 { 0.0 } else { cumsum[idx - 1] };
        let tp = num_true - below;
        let fp = num_examples - idx as f64 - tp;
        let fn_ = below + hard_fn;
        precision[r] = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
        recall[r] = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
    }
    let last = unique.len();
    precision[last] = 1.0;
    recall[last] = 0.0;

    // step width at r is half the recall span between its neighbours
    let mut padded = Vec::with_capacity(recall.len() + 2);
    padded.push(recall[0]);
    padded.extend_from_slice(&recall);
    padded.push(0.0);

    precision
        .iter()
        .enumerate()
        .map(|(r, p)| p * 0.5 * (padded[r] - padded[r + 2]))
        .sum()
}

fn is_close(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    mean(values.filter(|v| !v.is_nan()))
}

fn overlap_columns(overlaps: &[f32], keep: impl Fn(f32) -> bool) -> Vec<usize> {
    overlaps
        .iter()
        .enumerate()
        .filter(|(_, o)| keep(**o))
        .map(|(i, _)| i)
        .collect()
}

/// Mean AP over 0.5:0.95, AP@50 and AP@25, overall and per class.
///
/// The overall means skip classes without ground truth.
pub fn compute_averages(scores: &ApScores) -> Averages {
    let o50 = overlap_columns(&scores.overlaps, |o| is_close(o, 0.5));
    let o25 = overlap_columns(&scores.overlaps, |o| is_close(o, 0.25));
    let all_but_25 = overlap_columns(&scores.overlaps, |o| !is_close(o, 0.25));

    let ap = &scores.ap;
    let over = |idx: &[usize]| -> Vec<f64> {
        (0..ap.nrows())
            .flat_map(|r| idx.iter().map(move |&c| ap[[r, c]]))
            .collect()
    };

    let classes = INSTANCE_CLASS_NAMES
        .iter()
        .zip(INSTANCE_LABEL_IDS)
        .enumerate()
        .map(|(li, (name, label_id))| {
            let row = ap.row(li);
            ClassAverages {
                name: name.to_string(),
                label_id,
                ap: mean(all_but_25.iter().map(|&c| row[c])),
                ap50: mean(o50.iter().map(|&c| row[c])),
                ap25: mean(o25.iter().map(|&c| row[c])),
            }
        })
        .collect();

    Averages {
        all_ap: nan_mean(over(&all_but_25).into_iter()),
        all_ap_50: nan_mean(over(&o50).into_iter()),
        all_ap_25: nan_mean(over(&o25).into_iter()),
        classes,
    }
}
