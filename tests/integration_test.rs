use pointgroup_core::{InstancePrediction, PointGroupConfig, PointMask};
use pointgroup_eval::{evaluate_directory, load_scene_predictions, Evaluator};
use pointgroup_infer::{PostProcessor, RawModelOutput, ResultWriter};
use std::fs;
use std::ops::Range;
use std::path::Path;

const SCENE: &str = "scene0011_00";
const NUM_POINTS: usize = 240;

fn one_hot(class: usize) -> Vec<f32> {
    let mut row = vec![0.0; 20];
    row[class] = 1.0;
    row
}

/// 240 points: 0..120 a chair, 120..240 a table
fn raw_output() -> RawModelOutput {
    let clusters: Vec<(Range<u32>, f32)> = vec![
        (0..120, 2.0),    // chair
        (0..110, 1.0),    // duplicate chair, IoU 0.92
        (120..240, 1.5),  // table
        (150..160, 3.0),  // too small
        (120..240, -5.0), // score too low
    ];

    let mut proposals_idx = Vec::new();
    let mut proposals_offset = vec![0];
    for (cluster, (points, _)) in clusters.iter().enumerate() {
        proposals_idx.extend(points.clone().map(|p| [cluster as u32, p]));
        proposals_offset.push(proposals_idx.len() as u32);
    }

    RawModelOutput {
        scene_name: SCENE.to_string(),
        semantic_scores: (0..NUM_POINTS).map(|i| one_hot(if i < 120 { 4 } else { 6 })).collect(),
        pt_offsets: vec![[0.1, 0.0, -0.1]; NUM_POINTS],
        coords: Some((0..NUM_POINTS).map(|i| [i as f32, 0.0, 0.0]).collect()),
        proposal_scores: clusters.iter().map(|(_, s)| *s).collect(),
        proposals_idx,
        proposals_offset,
    }
}

fn write_gt(dir: &Path) {
    let ids: Vec<String> = (0..NUM_POINTS)
        .map(|i| if i < 120 { "5001" } else { "7001" }.to_string())
        .collect();
    fs::write(dir.join(format!("{}.txt", SCENE)), ids.join("\n")).unwrap();
}

#[test]
fn test_raw_output_to_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(format!("{}.json", SCENE));
    fs::write(&path, serde_json::to_string(&raw_output()).unwrap()).unwrap();

    let raw = RawModelOutput::from_file(&path).unwrap();
    assert_eq!(raw.num_proposals(), 5);

    let result = PostProcessor::default().process_raw(&raw, true).unwrap();
    assert_eq!(result.instances.len(), 2);
    // chair first (sigmoid 2.0 > sigmoid 1.5)
    assert_eq!(result.instances[0].label_id, 5);
    assert_eq!(result.instances[0].mask.count(), 120);
    assert_eq!(result.instances[1].label_id, 7);
    assert!(result.instances[0].score > result.instances[1].score);
}

#[test]
fn test_semantic_only_before_prepare_epochs() {
    let mut config = PointGroupConfig::default();
    config.test.test_epoch = 100;
    assert!(!config.test.has_proposals());

    let result = PostProcessor::from_config(&config.test)
        .process_raw(&raw_output(), config.test.has_proposals())
        .unwrap();
    assert!(result.instances.is_empty());
    assert_eq!(result.semantic_pred[0], 4);
    assert_eq!(result.semantic_pred[239], 6);
}

#[test]
fn test_full_inference_and_evaluation() {
    let work = tempfile::tempdir().unwrap();
    let gt_dir = work.path().join("gt");
    fs::create_dir_all(&gt_dir).unwrap();
    write_gt(&gt_dir);

    let mut config = PointGroupConfig::default();
    config.exp_path = work.path().join("exp");
    config.test.save_instance = true;
    config.test.save_semantic = true;

    let writer = ResultWriter::new(config.result_dir()).unwrap();
    writer.backup_config(&config).unwrap();

    let raw = raw_output();
    let result = PostProcessor::from_config(&config.test).process_raw(&raw, true).unwrap();
    writer.write_instances(&result).unwrap();
    writer.write_semantic(&result).unwrap();
    writer
        .write_coords_offsets(SCENE, raw.coords.as_deref().unwrap(), &raw.pt_offsets)
        .unwrap();

    // in-memory evaluation on the proposal labels
    let mut evaluator = Evaluator::new(config.eval.clone());
    evaluator
        .add_scan_file(SCENE, &result.instances, gt_dir.join(format!("{}.txt", SCENE)))
        .unwrap();
    let in_memory = evaluator.evaluate();
    assert!((in_memory.averages.all_ap - 1.0).abs() < 1e-9);

    // same numbers from the files on disk
    let from_files = evaluate_directory(writer.root(), &gt_dir, config.eval.clone()).unwrap();
    assert!((from_files.averages.all_ap - 1.0).abs() < 1e-9);
    assert!((from_files.averages.all_ap_50 - 1.0).abs() < 1e-9);
    assert!((from_files.averages.all_ap_25 - 1.0).abs() < 1e-9);

    let root = writer.root();
    assert!(root.join("backup_files/config.toml").is_file());
    assert!(root.join(format!("semantic/{}.txt", SCENE)).is_file());
    assert!(root.join(format!("coords_offsets/{}.txt", SCENE)).is_file());
    assert!(root.ends_with("result/epoch384_nmst0.3_scoret0.09_npointt100/val"));
}

#[test]
fn test_writer_loader_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ResultWriter::new(dir.path()).unwrap();

    let result = PostProcessor::default().process_raw(&raw_output(), true).unwrap();
    writer.write_instances(&result).unwrap();

    let loaded: Vec<InstancePrediction> = load_scene_predictions(dir.path(), SCENE).unwrap();
    assert_eq!(loaded.len(), result.instances.len());
    for (written, read) in result.instances.iter().zip(&loaded) {
        assert_eq!(written.mask, read.mask);
        assert_eq!(written.label_id, read.label_id);
        assert!((written.score - read.score).abs() <= 5e-5);
    }
}

#[test]
fn test_file_label_is_majority_class() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ResultWriter::new(dir.path()).unwrap();

    let mut result = PostProcessor::default().process_raw(&raw_output(), true).unwrap();
    // a mask mostly on table points, labelled chair by its proposal
    result.instances = vec![InstancePrediction {
        mask: PointMask::from_indices(NUM_POINTS, 100..240).unwrap(),
        score: 0.9,
        label_id: 5,
    }];
    writer.write_instances(&result).unwrap();

    let loaded = load_scene_predictions(dir.path(), SCENE).unwrap();
    assert_eq!(loaded[0].label_id, 7);
}
