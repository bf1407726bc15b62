// Configuration for the PointGroup test driver and evaluation

use crate::labels::SEMANTIC_LABEL_IDS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Dataset location and label space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub data_root: PathBuf,
    pub dataset: String,
    /// Number of semantic classes predicted by the network
    pub classes: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("dataset"),
            dataset: "scannetv2".to_string(),
            classes: SEMANTIC_LABEL_IDS.len(),
        }
    }
}

/// Inference post-processing and output options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub split: String,
    pub test_epoch: u32,
    /// Epochs during which the network only predicts semantics and offsets
    pub prepare_epochs: u32,
    /// Proposals with confidence <= this are dropped
    pub score_thresh: f32,
    /// Proposals with point count <= this are dropped
    pub npoint_thresh: usize,
    /// NMS removes proposals whose IoU with a kept one is above this
    pub nms_thresh: f32,
    pub eval: bool,
    pub save_semantic: bool,
    pub save_pt_offsets: bool,
    pub save_instance: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            split: "val".to_string(),
            test_epoch: 384,
            prepare_epochs: 128,
            score_thresh: 0.09,
            npoint_thresh: 100,
            nms_thresh: 0.3,
            eval: true,
            save_semantic: false,
            save_pt_offsets: false,
            save_instance: false,
        }
    }
}

impl TestConfig {
    /// Whether the network emits instance proposals at the tested epoch
    pub fn has_proposals(&self) -> bool {
        self.test_epoch > self.prepare_epochs
    }
}

/// Instance evaluation parameters (ScanNet benchmark defaults)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub overlaps: Vec<f32>,
    pub min_region_size: usize,
    /// Maximum median distance of a GT instance, `None` for unbounded
    pub distance_thresh: Option<f32>,
    /// Minimum distance confidence of a GT instance, `None` for unbounded
    pub distance_conf: Option<f32>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        let mut overlaps: Vec<f32> = (0..9).map(|i| 0.5 + 0.05 * i as f32).collect();
        overlaps.push(0.25);
        Self {
            overlaps,
            min_region_size: 100,
            distance_thresh: None,
            distance_conf: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointGroupConfig {
    pub exp_path: PathBuf,
    pub data: DataConfig,
    pub test: TestConfig,
    pub eval: EvalConfig,
}

impl Default for PointGroupConfig {
    fn default() -> Self {
        Self {
            exp_path: PathBuf::from("exp/scannetv2/pointgroup/pointgroup_run1_scannet"),
            data: DataConfig::default(),
            test: TestConfig::default(),
            eval: EvalConfig::default(),
        }
    }
}

impl PointGroupConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded configuration from {:?}", path);
        Self::from_str(&content)
    }

    /// Load configuration from string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        // Try JSON first
        if let Ok(config) = serde_json::from_str::<PointGroupConfig>(content) {
            return Ok(config);
        }

        // Try TOML
        if let Ok(config) = toml::from_str::<PointGroupConfig>(content) {
            return Ok(config);
        }

        // YAML accepts almost anything, so it goes last
        if let Ok(config) = serde_yaml::from_str::<PointGroupConfig>(content) {
            return Ok(config);
        }

        Err(ConfigError::ParseError("Unknown format".to_string()))
    }

    /// Apply `POINTGROUP_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("POINTGROUP_DATA_ROOT") {
            self.data.data_root = PathBuf::from(root);
        }

        if let Some(exp) = lookup("POINTGROUP_EXP_PATH") {
            self.exp_path = PathBuf::from(exp);
        }

        if let Some(split) = lookup("POINTGROUP_SPLIT") {
            self.test.split = split;
        }

        if let Some(epoch) = lookup("POINTGROUP_TEST_EPOCH").and_then(|v| v.parse().ok()) {
            self.test.test_epoch = epoch;
        }

        if let Some(t) = lookup("POINTGROUP_NMS_THRESH").and_then(|v| v.parse().ok()) {
            self.test.nms_thresh = t;
        }

        if let Some(t) = lookup("POINTGROUP_SCORE_THRESH").and_then(|v| v.parse().ok()) {
            self.test.score_thresh = t;
        }

        if let Some(t) = lookup("POINTGROUP_NPOINT_THRESH").and_then(|v| v.parse().ok()) {
            self.test.npoint_thresh = t;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = 0.0..=1.0;

        if !unit.contains(&self.test.score_thresh) {
            return Err(ConfigError::ValidationError(
                "test.score_thresh must be within [0, 1]".to_string(),
            ));
        }

        if !unit.contains(&self.test.nms_thresh) {
            return Err(ConfigError::ValidationError(
                "test.nms_thresh must be within [0, 1]".to_string(),
            ));
        }

        if self.data.classes == 0 {
            return Err(ConfigError::ValidationError(
                "data.classes must be > 0".to_string(),
            ));
        }

        if self.data.classes > SEMANTIC_LABEL_IDS.len() {
            return Err(ConfigError::ValidationError(format!(
                "data.classes {} exceeds the {} classes with a label id",
                self.data.classes,
                SEMANTIC_LABEL_IDS.len()
            )));
        }

        if self.eval.overlaps.is_empty() {
            return Err(ConfigError::ValidationError(
                "eval.overlaps cannot be empty".to_string(),
            ));
        }

        if let Some(bad) = self.eval.overlaps.iter().find(|o| !unit.contains(*o)) {
            return Err(ConfigError::ValidationError(format!(
                "eval overlap {} is outside [0, 1]",
                bad
            )));
        }

        Ok(())
    }

    /// Directory that receives per-scan result files
    pub fn result_dir(&self) -> PathBuf {
        let t = &self.test;
        self.exp_path
            .join("result")
            .join(format!(
                "epoch{}_nmst{}_scoret{}_npointt{}",
                t.test_epoch, t.nms_thresh, t.score_thresh, t.npoint_thresh
            ))
            .join(&t.split)
    }

    /// Ground-truth label file of a scene
    pub fn gt_file(&self, scene_name: &str) -> PathBuf {
        self.gt_dir().join(format!("{}.txt", scene_name))
    }

    pub fn gt_dir(&self) -> PathBuf {
        self.data
            .data_root
            .join(&self.data.dataset)
            .join(format!("{}_gt", self.test.split))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::ValidationError(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = PointGroupConfig::default();
        assert_eq!(config.test.score_thresh, 0.09);
        assert_eq!(config.test.npoint_thresh, 100);
        assert_eq!(config.test.nms_thresh, 0.3);
        assert_eq!(config.test.split, "val");
        assert_eq!(config.data.classes, 20);
        assert!(config.test.has_proposals());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_overlaps() {
        let eval = EvalConfig::default();
        assert_eq!(eval.overlaps.len(), 10);
        assert!((eval.overlaps[0] - 0.5).abs() < 1e-6);
        assert!((eval.overlaps[8] - 0.9).abs() < 1e-6);
        assert!((eval.overlaps[9] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_result_dir_naming() {
        let config = PointGroupConfig::default();
        let dir = config.result_dir();
        let s = dir.to_string_lossy();
        assert!(s.ends_with("epoch384_nmst0.3_scoret0.09_npointt100/val"), "{}", s);
    }

    #[test]
    fn test_gt_file_path() {
        let config = PointGroupConfig::default();
        let path = config.gt_file("scene0011_00");
        assert_eq!(path, PathBuf::from("dataset/scannetv2/val_gt/scene0011_00.txt"));
    }

    #[test]
    fn test_from_str_toml_partial() {
        let content = r#"
            exp_path = "exp/custom"

            [test]
            nms_thresh = 0.5
            save_instance = true
        "#;
        let config = PointGroupConfig::from_str(content).unwrap();
        assert_eq!(config.exp_path, PathBuf::from("exp/custom"));
        assert_eq!(config.test.nms_thresh, 0.5);
        assert!(config.test.save_instance);
        // untouched sections keep their defaults
        assert_eq!(config.test.npoint_thresh, 100);
        assert_eq!(config.data.dataset, "scannetv2");
    }

    #[test]
    fn test_from_str_json() {
        let content = r#"{"test": {"score_thresh": 0.2, "split": "test"}}"#;
        let config = PointGroupConfig::from_str(content).unwrap();
        assert_eq!(config.test.score_thresh, 0.2);
        assert_eq!(config.test.split, "test");
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!(PointGroupConfig::from_str("[[[").is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = PointGroupConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed = PointGroupConfig::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pointgroup.yaml");
        std::fs::write(&path, "test:\n  npoint_thresh: 50\n").unwrap();
        let config = PointGroupConfig::from_file(&path).unwrap();
        assert_eq!(config.test.npoint_thresh, 50);
    }

    #[test]
    fn test_from_file_missing() {
        let err = PointGroupConfig::from_file("/nonexistent/pointgroup.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("POINTGROUP_DATA_ROOT", "/data"),
            ("POINTGROUP_NMS_THRESH", "0.25"),
            ("POINTGROUP_NPOINT_THRESH", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = PointGroupConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.data.data_root, PathBuf::from("/data"));
        assert_eq!(config.test.nms_thresh, 0.25);
        // unparsable values are ignored
        assert_eq!(config.test.npoint_thresh, 100);
    }

    #[test]
    fn test_validation_thresholds() {
        let mut config = PointGroupConfig::default();
        config.test.nms_thresh = 1.5;
        assert!(config.validate().is_err());

        let mut config = PointGroupConfig::default();
        config.test.score_thresh = -0.1;
        assert!(config.validate().is_err());

        let mut config = PointGroupConfig::default();
        config.eval.overlaps.clear();
        assert!(config.validate().is_err());

        let mut config = PointGroupConfig::default();
        config.data.classes = 0;
        assert!(config.validate().is_err());

        // class 20 would have no NYU40 id
        let mut config = PointGroupConfig::default();
        config.data.classes = 21;
        assert!(config.validate().is_err());
        config.data.classes = 18;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_prepare_epochs() {
        let mut config = TestConfig::default();
        config.test_epoch = 128;
        assert!(!config.has_proposals());
        config.test_epoch = 129;
        assert!(config.has_proposals());
    }
}
