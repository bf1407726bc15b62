//! Reads predictions back from a result directory

use pointgroup_core::{Error, InstancePrediction, PointMask, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Scene names with a `<scene>.txt` file directly under `dir`, sorted
pub fn list_scenes(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let mut scenes = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            scenes.push(stem.to_string());
        }
    }
    scenes.sort();
    Ok(scenes)
}

fn load_mask(path: &Path) -> Result<PointMask> {
    let content = fs::read_to_string(path)?;
    let values = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            l.parse::<u32>()
                .map_err(|e| Error::Parse(format!("{}: '{}': {}", path.display(), l, e)))
        })
        .collect::<Result<Vec<u32>>>()?;
    Ok(PointMask::from_values(&values))
}

fn resolve(base: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Load the instances listed in `<dir>/<scene>.txt`.
///
/// Each line is `<mask file> <label id> <confidence>`; relative mask paths
/// are resolved against `dir`.
pub fn load_scene_predictions(dir: impl AsRef<Path>, scene_name: &str) -> Result<Vec<InstancePrediction>> {
    let dir = dir.as_ref();
    let path = dir.join(format!("{}.txt", scene_name));
    let content = fs::read_to_string(&path)?;

    let mut predictions = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [mask_file, label, score] = parts[..] else {
            return Err(Error::Parse(format!(
                "{}:{}: expected '<mask file> <label id> <confidence>', got '{}'",
                path.display(),
                i + 1,
                line
            )));
        };

        let label_id = label
            .parse::<u32>()
            .map_err(|e| Error::Parse(format!("{}:{}: label '{}': {}", path.display(), i + 1, label, e)))?;
        let score = score
            .parse::<f32>()
            .map_err(|e| Error::Parse(format!("{}:{}: score '{}': {}", path.display(), i + 1, score, e)))?;

        predictions.push(InstancePrediction {
            mask: load_mask(&resolve(dir, mask_file))?,
            score,
            label_id,
        });
    }

    debug!("Loaded {} predictions for {}", predictions.len(), scene_name);
    Ok(predictions)
}
