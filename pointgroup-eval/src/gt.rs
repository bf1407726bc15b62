//! Ground-truth label files

use pointgroup_core::labels::{instance_class_index, INSTANCE_LABEL_IDS};
use pointgroup_core::{Error, GtInstance, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Read a `<scene>.txt` ground-truth file: one encoded id per point
pub fn load_gt_ids(path: impl AsRef<Path>) -> Result<Vec<u32>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(i, line)| {
            line.parse::<u32>().map_err(|e| {
                Error::Parse(format!("{}:{}: '{}': {}", path.display(), i + 1, line, e))
            })
        })
        .collect()
}

/// Instances of the scan grouped by instance class index.
///
/// Id 0 (unannotated) and ids whose label is not an instance class are
/// skipped.
pub fn gt_instances(gt_ids: &[u32]) -> Vec<Vec<GtInstance>> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for &id in gt_ids {
        *counts.entry(id).or_default() += 1;
    }

    let mut by_class = vec![Vec::new(); INSTANCE_LABEL_IDS.len()];
    for (id, vert_count) in counts {
        if id == 0 {
            continue;
        }
        let instance = GtInstance::new(id, vert_count);
        if let Some(class) = instance_class_index(instance.label_id) {
            by_class[class].push(instance);
        }
    }
    by_class
}
