//! Result files in the ScanNet benchmark layout
//!
//! ```text
//! <root>/<scene>.txt                      predicted_masks/<scene>_000.txt <label_id> <score>
//! <root>/predicted_masks/<scene>_000.txt  one 0/1 per point
//! <root>/semantic/<scene>.txt             one class index per point
//! <root>/coords_offsets/<scene>.txt       x y z dx dy dz per point
//! <root>/backup_files/config.toml
//! ```

use crate::pipeline::ScanResult;
use crate::semantic::majority_label;
use pointgroup_core::{Error, PointGroupConfig, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const MASK_DIR: &str = "predicted_masks";
pub const SEMANTIC_DIR: &str = "semantic";
pub const COORDS_OFFSETS_DIR: &str = "coords_offsets";
pub const BACKUP_DIR: &str = "backup_files";

/// Relative path of an instance mask, as listed in the scene file
pub fn mask_file_name(scene_name: &str, instance: usize) -> String {
    format!("{}/{}_{:03}.txt", MASK_DIR, scene_name, instance)
}

/// Writes per-scan results under a result directory
pub struct ResultWriter {
    root: PathBuf,
}

impl ResultWriter {
    /// Create the result directory tree
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(MASK_DIR))?;
        debug!("Writing results to {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store the resolved configuration next to the results
    pub fn backup_config(&self, config: &PointGroupConfig) -> Result<PathBuf> {
        let dir = self.root.join(BACKUP_DIR);
        fs::create_dir_all(&dir)?;
        let path = dir.join("config.toml");
        fs::write(&path, toml::to_string(config)?)?;
        Ok(path)
    }

    /// Write the scene file and one mask file per instance.
    ///
    /// The label written for an instance is the majority semantic class of
    /// its points.
    pub fn write_instances(&self, result: &ScanResult) -> Result<PathBuf> {
        let scene = &result.scene_name;
        let path = self.root.join(format!("{}.txt", scene));
        let mut out = BufWriter::new(File::create(&path)?);

        for (i, instance) in result.instances.iter().enumerate() {
            if instance.mask.len() != result.num_points() {
                return Err(Error::shape(
                    format!("mask of {} instance {}", scene, i),
                    result.num_points(),
                    instance.mask.len(),
                ));
            }

            let label_id = match majority_label(&instance.mask, &result.semantic_pred)? {
                Some(label_id) => label_id,
                None => {
                    warn!("Instance {} of {} has no points, writing its proposal label", i, scene);
                    instance.label_id
                }
            };

            if i > 0 {
                writeln!(out)?;
            }
            write!(out, "{} {} {:.4}", mask_file_name(scene, i), label_id, instance.score)?;

            let mut mask_out = BufWriter::new(File::create(self.root.join(mask_file_name(scene, i)))?);
            for v in instance.mask.to_values() {
                writeln!(mask_out, "{}", v)?;
            }
            mask_out.flush()?;
        }

        out.flush()?;
        Ok(path)
    }

    pub fn write_semantic(&self, result: &ScanResult) -> Result<PathBuf> {
        let dir = self.root.join(SEMANTIC_DIR);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.txt", result.scene_name));
        let mut out = BufWriter::new(File::create(&path)?);
        for class in &result.semantic_pred {
            writeln!(out, "{}", class)?;
        }
        out.flush()?;
        Ok(path)
    }

    /// Write coordinates and predicted offsets side by side
    pub fn write_coords_offsets(
        &self,
        scene_name: &str,
        coords: &[[f32; 3]],
        offsets: &[[f32; 3]],
    ) -> Result<PathBuf> {
        if coords.len() != offsets.len() {
            return Err(Error::shape("coords", offsets.len(), coords.len()));
        }

        let dir = self.root.join(COORDS_OFFSETS_DIR);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.txt", scene_name));
        let mut out = BufWriter::new(File::create(&path)?);
        for (c, o) in coords.iter().zip(offsets) {
            writeln!(out, "{} {} {} {} {} {}", c[0], c[1], c[2], o[0], o[1], o[2])?;
        }
        out.flush()?;
        Ok(path)
    }
}
