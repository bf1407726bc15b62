//! Console table and CSV output for AP averages

use crate::ap::Averages;
use pointgroup_core::Result;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

const LINE_LEN: usize = 64;

/// AP value formatted like Python's `{:.3f}`: NaN prints as `nan`
struct Ap(f64);

impl fmt::Display for Ap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_nan() {
            f.pad("nan")
        } else {
            fmt::Display::fmt(&self.0, f)
        }
    }
}

impl fmt::Display for Averages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "#".repeat(LINE_LEN))?;
        writeln!(f, "{:<15}:{:>15}{:>15}{:>15}", "what", "AP", "AP_50%", "AP_25%")?;
        writeln!(f, "{}", "#".repeat(LINE_LEN))?;
        for class in &self.classes {
            writeln!(
                f,
                "{:<15}:{:>15.3}{:>15.3}{:>15.3}",
                class.name,
                Ap(class.ap),
                Ap(class.ap50),
                Ap(class.ap25)
            )?;
        }
        writeln!(f, "{}", "-".repeat(LINE_LEN))?;
        writeln!(
            f,
            "{:<15}:{:>15.3}{:>15.3}{:>15.3}",
            "average",
            Ap(self.all_ap),
            Ap(self.all_ap_50),
            Ap(self.all_ap_25)
        )
    }
}

/// Write one row per class: `class,class id,ap,ap50,ap25`
pub fn write_csv(averages: &Averages, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "class,class id,ap,ap50,ap25")?;
    for class in &averages.classes {
        writeln!(
            out,
            "{},{},{:.3},{:.3},{:.3}",
            class.name,
            class.label_id,
            Ap(class.ap),
            Ap(class.ap50),
            Ap(class.ap25)
        )?;
    }
    out.flush()?;
    info!("Wrote evaluation results to {}", path.display());
    Ok(())
}

/// Write the averages as pretty-printed JSON
pub fn write_json(averages: &Averages, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(out, averages)?;
    info!("Wrote evaluation summary to {}", path.display());
    Ok(())
}
