// PointGroup Command Line Interface
// Post-processes raw network dumps and evaluates instance predictions

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pointgroup_core::PointGroupConfig;
use pointgroup_eval::{evaluate_directory, write_csv, write_json, Evaluation, Evaluator};
use pointgroup_infer::{PostProcessor, RawModelOutput, ResultWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pointgroup")]
#[command(about = "PointGroup instance segmentation post-processing and evaluation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Post-process raw network outputs and write results
    Infer {
        /// Configuration file (JSON, TOML or YAML)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Directory of `<scene>.json` raw outputs
        #[arg(long, short)]
        input: PathBuf,
    },

    /// Evaluate a result directory against ground truth
    Evaluate {
        /// Result directory holding `<scene>.txt` prediction files
        #[arg(long)]
        pred_dir: PathBuf,

        /// Directory holding `<scene>.txt` ground-truth files
        #[arg(long)]
        gt_dir: PathBuf,

        /// Configuration file for the evaluation parameters
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Write per-class results as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the summary as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Print the resolved configuration as TOML
    Config {
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Infer { config, input } => {
            let config = load_config(config.as_deref())?;
            run_inference(&config, &input)?;
        }
        Commands::Evaluate {
            pred_dir,
            gt_dir,
            config,
            csv,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let evaluation = evaluate_directory(&pred_dir, &gt_dir, config.eval)
                .with_context(|| format!("Failed to evaluate {}", pred_dir.display()))?;
            report(&evaluation, csv.as_deref(), json.as_deref())?;
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// File (or defaults), then environment overrides, then validation
fn load_config(path: Option<&Path>) -> anyhow::Result<PointGroupConfig> {
    let mut config = match path {
        Some(path) => PointGroupConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => PointGroupConfig::default(),
    };
    config.apply_env();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn raw_inputs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

fn run_inference(config: &PointGroupConfig, input: &Path) -> anyhow::Result<()> {
    let inputs = raw_inputs(input)?;
    if inputs.is_empty() {
        bail!("No raw outputs (*.json) in {}", input.display());
    }

    let test = &config.test;
    let with_proposals = test.has_proposals();
    if !with_proposals {
        info!(
            "test_epoch {} <= prepare_epochs {}: semantic predictions only",
            test.test_epoch, test.prepare_epochs
        );
    }

    let writer = ResultWriter::new(config.result_dir())?;
    writer.backup_config(config)?;
    info!("Results go to {}", writer.root().display());

    let processor = PostProcessor::from_config(test).with_classes(config.data.classes);
    let mut evaluator = (test.eval && with_proposals).then(|| Evaluator::new(config.eval.clone()));

    for (i, path) in inputs.iter().enumerate() {
        let start = Instant::now();
        let raw = RawModelOutput::from_file(path)
            .with_context(|| format!("Failed to read raw output {}", path.display()))?;
        let result = processor.process_raw(&raw, with_proposals)?;
        let inference = start.elapsed();

        if let Some(evaluator) = evaluator.as_mut() {
            evaluator
                .add_scan_file(&result.scene_name, &result.instances, config.gt_file(&result.scene_name))
                .with_context(|| format!("Failed to evaluate {}", result.scene_name))?;
        }

        if test.save_semantic {
            writer.write_semantic(&result)?;
        }
        if test.save_pt_offsets {
            match &raw.coords {
                Some(coords) => {
                    writer.write_coords_offsets(&raw.scene_name, coords, &raw.pt_offsets)?;
                }
                None => warn!("{} has no coordinates, offsets not saved", raw.scene_name),
            }
        }
        if with_proposals && test.save_instance {
            writer.write_instances(&result)?;
        }

        let total = start.elapsed();
        info!(
            "instance iter: {}/{} point_num: {} ncluster: {} time: total {:.2}s inference {:.2}s save {:.2}s",
            i + 1,
            inputs.len(),
            result.num_points(),
            result.instances.len(),
            total.as_secs_f64(),
            inference.as_secs_f64(),
            (total - inference).as_secs_f64()
        );
    }

    if let Some(evaluator) = evaluator {
        report(&evaluator.evaluate(), None, None)?;
    }

    Ok(())
}

fn report(evaluation: &Evaluation, csv: Option<&Path>, json: Option<&Path>) -> anyhow::Result<()> {
    println!();
    print!("{}", evaluation.averages);

    if let Some(path) = csv {
        write_csv(&evaluation.averages, path)?;
    }
    if let Some(path) = json {
        write_json(&evaluation.averages, path)?;
    }
    Ok(())
}
