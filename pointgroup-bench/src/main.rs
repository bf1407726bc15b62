mod synthetic;

use clap::{Parser, Subcommand};
use pointgroup_core::EvalConfig;
use pointgroup_eval::Evaluator;
use pointgroup_infer::{proposal_iou_matrix, suppress_proposals, PostProcessor};
use std::time::Instant;
use synthetic::SyntheticScan;

const SEED: u64 = 567;

#[derive(Parser)]
#[command(name = "pointgroup-bench")]
#[command(about = "PointGroup post-processing benchmarks")]
struct Cli {
    #[command(subcommand)]
    command: Option<BenchCommand>,

    /// Points per scan
    #[arg(long, default_value = "100000")]
    points: usize,

    /// Proposals per scan
    #[arg(long, default_value = "200")]
    proposals: usize,
}

#[derive(Subcommand)]
enum BenchCommand {
    /// Mask IoU matrix
    Iou,
    /// IoU matrix plus greedy NMS
    Nms,
    /// Thresholds, NMS and evaluation over several scans
    Pipeline {
        #[arg(long, default_value = "10")]
        scans: usize,
    },
    /// All of the above over growing proposal counts
    Full,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Some(BenchCommand::Iou) => benchmark_iou(cli.points, &[cli.proposals]),
        Some(BenchCommand::Nms) => benchmark_nms(cli.points, &[cli.proposals]),
        Some(BenchCommand::Pipeline { scans }) => benchmark_pipeline(cli.points, cli.proposals, scans)?,
        Some(BenchCommand::Full) | None => {
            println!("PointGroup Post-processing Benchmarks");
            println!("=====================================\n");

            let sizes = [50, 200, 800];
            benchmark_iou(cli.points, &sizes);
            benchmark_nms(cli.points, &sizes);
            benchmark_pipeline(cli.points, cli.proposals, 10)?;
        }
    }

    Ok(())
}

fn benchmark_iou(points: usize, sizes: &[usize]) {
    println!("Benchmark 1: Mask IoU Matrix");
    println!("----------------------------");

    for &size in sizes {
        let scan = SyntheticScan::generate(SEED, points, size, 20);

        let start = Instant::now();
        let ious = proposal_iou_matrix(&scan.proposals);
        let duration = start.elapsed();

        let pairs = (size * size) as f64;
        println!(
            "  {} proposals x {} points: {:?} ({:.2} pairs/sec, {} threads)",
            size,
            points,
            duration,
            pairs / duration.as_secs_f64(),
            rayon::current_num_threads()
        );
        tracing::debug!("IoU matrix shape {:?}", ious.dim());
    }

    println!();
}

fn benchmark_nms(points: usize, sizes: &[usize]) {
    println!("Benchmark 2: Greedy Mask NMS");
    println!("----------------------------");

    for &size in sizes {
        let scan = SyntheticScan::generate(SEED, points, size, 20);

        let start = Instant::now();
        let kept = suppress_proposals(scan.proposals, 0.3);
        let duration = start.elapsed();

        println!("  {} proposals: {:?} (kept {})", size, duration, kept.len());
    }

    println!();
}

fn benchmark_pipeline(points: usize, proposals: usize, scans: usize) -> anyhow::Result<()> {
    println!("Benchmark 3: Pipeline and Evaluation");
    println!("------------------------------------");

    let processor = PostProcessor::default();
    let mut evaluator = Evaluator::new(EvalConfig::default());

    let start = Instant::now();
    for i in 0..scans {
        let scan = SyntheticScan::generate(SEED + i as u64, points, proposals, 20);
        let instances = processor.process(scan.proposals);
        evaluator.add_scan(&format!("synthetic{:04}", i), &instances, &scan.gt_ids)?;
    }
    let process_duration = start.elapsed();

    let start = Instant::now();
    let evaluation = evaluator.evaluate();
    let eval_duration = start.elapsed();

    println!(
        "  {} scans: process {:?} ({:.2} scans/sec), evaluate {:?}",
        scans,
        process_duration,
        scans as f64 / process_duration.as_secs_f64(),
        eval_duration
    );
    println!("  AP {:.3} AP50 {:.3}", evaluation.averages.all_ap, evaluation.averages.all_ap_50);

    println!();
    Ok(())
}
