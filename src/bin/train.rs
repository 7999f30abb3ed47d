//! nag-train: encrypted NAG logistic-regression training
//!
//! Loads the training and held-out sets, trains on the simulated engine and
//! writes the loss, weight and test-loss logs plus a JSON summary.

use std::time::Instant;

use clap::Parser;
use eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use nesterov_he::data::{load_training_data, DataPaths};
use nesterov_he::params::{EngineParams, RefreshStrategy, TrainingParams};
use nesterov_he::train::{
    CsvMonitor, IterationObserver, IterationReport, NagOptimizer, OutputFiles, PlainNag,
    RunSummary,
};
use nesterov_he::SimulatedEngine;

#[derive(Parser)]
#[command(name = "nag-train")]
#[command(about = "Train logistic regression with encrypted Nesterov accelerated gradient")]
#[command(version)]
struct Args {
    /// Refresh depth by bootstrapping (default)
    #[arg(long, conflicts_with = "interactive")]
    bootstrap: bool,

    /// Refresh depth by decrypt/re-encrypt (research mode, not secure)
    #[arg(long)]
    interactive: bool,

    /// Number of NAG iterations
    #[arg(long, default_value = "200")]
    iterations: usize,

    /// Maximum rows read from each input file
    #[arg(long)]
    rows: Option<usize>,

    /// Training features
    #[arg(long, default_value = "train_data/X_norm_1024.csv")]
    train_x: std::path::PathBuf,

    /// Training labels
    #[arg(long, default_value = "train_data/y_1024.csv")]
    train_y: std::path::PathBuf,

    /// Held-out features
    #[arg(long, default_value = "train_data/X_norm.csv")]
    test_x: std::path::PathBuf,

    /// Held-out labels
    #[arg(long, default_value = "train_data/y.csv")]
    test_y: std::path::PathBuf,

    /// Ring dimension (slots = ring_dim / 2)
    #[arg(long, default_value = "131072")]
    ring_dim: usize,

    /// Prefix for output files
    #[arg(long, default_value = "")]
    output_prefix: String,

    /// Digits after the decimal point in output files
    #[arg(long, default_value = "10")]
    precision: usize,

    /// Run a second bootstrap pass at this precision (bits)
    #[arg(long)]
    bootstrap_precision: Option<u32>,

    /// Write weights and test loss every K iterations
    #[arg(long, default_value = "10")]
    write_every: usize,

    /// Scale non-intercept features into [-0.5, 0.5]
    #[arg(long)]
    normalize: bool,

    /// Approximation noise (std dev) added on encryption and refresh
    #[arg(long, default_value = "0")]
    noise: f64,

    /// Seed for the noise generator
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Run the plaintext recurrence alongside and log the weight deviation
    #[arg(long)]
    verify_plaintext: bool,

    /// Debug-level logging
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let refresh = if args.interactive && !args.bootstrap {
        RefreshStrategy::Interactive
    } else {
        RefreshStrategy::Bootstrap {
            precision: args.bootstrap_precision,
        }
    };
    if args.interactive && args.bootstrap_precision.is_some() {
        warn!("--bootstrap-precision has no effect with --interactive");
    }

    info!("Encrypted NAG logistic regression ({})", refresh.label());

    let paths = DataPaths {
        train_x: args.train_x.clone(),
        train_y: args.train_y.clone(),
        test_x: args.test_x.clone(),
        test_y: args.test_y.clone(),
    };
    let data = load_training_data(&paths, args.rows, args.normalize)
        .wrap_err_with(|| format!("Failed to load data from {}", args.train_x.display()))?;
    info!(
        "Training set: {} x {}, test set: {} x {}",
        data.train_x.data.rows(),
        data.train_x.data.cols(),
        data.test_x.data.rows(),
        data.test_x.data.cols()
    );

    let mut engine_params = EngineParams::for_strategy(args.ring_dim, refresh);
    engine_params.encryption_noise = args.noise;
    engine_params.bootstrap_noise = args.noise;
    engine_params.seed = args.seed;

    let training = TrainingParams {
        iterations: args.iterations,
        refresh,
        write_every: args.write_every,
        ..TrainingParams::default()
    };

    let setup_start = Instant::now();
    let engine = SimulatedEngine::new(engine_params.clone())
        .map_err(|e| eyre::eyre!("Invalid engine parameters: {}", e))?;
    let optimizer = NagOptimizer::new(
        engine,
        training.clone(),
        &data.train_x.data,
        &data.train_y,
    )
    .map_err(|e| eyre::eyre!("Setup failed: {}", e))?;
    info!("Setup time: {:.2?}", setup_start.elapsed());

    let files = OutputFiles::new(&args.output_prefix, refresh.label());
    let mut monitor = CsvMonitor::create(
        &files,
        (data.train_x.data.clone(), data.train_y.clone()),
        (data.test_x.data.clone(), data.test_y.clone()),
        args.write_every,
        args.precision,
    )
    .wrap_err_with(|| format!("Failed to create output files at {}", files.loss.display()))?;

    let mut reference = if args.verify_plaintext {
        Some(PlainNag::new(&data.train_x.data, &data.train_y, &training)?)
    } else {
        None
    };

    let pb = ProgressBar::new(args.iterations as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut observer = |report: &IterationReport| -> nesterov_he::Result<()> {
        monitor.on_iteration(report)?;
        if let (Some(plain), Some(weights)) = (reference.as_mut(), report.weights.as_ref()) {
            plain.step()?;
            let deviation = plain
                .theta()
                .iter()
                .zip(weights)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max);
            info!(
                "Iteration {}: max deviation from plaintext {:.3e}",
                report.iteration, deviation
            );
        }
        pb.inc(1);
        Ok(())
    };

    let state = optimizer.run(&mut observer).wrap_err("Training failed")?;
    pb.finish_with_message("Done");
    monitor.finish()?;

    let summary = RunSummary {
        version: env!("CARGO_PKG_VERSION").to_string(),
        refresh: refresh.label().to_string(),
        engine: engine_params,
        training,
        num_features: optimizer.num_features(),
        row_size: optimizer.row_size(),
        col_size: optimizer.col_size(),
        iteration_depth: optimizer.iteration_depth(),
        last: monitor.last().clone(),
        total_seconds: state.elapsed.as_secs_f64(),
    };
    summary
        .save(&files.summary)
        .wrap_err_with(|| format!("Failed to write {}", files.summary.display()))?;
    info!("Summary saved to {}", files.summary.display());

    println!();
    println!("=== Training Complete ({}) ===", refresh.label());
    println!("Iterations: {}", state.iteration);
    println!("Features: {} (row size {})", optimizer.num_features(), optimizer.row_size());
    if let Some(loss) = summary.last.train_loss {
        println!("Final training loss: {:.6}", loss);
    }
    if let Some(loss) = summary.last.test_loss {
        println!("Last test loss: {:.6}", loss);
    }
    println!("Total time: {:.2?}", state.elapsed);

    Ok(())
}
