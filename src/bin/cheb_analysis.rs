//! cheb-analysis: error sweep of the Chebyshev sigmoid approximation
//!
//! Evaluates the engine's logistic approximation over `(low, high)` and
//! writes `x,approx,exact,abs_error` rows to a CSV file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use nesterov_he::math::sigmoid;
use nesterov_he::{EngineParams, HomomorphicEngine, SimulatedEngine};

#[derive(Parser)]
#[command(name = "cheb-analysis")]
#[command(about = "Measure the error of the Chebyshev sigmoid approximation")]
#[command(version)]
struct Args {
    /// Lower end of the approximation interval
    #[arg(long, default_value = "-16", allow_hyphen_values = true)]
    low: f64,

    /// Upper end of the approximation interval
    #[arg(long, default_value = "16")]
    high: f64,

    /// Chebyshev polynomial degree
    #[arg(long, default_value = "59")]
    degree: u32,

    /// Distance between sample points
    #[arg(long, default_value = "0.001")]
    step: f64,

    /// Ring dimension of the evaluating engine
    #[arg(long, default_value = "8192")]
    ring_dim: usize,

    /// Output CSV (default: sigmoid_results_<high>_<degree>.csv)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    if !(args.step > 0.0) || !(args.low < args.high) {
        return Err(eyre::eyre!(
            "Invalid sweep: step {} over [{}, {}]",
            args.step,
            args.low,
            args.high
        ));
    }

    let depth = nesterov_he::math::chebyshev_depth(args.degree)
        .map_err(|e| eyre::eyre!("Invalid degree: {}", e))?;
    info!("Degree {} consumes {} levels", args.degree, depth);

    let params = EngineParams {
        max_depth: depth,
        ..EngineParams::interactive(args.ring_dim)
    };
    let mut engine = SimulatedEngine::new(params)?;
    let keys = engine.key_gen();
    engine.gen_mult_key(&keys.secret)?;

    let mut inputs = Vec::new();
    let mut x = args.low + args.step;
    while x < args.high - args.step {
        inputs.push(x);
        x += args.step;
    }
    info!("Evaluating {} points", inputs.len());

    let output = args.output.clone().unwrap_or_else(|| {
        PathBuf::from(format!(
            "sigmoid_results_{}_{}.csv",
            args.high as i64, args.degree
        ))
    });
    let file = File::create(&output)
        .wrap_err_with(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "x,approx,exact,abs_error")?;

    let num_slots = engine.num_slots();
    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut max_error: f64 = 0.0;
    let mut worst_x = args.low;
    for chunk in inputs.chunks(num_slots) {
        let ct = engine.encrypt(&keys.public, chunk)?;
        let out = engine.approximate_sigmoid(&ct, args.low, args.high, args.degree)?;
        let values = engine.decrypt(&keys.secret, &out)?;

        for (&x, &approx) in chunk.iter().zip(&values) {
            let exact = sigmoid(x);
            let error = (approx - exact).abs();
            if error > max_error {
                max_error = error;
                worst_x = x;
            }
            writeln!(writer, "{},{},{},{}", x, approx, exact, error)?;
        }
        pb.inc(chunk.len() as u64);
    }
    writer.flush()?;
    pb.finish_with_message("Done");

    info!("Max abs error {:.3e} at x = {:.4}", max_error, worst_x);
    info!("Results written to {}", output.display());
    Ok(())
}
