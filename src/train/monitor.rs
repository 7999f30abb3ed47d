//! Loss, weight and test-loss logs
//!
//! Three CSV files per run, named after the refresh strategy so bootstrap
//! and interactive results never mix:
//!
//! - `<prefix><label>_loss.csv`: `time_seconds,loss` every iteration
//! - `<prefix><label>_weights.csv`: `iteration,w0,..,wn` every `K` iterations
//! - `<prefix><label>_test.csv`: `iteration,loss` every `K` iterations
//!
//! plus `<prefix><label>_summary.json` written at the end of the run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::loss::compute_loss;
use crate::math::PlainMatrix;
use crate::params::{EngineParams, TrainingParams};
use crate::train::nag::{IterationObserver, IterationReport};

/// Output file locations for one run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputFiles {
    /// Training loss log
    pub loss: PathBuf,
    /// Weight snapshots
    pub weights: PathBuf,
    /// Held-out loss log
    pub test: PathBuf,
    /// Run summary
    pub summary: PathBuf,
}

impl OutputFiles {
    /// `<prefix><label>_{loss,weights,test}.csv` and `<prefix><label>_summary.json`
    pub fn new(prefix: &str, label: &str) -> Self {
        let name = |suffix: &str| PathBuf::from(format!("{}{}_{}", prefix, label, suffix));
        Self {
            loss: name("loss.csv"),
            weights: name("weights.csv"),
            test: name("test.csv"),
            summary: name("summary.json"),
        }
    }
}

/// Whether weights and test loss are written after `iteration`
pub fn is_checkpoint(iteration: usize, write_every: usize) -> bool {
    iteration > 0 && iteration % write_every == 0
}

/// Latest monitored values
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MonitorRecord {
    /// Last iteration seen
    pub iteration: usize,
    /// Decrypted weights after that iteration
    pub weights: Vec<f64>,
    /// Training loss after that iteration
    pub train_loss: Option<f64>,
    /// Most recent held-out loss
    pub test_loss: Option<f64>,
}

/// [`IterationObserver`] that writes the monitoring CSV files
pub struct CsvMonitor {
    loss_out: BufWriter<File>,
    weights_out: BufWriter<File>,
    test_out: BufWriter<File>,
    train: (PlainMatrix, Vec<f64>),
    test: (PlainMatrix, Vec<f64>),
    write_every: usize,
    precision: usize,
    last: MonitorRecord,
}

impl CsvMonitor {
    /// Create the three CSV files and write their headers
    ///
    /// # Arguments
    /// * `files` - output locations
    /// * `train` - training features and labels
    /// * `test` - held-out features and labels
    /// * `write_every` - checkpoint interval `K`
    /// * `precision` - digits after the decimal point
    pub fn create(
        files: &OutputFiles,
        train: (PlainMatrix, Vec<f64>),
        test: (PlainMatrix, Vec<f64>),
        write_every: usize,
        precision: usize,
    ) -> Result<Self> {
        let mut loss_out = BufWriter::new(File::create(&files.loss)?);
        let mut weights_out = BufWriter::new(File::create(&files.weights)?);
        let mut test_out = BufWriter::new(File::create(&files.test)?);

        writeln!(loss_out, "time_seconds,loss")?;
        let columns: Vec<String> = (0..train.0.cols()).map(|j| format!("w{}", j)).collect();
        writeln!(weights_out, "iteration,{}", columns.join(","))?;
        writeln!(test_out, "iteration,loss")?;

        Ok(Self {
            loss_out,
            weights_out,
            test_out,
            train,
            test,
            write_every: write_every.max(1),
            precision,
            last: MonitorRecord::default(),
        })
    }

    /// Values from the most recent iteration
    pub fn last(&self) -> &MonitorRecord {
        &self.last
    }

    /// Flush all files
    pub fn finish(&mut self) -> Result<()> {
        self.loss_out.flush()?;
        self.weights_out.flush()?;
        self.test_out.flush()?;
        Ok(())
    }

    fn fmt(&self, v: f64) -> String {
        format!("{:.*}", self.precision, v)
    }
}

impl IterationObserver for CsvMonitor {
    fn on_iteration(&mut self, report: &IterationReport) -> Result<()> {
        let Some(weights) = report.weights.as_ref() else {
            return Ok(());
        };

        let loss = compute_loss(weights, &self.train.0, &self.train.1)?;
        info!(
            "Iteration {}: loss {:.6} ({:.3}s)",
            report.iteration,
            loss,
            report.epoch_time.as_secs_f64()
        );
        let line = format!(
            "{},{}",
            self.fmt(report.epoch_time.as_secs_f64()),
            self.fmt(loss)
        );
        writeln!(self.loss_out, "{}", line)?;

        self.last.iteration = report.iteration;
        self.last.weights = weights.clone();
        self.last.train_loss = Some(loss);

        if is_checkpoint(report.iteration, self.write_every) {
            let values: Vec<String> = weights.iter().map(|&w| self.fmt(w)).collect();
            writeln!(self.weights_out, "{},{}", report.iteration, values.join(","))?;

            let test_loss = compute_loss(weights, &self.test.0, &self.test.1)?;
            info!("Iteration {}: test loss {:.6}", report.iteration, test_loss);
            let line = format!("{},{}", report.iteration, self.fmt(test_loss));
            writeln!(self.test_out, "{}", line)?;
            self.last.test_loss = Some(test_loss);
        }
        Ok(())
    }
}

/// End-of-run summary
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    /// Crate version that produced the run
    pub version: String,
    /// Refresh strategy label
    pub refresh: String,
    /// Engine parameters
    pub engine: EngineParams,
    /// Optimizer parameters
    pub training: TrainingParams,
    /// Unpadded feature count
    pub num_features: usize,
    /// Padded block width
    pub row_size: usize,
    /// Blocks per slot vector
    pub col_size: usize,
    /// Levels consumed per iteration
    pub iteration_depth: usize,
    /// Final monitored values
    pub last: MonitorRecord,
    /// Total training wall time in seconds
    pub total_seconds: f64,
}

impl RunSummary {
    /// Write the summary as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
