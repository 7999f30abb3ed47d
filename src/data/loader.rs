//! CSV loading and feature scaling

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{config_err, Error, Result};
use crate::math::PlainMatrix;

/// Header name that marks the intercept column
pub const INTERCEPT_COLUMN: &str = "intercept";

/// Tabular numeric data with named columns
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    /// Column names from the header line
    pub header: Vec<String>,
    /// One row per data line
    pub data: PlainMatrix,
}

/// Min / mean / max of one column
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    /// Smallest value
    pub min: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Largest value
    pub max: f64,
}

impl FeatureStats {
    /// Per-column statistics of `matrix`
    pub fn compute(matrix: &PlainMatrix) -> Vec<FeatureStats> {
        let mut stats = vec![
            FeatureStats {
                min: f64::INFINITY,
                mean: 0.0,
                max: f64::NEG_INFINITY,
            };
            matrix.cols()
        ];
        for row in matrix.iter_rows() {
            for (s, &v) in stats.iter_mut().zip(row) {
                s.min = s.min.min(v);
                s.max = s.max.max(v);
                s.mean += v;
            }
        }
        let n = matrix.rows().max(1) as f64;
        for s in &mut stats {
            s.mean /= n;
        }
        stats
    }

    /// Scale that maps the column into `[-0.5, 0.5]`
    pub fn scale(&self) -> f64 {
        2.0 * self.min.abs().max(self.max.abs())
    }
}

impl Dataset {
    /// Index of the intercept column: the one named `intercept`, else the last
    pub fn intercept_column(&self) -> Option<usize> {
        self.header
            .iter()
            .position(|name| name.eq_ignore_ascii_case(INTERCEPT_COLUMN))
            .or_else(|| self.data.cols().checked_sub(1))
    }

    /// Scale every non-intercept column into `[-0.5, 0.5]`
    ///
    /// Returns the per-column divisors (1 for untouched columns).
    pub fn normalize(&mut self) -> Vec<f64> {
        let intercept = self.intercept_column();
        normalize_features(&mut self.data, intercept)
    }

    /// Log per-column statistics at debug level
    pub fn log_stats(&self, title: &str) {
        debug!("{}: min / mean / max", title);
        for (name, s) in self.header.iter().zip(FeatureStats::compute(&self.data)) {
            debug!("  {}: {} {} {}", name, s.min, s.mean, s.max);
        }
    }
}

/// Divide each column except `intercept` by `2·max(|min|, |max|)`
///
/// Columns that are identically zero are left unchanged.
pub fn normalize_features(matrix: &mut PlainMatrix, intercept: Option<usize>) -> Vec<f64> {
    let scales: Vec<f64> = FeatureStats::compute(matrix)
        .iter()
        .enumerate()
        .map(|(j, s)| {
            let scale = s.scale();
            if Some(j) == intercept || scale == 0.0 {
                1.0
            } else {
                scale
            }
        })
        .collect();

    for i in 0..matrix.rows() {
        for (j, &scale) in scales.iter().enumerate() {
            let v = matrix.get(i, j);
            matrix.set(i, j, v / scale);
        }
    }
    scales
}

/// Read a header line and up to `max_rows` comma-separated numeric rows
///
/// # Errors
/// `Some(0)` rows is a configuration error. A missing header, ragged rows,
/// non-numeric fields or a file with no data rows are data errors.
pub fn load_csv(path: impl AsRef<Path>, max_rows: Option<usize>) -> Result<Dataset> {
    let path = path.as_ref();
    if max_rows == Some(0) {
        return Err(config_err!("row limit must be positive"));
    }
    let limit = max_rows.unwrap_or(usize::MAX);

    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines().enumerate();

    let header: Vec<String> = match lines.next() {
        Some((_, line)) => line?.split(',').map(|s| s.trim().to_string()).collect(),
        None => {
            return Err(Error::Data(format!(
                "{}: missing header line",
                path.display()
            )))
        }
    };

    let mut rows = Vec::new();
    for (index, line) in lines {
        if rows.len() == limit {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split(',')
            .map(|field| {
                field.trim().parse::<f64>().map_err(|_| {
                    Error::Data(format!(
                        "{}:{}: field '{}' is not numeric",
                        path.display(),
                        index + 1,
                        field.trim()
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if row.len() != header.len() {
            return Err(Error::Data(format!(
                "{}:{}: {} fields, header has {}",
                path.display(),
                index + 1,
                row.len(),
                header.len()
            )));
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(Error::Data(format!("{}: no data rows", path.display())));
    }
    let data = PlainMatrix::from_rows(rows)?;
    debug!(
        "Loaded {} x {} from {}",
        data.rows(),
        data.cols(),
        path.display()
    );
    Ok(Dataset { header, data })
}

/// Read a single-column label file
pub fn load_labels(path: impl AsRef<Path>, max_rows: Option<usize>) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let dataset = load_csv(path, max_rows)?;
    if dataset.data.cols() != 1 {
        return Err(Error::Data(format!(
            "{}: label file has {} columns, expected 1",
            path.display(),
            dataset.data.cols()
        )));
    }
    dataset.data.to_vector()
}

/// Locations of the four input files
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataPaths {
    /// Training features
    pub train_x: PathBuf,
    /// Training labels
    pub train_y: PathBuf,
    /// Held-out features
    pub test_x: PathBuf,
    /// Held-out labels
    pub test_y: PathBuf,
}

/// Training and held-out sets
#[derive(Clone, Debug)]
pub struct TrainingData {
    /// Training features
    pub train_x: Dataset,
    /// Training labels
    pub train_y: Vec<f64>,
    /// Held-out features
    pub test_x: Dataset,
    /// Held-out labels
    pub test_y: Vec<f64>,
}

/// Load all four files, optionally normalizing each feature file
///
/// `max_rows` applies to every file.
pub fn load_training_data(
    paths: &DataPaths,
    max_rows: Option<usize>,
    normalize: bool,
) -> Result<TrainingData> {
    let mut train_x = load_csv(&paths.train_x, max_rows)?;
    let mut test_x = load_csv(&paths.test_x, max_rows)?;
    let train_y = load_labels(&paths.train_y, max_rows)?;
    let test_y = load_labels(&paths.test_y, max_rows)?;

    for (name, x, y) in [("training", &train_x, &train_y), ("test", &test_x, &test_y)] {
        if x.data.rows() != y.len() {
            return Err(config_err!(
                "{} set has {} feature rows but {} labels",
                name,
                x.data.rows(),
                y.len()
            ));
        }
    }
    if train_x.data.cols() != test_x.data.cols() {
        return Err(config_err!(
            "training set has {} features, test set has {}",
            train_x.data.cols(),
            test_x.data.cols()
        ));
    }

    train_x.log_stats("Training features");
    if normalize {
        info!("Normalizing features to [-0.5, 0.5]");
        train_x.normalize();
        test_x.normalize();
        train_x.log_stats("Normalized training features");
    }

    Ok(TrainingData {
        train_x,
        train_y,
        test_x,
        test_y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_skips_intercept() {
        let mut m = PlainMatrix::from_rows(vec![
            vec![4.0, -1.0, 1.0],
            vec![-2.0, 0.5, 1.0],
        ])
        .unwrap();
        let scales = normalize_features(&mut m, Some(2));
        assert_eq!(scales, vec![8.0, 2.0, 1.0]);
        assert_eq!(m.row(0), &[0.5, -0.5, 1.0]);
        assert_eq!(m.row(1), &[-0.25, 0.25, 1.0]);
    }

    #[test]
    fn test_zero_column_untouched() {
        let mut m = PlainMatrix::from_rows(vec![vec![0.0, 3.0], vec![0.0, 1.0]]).unwrap();
        let scales = normalize_features(&mut m, None);
        assert_eq!(scales, vec![1.0, 6.0]);
        assert_eq!(m.get(0, 0), 0.0);
    }

    #[test]
    fn test_intercept_lookup() {
        let ds = Dataset {
            header: vec!["Intercept".into(), "a".into()],
            data: PlainMatrix::zeros(1, 2),
        };
        assert_eq!(ds.intercept_column(), Some(0));

        let ds = Dataset {
            header: vec!["a".into(), "b".into()],
            data: PlainMatrix::zeros(1, 2),
        };
        assert_eq!(ds.intercept_column(), Some(1));
    }

    #[test]
    fn test_stats() {
        let m = PlainMatrix::from_rows(vec![vec![1.0], vec![3.0]]).unwrap();
        let stats = FeatureStats::compute(&m);
        assert_eq!(
            stats[0],
            FeatureStats {
                min: 1.0,
                mean: 2.0,
                max: 3.0
            }
        );
    }
}
