//! Plaintext cross-entropy loss for monitoring
//!
//! Computed on decrypted weights only; nothing here feeds back into the
//! encrypted computation.

use crate::error::{config_err, Result};
use crate::math::{sigmoid, PlainMatrix};

/// Predictions are clamped to `[LOSS_EPSILON, 1 - LOSS_EPSILON]` before the log
pub const LOSS_EPSILON: f64 = 1e-12;

/// Mean binary cross-entropy `-(y·ln σ(Xw) + (1 - y)·ln(1 - σ(Xw)))`
///
/// # Arguments
/// * `weights` - one weight per column of `x`
/// * `x` - samples, one per row
/// * `y` - 0/1 labels
///
/// # Returns
/// Always finite for finite inputs, thanks to the clamp.
pub fn compute_loss(weights: &[f64], x: &PlainMatrix, y: &[f64]) -> Result<f64> {
    if x.is_empty() {
        return Err(config_err!("empty input matrix"));
    }
    if weights.len() != x.cols() {
        return Err(config_err!(
            "{} weights for {} features",
            weights.len(),
            x.cols()
        ));
    }
    if y.len() != x.rows() {
        return Err(config_err!(
            "X has {} rows but y has {} labels",
            x.rows(),
            y.len()
        ));
    }

    let total: f64 = x
        .iter_rows()
        .zip(y)
        .map(|(row, &label)| {
            let logit: f64 = row.iter().zip(weights).map(|(a, w)| a * w).sum();
            let p = sigmoid(logit).clamp(LOSS_EPSILON, 1.0 - LOSS_EPSILON);
            -label * p.ln() - (1.0 - label) * (1.0 - p).ln()
        })
        .sum();
    Ok(total / x.rows() as f64)
}
