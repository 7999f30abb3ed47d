//! Plaintext NAG reference
//!
//! Runs the same recurrence as the encrypted optimizer on `PlainMatrix`
//! data. Uses the exact logistic function by default, or the engine's
//! Chebyshev approximation to reproduce encrypted results slot for slot.

use crate::error::{config_err, Result};
use crate::loss::compute_loss;
use crate::math::{sigmoid, ChebyshevSeries, PlainMatrix};
use crate::params::TrainingParams;
use crate::train::gradient::initialize_neg_xt;

/// Plaintext NAG trainer
#[derive(Clone, Debug)]
pub struct PlainNag {
    x: PlainMatrix,
    y: Vec<f64>,
    neg_xt: PlainMatrix,
    momentum: f64,
    approx: Option<ChebyshevSeries>,
    theta: Vec<f64>,
    phi: Vec<f64>,
    iteration: usize,
}

impl PlainNag {
    /// Start from zero weights
    pub fn new(x: &PlainMatrix, y: &[f64], params: &TrainingParams) -> Result<Self> {
        if x.rows() != y.len() {
            return Err(config_err!(
                "X has {} rows but y has {} labels",
                x.rows(),
                y.len()
            ));
        }
        let neg_xt = initialize_neg_xt(x, params.learning_rate)?;
        Ok(Self {
            x: x.clone(),
            y: y.to_vec(),
            neg_xt,
            momentum: params.momentum,
            approx: None,
            theta: vec![0.0; x.cols()],
            phi: vec![0.0; x.cols()],
            iteration: 0,
        })
    }

    /// Replace the exact sigmoid with a Chebyshev approximation
    pub fn with_approximation(mut self, series: ChebyshevSeries) -> Self {
        self.approx = Some(series);
        self
    }

    /// Current `θ`
    pub fn theta(&self) -> &[f64] {
        &self.theta
    }

    /// Current `φ`
    pub fn phi(&self) -> &[f64] {
        &self.phi
    }

    /// Iterations completed
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Scaled gradient `-(γ/n)·Xᵀ·(y - σ(X·θ))`
    pub fn gradient(&self, theta: &[f64]) -> Result<Vec<f64>> {
        let mut predictions = self.x.matmul(&PlainMatrix::column(theta))?;
        match &self.approx {
            Some(series) => predictions = predictions.map(|v| series.eval(v)),
            None => predictions.sigmoid_in_place(),
        }
        let residual = PlainMatrix::column(&self.y).sub(&predictions)?;
        self.neg_xt.transpose().matmul(&residual)?.to_vector()
    }

    /// One NAG iteration
    pub fn step(&mut self) -> Result<()> {
        let gradient = self.gradient(&self.theta)?;
        let phi_prime: Vec<f64> = self
            .theta
            .iter()
            .zip(&gradient)
            .map(|(t, g)| t - g)
            .collect();

        self.theta = if self.iteration == 0 {
            phi_prime.clone()
        } else {
            phi_prime
                .iter()
                .zip(&self.phi)
                .map(|(p, old)| p + self.momentum * (p - old))
                .collect()
        };
        self.phi = phi_prime;
        self.iteration += 1;
        Ok(())
    }

    /// Training loss at the current `θ`
    pub fn loss(&self) -> Result<f64> {
        compute_loss(&self.theta, &self.x, &self.y)
    }

    /// Probability predictions for `x` at the current `θ`
    pub fn predict(&self, x: &PlainMatrix) -> Result<Vec<f64>> {
        let logits = x.matmul(&PlainMatrix::column(&self.theta))?;
        Ok(logits.as_slice().iter().map(|&v| sigmoid(v)).collect())
    }
}
