//! Parameter sets for encrypted NAG training
//!
//! Engine parameters describe the slot vector and depth budget of the
//! homomorphic engine. Training parameters are the immutable optimizer
//! configuration handed to `NagOptimizer::new`.

use serde::{Deserialize, Serialize};

use crate::error::{config_err, Result};
use crate::math::chebyshev::chebyshev_depth;

/// Depth refresh strategy applied at the start of every iteration after the first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshStrategy {
    /// Sparse bootstrapping through the engine's refresh primitive
    ///
    /// - `precision: None`: single refresh pass
    /// - `precision: Some(p)`: two passes targeting `p` bits, for low-precision
    ///   numeric configurations
    Bootstrap {
        /// Target precision of the second refresh pass
        precision: Option<u32>,
    },

    /// Decrypt and re-encrypt the packed weights
    ///
    /// Research mode only: whoever runs the decrypt sees the intermediate
    /// weights. Used to study the algorithm without bootstrapping cost.
    Interactive,
}

impl RefreshStrategy {
    /// Short label used in output file names and log lines
    pub fn label(&self) -> &'static str {
        match self {
            RefreshStrategy::Bootstrap { .. } => "bootstrap",
            RefreshStrategy::Interactive => "interactive",
        }
    }

    /// Whether this strategy needs bootstrap evaluation keys
    pub fn needs_bootstrap_keys(&self) -> bool {
        matches!(self, RefreshStrategy::Bootstrap { .. })
    }
}

impl Default for RefreshStrategy {
    fn default() -> Self {
        RefreshStrategy::Bootstrap { precision: None }
    }
}

/// Chebyshev approximation of the logistic function
///
/// The approximation is only valid for logits inside `[low, high]`. Outside
/// this interval the polynomial diverges without any error being raised, so
/// callers must keep `|X·θ|` inside the range (normalized features and a
/// moderate iteration count do this in practice).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmoidApprox {
    /// Lower end of the approximation interval
    pub low: f64,
    /// Upper end of the approximation interval
    pub high: f64,
    /// Chebyshev polynomial degree
    pub degree: u32,
}

impl SigmoidApprox {
    /// Multiplicative depth the approximation consumes
    pub fn depth(&self) -> Result<usize> {
        chebyshev_depth(self.degree)
    }

    /// Check the interval and the degree
    pub fn validate(&self) -> Result<()> {
        if !self.low.is_finite() || !self.high.is_finite() || self.low >= self.high {
            return Err(config_err!(
                "sigmoid approximation range [{}, {}] is empty or not finite",
                self.low,
                self.high
            ));
        }
        self.depth().map(|_| ())
    }
}

impl Default for SigmoidApprox {
    fn default() -> Self {
        Self {
            low: -16.0,
            high: 16.0,
            degree: 59,
        }
    }
}

/// Slot and depth parameters of the homomorphic engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    /// Ring dimension (power of two); the engine exposes `ring_dim / 2` slots
    pub ring_dim: usize,

    /// Multiplicative levels available on a fresh or refreshed ciphertext
    pub max_depth: usize,

    /// Standard deviation of the approximation error added on encryption
    pub encryption_noise: f64,

    /// Standard deviation of the approximation error added by one refresh
    pub bootstrap_noise: f64,

    /// Seed for the noise generator
    pub seed: u64,
}

impl EngineParams {
    /// Levels used by the interactive configuration
    ///
    /// 12 levels for one iteration at degree 59, plus one spare.
    pub const INTERACTIVE_DEPTH: usize = 13;

    /// Levels kept after each bootstrap
    pub const BOOTSTRAP_DEPTH: usize = 14;

    /// Parameters for decrypt/re-encrypt refresh
    pub fn interactive(ring_dim: usize) -> Self {
        Self {
            ring_dim,
            max_depth: Self::INTERACTIVE_DEPTH,
            encryption_noise: 0.0,
            bootstrap_noise: 0.0,
            seed: 0,
        }
    }

    /// Parameters for bootstrapped refresh
    pub fn bootstrap(ring_dim: usize) -> Self {
        Self {
            ring_dim,
            max_depth: Self::BOOTSTRAP_DEPTH,
            encryption_noise: 0.0,
            bootstrap_noise: 0.0,
            seed: 0,
        }
    }

    /// Parameters matching a refresh strategy
    pub fn for_strategy(ring_dim: usize, strategy: RefreshStrategy) -> Self {
        match strategy {
            RefreshStrategy::Bootstrap { .. } => Self::bootstrap(ring_dim),
            RefreshStrategy::Interactive => Self::interactive(ring_dim),
        }
    }

    /// Number of SIMD slots in one ciphertext
    pub fn num_slots(&self) -> usize {
        self.ring_dim / 2
    }

    /// Check if parameters are valid
    pub fn validate(&self) -> Result<()> {
        if !self.ring_dim.is_power_of_two() {
            return Err(config_err!(
                "ring dimension {} must be a power of two",
                self.ring_dim
            ));
        }
        if self.num_slots() < 2 {
            return Err(config_err!(
                "ring dimension {} leaves fewer than two slots",
                self.ring_dim
            ));
        }
        if self.max_depth == 0 {
            return Err(config_err!("engine must allow at least one multiplicative level"));
        }
        if !(self.encryption_noise >= 0.0 && self.encryption_noise.is_finite())
            || !(self.bootstrap_noise >= 0.0 && self.bootstrap_noise.is_finite())
        {
            return Err(config_err!("noise levels must be finite and non-negative"));
        }
        Ok(())
    }
}

impl Default for EngineParams {
    fn default() -> Self {
        Self::bootstrap(1 << 17)
    }
}

/// Optimizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingParams {
    /// Number of NAG iterations; there is no early stopping
    pub iterations: usize,

    /// Learning rate γ, folded into `-γ/n · Xᵀ` at initialization
    pub learning_rate: f64,

    /// Momentum coefficient η
    pub momentum: f64,

    /// Sigmoid approximation evaluated by the engine
    pub sigmoid: SigmoidApprox,

    /// Depth refresh strategy
    pub refresh: RefreshStrategy,

    /// Weights and test loss are written every `write_every` iterations
    pub write_every: usize,

    /// Decrypt the weights after every iteration for loss monitoring
    pub monitor: bool,
}

impl TrainingParams {
    /// Check if parameters are valid
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(config_err!("iteration count must be positive"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(config_err!(
                "learning rate {} must be finite and positive",
                self.learning_rate
            ));
        }
        if !(self.momentum.is_finite() && self.momentum >= 0.0) {
            return Err(config_err!(
                "momentum {} must be finite and non-negative",
                self.momentum
            ));
        }
        if self.write_every == 0 {
            return Err(config_err!("write_every must be positive"));
        }
        self.sigmoid.validate()
    }

    /// Levels used by the gradient protocol outside the sigmoid
    pub const PROTOCOL_DEPTH: usize = 3;

    /// Levels used outside the gradient: extract, momentum scale and repack
    pub const UPDATE_DEPTH: usize = 3;

    /// Levels consumed by one gradient evaluation, given the engine's sigmoid depth
    pub fn gradient_depth(sigmoid_depth: usize) -> usize {
        Self::PROTOCOL_DEPTH + sigmoid_depth
    }

    /// Levels consumed by one full iteration (extract, gradient, momentum, repack)
    pub fn iteration_depth(sigmoid_depth: usize) -> usize {
        Self::gradient_depth(sigmoid_depth) + Self::UPDATE_DEPTH
    }
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            iterations: 200,
            learning_rate: 0.1,
            momentum: 0.1,
            sigmoid: SigmoidApprox::default(),
            refresh: RefreshStrategy::default(),
            write_every: 10,
            monitor: true,
        }
    }
}
