//! Encrypted Nesterov accelerated gradient
//!
//! One iteration on the dual-packed weights:
//!
//! 1. Refresh depth (skipped at iteration 0, the operand is fresh)
//! 2. Extract row-cloned `θ` and `φ`
//! 3. `g = -(γ/n)·Xᵀ·(y - σ(X·θ))`
//! 4. `φ' = θ - g`; `θ' = φ'` at iteration 0, else `θ' = φ' + η·(φ' - φ)`
//! 5. Repack `(θ', φ')`
//!
//! The run is bounded by the iteration count only; there is no early stop.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::encoding::{
    build_extraction_masks, compute_padded_dimensions, encode_dual_packed, ExtractionMasks,
};
use crate::engine::{decrypt_operand, encrypt_slots, EncryptedOperand, HomomorphicEngine, KeyPair};
use crate::error::{config_err, Result};
use crate::math::PlainMatrix;
use crate::params::{RefreshStrategy, TrainingParams};
use crate::train::duals::{extract_duals, repack_duals};
use crate::train::gradient::{compute_gradient, EncryptedDataset};
use crate::train::refresh::{bootstrap_slots, refresh_weights};

/// Optimizer state carried between iterations
#[derive(Clone, Debug)]
pub struct TrainingState<C> {
    /// Dual-packed `(θ, φ)`
    pub weights: EncryptedOperand<C>,
    /// Iterations completed
    pub iteration: usize,
    /// Accumulated wall time of completed iterations
    pub elapsed: Duration,
}

/// Per-iteration progress handed to an [`IterationObserver`]
#[derive(Clone, Debug)]
pub struct IterationReport {
    /// Zero-based index of the iteration that just finished
    pub iteration: usize,
    /// Wall time of this iteration
    pub epoch_time: Duration,
    /// Wall time since the start of the run
    pub elapsed: Duration,
    /// Decrypted `θ` truncated to the feature count, when monitoring is on
    pub weights: Option<Vec<f64>>,
}

/// Receives a report after every iteration
pub trait IterationObserver {
    /// Called once per iteration, in order
    fn on_iteration(&mut self, report: &IterationReport) -> Result<()>;
}

impl<F> IterationObserver for F
where
    F: FnMut(&IterationReport) -> Result<()>,
{
    fn on_iteration(&mut self, report: &IterationReport) -> Result<()> {
        self(report)
    }
}

/// Encrypted NAG trainer for logistic regression
///
/// Owns the engine, the key material and the packed training data. All of
/// them are fixed after construction.
pub struct NagOptimizer<E: HomomorphicEngine> {
    engine: E,
    keys: KeyPair<E::PublicKey, E::SecretKey>,
    params: TrainingParams,
    data: EncryptedDataset<E::Ciphertext>,
    masks: ExtractionMasks,
    num_features: usize,
    row_size: usize,
    col_size: usize,
    bootstrap_slots: usize,
    iteration_depth: usize,
}

impl<E: HomomorphicEngine> NagOptimizer<E> {
    /// Check the configuration, generate keys and encrypt the training data
    ///
    /// # Arguments
    /// * `engine` - engine without key material
    /// * `params` - optimizer configuration
    /// * `x` - design matrix, intercept column included
    /// * `y` - 0/1 labels, one per row of `x`
    ///
    /// # Errors
    /// Configuration errors for an empty or oversized `x`, mismatched
    /// `x`/`y`, a single-block layout, or a depth budget below one iteration.
    pub fn new(mut engine: E, params: TrainingParams, x: &PlainMatrix, y: &[f64]) -> Result<Self> {
        params.validate()?;
        if x.rows() != y.len() {
            return Err(config_err!(
                "X has {} rows but y has {} labels",
                x.rows(),
                y.len()
            ));
        }

        let num_slots = engine.num_slots();
        let (col_size, row_size) = compute_padded_dimensions(x.rows(), x.cols(), num_slots)?;
        if col_size < 2 {
            return Err(config_err!(
                "{} slots hold a single block of {}; dual packing needs two",
                num_slots,
                row_size
            ));
        }

        let sigmoid_depth = engine.sigmoid_depth(params.sigmoid.degree)?;
        let gradient_depth = TrainingParams::gradient_depth(sigmoid_depth);
        let iteration_depth = TrainingParams::iteration_depth(sigmoid_depth);
        if iteration_depth > engine.max_depth() {
            return Err(config_err!(
                "depth budget {} is below the {} levels one iteration needs (gradient {})",
                engine.max_depth(),
                iteration_depth,
                gradient_depth
            ));
        }

        let bootstrap_slots = bootstrap_slots(row_size, num_slots);
        if bootstrap_slots % (2 * row_size) != 0 {
            return Err(config_err!(
                "bootstrap width {} does not preserve the dual-packed period {}",
                bootstrap_slots,
                2 * row_size
            ));
        }

        match params.refresh {
            RefreshStrategy::Interactive => warn!(
                "interactive refresh decrypts the weights every iteration: research mode, not secure"
            ),
            RefreshStrategy::Bootstrap { precision } => {
                info!("Bootstrap refresh over {} slots", bootstrap_slots);
                if let Some(bits) = precision {
                    info!("Double bootstrapping at {} bits", bits);
                }
            }
        }
        info!(
            "Packing {} x {} into {} slots: row size {}, col size {}",
            x.rows(),
            x.cols(),
            num_slots,
            row_size,
            col_size
        );
        info!(
            "Depth per iteration: {} of {}",
            iteration_depth,
            engine.max_depth()
        );

        let keys = engine.key_gen();
        engine.gen_mult_key(&keys.secret)?;
        engine.gen_sum_rows_keys(&keys.secret, row_size)?;
        engine.gen_sum_cols_keys(&keys.secret)?;
        let offset = row_size as i32;
        engine.gen_rotation_keys(&keys.secret, &[offset, -offset])?;
        if params.refresh.needs_bootstrap_keys() {
            engine.gen_bootstrap_keys(&keys.secret, bootstrap_slots)?;
        }
        debug!("Evaluation keys generated");

        let masks = build_extraction_masks(row_size, num_slots)?;
        let data = EncryptedDataset::encrypt(
            &engine,
            &keys.public,
            x,
            y,
            row_size,
            params.learning_rate,
        )?;

        Ok(Self {
            engine,
            keys,
            params,
            data,
            masks,
            num_features: x.cols(),
            row_size,
            col_size,
            bootstrap_slots,
            iteration_depth,
        })
    }

    /// Engine with the generated evaluation keys
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Key pair used for the run
    pub fn keys(&self) -> &KeyPair<E::PublicKey, E::SecretKey> {
        &self.keys
    }

    /// Optimizer configuration
    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Unpadded feature count
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Padded block width
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Number of blocks per slot vector
    pub fn col_size(&self) -> usize {
        self.col_size
    }

    /// Active slots handed to the bootstrap
    pub fn bootstrap_slots(&self) -> usize {
        self.bootstrap_slots
    }

    /// Levels consumed by one iteration
    pub fn iteration_depth(&self) -> usize {
        self.iteration_depth
    }

    /// Encrypted training data
    pub fn dataset(&self) -> &EncryptedDataset<E::Ciphertext> {
        &self.data
    }

    /// Extraction masks for the packed weights
    pub fn masks(&self) -> &ExtractionMasks {
        &self.masks
    }

    /// Zero weights, `θ₀ = φ₀ = 0`, packed and encrypted
    pub fn initial_state(&self) -> Result<TrainingState<E::Ciphertext>> {
        let zeros = vec![0.0; self.num_features];
        let packed = encode_dual_packed(
            &zeros,
            &zeros,
            self.row_size,
            self.engine.num_slots(),
            0.0,
        )?;
        Ok(TrainingState {
            weights: encrypt_slots(&self.engine, &self.keys.public, &packed)?,
            iteration: 0,
            elapsed: Duration::ZERO,
        })
    }

    /// Run one iteration, returning the new row-cloned `θ`
    pub fn step(
        &self,
        state: &mut TrainingState<E::Ciphertext>,
    ) -> Result<EncryptedOperand<E::Ciphertext>> {
        let engine = &self.engine;
        if state.iteration > 0 {
            state.weights = refresh_weights(
                engine,
                &self.keys,
                &state.weights,
                self.params.refresh,
                self.bootstrap_slots,
                self.iteration_depth,
            )?;
        }

        let (theta, phi) = extract_duals(engine, &state.weights, &self.masks)?;
        let gradient = compute_gradient(engine, &self.data, &theta, &self.params.sigmoid)?;

        let layout = theta.layout();
        let phi_prime = engine.sub(theta.ciphertext(), gradient.expect(layout)?)?;
        let theta_new = if state.iteration == 0 {
            phi_prime.clone()
        } else {
            let momentum = engine.mul_scalar(
                &engine.sub(&phi_prime, phi.ciphertext())?,
                self.params.momentum,
            )?;
            engine.add(&phi_prime, &momentum)?
        };

        let theta_new = EncryptedOperand::new(theta_new, layout);
        let phi_new = EncryptedOperand::new(phi_prime, layout);
        state.weights = repack_duals(engine, &theta_new, &phi_new, &self.masks)?;
        state.iteration += 1;
        debug!(
            "iteration {} done at depth {}",
            state.iteration - 1,
            engine.depth(state.weights.ciphertext())
        );

        Ok(theta_new)
    }

    /// Decrypt a row-cloned `θ` and drop the padding
    pub fn decrypt_weights(&self, theta: &EncryptedOperand<E::Ciphertext>) -> Result<Vec<f64>> {
        let slots = decrypt_operand(&self.engine, &self.keys.secret, theta)?;
        Ok(slots.values()[..self.num_features].to_vec())
    }

    /// Decrypt `(θ, φ)` from the packed state, padding dropped
    pub fn decrypt_state(&self, state: &TrainingState<E::Ciphertext>) -> Result<(Vec<f64>, Vec<f64>)> {
        let slots = decrypt_operand(&self.engine, &self.keys.secret, &state.weights)?;
        let values = slots.values();
        let d = self.num_features;
        Ok((
            values[..d].to_vec(),
            values[self.row_size..self.row_size + d].to_vec(),
        ))
    }

    /// Run the configured number of iterations
    ///
    /// With monitoring on, `θ` is decrypted after every iteration and passed
    /// to `observer`; the encrypted computation never depends on it.
    pub fn run(
        &self,
        observer: &mut impl IterationObserver,
    ) -> Result<TrainingState<E::Ciphertext>> {
        let mut state = self.initial_state()?;
        let label = self.params.refresh.label();

        for _ in 0..self.params.iterations {
            let iteration = state.iteration;
            let start = Instant::now();
            let theta = self.step(&mut state)?;
            let epoch_time = start.elapsed();
            state.elapsed += epoch_time;

            let weights = if self.params.monitor {
                Some(self.decrypt_weights(&theta)?)
            } else {
                None
            };
            debug!(
                "{} iteration {} took {:.3}s",
                label,
                iteration,
                epoch_time.as_secs_f64()
            );

            observer.on_iteration(&IterationReport {
                iteration,
                epoch_time,
                elapsed: state.elapsed,
                weights,
            })?;
        }

        info!(
            "Training for {} iterations ({}) took {:.2?}",
            self.params.iterations, label, state.elapsed
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulatedEngine;
    use crate::error::Error;
    use crate::params::{EngineParams, SigmoidApprox};

    fn toy() -> (PlainMatrix, Vec<f64>) {
        let x = PlainMatrix::from_rows(vec![
            vec![0.5, -0.2, 1.0],
            vec![-0.4, 0.3, 1.0],
            vec![0.1, 0.4, 1.0],
            vec![-0.3, -0.1, 1.0],
        ])
        .unwrap();
        (x, vec![1.0, 0.0, 1.0, 0.0])
    }

    fn engine(ring_dim: usize, strategy: RefreshStrategy) -> SimulatedEngine {
        SimulatedEngine::new(EngineParams::for_strategy(ring_dim, strategy)).unwrap()
    }

    #[test]
    fn test_new_reports_geometry() {
        let (x, y) = toy();
        let params = TrainingParams {
            refresh: RefreshStrategy::Interactive,
            ..TrainingParams::default()
        };
        let opt = NagOptimizer::new(engine(32, params.refresh), params, &x, &y).unwrap();
        assert_eq!(opt.row_size(), 4);
        assert_eq!(opt.col_size(), 4);
        assert_eq!(opt.iteration_depth(), 12);
        let sigmoid_depth = opt.engine().sigmoid_depth(opt.params().sigmoid.degree).unwrap();
        assert_eq!(opt.iteration_depth(), TrainingParams::iteration_depth(sigmoid_depth));
        assert_eq!(opt.bootstrap_slots(), 16);
    }

    #[test]
    fn test_depth_budget_preflight() {
        let (x, y) = toy();
        let params = TrainingParams {
            refresh: RefreshStrategy::Interactive,
            sigmoid: SigmoidApprox {
                degree: 247,
                ..SigmoidApprox::default()
            },
            ..TrainingParams::default()
        };
        let err = NagOptimizer::new(engine(32, params.refresh), params, &x, &y)
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_single_block_rejected() {
        let (x, y) = toy();
        let params = TrainingParams::default();
        // 4 slots hold one block of 4
        let result = NagOptimizer::new(engine(8, params.refresh), params, &x, &y);
        assert!(matches!(result, Err(Error::CapacityExceeded { .. }) | Err(Error::Config(_))));
    }

    #[test]
    fn test_label_mismatch_rejected() {
        let (x, _) = toy();
        let params = TrainingParams::default();
        let result = NagOptimizer::new(engine(32, params.refresh), params, &x, &[1.0, 0.0]);
        assert!(result.err().unwrap().is_configuration());
    }

    #[test]
    fn test_bootstrap_run_stays_within_budget() {
        let (x, y) = toy();
        let params = TrainingParams {
            iterations: 5,
            ..TrainingParams::default()
        };
        let opt = NagOptimizer::new(engine(32, params.refresh), params, &x, &y).unwrap();

        let mut seen = Vec::new();
        let mut observer = |report: &IterationReport| {
            seen.push((report.iteration, report.weights.clone()));
            Ok::<(), Error>(())
        };
        let state = opt.run(&mut observer).unwrap();
        assert_eq!(state.iteration, 5);
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[4].0, 4);
        assert_eq!(seen[4].1.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn test_first_step_skips_refresh() {
        let (x, y) = toy();
        let params = TrainingParams::default();
        let optimizer = |bootstrap_noise: f64| {
            let mut engine_params = EngineParams::bootstrap(32);
            engine_params.bootstrap_noise = bootstrap_noise;
            let engine = SimulatedEngine::new(engine_params).unwrap();
            NagOptimizer::new(engine, params.clone(), &x, &y).unwrap()
        };
        let quiet = optimizer(0.0);
        let loud = optimizer(1.0);
        let mut quiet_state = quiet.initial_state().unwrap();
        let mut loud_state = loud.initial_state().unwrap();

        // Only a refresh adds noise, so the first step must agree exactly
        let a = quiet.step(&mut quiet_state).unwrap();
        let b = loud.step(&mut loud_state).unwrap();
        assert_eq!(quiet.decrypt_weights(&a).unwrap(), loud.decrypt_weights(&b).unwrap());

        let a = quiet.decrypt_weights(&quiet.step(&mut quiet_state).unwrap()).unwrap();
        let b = loud.decrypt_weights(&loud.step(&mut loud_state).unwrap()).unwrap();
        let max_dev = a
            .iter()
            .zip(&b)
            .map(|(p, q)| (p - q).abs())
            .fold(0.0, f64::max);
        assert!(max_dev > 1e-3, "second step was not refreshed: {}", max_dev);
    }

    #[test]
    fn test_first_step_has_no_momentum() {
        let (x, y) = toy();
        let params = TrainingParams {
            refresh: RefreshStrategy::Interactive,
            ..TrainingParams::default()
        };
        let opt = NagOptimizer::new(engine(32, params.refresh), params, &x, &y).unwrap();
        let mut state = opt.initial_state().unwrap();
        let theta = opt.step(&mut state).unwrap();

        let (packed_theta, phi) = opt.decrypt_state(&state).unwrap();
        let theta = opt.decrypt_weights(&theta).unwrap();
        assert_eq!(theta, packed_theta);
        assert_eq!(theta, phi);
    }
}
