//! Nesterov-accelerated logistic regression over packed homomorphic ciphertexts
//!
//! Trains a logistic-regression model on data that stays encrypted for the
//! whole run. The cryptography is delegated to a [`HomomorphicEngine`]; this
//! crate supplies what sits on top of it:
//!
//! - Slot layouts: row-major, row-cloned, column-cloned and dual-packed
//!   encodings of matrices and vectors into fixed-width slot vectors
//! - Matrix-vector products built from one elementwise multiply and one
//!   row or column reduction
//! - The NAG training loop with `(θ, φ)` co-packed in one ciphertext and a
//!   per-iteration depth refresh (bootstrap, or decrypt/re-encrypt in
//!   research mode)
//! - A plaintext-simulating engine, a plaintext reference trainer and the
//!   cross-entropy loss used for monitoring

pub mod data;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod loss;
pub mod math;
pub mod params;
pub mod train;

pub use encoding::{SlotLayout, SlotVector};
pub use engine::{EncryptedOperand, HomomorphicEngine, KeyPair, SimulatedEngine};
pub use error::{Error, Result};
pub use loss::compute_loss;
pub use math::PlainMatrix;
pub use params::{EngineParams, RefreshStrategy, SigmoidApprox, TrainingParams};
pub use train::{IterationObserver, IterationReport, NagOptimizer, PlainNag, TrainingState};
