//! Encrypted logistic-regression training
//!
//! - [`gradient`]: matrix-vector product protocol and gradient
//! - [`duals`]: dual-packed `(θ, φ)` extraction and repacking
//! - [`refresh`]: bootstrap and interactive depth refresh
//! - [`nag`]: the NAG optimizer loop
//! - [`plain`]: plaintext reference of the same recurrence
//! - [`monitor`]: CSV logs and run summary

pub mod duals;
pub mod gradient;
pub mod monitor;
pub mod nag;
pub mod plain;
pub mod refresh;

pub use gradient::{compute_gradient, initialize_neg_xt, product_col, product_row, EncryptedDataset};
pub use monitor::{CsvMonitor, MonitorRecord, OutputFiles, RunSummary};
pub use nag::{IterationObserver, IterationReport, NagOptimizer, TrainingState};
pub use plain::PlainNag;
