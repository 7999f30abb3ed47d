//! Input data
//!
//! Feature files are CSV with a header line and one sample per line,
//! intercept column included. Label files have a single column.

mod loader;

pub use loader::{
    load_csv, load_labels, load_training_data, normalize_features, DataPaths, Dataset,
    FeatureStats, TrainingData, INTERCEPT_COLUMN,
};
