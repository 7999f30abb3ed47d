//! CSV loading, row caps and output files

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use nesterov_he::data::{load_csv, load_labels, load_training_data, DataPaths};
use nesterov_he::train::monitor::is_checkpoint;
use nesterov_he::train::RunSummary;
use nesterov_he::Error;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

const FEATURES: &str = "x1,x2,intercept\n\
                        0.5,2.0,1\n\
                        -0.5,4.0,1\n\
                        1.5,-2.0,1\n\
                        0.0,0.0,1\n";

const LABELS: &str = "y\n1\n0\n1\n0\n";

fn dataset_dir() -> (TempDir, DataPaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = DataPaths {
        train_x: write(dir.path(), "X_train.csv", FEATURES),
        train_y: write(dir.path(), "y_train.csv", LABELS),
        test_x: write(dir.path(), "X_test.csv", FEATURES),
        test_y: write(dir.path(), "y_test.csv", LABELS),
    };
    (dir, paths)
}

#[test]
fn test_load_csv_reads_header_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "x.csv", FEATURES);

    let dataset = load_csv(&path, None).unwrap();
    assert_eq!(dataset.header, vec!["x1", "x2", "intercept"]);
    assert_eq!(dataset.data.rows(), 4);
    assert_eq!(dataset.data.cols(), 3);
    assert_eq!(dataset.data.row(1), &[-0.5, 4.0, 1.0]);
}

#[test]
fn test_row_cap() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "x.csv", FEATURES);

    let dataset = load_csv(&path, Some(2)).unwrap();
    assert_eq!(dataset.data.rows(), 2);
    assert_eq!(dataset.data.row(1), &[-0.5, 4.0, 1.0]);

    let dataset = load_csv(&path, Some(100)).unwrap();
    assert_eq!(dataset.data.rows(), 4);
}

#[test]
fn test_zero_row_cap_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "x.csv", FEATURES);

    let err = load_csv(&path, Some(0)).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_malformed_files() {
    let dir = tempfile::tempdir().unwrap();

    let ragged = write(dir.path(), "ragged.csv", "a,b\n1,2\n3\n");
    assert!(matches!(load_csv(&ragged, None), Err(Error::Data(_))));

    let text = write(dir.path(), "text.csv", "a,b\n1,two\n");
    assert!(matches!(load_csv(&text, None), Err(Error::Data(_))));

    let empty = write(dir.path(), "empty.csv", "");
    assert!(matches!(load_csv(&empty, None), Err(Error::Data(_))));

    let header_only = write(dir.path(), "header.csv", "a,b\n");
    assert!(matches!(load_csv(&header_only, None), Err(Error::Data(_))));

    let missing = dir.path().join("missing.csv");
    assert!(matches!(load_csv(&missing, None), Err(Error::Io(_))));
}

#[test]
fn test_labels_need_one_column() {
    let dir = tempfile::tempdir().unwrap();
    let labels = write(dir.path(), "y.csv", LABELS);
    assert_eq!(load_labels(&labels, None).unwrap(), vec![1.0, 0.0, 1.0, 0.0]);

    let wide = write(dir.path(), "wide.csv", "a,b\n1,0\n");
    assert!(load_labels(&wide, None).is_err());
}

#[test]
fn test_training_data_applies_cap_to_every_file() {
    let (_dir, paths) = dataset_dir();
    let data = load_training_data(&paths, Some(3), false).unwrap();

    assert_eq!(data.train_x.data.rows(), 3);
    assert_eq!(data.train_y.len(), 3);
    assert_eq!(data.test_x.data.rows(), 3);
    assert_eq!(data.test_y.len(), 3);
}

#[test]
fn test_training_data_normalizes_without_touching_intercept() {
    let (_dir, paths) = dataset_dir();
    let data = load_training_data(&paths, None, true).unwrap();

    for row in data.train_x.data.iter_rows() {
        assert_eq!(row[2], 1.0);
        assert!(row[0].abs() <= 0.5 + 1e-12);
        assert!(row[1].abs() <= 0.5 + 1e-12);
    }
}

#[test]
fn test_label_count_mismatch() {
    let (dir, mut paths) = dataset_dir();
    paths.train_y = write(dir.path(), "short.csv", "y\n1\n0\n");

    let err = load_training_data(&paths, None, false).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_feature_count_mismatch() {
    let (dir, mut paths) = dataset_dir();
    paths.test_x = write(dir.path(), "narrow.csv", "x1,intercept\n1,1\n2,1\n3,1\n4,1\n");

    let err = load_training_data(&paths, None, false).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_checkpoint_schedule() {
    let hits: Vec<usize> = (0..35).filter(|&i| is_checkpoint(i, 10)).collect();
    assert_eq!(hits, vec![10, 20, 30]);
}

#[test]
fn test_summary_is_valid_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("summary.json");

    let summary = RunSummary {
        version: "0.1.0".to_string(),
        refresh: "interactive".to_string(),
        engine: nesterov_he::EngineParams::interactive(32),
        training: nesterov_he::TrainingParams::default(),
        num_features: 3,
        row_size: 4,
        col_size: 4,
        iteration_depth: 12,
        last: Default::default(),
        total_seconds: 1.5,
    };
    summary.save(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["refresh"], "interactive");
    assert_eq!(value["row_size"], 4);
    assert_eq!(value["engine"]["max_depth"], 13);
}
