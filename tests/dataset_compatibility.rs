//! Dataset compatibility and format validation tests
//!
//! Tests for ensuring libsvm-format inputs work correctly across the pipeline

use smosvm::api::{ClassificationMetrics, Svm};
use smosvm::{Dataset, LibSVMDataset, MemoryDataset, Predict, SVMError, SvmType};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(data: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    write!(temp_file, "{}", data).expect("Failed to write");
    temp_file.flush().expect("Failed to flush");
    temp_file
}

/// Test LibSVM format variations
#[test]
fn test_libsvm_format_variations() {
    let test_cases = vec![
        // Basic format
        ("+1 1:0.5 3:1.2 7:0.8\n-1 2:0.3 5:2.1\n", "basic format"),
        // With comments and empty lines
        (
            "# This is a comment\n+1 1:0.5 3:1.2\n\n# Another comment\n-1 2:0.3\n",
            "with comments",
        ),
        // Different label formats
        ("1 1:0.5 2:1.0\n-1 1:-0.5 2:-1.0\n", "explicit +/-1 labels"),
        // Sparse indices (non-consecutive)
        (
            "+1 1:1.0 10:2.0 100:3.0\n-1 5:1.5 50:2.5 500:3.5\n",
            "sparse indices",
        ),
        // Single feature
        (
            "+1 1:2.0\n-1 1:-2.0\n+1 1:1.8\n-1 1:-1.8\n",
            "single feature",
        ),
        // Many features
        (
            "+1 1:0.1 2:0.2 3:0.3 4:0.4 5:0.5\n-1 1:-0.1 2:-0.2 3:-0.3 4:-0.4 5:-0.5\n",
            "many features",
        ),
        // Unsorted indices within a line
        ("+1 3:1.0 1:2.0\n-1 2:-1.0 1:-2.0\n", "unsorted indices"),
    ];

    for (data, description) in test_cases {
        let temp_file = write_temp(data);

        let dataset = LibSVMDataset::from_file(temp_file.path())
            .unwrap_or_else(|e| panic!("Failed to load LibSVM dataset {}: {}", description, e));

        assert!(
            dataset.len() >= 2,
            "Dataset should have at least 2 samples: {}",
            description
        );
        assert!(
            dataset.dim() > 0,
            "Dataset should have dimensions: {}",
            description
        );

        let model = Svm::new()
            .train(&dataset)
            .unwrap_or_else(|e| panic!("Training should succeed for {}: {}", description, e));

        let prediction = model
            .predict(dataset.features(0))
            .expect("training points fit the model");
        assert!(
            prediction == 1.0 || prediction == -1.0,
            "Prediction should be binary for: {}",
            description
        );
    }
}

/// Labels are kept as written, multi-class files train one-vs-one
#[test]
fn test_multiclass_labels_are_preserved() {
    let data = "3 1:1.0 2:0.1\n3 1:1.1 2:0.0\n7 1:-1.0 2:0.1\n7 1:-1.1 2:0.0\n5 1:0.0 2:2.0\n5 1:0.1 2:2.1\n";
    let temp_file = write_temp(data);

    let dataset = LibSVMDataset::from_file(temp_file.path()).expect("Failed to load dataset");
    assert_eq!(dataset.get_labels(), vec![3.0, 3.0, 7.0, 7.0, 5.0, 5.0]);

    let model = Svm::new().with_c(10.0).train(&dataset).expect("training succeeds");
    // Labels in order of first appearance
    assert_eq!(model.labels(), &[3, 7, 5]);
    assert_eq!(model.rho().len(), 3);

    let predictions = model.predict_dataset(&dataset).expect("dimensions fit");
    let metrics = ClassificationMetrics::from_predictions(&predictions, &dataset.get_labels());
    assert_eq!(metrics.accuracy(), 1.0);
}

/// Real-valued targets load for regression but not for classification
#[test]
fn test_real_valued_targets() {
    let data = "0.5 1:0.1\n1.25 1:0.2\n2.0 1:0.3\n2.75 1:0.4\n3.5 1:0.5\n";
    let temp_file = write_temp(data);
    let dataset = LibSVMDataset::from_file(temp_file.path()).expect("Failed to load dataset");

    assert!(matches!(
        Svm::new().train(&dataset),
        Err(SVMError::InvalidLabel(_))
    ));

    let model = Svm::new()
        .with_type(SvmType::EpsilonSvr)
        .with_c(100.0)
        .with_p(0.01)
        .train(&dataset)
        .expect("regression accepts real targets");
    let prediction = model.predict(dataset.features(2)).expect("dimensions fit");
    assert!((prediction - 2.0).abs() < 0.1);
}

/// A parsed file converts into an in-memory dataset with the same content
#[test]
fn test_libsvm_into_memory_dataset() {
    let data = "+1 1:2.0 2:1.0\n+1 1:1.8 2:1.1\n-1 1:-2.0 2:-1.0\n-1 1:-1.8 2:-1.1\n";
    let temp_file = write_temp(data);

    let libsvm_dataset =
        LibSVMDataset::from_file(temp_file.path()).expect("Failed to load LibSVM dataset");
    let labels = libsvm_dataset.get_labels();
    let dim = libsvm_dataset.dim();
    let first = libsvm_dataset.features(0).clone();

    let memory_dataset = MemoryDataset::from(libsvm_dataset);
    assert_eq!(memory_dataset.len(), 4);
    assert_eq!(memory_dataset.dim(), dim);
    assert_eq!(memory_dataset.get_labels(), labels);
    assert_eq!(memory_dataset.features(0), &first);

    let model = Svm::new()
        .train(&memory_dataset)
        .expect("training succeeds");
    let predictions = model.predict_dataset(&memory_dataset).expect("dimensions fit");
    assert_eq!(predictions, labels);
}

/// Test large dimension handling
#[test]
fn test_large_dimensions() {
    // Create a dataset with sparse, high-dimensional features
    let mut libsvm_data = String::new();

    // Positive samples with features at high indices
    libsvm_data.push_str("+1 100:1.0 1000:2.0 10000:1.5\n");
    libsvm_data.push_str("+1 150:1.2 1500:1.8 15000:1.3\n");

    // Negative samples
    libsvm_data.push_str("-1 200:1.0 2000:2.0 20000:1.5\n");
    libsvm_data.push_str("-1 250:1.2 2500:1.8 25000:1.3\n");

    let temp_file = write_temp(&libsvm_data);

    let dataset = LibSVMDataset::from_file(temp_file.path())
        .expect("Failed to load high-dimensional dataset");

    assert_eq!(dataset.len(), 4);
    assert_eq!(dataset.dim(), 25000); // Max index was 24999 (0-based), so dim is 25000

    let model = Svm::new()
        .with_max_iterations(100)
        .train(&dataset)
        .expect("Training on high-dimensional data should succeed");
    assert_eq!(model.n_features(), 25000);

    let prediction = model
        .predict(dataset.features(0))
        .expect("training points fit the model");
    assert!(prediction == 1.0 || prediction == -1.0);
}

/// Test malformed data handling
#[test]
fn test_malformed_data_handling() {
    let malformed_cases = vec![
        ("invalid_label 1:1.0\n", "invalid label"),
        ("nan 1:1.0\n", "non-finite label"),
        ("+1 invalid_feature\n", "invalid feature format"),
        ("+1 0:1.0\n", "zero-based index"),
        ("+1 1:invalid_value\n", "invalid feature value"),
        ("+1 1:1.0\n-1 2:2.0 x:1\n", "bad second line"),
    ];

    for (data, description) in malformed_cases {
        let temp_file = write_temp(data);
        let result = LibSVMDataset::from_file(temp_file.path());
        assert!(
            matches!(result, Err(SVMError::ParseError(_))),
            "LibSVM should reject malformed data: {}",
            description
        );
    }

    let empty = write_temp("# only a comment\n\n");
    assert!(matches!(
        LibSVMDataset::from_file(empty.path()),
        Err(SVMError::EmptyDataset)
    ));

    assert!(matches!(
        LibSVMDataset::from_file("/nonexistent/train.libsvm"),
        Err(SVMError::IoError(_))
    ));
}
