//! High-level API for Support Vector Machine operations
//!
//! This module provides a builder over [`SvmParams`] for training and
//! cross-validating models, plus evaluation helpers for their predictions.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use smosvm::api::{ClassificationMetrics, Svm};
//! use smosvm::kernel::KernelParams;
//! use smosvm::{Dataset, LibSVMDataset};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let train = LibSVMDataset::from_file("train.libsvm")?;
//! let svm = Svm::new().with_kernel(KernelParams::rbf(0.5)).with_c(10.0);
//!
//! let model = svm.train(&train)?;
//! let predictions = svm.cross_validate(&train, 5)?;
//! let accuracy = ClassificationMetrics::from_predictions(&predictions, &train.get_labels());
//! println!("CV accuracy: {:.2}%", accuracy.accuracy() * 100.0);
//! # let _ = model;
//! # Ok(())
//! # }
//! ```

use crate::core::{Dataset, Predict, Result, SVMError, SvmParams, SvmType};
use crate::data::LibSVMDataset;
use crate::kernel::KernelParams;
use crate::model::{cross_validation, train, SvmModel};
use crate::utils::validation::check_parameter;
use std::path::Path;

/// SVM trainer with builder pattern
#[derive(Debug, Clone, Default)]
pub struct Svm {
    params: SvmParams,
}

impl Svm {
    /// Create a C-SVC trainer with a linear kernel and default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from explicit parameters
    pub fn from_params(params: SvmParams) -> Self {
        Self { params }
    }

    /// Set the problem formulation
    pub fn with_type(mut self, svm_type: SvmType) -> Self {
        self.params.svm_type = svm_type;
        self
    }

    /// Set the kernel
    pub fn with_kernel(mut self, kernel: KernelParams) -> Self {
        self.params.kernel = kernel;
        self
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.params.c = c;
        self
    }

    /// Set ν
    pub fn with_nu(mut self, nu: f64) -> Self {
        self.params.nu = nu;
        self
    }

    /// Set the ε-SVR tube width
    pub fn with_p(mut self, p: f64) -> Self {
        self.params.p = p;
        self
    }

    /// Set convergence tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.params.epsilon = epsilon;
        self
    }

    /// Set kernel cache size in bytes
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.params.cache_size = cache_size;
        self
    }

    /// Multiply C by `weight` for class `label`
    pub fn with_weight(mut self, label: i32, weight: f64) -> Self {
        self.params.weights.push((label, weight));
        self
    }

    /// Fit probability estimates while training
    pub fn with_probability(mut self, probability: bool) -> Self {
        self.params.probability = probability;
        self
    }

    /// Override the solver's iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.params.max_iterations = Some(max_iterations);
        self
    }

    /// Seed for fold shuffling
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params.seed = seed;
        self
    }

    pub fn params(&self) -> &SvmParams {
        &self.params
    }

    /// Validate the configured parameters without training
    pub fn validate(&self) -> Result<()> {
        check_parameter(&self.params)
    }

    /// Train on a dataset
    pub fn train<D: Dataset + ?Sized>(&self, dataset: &D) -> Result<SvmModel> {
        train(dataset, &self.params)
    }

    /// Train from LibSVM format file
    pub fn train_from_file<P: AsRef<Path>>(&self, path: P) -> Result<SvmModel> {
        let dataset = LibSVMDataset::from_file(path)?;
        self.train(&dataset)
    }

    /// Out-of-fold predictions from `nr_fold`-fold cross-validation
    pub fn cross_validate<D: Dataset + ?Sized>(&self, dataset: &D, nr_fold: usize) -> Result<Vec<f64>> {
        check_parameter(&self.params)?;
        cross_validation(dataset, &self.params, nr_fold)
    }
}

/// Classification accuracy
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationMetrics {
    pub correct: usize,
    pub total: usize,
}

impl ClassificationMetrics {
    /// Compare predicted labels against true labels
    pub fn from_predictions(predictions: &[f64], labels: &[f64]) -> Self {
        let correct = predictions
            .iter()
            .zip(labels)
            .filter(|(pred, actual)| pred == actual)
            .count();
        Self {
            correct,
            total: predictions.len().min(labels.len()),
        }
    }

    /// Calculate accuracy: correct / total
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Regression error and fit quality
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionMetrics {
    pub mean_squared_error: f64,
    pub squared_correlation: f64,
}

impl RegressionMetrics {
    /// Compare predicted values against true targets
    pub fn from_predictions(predictions: &[f64], targets: &[f64]) -> Self {
        let n = predictions.len().min(targets.len());
        if n == 0 {
            return Self {
                mean_squared_error: 0.0,
                squared_correlation: 0.0,
            };
        }

        let (mut sum_v, mut sum_y, mut sum_vv, mut sum_yy, mut sum_vy) = (0.0, 0.0, 0.0, 0.0, 0.0);
        let mut total_error = 0.0;
        for (&v, &y) in predictions.iter().zip(targets) {
            total_error += (v - y) * (v - y);
            sum_v += v;
            sum_y += y;
            sum_vv += v * v;
            sum_yy += y * y;
            sum_vy += v * y;
        }

        let n = n as f64;
        let numerator = n * sum_vy - sum_v * sum_y;
        let denominator = (n * sum_vv - sum_v * sum_v) * (n * sum_yy - sum_y * sum_y);
        Self {
            mean_squared_error: total_error / n,
            squared_correlation: if denominator > 0.0 {
                numerator * numerator / denominator
            } else {
                0.0
            },
        }
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub svm_type: SvmType,
    pub nr_class: usize,
    pub n_support_vectors: usize,
    pub rho: Vec<f64>,
    pub support_vector_indices: Vec<usize>,
}

impl From<&SvmModel> for ModelInfo {
    fn from(model: &SvmModel) -> Self {
        Self {
            svm_type: model.svm_type(),
            nr_class: model.nr_class(),
            n_support_vectors: model.total_sv(),
            rho: model.rho().to_vec(),
            support_vector_indices: model.support_indices().to_vec(),
        }
    }
}

/// Convenience functions for quick operations
pub mod quick {
    use super::*;

    /// Train a linear C-SVC on LibSVM data with default parameters
    pub fn train_libsvm<P: AsRef<Path>>(path: P) -> Result<SvmModel> {
        Svm::new().train_from_file(path)
    }

    /// Train with custom C parameter
    pub fn train_libsvm_with_c<P: AsRef<Path>>(path: P, c: f64) -> Result<SvmModel> {
        Svm::new().with_c(c).train_from_file(path)
    }

    /// Quick evaluation: train on training file, report accuracy on test file
    pub fn evaluate_split<P1: AsRef<Path>, P2: AsRef<Path>>(
        train_path: P1,
        test_path: P2,
    ) -> Result<f64> {
        let model = train_libsvm(train_path)?;
        let test = LibSVMDataset::from_file(test_path)?;
        let predictions = model.predict_dataset(&test)?;
        Ok(ClassificationMetrics::from_predictions(&predictions, &test.get_labels()).accuracy())
    }

    /// Cross-validated accuracy of a linear C-SVC
    pub fn cross_validated_accuracy<D: Dataset + ?Sized>(
        dataset: &D,
        nr_fold: usize,
        c: f64,
    ) -> Result<f64> {
        if dataset.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        let predictions = Svm::new().with_c(c).cross_validate(dataset, nr_fold)?;
        Ok(ClassificationMetrics::from_predictions(&predictions, &dataset.get_labels()).accuracy())
    }
}
