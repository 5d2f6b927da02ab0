//! Core type definitions for SVM

use crate::kernel::KernelParams;

/// Sparse vector representation with sorted indices
#[derive(Clone, Debug, PartialEq)]
pub struct SparseVector {
    /// Sorted indices of non-zero elements
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create a new sparse vector, ensuring indices are sorted
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );

        // Sort by indices
        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        let (indices, values): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self { indices, values }
    }

    /// Build a sparse vector from dense coordinates, dropping zeros
    pub fn from_dense(values: &[f64]) -> Self {
        let (indices, values): (Vec<_>, Vec<_>) = values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0.0)
            .map(|(i, &v)| (i, v))
            .unzip();
        Self { indices, values }
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Smallest dense dimension able to hold this vector
    pub fn dim(&self) -> usize {
        self.indices.last().map_or(0, |&i| i + 1)
    }

    /// Dot product with another sparse vector
    ///
    /// Both index lists are sorted, so this is a merge in O(nnz(x) + nnz(y)).
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let mut result = 0.0;
        let mut i = 0;
        let mut j = 0;

        while i < self.indices.len() && j < other.indices.len() {
            let x_idx = self.indices[i];
            let y_idx = other.indices[j];

            if x_idx == y_idx {
                result += self.values[i] * other.values[j];
                i += 1;
                j += 1;
            } else if x_idx < y_idx {
                i += 1;
            } else {
                j += 1;
            }
        }

        result
    }

    /// Squared Euclidean distance ||x - y||²
    pub fn squared_distance(&self, other: &SparseVector) -> f64 {
        let mut distance_sq = 0.0;
        let mut i = 0;
        let mut j = 0;

        while i < self.indices.len() && j < other.indices.len() {
            let x_idx = self.indices[i];
            let y_idx = other.indices[j];

            if x_idx == y_idx {
                let diff = self.values[i] - other.values[j];
                distance_sq += diff * diff;
                i += 1;
                j += 1;
            } else if x_idx < y_idx {
                distance_sq += self.values[i] * self.values[i];
                i += 1;
            } else {
                distance_sq += other.values[j] * other.values[j];
                j += 1;
            }
        }

        distance_sq += self.values[i..].iter().map(|v| v * v).sum::<f64>();
        distance_sq += other.values[j..].iter().map(|v| v * v).sum::<f64>();

        distance_sq
    }

    /// Compute squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|&v| v * v).sum()
    }

    /// Compute L2 norm
    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// Number of non-zero elements
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Training sample with features and target
#[derive(Clone, Debug)]
pub struct Sample {
    /// Feature vector (sparse representation)
    pub features: SparseVector,
    /// Class label for classification, real target for regression
    pub label: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(features: SparseVector, label: f64) -> Self {
        Self { features, label }
    }
}

/// SVM formulation
///
/// The integer codes are the ones written into persisted models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SvmType {
    /// C-support vector classification
    CSvc,
    /// ν-support vector classification
    NuSvc,
    /// One-class novelty detection
    OneClass,
    /// ε-support vector regression
    EpsilonSvr,
    /// ν-support vector regression
    NuSvr,
}

impl SvmType {
    pub fn code(self) -> i32 {
        match self {
            SvmType::CSvc => 0,
            SvmType::NuSvc => 1,
            SvmType::OneClass => 2,
            SvmType::EpsilonSvr => 3,
            SvmType::NuSvr => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SvmType::CSvc),
            1 => Some(SvmType::NuSvc),
            2 => Some(SvmType::OneClass),
            3 => Some(SvmType::EpsilonSvr),
            4 => Some(SvmType::NuSvr),
            _ => None,
        }
    }

    pub fn is_classification(self) -> bool {
        matches!(self, SvmType::CSvc | SvmType::NuSvc)
    }

    pub fn is_regression(self) -> bool {
        matches!(self, SvmType::EpsilonSvr | SvmType::NuSvr)
    }
}

/// Training configuration
#[derive(Debug, Clone)]
pub struct SvmParams {
    /// Problem formulation
    pub svm_type: SvmType,
    /// Kernel family and hyperparameters
    pub kernel: KernelParams,
    /// Cost parameter (C-SVC, ε-SVR, ν-SVR)
    pub c: f64,
    /// ν parameter (ν-SVC, one-class, ν-SVR)
    pub nu: f64,
    /// Width of the ε-insensitive tube (ε-SVR)
    pub p: f64,
    /// Stopping tolerance on the maximal violating pair
    pub epsilon: f64,
    /// Kernel row cache size in bytes
    pub cache_size: usize,
    /// Per-class cost multipliers as (label, weight) pairs
    pub weights: Vec<(i32, f64)>,
    /// Fit probability estimates during training
    pub probability: bool,
    /// Override of the solver's iteration cap
    pub max_iterations: Option<usize>,
    /// Seed for fold shuffling
    pub seed: u64,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            svm_type: SvmType::CSvc,
            kernel: KernelParams::default(),
            c: 1.0,
            nu: 0.5,
            p: 0.1,
            epsilon: 0.001,
            cache_size: 100_000_000, // 100MB
            weights: Vec::new(),
            probability: false,
            max_iterations: None,
            seed: 1,
        }
    }
}

/// Non-fatal problems reported while training
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrainingWarning {
    /// The SMO loop stopped at its iteration cap
    IterationLimit { iterations: usize },
    /// A weight was given for a label absent from the training data
    UnknownWeightLabel(i32),
    /// Platt fitting stopped because the line search could not make progress
    LineSearchFailed,
    /// Platt fitting stopped at its iteration cap
    SigmoidIterationLimit,
}

/// Prediction result containing the predicted value and raw decision values
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Class label, ±1 for one-class, or the regression estimate
    pub value: f64,
    /// One value per class pair for classification, a single value otherwise
    pub decision_values: Vec<f64>,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(value: f64, decision_values: Vec<f64>) -> Self {
        Self {
            value,
            decision_values,
        }
    }

    /// Get confidence as absolute value of the first decision value
    pub fn confidence(&self) -> f64 {
        self.decision_values.first().map_or(0.0, |d| d.abs())
    }
}
