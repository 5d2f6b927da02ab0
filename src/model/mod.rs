//! Trained SVM models
//!
//! A model only comes out of [`train`](crate::model::train) or a validated
//! persisted record. Classification models hold `k(k-1)/2` one-vs-one
//! decision functions sharing one flattened support vector list:
//! `sv_coef[j - 1]` carries the coefficients of class-i vectors in pair
//! `(i, j)` and `sv_coef[i]` those of class-j vectors.

pub mod cross_validation;
pub mod train;

pub use self::cross_validation::{cross_validation, fold_partition, Folds};
pub use self::train::{svr_probability, train};

use crate::core::{Predict, Prediction, Result, SVMError, SparseVector, SvmType, TrainingWarning};
use crate::kernel::{Kernel, KernelParams};
use crate::probability::{multiclass_probability, sigmoid_predict, MIN_PROB};

/// Probability information attached at training time
#[derive(Debug, Clone, PartialEq)]
pub enum Calibration {
    None,
    /// Platt parameters per class pair, in pair order
    Pairwise { a: Vec<f64>, b: Vec<f64> },
    /// Laplace noise scale of a regression model
    Laplace { sigma: f64 },
}

/// Trained SVM
#[derive(Debug, Clone)]
pub struct SvmModel {
    pub(crate) svm_type: SvmType,
    pub(crate) kernel: KernelParams,
    pub(crate) nr_class: usize,
    /// Class labels, empty for one-class and regression
    pub(crate) labels: Vec<i32>,
    /// One ρ per class pair, or a single ρ
    pub(crate) rho: Vec<f64>,
    pub(crate) support_vectors: Vec<SparseVector>,
    /// Training set index of each support vector, when known
    pub(crate) sv_indices: Vec<usize>,
    pub(crate) sv_counts: Vec<usize>,
    /// `nr_class - 1` rows of `total_sv` coefficients
    pub(crate) sv_coef: Vec<Vec<f64>>,
    pub(crate) calibration: Calibration,
    pub(crate) n_features: usize,
    pub(crate) warnings: Vec<TrainingWarning>,
}

impl SvmModel {
    pub fn svm_type(&self) -> SvmType {
        self.svm_type
    }

    pub fn kernel(&self) -> &KernelParams {
        &self.kernel
    }

    /// Number of classes; 2 for one-class and regression models
    pub fn nr_class(&self) -> usize {
        self.nr_class
    }

    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    pub fn rho(&self) -> &[f64] {
        &self.rho
    }

    pub fn support_vectors(&self) -> &[SparseVector] {
        &self.support_vectors
    }

    /// Training set indices of the support vectors
    pub fn support_indices(&self) -> &[usize] {
        &self.sv_indices
    }

    /// Support vectors per class (a single entry for one-class and regression)
    pub fn sv_counts(&self) -> &[usize] {
        &self.sv_counts
    }

    pub fn total_sv(&self) -> usize {
        self.support_vectors.len()
    }

    pub fn sv_coef(&self) -> &[Vec<f64>] {
        &self.sv_coef
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Non-fatal problems reported while training
    pub fn warnings(&self) -> &[TrainingWarning] {
        &self.warnings
    }

    pub fn has_probability(&self) -> bool {
        !matches!(self.calibration, Calibration::None)
    }

    /// Laplace scale of the regression noise, when calibrated
    pub fn svr_sigma(&self) -> Option<f64> {
        match self.calibration {
            Calibration::Laplace { sigma } => Some(sigma),
            _ => None,
        }
    }

    fn check_dimension(&self, x: &SparseVector) -> Result<()> {
        if x.dim() > self.n_features {
            return Err(SVMError::DimensionMismatch {
                expected: self.n_features,
                actual: x.dim(),
            });
        }
        Ok(())
    }

    /// Decision values: one per class pair for classification, one otherwise
    pub fn decision_values(&self, x: &SparseVector) -> Result<Vec<f64>> {
        self.check_dimension(x)?;

        let kvalue: Vec<f64> = self
            .support_vectors
            .iter()
            .map(|sv| self.kernel.compute(sv, x))
            .collect();

        if !self.svm_type.is_classification() {
            let sum: f64 = self.sv_coef[0]
                .iter()
                .zip(&kvalue)
                .map(|(c, k)| c * k)
                .sum();
            return Ok(vec![sum - self.rho[0]]);
        }

        let k = self.nr_class;
        let mut start = Vec::with_capacity(k);
        let mut offset = 0;
        for &count in &self.sv_counts {
            start.push(offset);
            offset += count;
        }

        let mut dec_values = Vec::with_capacity(k * (k - 1) / 2);
        let mut p = 0;
        for i in 0..k {
            for j in i + 1..k {
                let (si, sj) = (start[i], start[j]);
                let (ci, cj) = (self.sv_counts[i], self.sv_counts[j]);
                let coef1 = &self.sv_coef[j - 1];
                let coef2 = &self.sv_coef[i];

                let sum: f64 = (si..si + ci)
                    .map(|t| coef1[t] * kvalue[t])
                    .chain((sj..sj + cj).map(|t| coef2[t] * kvalue[t]))
                    .sum();
                dec_values.push(sum - self.rho[p]);
                p += 1;
            }
        }
        Ok(dec_values)
    }

    /// Index of the class with most one-vs-one votes, lowest index on ties
    fn vote(&self, dec_values: &[f64]) -> usize {
        let k = self.nr_class;
        let mut votes = vec![0usize; k];
        let mut p = 0;
        for i in 0..k {
            for j in i + 1..k {
                if dec_values[p] > 0.0 {
                    votes[i] += 1;
                } else {
                    votes[j] += 1;
                }
                p += 1;
            }
        }

        let mut best = 0;
        for (c, &v) in votes.iter().enumerate().skip(1) {
            if v > votes[best] {
                best = c;
            }
        }
        best
    }

    /// Label with the highest probability and the per-class probabilities
    ///
    /// Probabilities follow the order of [`labels`](Self::labels).
    pub fn predict_probability(&self, x: &SparseVector) -> Result<(f64, Vec<f64>)> {
        if !self.svm_type.is_classification() {
            return Err(SVMError::UnsupportedOperation(format!(
                "class probabilities are not defined for {:?}",
                self.svm_type
            )));
        }
        let (prob_a, prob_b) = match &self.calibration {
            Calibration::Pairwise { a, b } => (a, b),
            _ => return Err(SVMError::ProbabilityNotAvailable),
        };

        let dec_values = self.decision_values(x)?;
        let k = self.nr_class;

        let mut pairwise = vec![vec![0.0; k]; k];
        let mut p = 0;
        for i in 0..k {
            for j in i + 1..k {
                let prob = sigmoid_predict(dec_values[p], prob_a[p], prob_b[p])
                    .clamp(MIN_PROB, 1.0 - MIN_PROB);
                pairwise[i][j] = prob;
                pairwise[j][i] = 1.0 - prob;
                p += 1;
            }
        }

        let estimates = if k == 2 {
            vec![pairwise[0][1], pairwise[1][0]]
        } else {
            multiclass_probability(&pairwise)
        };

        let mut best = 0;
        for (c, &prob) in estimates.iter().enumerate().skip(1) {
            if prob > estimates[best] {
                best = c;
            }
        }
        Ok((f64::from(self.labels[best]), estimates))
    }
}

impl Predict for SvmModel {
    fn predict(&self, x: &SparseVector) -> Result<f64> {
        Ok(self.predict_values(x)?.value)
    }

    fn predict_values(&self, x: &SparseVector) -> Result<Prediction> {
        let dec_values = self.decision_values(x)?;
        let value = match self.svm_type {
            SvmType::OneClass => {
                if dec_values[0] > 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            SvmType::EpsilonSvr | SvmType::NuSvr => dec_values[0],
            SvmType::CSvc | SvmType::NuSvc => f64::from(self.labels[self.vote(&dec_values)]),
        };
        Ok(Prediction::new(value, dec_values))
    }
}
