//! Core traits for SVM implementation

use crate::core::{Prediction, Result, Sample, SparseVector};

/// Dataset abstraction for read-only data access during training
pub trait Dataset: Send + Sync {
    /// Number of samples in the dataset
    fn len(&self) -> usize;

    /// Number of features (dimensionality)
    fn dim(&self) -> usize;

    /// Borrow a single sample by index
    ///
    /// # Panics
    /// Panics if index >= len()
    fn sample(&self, i: usize) -> &Sample;

    /// Feature vector of sample `i`
    fn features(&self, i: usize) -> &SparseVector {
        &self.sample(i).features
    }

    /// Class label or regression target of sample `i`
    fn target(&self, i: usize) -> f64 {
        self.sample(i).label
    }

    /// Get all labels as a vector
    fn get_labels(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.target(i)).collect()
    }

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fitted model able to score feature vectors
pub trait Predict: Send + Sync {
    /// Predict a single feature vector
    fn predict(&self, x: &SparseVector) -> Result<f64>;

    /// Predict with decision values attached
    fn predict_values(&self, x: &SparseVector) -> Result<Prediction>;

    /// Predict every sample of a dataset
    fn predict_dataset<D: Dataset + ?Sized>(&self, dataset: &D) -> Result<Vec<f64>>
    where
        Self: Sized,
    {
        (0..dataset.len())
            .map(|i| self.predict(dataset.features(i)))
            .collect()
    }
}
