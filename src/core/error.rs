//! Error types for SVM implementation

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SVMError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Specified nu is infeasible: nu * ({count_i} + {count_j}) / 2 > min({count_i}, {count_j}) for nu = {nu}")]
    InfeasibleNu {
        nu: f64,
        count_i: usize,
        count_j: usize,
    },

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid label: expected an integer class label, got {0}")]
    InvalidLabel(f64),

    #[error("Classification needs at least two classes, got {0}")]
    TooFewClasses(usize),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Model was not trained with probability estimates")]
    ProbabilityNotAvailable,

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Missing or malformed model field: {0}")]
    MalformedModel(String),
}

impl SVMError {
    /// True for errors raised while validating inputs, before any solve runs
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SVMError::InvalidParameter(_)
                | SVMError::InvalidDataset(_)
                | SVMError::InvalidLabel(_)
                | SVMError::TooFewClasses(_)
                | SVMError::DimensionMismatch { .. }
                | SVMError::EmptyDataset
        )
    }
}

pub type Result<T> = std::result::Result<T, SVMError>;
