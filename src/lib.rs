//! Support Vector Machines trained with Sequential Minimal Optimization
//!
//! C-SVC, ν-SVC, one-class SVM, ε-SVR and ν-SVR share one SMO solver
//! (Fan, Chen and Lin, "Working Set Selection Using Second Order Information
//! for Training SVM", JMLR 2005). Multi-class problems are decomposed
//! one-vs-one, probabilities come from Platt scaling and pairwise coupling.

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod kernel;
pub mod model;
pub mod persistence;
pub mod probability;
pub mod solver;
pub mod utils;

// Re-export main types for convenience
pub use crate::api::{quick, ClassificationMetrics, ModelInfo, RegressionMetrics, Svm};
pub use crate::cache::{CacheStats, RowCache};
pub use crate::core::error::*;
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::data::{ClassGroups, DatasetView, LibSVMDataset, MemoryDataset};
pub use crate::kernel::{Kernel, KernelParams};
pub use crate::model::{Calibration, Folds, SvmModel};
pub use crate::persistence::{ModelRecord, MODEL_FORMAT_VERSION};
pub use crate::utils::validation::{check_parameter, is_nu_feasible, is_nu_feasible_for_data};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
