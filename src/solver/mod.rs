//! SVM solver implementations
//!
//! A single SMO engine (`smo`) works over an abstract Q matrix (`qmatrix`);
//! `formulations` maps each SVM type onto it.

pub mod formulations;
pub mod qmatrix;
pub mod smo;

pub use self::formulations::{train_one, DecisionFunction};
pub use self::qmatrix::{ClassificationQ, OneClassQ, QMatrix, RegressionQ};
pub use self::smo::{AlphaStatus, SolutionInfo, Solver, SolverConfig, SolverVariant};
