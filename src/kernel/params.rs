//! Kernel family selector
//!
//! Models store their kernel as a `KernelParams` value so that a trained
//! model can be persisted and reloaded without knowing the concrete kernel
//! type at compile time.

use crate::core::{Result, SVMError, SparseVector};
use crate::kernel::{Kernel, LinearKernel, PolynomialKernel, RBFKernel, SigmoidKernel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KernelParams {
    Linear,
    Polynomial(PolynomialKernel),
    Rbf(RBFKernel),
    Sigmoid(SigmoidKernel),
}

impl KernelParams {
    pub fn linear() -> Self {
        KernelParams::Linear
    }

    pub fn polynomial(degree: u32, gamma: f64, coef0: f64) -> Self {
        KernelParams::Polynomial(PolynomialKernel::new(degree, gamma, coef0))
    }

    pub fn rbf(gamma: f64) -> Self {
        KernelParams::Rbf(RBFKernel::new(gamma))
    }

    pub fn sigmoid(gamma: f64, coef0: f64) -> Self {
        KernelParams::Sigmoid(SigmoidKernel::new(gamma, coef0))
    }

    /// Check hyperparameters that bypassed the constructors (e.g. deserialized ones)
    pub fn validate(&self) -> Result<()> {
        let gamma_ok = |gamma: f64| gamma.is_finite() && gamma > 0.0;
        match self {
            KernelParams::Linear => Ok(()),
            KernelParams::Polynomial(k) if k.degree == 0 => Err(SVMError::InvalidParameter(
                "polynomial degree must be at least 1".to_string(),
            )),
            KernelParams::Polynomial(k) if !gamma_ok(k.gamma) => Err(SVMError::InvalidParameter(
                format!("gamma must be positive, got {}", k.gamma),
            )),
            KernelParams::Rbf(k) if !gamma_ok(k.gamma()) => Err(SVMError::InvalidParameter(
                format!("gamma must be positive, got {}", k.gamma()),
            )),
            KernelParams::Sigmoid(k) if !gamma_ok(k.gamma) => Err(SVMError::InvalidParameter(
                format!("gamma must be positive, got {}", k.gamma),
            )),
            _ => Ok(()),
        }
    }
}

impl Default for KernelParams {
    fn default() -> Self {
        KernelParams::linear()
    }
}

impl Kernel for KernelParams {
    fn compute(&self, x: &SparseVector, y: &SparseVector) -> f64 {
        match self {
            KernelParams::Linear => LinearKernel.compute(x, y),
            KernelParams::Polynomial(k) => k.compute(x, y),
            KernelParams::Rbf(k) => k.compute(x, y),
            KernelParams::Sigmoid(k) => k.compute(x, y),
        }
    }

    fn compute_with_norms(
        &self,
        x: &SparseVector,
        y: &SparseVector,
        x_norm_sq: f64,
        y_norm_sq: f64,
    ) -> f64 {
        match self {
            KernelParams::Rbf(k) => k.compute_with_norms(x, y, x_norm_sq, y_norm_sq),
            _ => self.compute(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_matches_concrete_kernels() {
        let x = SparseVector::new(vec![0, 1], vec![1.0, 2.0]);
        let y = SparseVector::new(vec![0, 1], vec![0.5, -1.0]);

        assert_eq!(KernelParams::linear().compute(&x, &y), -1.5);
        assert_eq!(
            KernelParams::rbf(0.5).compute(&x, &y),
            RBFKernel::new(0.5).compute(&x, &y)
        );
        assert_eq!(
            KernelParams::polynomial(2, 1.0, 1.0).compute(&x, &y),
            0.25
        );
    }

    #[test]
    fn test_validate_rejects_deserialized_bad_gamma() {
        let params: KernelParams =
            serde_json::from_str(r#"{"type":"rbf","gamma":-1.0}"#).expect("valid json");
        assert!(params.validate().is_err());

        let params: KernelParams = serde_json::from_str(
            r#"{"type":"polynomial","gamma":1.0,"coef0":0.0,"degree":3}"#,
        )
        .expect("valid json");
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&KernelParams::sigmoid(0.1, -1.0)).expect("serialize");
        assert!(json.contains("\"type\":\"sigmoid\""));
        let back: KernelParams = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, KernelParams::sigmoid(0.1, -1.0));
    }
}
