//! Utility functions for SVM operations

/// Parameter checks run before any solve
pub mod validation {
    use crate::core::{Dataset, Result, SVMError, SvmParams, SvmType};
    use crate::data::group_classes;

    /// Reject hyperparameters that no formulation can train with
    pub fn check_parameter(params: &SvmParams) -> Result<()> {
        let svm_type = params.svm_type;

        if matches!(
            svm_type,
            SvmType::CSvc | SvmType::EpsilonSvr | SvmType::NuSvr
        ) && !(params.c > 0.0)
        {
            return Err(SVMError::InvalidParameter(format!(
                "C must be positive, got {}",
                params.c
            )));
        }

        if matches!(svm_type, SvmType::NuSvc | SvmType::OneClass | SvmType::NuSvr)
            && !(params.nu > 0.0 && params.nu <= 1.0)
        {
            return Err(SVMError::InvalidParameter(format!(
                "nu must be in (0, 1], got {}",
                params.nu
            )));
        }

        if svm_type == SvmType::EpsilonSvr && !(params.p >= 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "p must be non-negative, got {}",
                params.p
            )));
        }

        if !(params.epsilon > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "epsilon must be positive, got {}",
                params.epsilon
            )));
        }

        if params.cache_size == 0 {
            return Err(SVMError::InvalidParameter(
                "cache size must be positive".to_string(),
            ));
        }

        if params.max_iterations == Some(0) {
            return Err(SVMError::InvalidParameter(
                "max_iterations must be positive".to_string(),
            ));
        }

        params.kernel.validate()?;

        if let Some(&(label, weight)) = params.weights.iter().find(|(_, w)| !(*w > 0.0)) {
            return Err(SVMError::InvalidParameter(format!(
                "weight for label {} must be positive, got {}",
                label, weight
            )));
        }

        if params.probability && svm_type == SvmType::OneClass {
            return Err(SVMError::UnsupportedOperation(
                "probability estimates are not available for one-class SVM".to_string(),
            ));
        }

        Ok(())
    }

    /// ν-SVC needs `ν·(n_i + n_j)/2 ≤ min(n_i, n_j)` for every class pair
    pub fn is_nu_feasible(count_i: usize, count_j: usize, nu: f64) -> bool {
        nu * (count_i + count_j) as f64 / 2.0 <= count_i.min(count_j) as f64
    }

    /// Check every class pair of a ν-SVC problem
    pub fn is_nu_feasible_for_counts(counts: &[usize], nu: f64) -> Result<()> {
        for (i, &count_i) in counts.iter().enumerate() {
            for &count_j in &counts[i + 1..] {
                if !is_nu_feasible(count_i, count_j, nu) {
                    return Err(SVMError::InfeasibleNu {
                        nu,
                        count_i,
                        count_j,
                    });
                }
            }
        }
        Ok(())
    }

    /// Group the dataset by class and check ν against every pair
    pub fn is_nu_feasible_for_data<D: Dataset + ?Sized>(dataset: &D, nu: f64) -> Result<()> {
        let groups = group_classes(dataset)?;
        is_nu_feasible_for_counts(&groups.counts, nu)
    }
}

#[cfg(test)]
mod tests {
    use super::validation::*;
    use crate::core::{SVMError, SvmParams, SvmType};
    use crate::kernel::{KernelParams, RBFKernel};

    #[test]
    fn test_default_params_are_valid() {
        assert!(check_parameter(&SvmParams::default()).is_ok());
    }

    #[test]
    fn test_check_parameter_rejects_bad_values() {
        let bad_c = SvmParams {
            c: 0.0,
            ..SvmParams::default()
        };
        assert!(matches!(
            check_parameter(&bad_c),
            Err(SVMError::InvalidParameter(_))
        ));

        let bad_nu = SvmParams {
            svm_type: SvmType::NuSvc,
            nu: 1.5,
            ..SvmParams::default()
        };
        assert!(check_parameter(&bad_nu).is_err());

        let bad_p = SvmParams {
            svm_type: SvmType::EpsilonSvr,
            p: -0.1,
            ..SvmParams::default()
        };
        assert!(check_parameter(&bad_p).is_err());

        let bad_eps = SvmParams {
            epsilon: 0.0,
            ..SvmParams::default()
        };
        assert!(check_parameter(&bad_eps).is_err());

        let bad_weight = SvmParams {
            weights: vec![(1, -2.0)],
            ..SvmParams::default()
        };
        assert!(check_parameter(&bad_weight).is_err());
    }

    #[test]
    fn test_nu_is_ignored_where_unused() {
        // C-SVC never reads ν
        let params = SvmParams {
            nu: 7.0,
            ..SvmParams::default()
        };
        assert!(check_parameter(&params).is_ok());
    }

    #[test]
    fn test_one_class_probability_is_unsupported() {
        let params = SvmParams {
            svm_type: SvmType::OneClass,
            kernel: KernelParams::Rbf(RBFKernel::new(0.5)),
            probability: true,
            ..SvmParams::default()
        };
        assert!(matches!(
            check_parameter(&params),
            Err(SVMError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_nu_feasibility_boundary() {
        // 0.5 * (10 + 4) / 2 = 3.5 <= 4
        assert!(is_nu_feasible(10, 4, 0.5));
        // 0.9 * (10 + 4) / 2 = 6.3 > 4
        assert!(!is_nu_feasible(10, 4, 0.9));
        // Equality is feasible
        assert!(is_nu_feasible(5, 5, 1.0));
    }

    #[test]
    fn test_nu_feasibility_over_all_pairs() {
        assert!(is_nu_feasible_for_counts(&[10, 10, 10], 0.9).is_ok());
        match is_nu_feasible_for_counts(&[10, 10, 2], 0.5) {
            Err(SVMError::InfeasibleNu {
                count_i, count_j, ..
            }) => {
                assert_eq!((count_i, count_j), (10, 2));
            }
            other => panic!("expected infeasible nu, got {:?}", other),
        }
    }
}
