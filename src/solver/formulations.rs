//! The five SVM formulations expressed as SMO sub-problems
//!
//! Each formulation only chooses the Q matrix, the linear term `p`, the sign
//! vector, the bounds and a feasible starting α, then hands everything to
//! [`Solver`]. Regression works on `2l` variables and folds the pair back into
//! one signed coefficient per training point.

use crate::core::{SparseVector, SvmParams, SvmType};
use crate::kernel::Kernel;
use crate::solver::qmatrix::{ClassificationQ, OneClassQ, RegressionQ};
use crate::solver::smo::{SolutionInfo, Solver, SolverConfig, SolverVariant};
use log::debug;

/// Result of training one binary (or one-class, or regression) sub-problem
#[derive(Debug, Clone)]
pub struct DecisionFunction {
    /// Signed coefficient per training point
    pub alpha: Vec<f64>,
    pub rho: f64,
    pub info: SolutionInfo,
}

impl DecisionFunction {
    /// Evaluate `Σ α_i K(x_i, x) − ρ` against the points the function was trained on
    pub fn evaluate(&self, x: &[&SparseVector], kernel: &dyn Kernel, point: &SparseVector) -> f64 {
        self.alpha
            .iter()
            .zip(x)
            .filter(|(a, _)| **a != 0.0)
            .map(|(a, xi)| a * kernel.compute(xi, point))
            .sum::<f64>()
            - self.rho
    }
}

fn solver_config(params: &SvmParams) -> SolverConfig {
    SolverConfig {
        epsilon: params.epsilon,
        max_iterations: params.max_iterations,
    }
}

fn to_signs(y: &[f64]) -> Vec<i8> {
    y.iter().map(|&v| if v > 0.0 { 1 } else { -1 }).collect()
}

/// Train a single decision function
///
/// For classification `y` holds ±1 and `cp`/`cn` are the class-weighted costs.
/// One-class ignores `y`; regression reads targets from it and uses `params.c`.
pub fn train_one(
    x: &[&SparseVector],
    y: &[f64],
    params: &SvmParams,
    cp: f64,
    cn: f64,
) -> DecisionFunction {
    let result = match params.svm_type {
        SvmType::CSvc => solve_c_svc(x, y, params, cp, cn),
        SvmType::NuSvc => solve_nu_svc(x, y, params),
        SvmType::OneClass => solve_one_class(x, params),
        SvmType::EpsilonSvr => solve_epsilon_svr(x, y, params),
        SvmType::NuSvr => solve_nu_svr(x, y, params),
    };

    let (n_sv, n_bsv) = result
        .alpha
        .iter()
        .zip(y.iter().chain(std::iter::repeat(&1.0)))
        .filter(|(a, _)| a.abs() > 0.0)
        .fold((0usize, 0usize), |(n_sv, n_bsv), (a, &target)| {
            let bound = match params.svm_type {
                SvmType::CSvc => {
                    if target > 0.0 {
                        cp
                    } else {
                        cn
                    }
                }
                SvmType::EpsilonSvr | SvmType::NuSvr => params.c,
                _ => f64::INFINITY,
            };
            (n_sv + 1, n_bsv + usize::from(a.abs() >= bound))
        });
    debug!(
        "{:?}: obj = {:.6}, rho = {:.6}, nSV = {}, nBSV = {}",
        params.svm_type, result.info.objective, result.rho, n_sv, n_bsv
    );

    result
}

fn solve_c_svc(
    x: &[&SparseVector],
    y: &[f64],
    params: &SvmParams,
    cp: f64,
    cn: f64,
) -> DecisionFunction {
    let l = x.len();
    let signs = to_signs(y);
    let kernel = &params.kernel;
    let mut q = ClassificationQ::new(x, &signs, kernel, params.cache_size);
    let mut alpha = vec![0.0; l];
    let p = vec![-1.0; l];

    let info = Solver::solve(
        SolverVariant::Standard,
        &mut q,
        &p,
        &signs,
        &mut alpha,
        (cp, cn),
        &solver_config(params),
    );

    if cp == cn && l > 0 {
        let sum_alpha: f64 = alpha.iter().sum();
        debug!("nu = {:.6}", sum_alpha / (cp * l as f64));
    }

    for (a, &s) in alpha.iter_mut().zip(&signs) {
        *a *= f64::from(s);
    }

    DecisionFunction {
        alpha,
        rho: info.rho,
        info,
    }
}

fn solve_nu_svc(x: &[&SparseVector], y: &[f64], params: &SvmParams) -> DecisionFunction {
    let l = x.len();
    let signs = to_signs(y);
    let nu = params.nu;

    let mut sum_pos = nu * l as f64 / 2.0;
    let mut sum_neg = nu * l as f64 / 2.0;
    let mut alpha: Vec<f64> = signs
        .iter()
        .map(|&s| {
            let remaining = if s > 0 { &mut sum_pos } else { &mut sum_neg };
            let a = remaining.min(1.0);
            *remaining -= a;
            a
        })
        .collect();

    let kernel = &params.kernel;
    let mut q = ClassificationQ::new(x, &signs, kernel, params.cache_size);
    let p = vec![0.0; l];

    let mut info = Solver::solve(
        SolverVariant::Nu,
        &mut q,
        &p,
        &signs,
        &mut alpha,
        (1.0, 1.0),
        &solver_config(params),
    );

    let r = info.r;
    debug!("C = {:.6}", 1.0 / r);

    for (a, &s) in alpha.iter_mut().zip(&signs) {
        *a *= f64::from(s) / r;
    }
    info.rho /= r;
    info.objective /= r * r;
    info.upper_bound_p = 1.0 / r;
    info.upper_bound_n = 1.0 / r;

    DecisionFunction {
        alpha,
        rho: info.rho,
        info,
    }
}

fn solve_one_class(x: &[&SparseVector], params: &SvmParams) -> DecisionFunction {
    let l = x.len();
    let total = params.nu * l as f64;
    let n = total.floor() as usize;

    let mut alpha = vec![0.0; l];
    for a in alpha.iter_mut().take(n.min(l)) {
        *a = 1.0;
    }
    if n < l {
        alpha[n] = total - n as f64;
    }

    let kernel = &params.kernel;
    let mut q = OneClassQ::new(x, kernel, params.cache_size);
    let p = vec![0.0; l];
    let signs = vec![1i8; l];

    let info = Solver::solve(
        SolverVariant::Standard,
        &mut q,
        &p,
        &signs,
        &mut alpha,
        (1.0, 1.0),
        &solver_config(params),
    );

    DecisionFunction {
        alpha,
        rho: info.rho,
        info,
    }
}

/// Sign vector for the doubled regression problem: `+1` then `-1`
fn regression_signs(l: usize) -> Vec<i8> {
    let mut signs = vec![1i8; l];
    signs.resize(2 * l, -1);
    signs
}

fn fold_regression_alpha(alpha2: &[f64]) -> Vec<f64> {
    let l = alpha2.len() / 2;
    (0..l).map(|i| alpha2[i] - alpha2[i + l]).collect()
}

fn solve_epsilon_svr(x: &[&SparseVector], y: &[f64], params: &SvmParams) -> DecisionFunction {
    let l = x.len();
    let mut alpha2 = vec![0.0; 2 * l];
    let mut linear_term = vec![0.0; 2 * l];
    for (i, &target) in y.iter().enumerate().take(l) {
        linear_term[i] = params.p - target;
        linear_term[i + l] = params.p + target;
    }
    let signs = regression_signs(l);

    let kernel = &params.kernel;
    let mut q = RegressionQ::new(x, kernel, params.cache_size);

    let info = Solver::solve(
        SolverVariant::Standard,
        &mut q,
        &linear_term,
        &signs,
        &mut alpha2,
        (params.c, params.c),
        &solver_config(params),
    );

    let alpha = fold_regression_alpha(&alpha2);
    if l > 0 {
        let sum_alpha: f64 = alpha.iter().map(|a| a.abs()).sum();
        debug!("nu = {:.6}", sum_alpha / (params.c * l as f64));
    }

    DecisionFunction {
        alpha,
        rho: info.rho,
        info,
    }
}

fn solve_nu_svr(x: &[&SparseVector], y: &[f64], params: &SvmParams) -> DecisionFunction {
    let l = x.len();
    let c = params.c;
    let mut sum = c * params.nu * l as f64 / 2.0;

    let mut alpha2 = vec![0.0; 2 * l];
    let mut linear_term = vec![0.0; 2 * l];
    for (i, &target) in y.iter().enumerate().take(l) {
        let a = sum.min(c);
        alpha2[i] = a;
        alpha2[i + l] = a;
        sum -= a;

        linear_term[i] = -target;
        linear_term[i + l] = target;
    }
    let signs = regression_signs(l);

    let kernel = &params.kernel;
    let mut q = RegressionQ::new(x, kernel, params.cache_size);

    let info = Solver::solve(
        SolverVariant::Nu,
        &mut q,
        &linear_term,
        &signs,
        &mut alpha2,
        (c, c),
        &solver_config(params),
    );
    debug!("epsilon = {:.6}", -info.r);

    DecisionFunction {
        alpha: fold_regression_alpha(&alpha2),
        rho: info.rho,
        info,
    }
}
