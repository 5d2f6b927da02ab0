//! Probability calibration
//!
//! Platt scaling maps binary decision values to probabilities through
//! `P(y = 1 | f) = 1 / (1 + exp(A·f + B))`. Pairwise probabilities are
//! coupled into one distribution over k classes with method 2 of Wu, Lin and
//! Weng (JMLR 2004). Regression uses a Laplace noise model whose scale comes
//! from cross-validated residuals.

use crate::core::{SparseVector, SvmParams, TrainingWarning};
use crate::data::random_permutation;
use crate::solver::train_one;
use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Folds used by the internal cross-validation of probability fitting
pub const PROBABILITY_FOLDS: usize = 5;

/// Pairwise probabilities are kept inside `[MIN_PROB, 1 - MIN_PROB]`
pub const MIN_PROB: f64 = 1e-7;

/// Fitted Platt sigmoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmoidFit {
    pub a: f64,
    pub b: f64,
    /// Set when the Newton iteration stopped without meeting its tolerance
    pub warning: Option<TrainingWarning>,
}

/// Fit Platt's sigmoid on decision values and their ±1 labels
///
/// Newton's method with backtracking line search on the regularized
/// log-likelihood, following Lin, Lin and Weng (2007).
pub fn sigmoid_train(dec_values: &[f64], labels: &[f64]) -> SigmoidFit {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    let prior1 = labels.iter().filter(|&&y| y > 0.0).count() as f64;
    let prior0 = labels.len() as f64 - prior1;

    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = labels
        .iter()
        .map(|&y| if y > 0.0 { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        dec_values
            .iter()
            .zip(&targets)
            .map(|(&f, &t)| {
                let f_apb = f * a + b;
                if f_apb >= 0.0 {
                    t * f_apb + (1.0 + (-f_apb).exp()).ln()
                } else {
                    (t - 1.0) * f_apb + (1.0 + f_apb.exp()).ln()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);
    let mut warning = None;
    let mut iter = 0;

    while iter < MAX_ITER {
        // Gradient and Hessian
        let mut h11 = SIGMA;
        let mut h22 = SIGMA;
        let mut h21 = 0.0;
        let mut g1 = 0.0;
        let mut g2 = 0.0;
        for (&f, &t) in dec_values.iter().zip(&targets) {
            let f_apb = f * a + b;
            let (p, q) = if f_apb >= 0.0 {
                let e = (-f_apb).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = f_apb.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < EPS && g2.abs() < EPS {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let d_a = -(h22 * g1 - h21 * g2) / det;
        let d_b = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * d_a + g2 * d_b;

        let mut step = 1.0;
        while step >= MIN_STEP {
            let new_a = a + step * d_a;
            let new_b = b + step * d_b;
            let new_f = objective(new_a, new_b);
            if new_f < fval + 0.0001 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }

        if step < MIN_STEP {
            warn!("Platt scaling: line search fails");
            warning = Some(TrainingWarning::LineSearchFailed);
            break;
        }
        iter += 1;
    }

    if iter >= MAX_ITER {
        warn!("Platt scaling: reaching maximal iterations");
        warning = Some(TrainingWarning::SigmoidIterationLimit);
    }

    SigmoidFit { a, b, warning }
}

/// Probability of the positive class for a decision value
pub fn sigmoid_predict(decision_value: f64, a: f64, b: f64) -> f64 {
    let f_apb = decision_value * a + b;
    // Both branches avoid overflowing exp
    if f_apb >= 0.0 {
        (-f_apb).exp() / (1.0 + (-f_apb).exp())
    } else {
        1.0 / (1.0 + f_apb.exp())
    }
}

/// Couple pairwise probabilities into a distribution over `k` classes
///
/// `pairwise[i][j]` estimates `P(class i | class i or j)`; the diagonal is
/// ignored. Returns `k` probabilities summing to one.
pub fn multiclass_probability(pairwise: &[Vec<f64>]) -> Vec<f64> {
    let k = pairwise.len();
    if k == 0 {
        return Vec::new();
    }
    let max_iter = k.max(100);
    let eps = 0.005 / k as f64;

    let mut p = vec![1.0 / k as f64; k];
    let mut q = vec![vec![0.0; k]; k];
    let mut qp = vec![0.0; k];

    for t in 0..k {
        for j in 0..t {
            q[t][t] += pairwise[j][t] * pairwise[j][t];
            q[t][j] = q[j][t];
        }
        for j in t + 1..k {
            q[t][t] += pairwise[j][t] * pairwise[j][t];
            q[t][j] = -pairwise[j][t] * pairwise[t][j];
        }
    }

    let mut iter = 0;
    while iter < max_iter {
        let mut p_qp = 0.0;
        for t in 0..k {
            qp[t] = q[t].iter().zip(&p).map(|(a, b)| a * b).sum();
            p_qp += p[t] * qp[t];
        }

        let max_error = qp
            .iter()
            .map(|&v| (v - p_qp).abs())
            .fold(0.0, f64::max);
        if max_error < eps {
            break;
        }

        for t in 0..k {
            let diff = (-qp[t] + p_qp) / q[t][t];
            p[t] += diff;
            p_qp = (p_qp + diff * (diff * q[t][t] + 2.0 * qp[t])) / (1.0 + diff) / (1.0 + diff);
            for j in 0..k {
                qp[j] = (qp[j] + diff * q[t][j]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
        iter += 1;
    }

    if iter >= max_iter {
        warn!("pairwise coupling exceeded {} iterations", max_iter);
    }

    p
}

/// Decision values for Platt fitting, from an internal 5-fold split
///
/// `y` holds ±1. Folds whose training part lacks one class get a constant
/// decision value (+1, -1, or 0 when the part is empty).
pub fn binary_svc_probability(
    x: &[&SparseVector],
    y: &[f64],
    params: &SvmParams,
    cp: f64,
    cn: f64,
    seed: u64,
) -> SigmoidFit {
    let l = x.len();
    let mut rng = SmallRng::seed_from_u64(seed);
    let perm = random_permutation(l, &mut rng);
    let mut dec_values = vec![0.0; l];

    for fold in 0..PROBABILITY_FOLDS {
        let begin = fold * l / PROBABILITY_FOLDS;
        let end = (fold + 1) * l / PROBABILITY_FOLDS;

        let train_idx: Vec<usize> = perm[..begin].iter().chain(&perm[end..]).copied().collect();
        let sub_x: Vec<&SparseVector> = train_idx.iter().map(|&i| x[i]).collect();
        let sub_y: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();

        let p_count = sub_y.iter().filter(|&&v| v > 0.0).count();
        let n_count = sub_y.len() - p_count;

        let constant = match (p_count, n_count) {
            (0, 0) => Some(0.0),
            (_, 0) => Some(1.0),
            (0, _) => Some(-1.0),
            _ => None,
        };

        match constant {
            Some(value) => {
                for &j in &perm[begin..end] {
                    dec_values[j] = value;
                }
            }
            None => {
                let f = train_one(&sub_x, &sub_y, params, cp, cn);
                for &j in &perm[begin..end] {
                    dec_values[j] = f.evaluate(&sub_x, &params.kernel, x[j]);
                }
            }
        }
    }

    let fit = sigmoid_train(&dec_values, y);
    debug!("Platt fit A = {:.6}, B = {:.6}", fit.a, fit.b);
    fit
}

/// Laplace scale from out-of-fold residuals `y - f(x)`
///
/// Residuals beyond `5·sqrt(2·mae²)` are treated as outliers and dropped
/// before the final mean absolute error is taken.
pub fn laplace_scale(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return 0.0;
    }
    let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / residuals.len() as f64;
    let std = (2.0 * mae * mae).sqrt();

    let kept: Vec<f64> = residuals
        .iter()
        .map(|r| r.abs())
        .filter(|&r| r <= 5.0 * std)
        .collect();
    let dropped = residuals.len() - kept.len();
    if kept.is_empty() {
        return mae;
    }
    let sigma = kept.iter().sum::<f64>() / kept.len() as f64;
    debug!(
        "Laplace scale sigma = {:.6} ({} outliers dropped)",
        sigma, dropped
    );
    sigma
}
