//! Training orchestration
//!
//! One-class and regression problems are a single solve. Classification is
//! decomposed one-vs-one: every class pair is solved independently on the
//! rayon pool and the results are assembled, in pair order, into the shared
//! support vector and coefficient tables.

use crate::core::{Dataset, Result, SVMError, SparseVector, SvmParams, SvmType, TrainingWarning};
use crate::data::{group_classes, ClassGroups};
use crate::model::{cross_validation, Calibration, SvmModel};
use crate::probability::{binary_svc_probability, laplace_scale, SigmoidFit, PROBABILITY_FOLDS};
use crate::solver::{train_one, DecisionFunction};
use crate::utils::validation::{check_parameter, is_nu_feasible_for_counts};
use log::{debug, info, warn};
use rayon::prelude::*;

/// Train a model on a dataset
///
/// Parameter and data problems fail before any solve. Convergence problems
/// never fail; they are logged and listed in [`SvmModel::warnings`].
pub fn train<D: Dataset + ?Sized>(dataset: &D, params: &SvmParams) -> Result<SvmModel> {
    check_parameter(params)?;
    if dataset.is_empty() {
        return Err(SVMError::EmptyDataset);
    }

    if params.svm_type.is_classification() {
        train_classifier(dataset, params)
    } else {
        train_single(dataset, params)
    }
}

fn convergence_warning(f: &DecisionFunction) -> Option<TrainingWarning> {
    (!f.info.converged).then_some(TrainingWarning::IterationLimit {
        iterations: f.info.iterations,
    })
}

/// One-class and regression: one solve over the whole dataset
fn train_single<D: Dataset + ?Sized>(dataset: &D, params: &SvmParams) -> Result<SvmModel> {
    let l = dataset.len();
    let x: Vec<&SparseVector> = (0..l).map(|i| dataset.features(i)).collect();
    let y = dataset.get_labels();
    if let Some(&bad) = y.iter().find(|v| !v.is_finite()) {
        return Err(SVMError::InvalidDataset(format!("non-finite target {}", bad)));
    }

    let mut warnings = Vec::new();

    let calibration = if params.probability && params.svm_type.is_regression() {
        let sigma = svr_probability(dataset, params)?;
        info!(
            "Prob. model for test data: target value = predicted value + z, \
             z: Laplace distribution e^(-|z|/sigma)/(2sigma), sigma = {:.6}",
            sigma
        );
        Calibration::Laplace { sigma }
    } else {
        Calibration::None
    };

    let f = train_one(&x, &y, params, params.c, params.c);
    warnings.extend(convergence_warning(&f));

    let mut support_vectors = Vec::new();
    let mut sv_indices = Vec::new();
    let mut coef = Vec::new();
    for (i, &alpha) in f.alpha.iter().enumerate() {
        if alpha.abs() > 0.0 {
            support_vectors.push(x[i].clone());
            sv_indices.push(i);
            coef.push(alpha);
        }
    }
    info!("{:?}: total nSV = {}", params.svm_type, support_vectors.len());

    Ok(SvmModel {
        svm_type: params.svm_type,
        kernel: params.kernel,
        nr_class: 2,
        labels: Vec::new(),
        rho: vec![f.rho],
        sv_counts: vec![support_vectors.len()],
        support_vectors,
        sv_indices,
        sv_coef: vec![coef],
        calibration,
        n_features: dataset.dim(),
        warnings,
    })
}

/// Per-class cost `C·w`, warning about weights for absent labels
fn weighted_costs(
    groups: &ClassGroups,
    params: &SvmParams,
    warnings: &mut Vec<TrainingWarning>,
) -> Vec<f64> {
    let mut costs = vec![params.c; groups.nr_class()];
    for &(label, weight) in &params.weights {
        match groups.labels.iter().position(|&l| l == label) {
            Some(class) => costs[class] *= weight,
            None => {
                warn!("class label {} specified in weight is not found", label);
                warnings.push(TrainingWarning::UnknownWeightLabel(label));
            }
        }
    }
    costs
}

struct PairSolution {
    function: DecisionFunction,
    sigmoid: Option<SigmoidFit>,
}

fn train_classifier<D: Dataset + ?Sized>(dataset: &D, params: &SvmParams) -> Result<SvmModel> {
    let groups = group_classes(dataset)?;
    let nr_class = groups.nr_class();
    if nr_class < 2 {
        return Err(SVMError::TooFewClasses(nr_class));
    }
    if params.svm_type == SvmType::NuSvc {
        is_nu_feasible_for_counts(&groups.counts, params.nu)?;
    }

    let mut warnings = Vec::new();
    let costs = weighted_costs(&groups, params, &mut warnings);

    // Points reordered class by class
    let x: Vec<&SparseVector> = groups.perm.iter().map(|&i| dataset.features(i)).collect();
    let start = &groups.starts;
    let count = &groups.counts;

    let pairs: Vec<(usize, usize)> = (0..nr_class)
        .flat_map(|i| (i + 1..nr_class).map(move |j| (i, j)))
        .collect();

    let solutions: Vec<PairSolution> = pairs
        .par_iter()
        .enumerate()
        .map(|(p, &(i, j))| {
            let sub_x: Vec<&SparseVector> = x[start[i]..start[i] + count[i]]
                .iter()
                .chain(&x[start[j]..start[j] + count[j]])
                .copied()
                .collect();
            let mut sub_y = vec![1.0; count[i]];
            sub_y.resize(count[i] + count[j], -1.0);

            debug!(
                "training pair ({}, {}) on {} points",
                groups.labels[i],
                groups.labels[j],
                sub_x.len()
            );

            let sigmoid = params.probability.then(|| {
                binary_svc_probability(
                    &sub_x,
                    &sub_y,
                    params,
                    costs[i],
                    costs[j],
                    params.seed.wrapping_add(p as u64),
                )
            });
            let function = train_one(&sub_x, &sub_y, params, costs[i], costs[j]);
            PairSolution { function, sigmoid }
        })
        .collect();

    let l = x.len();
    let mut nonzero = vec![false; l];
    for (solution, &(i, j)) in solutions.iter().zip(&pairs) {
        warnings.extend(convergence_warning(&solution.function));
        if let Some(warning) = solution.sigmoid.and_then(|s| s.warning) {
            warnings.push(warning);
        }

        let alpha = &solution.function.alpha;
        for k in 0..count[i] {
            if alpha[k].abs() > 0.0 {
                nonzero[start[i] + k] = true;
            }
        }
        for k in 0..count[j] {
            if alpha[count[i] + k].abs() > 0.0 {
                nonzero[start[j] + k] = true;
            }
        }
    }

    let sv_counts: Vec<usize> = (0..nr_class)
        .map(|c| nonzero[start[c]..start[c] + count[c]].iter().filter(|&&nz| nz).count())
        .collect();
    let mut nz_start = Vec::with_capacity(nr_class);
    let mut offset = 0;
    for &n in &sv_counts {
        nz_start.push(offset);
        offset += n;
    }
    let total_sv = offset;

    let mut support_vectors = Vec::with_capacity(total_sv);
    let mut sv_indices = Vec::with_capacity(total_sv);
    for (k, &nz) in nonzero.iter().enumerate() {
        if nz {
            support_vectors.push(x[k].clone());
            sv_indices.push(groups.perm[k]);
        }
    }

    let mut sv_coef = vec![vec![0.0; total_sv]; nr_class - 1];
    for (solution, &(i, j)) in solutions.iter().zip(&pairs) {
        let alpha = &solution.function.alpha;

        let mut q = nz_start[i];
        for k in 0..count[i] {
            if nonzero[start[i] + k] {
                sv_coef[j - 1][q] = alpha[k];
                q += 1;
            }
        }
        let mut q = nz_start[j];
        for k in 0..count[j] {
            if nonzero[start[j] + k] {
                sv_coef[i][q] = alpha[count[i] + k];
                q += 1;
            }
        }
    }

    let rho: Vec<f64> = solutions.iter().map(|s| s.function.rho).collect();

    let calibration = if params.probability {
        let (a, b) = solutions
            .iter()
            .map(|s| s.sigmoid.map_or((0.0, 0.0), |fit| (fit.a, fit.b)))
            .unzip();
        Calibration::Pairwise { a, b }
    } else {
        Calibration::None
    };

    info!(
        "{:?}: {} classes, {} pairs, total nSV = {}",
        params.svm_type,
        nr_class,
        pairs.len(),
        total_sv
    );

    Ok(SvmModel {
        svm_type: params.svm_type,
        kernel: params.kernel,
        nr_class,
        labels: groups.labels,
        rho,
        support_vectors,
        sv_indices,
        sv_counts,
        sv_coef,
        calibration,
        n_features: dataset.dim(),
        warnings,
    })
}

/// Laplace scale of regression residuals from 5-fold cross-validation
pub fn svr_probability<D: Dataset + ?Sized>(dataset: &D, params: &SvmParams) -> Result<f64> {
    let sub_params = SvmParams {
        probability: false,
        ..params.clone()
    };
    let predictions = cross_validation(dataset, &sub_params, PROBABILITY_FOLDS)?;
    let residuals: Vec<f64> = predictions
        .iter()
        .enumerate()
        .map(|(i, &pred)| dataset.target(i) - pred)
        .collect();
    Ok(laplace_scale(&residuals))
}
