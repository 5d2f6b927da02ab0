//! k-fold cross-validation
//!
//! Classification folds are stratified: each class is shuffled and spread
//! over the folds in proportion to its size. Other problems, and
//! leave-one-out classification, use a plain random permutation. Folds train
//! in parallel, each on a [`DatasetView`] of the remaining points.

use crate::core::{Dataset, Predict, Result, SVMError, SvmParams};
use crate::data::{group_classes, random_permutation, DatasetView};
use crate::model::train;
use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

/// Assignment of dataset indices to folds
#[derive(Debug, Clone, PartialEq)]
pub struct Folds {
    /// Dataset indices, fold after fold
    index: Vec<usize>,
    /// `fold_start[f]..fold_start[f + 1]` slices `index` for fold `f`
    fold_start: Vec<usize>,
}

impl Folds {
    pub fn len(&self) -> usize {
        self.fold_start.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Held-out indices of fold `f`
    pub fn test_indices(&self, f: usize) -> &[usize] {
        &self.index[self.fold_start[f]..self.fold_start[f + 1]]
    }

    /// Indices the model for fold `f` is trained on
    pub fn train_indices(&self, f: usize) -> Vec<usize> {
        let begin = self.fold_start[f];
        let end = self.fold_start[f + 1];
        self.index[..begin]
            .iter()
            .chain(&self.index[end..])
            .copied()
            .collect()
    }
}

/// Split a dataset into `nr_fold` folds
///
/// `nr_fold` above the dataset size falls back to leave-one-out.
pub fn fold_partition<D: Dataset + ?Sized>(
    dataset: &D,
    params: &SvmParams,
    nr_fold: usize,
) -> Result<Folds> {
    let l = dataset.len();
    if l == 0 {
        return Err(SVMError::EmptyDataset);
    }
    if nr_fold < 2 {
        return Err(SVMError::InvalidParameter(format!(
            "cross-validation needs at least 2 folds, got {}",
            nr_fold
        )));
    }
    let nr_fold = if nr_fold > l {
        warn!(
            "{} folds requested for {} points, using leave-one-out",
            nr_fold, l
        );
        l
    } else {
        nr_fold
    };

    let mut rng = SmallRng::seed_from_u64(params.seed);

    if params.svm_type.is_classification() && nr_fold < l {
        let mut groups = group_classes(dataset)?;
        for c in 0..groups.nr_class() {
            let begin = groups.starts[c];
            let end = begin + groups.counts[c];
            groups.perm[begin..end].shuffle(&mut rng);
        }

        let mut fold_count = vec![0usize; nr_fold];
        for (i, fc) in fold_count.iter_mut().enumerate() {
            for &count in &groups.counts {
                *fc += (i + 1) * count / nr_fold - i * count / nr_fold;
            }
        }
        let mut fold_start = vec![0usize; nr_fold + 1];
        for i in 0..nr_fold {
            fold_start[i + 1] = fold_start[i] + fold_count[i];
        }

        let mut next = fold_start.clone();
        let mut index = vec![0usize; l];
        for c in 0..groups.nr_class() {
            let count = groups.counts[c];
            for (i, slot) in next.iter_mut().take(nr_fold).enumerate() {
                let begin = groups.starts[c] + i * count / nr_fold;
                let end = groups.starts[c] + (i + 1) * count / nr_fold;
                for &point in &groups.perm[begin..end] {
                    index[*slot] = point;
                    *slot += 1;
                }
            }
        }

        Ok(Folds { index, fold_start })
    } else {
        let index = random_permutation(l, &mut rng);
        let fold_start = (0..=nr_fold).map(|i| i * l / nr_fold).collect();
        Ok(Folds { index, fold_start })
    }
}

/// Out-of-fold predictions for every point of the dataset
///
/// Each fold trains a fresh model on the other folds. Classification with
/// probability enabled predicts through the calibrated probabilities.
/// Classification fails with [`SVMError::InvalidDataset`] before any training
/// when some fold would leave only one class to train on.
pub fn cross_validation<D: Dataset + ?Sized>(
    dataset: &D,
    params: &SvmParams,
    nr_fold: usize,
) -> Result<Vec<f64>> {
    let folds = fold_partition(dataset, params, nr_fold)?;
    if params.svm_type.is_classification() {
        check_fold_classes(dataset, &folds)?;
    }
    debug!("cross-validation over {} folds", folds.len());

    // Fold models see the data as `dyn Dataset`; training may cross-validate
    // again and the view types must not nest.
    let whole = DatasetView::new(dataset, (0..dataset.len()).collect());
    predict_folds(&whole, &folds, params)
}

fn check_fold_classes<D: Dataset + ?Sized>(dataset: &D, folds: &Folds) -> Result<()> {
    for f in 0..folds.len() {
        let train = folds.train_indices(f);
        let Some((&first, rest)) = train.split_first() else {
            continue;
        };
        let label = dataset.target(first);
        if rest.iter().all(|&i| dataset.target(i) == label) {
            return Err(SVMError::InvalidDataset(format!(
                "cross-validation fold {} would train on class {} alone; use fewer folds or more points per class",
                f, label
            )));
        }
    }
    Ok(())
}

fn predict_folds(dataset: &dyn Dataset, folds: &Folds, params: &SvmParams) -> Result<Vec<f64>> {
    let use_probability = params.probability && params.svm_type.is_classification();

    let fold_predictions: Vec<Vec<(usize, f64)>> = (0..folds.len())
        .into_par_iter()
        .map(|f| {
            let view = DatasetView::new(dataset, folds.train_indices(f));
            let model = train(&view, params)?;
            folds
                .test_indices(f)
                .iter()
                .map(|&i| {
                    let x = dataset.features(i);
                    let value = if use_probability {
                        model.predict_probability(x)?.0
                    } else {
                        model.predict(x)?
                    };
                    Ok((i, value))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let mut target = vec![0.0; dataset.len()];
    for (i, value) in fold_predictions.into_iter().flatten() {
        target[i] = value;
    }
    Ok(target)
}
