//! Data loading and dataset implementations
//!
//! `MemoryDataset` owns its samples, `LibSVMDataset` reads the libsvm text
//! format and `DatasetView` borrows a subset of another dataset by index so
//! cross-validation folds never copy feature vectors.

pub mod libsvm;

pub use self::libsvm::LibSVMDataset;

use crate::core::{Dataset, Result, SVMError, Sample, SparseVector};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// Dataset held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    samples: Vec<Sample>,
    dimensions: usize,
}

impl MemoryDataset {
    /// Build a dataset from samples; the dimension is the largest vector extent
    pub fn new(samples: Vec<Sample>) -> Self {
        let dimensions = samples.iter().map(|s| s.features.dim()).max().unwrap_or(0);
        Self {
            samples,
            dimensions,
        }
    }

    /// Build a dataset from dense rows, checking that every row has the same width
    pub fn from_dense(rows: &[Vec<f64>], targets: &[f64]) -> Result<Self> {
        if rows.len() != targets.len() {
            return Err(SVMError::InvalidDataset(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        let width = rows.first().map_or(0, Vec::len);
        let mut samples = Vec::with_capacity(rows.len());
        for (row, &target) in rows.iter().zip(targets) {
            if row.len() != width {
                return Err(SVMError::DimensionMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            samples.push(Sample::new(SparseVector::from_dense(row), target));
        }
        Ok(Self {
            samples,
            dimensions: width,
        })
    }

    /// Append a sample, growing the dimension if needed
    pub fn push(&mut self, sample: Sample) {
        self.dimensions = self.dimensions.max(sample.features.dim());
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

impl Dataset for MemoryDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn sample(&self, i: usize) -> &Sample {
        &self.samples[i]
    }
}

/// Borrowed subset of a dataset, addressed through an index list
pub struct DatasetView<'a, D: Dataset + ?Sized> {
    base: &'a D,
    indices: Vec<usize>,
}

impl<'a, D: Dataset + ?Sized> DatasetView<'a, D> {
    pub fn new(base: &'a D, indices: Vec<usize>) -> Self {
        debug_assert!(indices.iter().all(|&i| i < base.len()));
        Self { base, indices }
    }

    /// Index in the underlying dataset of view position `i`
    pub fn original_index(&self, i: usize) -> usize {
        self.indices[i]
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl<D: Dataset + ?Sized> Dataset for DatasetView<'_, D> {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn dim(&self) -> usize {
        self.base.dim()
    }

    fn sample(&self, i: usize) -> &Sample {
        self.base.sample(self.indices[i])
    }
}

/// Points grouped by class label
#[derive(Debug, Clone, PartialEq)]
pub struct ClassGroups {
    /// Distinct labels in first-seen order (a `{-1, +1}` problem lists `+1` first)
    pub labels: Vec<i32>,
    /// Number of points per label
    pub counts: Vec<usize>,
    /// Offset of each class inside `perm`
    pub starts: Vec<usize>,
    /// Dataset indices ordered class by class, original order within a class
    pub perm: Vec<usize>,
}

impl ClassGroups {
    pub fn nr_class(&self) -> usize {
        self.labels.len()
    }

    /// Dataset indices of the points in class `c`
    pub fn members(&self, c: usize) -> &[usize] {
        &self.perm[self.starts[c]..self.starts[c] + self.counts[c]]
    }
}

/// Convert a classification target to an integer label
pub fn class_label(target: f64) -> Result<i32> {
    if target.fract() != 0.0 || !target.is_finite() || target.abs() > f64::from(i32::MAX) {
        return Err(SVMError::InvalidLabel(target));
    }
    Ok(target as i32)
}

/// Group the points of a classification dataset by label
pub fn group_classes<D: Dataset + ?Sized>(dataset: &D) -> Result<ClassGroups> {
    let l = dataset.len();
    let mut labels: Vec<i32> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut lookup: HashMap<i32, usize> = HashMap::new();
    let mut class_of = Vec::with_capacity(l);

    for i in 0..l {
        let label = class_label(dataset.target(i))?;
        let class = *lookup.entry(label).or_insert_with(|| {
            labels.push(label);
            counts.push(0);
            labels.len() - 1
        });
        counts[class] += 1;
        class_of.push(class);
    }

    // Binary -1/+1 data keeps +1 as the first class
    if labels == [-1, 1] {
        labels.swap(0, 1);
        counts.swap(0, 1);
        for class in class_of.iter_mut() {
            *class = 1 - *class;
        }
    }

    let mut starts = Vec::with_capacity(labels.len());
    let mut offset = 0;
    for &count in &counts {
        starts.push(offset);
        offset += count;
    }

    let mut next = starts.clone();
    let mut perm = vec![0; l];
    for (i, &class) in class_of.iter().enumerate() {
        perm[next[class]] = i;
        next[class] += 1;
    }

    Ok(ClassGroups {
        labels,
        counts,
        starts,
        perm,
    })
}

/// Uniform random permutation of `0..len`
pub fn random_permutation<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..len).collect();
    perm.shuffle(rng);
    perm
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn labelled(targets: &[f64]) -> MemoryDataset {
        MemoryDataset::new(
            targets
                .iter()
                .enumerate()
                .map(|(i, &t)| Sample::new(SparseVector::from_dense(&[i as f64 + 1.0]), t))
                .collect(),
        )
    }

    #[test]
    fn test_group_classes_first_seen_order() {
        let dataset = labelled(&[3.0, 1.0, 3.0, 2.0, 1.0, 3.0]);
        let groups = group_classes(&dataset).expect("integer labels");

        assert_eq!(groups.labels, vec![3, 1, 2]);
        assert_eq!(groups.counts, vec![3, 2, 1]);
        assert_eq!(groups.starts, vec![0, 3, 5]);
        assert_eq!(groups.perm, vec![0, 2, 5, 1, 4, 3]);
        assert_eq!(groups.members(1), &[1, 4]);
    }

    #[test]
    fn test_group_classes_binary_puts_positive_first() {
        let dataset = labelled(&[-1.0, 1.0, -1.0, 1.0, 1.0]);
        let groups = group_classes(&dataset).expect("integer labels");

        assert_eq!(groups.labels, vec![1, -1]);
        assert_eq!(groups.counts, vec![3, 2]);
        assert_eq!(groups.perm, vec![1, 3, 4, 0, 2]);
    }

    #[test]
    fn test_group_classes_rejects_fractional_label() {
        let dataset = labelled(&[1.0, 2.5]);
        assert!(matches!(
            group_classes(&dataset),
            Err(SVMError::InvalidLabel(v)) if v == 2.5
        ));
    }

    #[test]
    fn test_dataset_view_maps_indices() {
        let dataset = labelled(&[0.0, 1.0, 2.0, 3.0]);
        let view = DatasetView::new(&dataset, vec![3, 1]);

        assert_eq!(view.len(), 2);
        assert_eq!(view.dim(), dataset.dim());
        assert_eq!(view.target(0), 3.0);
        assert_eq!(view.original_index(1), 1);
        assert_eq!(view.get_labels(), vec![3.0, 1.0]);
    }

    #[test]
    fn test_from_dense_checks_width() {
        let ok = MemoryDataset::from_dense(&[vec![1.0, 0.0], vec![0.0, 2.0]], &[1.0, -1.0])
            .expect("consistent rows");
        assert_eq!(ok.dim(), 2);
        assert_eq!(ok.features(1).indices, vec![1]);

        let err = MemoryDataset::from_dense(&[vec![1.0, 0.0], vec![1.0]], &[1.0, -1.0]);
        assert!(matches!(
            err,
            Err(SVMError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_random_permutation_is_seeded() {
        let a = random_permutation(20, &mut SmallRng::seed_from_u64(7));
        let b = random_permutation(20, &mut SmallRng::seed_from_u64(7));
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }
}
