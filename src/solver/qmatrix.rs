//! Q matrix views over a kernel
//!
//! The dual problem is `min ½ αᵀQα + pᵀα`. Each formulation shapes Q from
//! the kernel differently:
//! - classification: `Q[i][j] = y_i y_j K(x_i, x_j)`
//! - one-class: `Q[i][j] = K(x_i, x_j)`
//! - regression: 2l variables, `Q[i][j] = s_i s_j K(x_{i mod l}, x_{j mod l})`
//!   with `s = +1` for the first copy and `-1` for the second
//!
//! Only the diagonal is precomputed; rows come from an LRU row cache.

use crate::cache::{CacheStats, RowCache};
use crate::core::SparseVector;
use crate::kernel::Kernel;
use std::rc::Rc;

/// Quadratic term of the dual problem as seen by the solver
pub trait QMatrix {
    /// Number of dual variables
    fn len(&self) -> usize;

    /// Row `i` of Q, `len()` entries
    fn row(&mut self, i: usize) -> Rc<[f64]>;

    /// `Q[i][i]` for every variable
    fn diagonal(&self) -> &[f64];

    /// Row cache statistics for diagnostics
    fn cache_stats(&self) -> CacheStats;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Kernel evaluation over a fixed set of points, with squared norms cached
struct KernelRows<'a, K: Kernel + ?Sized> {
    x: &'a [&'a SparseVector],
    norms: Vec<f64>,
    kernel: &'a K,
}

impl<'a, K: Kernel + ?Sized> KernelRows<'a, K> {
    fn new(x: &'a [&'a SparseVector], kernel: &'a K) -> Self {
        let norms = x.iter().map(|v| v.norm_squared()).collect();
        Self { x, norms, kernel }
    }

    fn eval(&self, i: usize, j: usize) -> f64 {
        self.kernel
            .compute_with_norms(self.x[i], self.x[j], self.norms[i], self.norms[j])
    }

    fn len(&self) -> usize {
        self.x.len()
    }
}

/// Q for C-SVC and ν-SVC
pub struct ClassificationQ<'a, K: Kernel + ?Sized> {
    rows: KernelRows<'a, K>,
    y: Vec<f64>,
    cache: RowCache,
    qd: Vec<f64>,
}

impl<'a, K: Kernel + ?Sized> ClassificationQ<'a, K> {
    /// `y` holds the ±1 labels of `x`
    pub fn new(x: &'a [&'a SparseVector], y: &[i8], kernel: &'a K, cache_size: usize) -> Self {
        let rows = KernelRows::new(x, kernel);
        let qd = (0..rows.len()).map(|i| rows.eval(i, i)).collect();
        Self {
            cache: RowCache::with_memory_limit(cache_size, rows.len()),
            y: y.iter().map(|&v| f64::from(v)).collect(),
            rows,
            qd,
        }
    }
}

impl<K: Kernel + ?Sized> QMatrix for ClassificationQ<'_, K> {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn row(&mut self, i: usize) -> Rc<[f64]> {
        let rows = &self.rows;
        let y = &self.y;
        self.cache.get_or_insert_with(i, || {
            (0..rows.len())
                .map(|j| y[i] * y[j] * rows.eval(i, j))
                .collect()
        })
    }

    fn diagonal(&self) -> &[f64] {
        &self.qd
    }

    fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Q for one-class SVM
pub struct OneClassQ<'a, K: Kernel + ?Sized> {
    rows: KernelRows<'a, K>,
    cache: RowCache,
    qd: Vec<f64>,
}

impl<'a, K: Kernel + ?Sized> OneClassQ<'a, K> {
    pub fn new(x: &'a [&'a SparseVector], kernel: &'a K, cache_size: usize) -> Self {
        let rows = KernelRows::new(x, kernel);
        let qd = (0..rows.len()).map(|i| rows.eval(i, i)).collect();
        Self {
            cache: RowCache::with_memory_limit(cache_size, rows.len()),
            rows,
            qd,
        }
    }
}

impl<K: Kernel + ?Sized> QMatrix for OneClassQ<'_, K> {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn row(&mut self, i: usize) -> Rc<[f64]> {
        let rows = &self.rows;
        self.cache
            .get_or_insert_with(i, || (0..rows.len()).map(|j| rows.eval(i, j)).collect())
    }

    fn diagonal(&self) -> &[f64] {
        &self.qd
    }

    fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Q for ε-SVR and ν-SVR over the doubled index space
///
/// Variable `k < l` is the α⁺ copy of point `k`, variable `k + l` its α⁻ copy.
/// The cache stores plain kernel rows of the l real points; signs are folded
/// in on every access.
pub struct RegressionQ<'a, K: Kernel + ?Sized> {
    rows: KernelRows<'a, K>,
    cache: RowCache,
    qd: Vec<f64>,
}

impl<'a, K: Kernel + ?Sized> RegressionQ<'a, K> {
    pub fn new(x: &'a [&'a SparseVector], kernel: &'a K, cache_size: usize) -> Self {
        let rows = KernelRows::new(x, kernel);
        let l = rows.len();
        let mut qd = vec![0.0; 2 * l];
        for k in 0..l {
            qd[k] = rows.eval(k, k);
            qd[k + l] = qd[k];
        }
        Self {
            cache: RowCache::with_memory_limit(cache_size, l),
            rows,
            qd,
        }
    }

    fn sign(&self, k: usize) -> f64 {
        if k < self.rows.len() {
            1.0
        } else {
            -1.0
        }
    }
}

impl<K: Kernel + ?Sized> QMatrix for RegressionQ<'_, K> {
    fn len(&self) -> usize {
        2 * self.rows.len()
    }

    fn row(&mut self, i: usize) -> Rc<[f64]> {
        let l = self.rows.len();
        let real_i = i % l;
        let rows = &self.rows;
        let kernel_row = self
            .cache
            .get_or_insert_with(real_i, || (0..l).map(|j| rows.eval(real_i, j)).collect());

        let si = self.sign(i);
        (0..2 * l)
            .map(|j| si * self.sign(j) * kernel_row[j % l])
            .collect::<Vec<_>>()
            .into()
    }

    fn diagonal(&self) -> &[f64] {
        &self.qd
    }

    fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
