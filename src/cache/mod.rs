//! Kernel row cache
//!
//! The SMO loop touches two full rows of Q per iteration, and the same rows
//! come back often near convergence. Rows are kept in an LRU cache keyed by
//! row index; a row is shared with the solver through `Rc` so a hit costs no
//! copy.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::rc::Rc;

/// LRU cache of Q matrix rows
pub struct RowCache {
    cache: LruCache<usize, Rc<[f64]>>,
    hits: u64,
    misses: u64,
}

impl RowCache {
    /// Create a new row cache holding at most `capacity` rows
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a row cache from a memory budget in bytes
    ///
    /// At least two rows are kept, since every SMO step needs a pair.
    pub fn with_memory_limit(memory_bytes: usize, row_len: usize) -> Self {
        let row_bytes = row_len.max(1) * std::mem::size_of::<f64>();
        Self::new((memory_bytes / row_bytes).max(2))
    }

    /// Get a cached row
    pub fn get(&mut self, i: usize) -> Option<Rc<[f64]>> {
        if let Some(row) = self.cache.get(&i) {
            self.hits += 1;
            Some(Rc::clone(row))
        } else {
            self.misses += 1;
            None
        }
    }

    /// Put a row into the cache
    pub fn put(&mut self, i: usize, row: Rc<[f64]>) {
        self.cache.put(i, row);
    }

    /// Return the cached row or compute, store and return it
    pub fn get_or_insert_with<F>(&mut self, i: usize, compute: F) -> Rc<[f64]>
    where
        F: FnOnce() -> Vec<f64>,
    {
        if let Some(row) = self.get(i) {
            return row;
        }
        let row: Rc<[f64]> = compute().into();
        self.put(i, Rc::clone(&row));
        row
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}

impl CacheStats {
    /// Fraction of row lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[f64]) -> Rc<[f64]> {
        values.to_vec().into()
    }

    #[test]
    fn test_row_cache_basic() {
        let mut cache = RowCache::new(3);

        assert!(cache.get(0).is_none());
        assert_eq!(cache.stats().misses, 1);

        cache.put(0, row(&[1.0, 2.0]));
        assert_eq!(cache.get(0).as_deref(), Some(&[1.0, 2.0][..]));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_row_cache_lru_eviction() {
        let mut cache = RowCache::new(2);

        cache.put(0, row(&[0.0]));
        cache.put(1, row(&[1.0]));
        cache.put(2, row(&[2.0])); // evicts row 0

        assert!(cache.get(0).is_none());
        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_some());
    }

    #[test]
    fn test_get_or_insert_computes_once() {
        let mut cache = RowCache::new(4);
        let mut calls = 0;

        for _ in 0..3 {
            let r = cache.get_or_insert_with(5, || {
                calls += 1;
                vec![5.0; 3]
            });
            assert_eq!(r.len(), 3);
        }

        assert_eq!(calls, 1);
        assert_eq!(cache.stats().hits, 2);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_hit_rate_calculation() {
        let mut cache = RowCache::new(10);
        assert_eq!(cache.stats().hit_rate(), 0.0);

        cache.get(0);
        cache.get(1);
        cache.put(0, row(&[1.0]));
        cache.get(0);
        cache.get(0);

        assert_eq!(cache.stats().hit_rate(), 0.5);
    }

    #[test]
    fn test_cache_with_memory_limit() {
        // 1000 rows of 10 f64 values fit in 80_000 bytes
        assert_eq!(RowCache::with_memory_limit(80_000, 10).stats().capacity, 1000);
        // Tiny budgets still hold a working pair
        assert_eq!(RowCache::with_memory_limit(1, 1000).stats().capacity, 2);
    }
}
