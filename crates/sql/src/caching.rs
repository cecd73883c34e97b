//! Rendered-fragment cache
//!
//! Shards frequently receive the same fragment for every partition of a
//! statement; the only part that changes is the shard qualifier. Fragments
//! rendered without a qualifier are cached here, keyed by the pointer
//! identity of the shared expression, so re-prepared statements skip the
//! rebuild entirely.

use crate::expr::Expression;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
}

/// LRU cache from shared expression identity to rendered SQL.
pub struct FragmentCache {
    inner: Mutex<LruCache<usize, Arc<String>>>,
}

impl FragmentCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn key(expr: &Arc<Expression>) -> usize {
        Arc::as_ptr(expr) as usize
    }

    pub fn get(&self, expr: &Arc<Expression>) -> Option<Arc<String>> {
        self.inner.lock().get(&Self::key(expr)).cloned()
    }

    pub fn insert(&self, expr: &Arc<Expression>, sql: String) -> Arc<String> {
        let sql = Arc::new(sql);
        self.inner.lock().put(Self::key(expr), sql.clone());
        sql
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            size: inner.len(),
            capacity: inner.cap().get(),
        }
    }
}

impl Default for FragmentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_by_pointer_identity() {
        let cache = FragmentCache::new(4);
        let a = Arc::new(Expression::constant("1"));
        let b = Arc::new(Expression::constant("1"));

        cache.insert(&a, "one".to_string());
        assert_eq!(cache.get(&a).as_deref().map(String::as_str), Some("one"));
        // Structurally equal but a different allocation.
        assert!(cache.get(&b).is_none());
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = FragmentCache::new(2);
        let exprs: Vec<_> = (0..3)
            .map(|i| Arc::new(Expression::constant(i.to_string())))
            .collect();
        cache.insert(&exprs[0], "0".into());
        cache.insert(&exprs[1], "1".into());
        cache.insert(&exprs[2], "2".into());
        assert!(cache.get(&exprs[0]).is_none());
        assert_eq!(cache.stats(), CacheStats { size: 2, capacity: 2 });
    }
}
