//! # Pattern Cache
//!
//! Compiled `pattern` and `patternProperties` expressions keyed by source
//! text. Each engine owns one; coercion without an engine falls back to the
//! process-wide cache.
//!
//! Compile failures are not cached, so a bad pattern is reported on every
//! use.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use regex::Regex;

/// Compiled regexes by source text.
#[derive(Default)]
pub struct PatternCache {
    compiled: RwLock<HashMap<String, Arc<Regex>>>,
}

impl fmt::Debug for PatternCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternCache")
            .field("patterns", &self.len())
            .finish()
    }
}

impl PatternCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache, built on first use.
    pub fn shared() -> &'static PatternCache {
        static CACHE: OnceLock<PatternCache> = OnceLock::new();
        CACHE.get_or_init(PatternCache::new)
    }

    /// The compiled regex for `pattern`.
    ///
    /// # Errors
    ///
    /// The compile error.
    pub fn get(&self, pattern: &str) -> Result<Arc<Regex>, regex::Error> {
        if let Some(re) = self.compiled.read().get(pattern) {
            return Ok(Arc::clone(re));
        }
        let compiled = Regex::new(pattern).map_err(|e| {
            tracing::warn!(pattern, error = %e, "schema pattern does not compile");
            e
        })?;
        let compiled = Arc::new(compiled);
        Ok(Arc::clone(
            self.compiled
                .write()
                .entry(pattern.to_string())
                .or_insert(compiled),
        ))
    }

    /// Number of compiled patterns held.
    pub fn len(&self) -> usize {
        self.compiled.read().len()
    }

    /// Whether nothing has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.compiled.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_compiled_pattern() {
        let cache = PatternCache::new();
        let a = cache.get("^[a-z]+$").unwrap();
        let b = cache.get("^[a-z]+$").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failures_are_not_stored() {
        let cache = PatternCache::new();
        assert!(cache.get("(unclosed").is_err());
        assert!(cache.get("(unclosed").is_err());
        assert!(cache.is_empty());
    }
}
