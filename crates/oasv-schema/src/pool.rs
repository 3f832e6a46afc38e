//! # Validator Pool
//!
//! Keyword validators are stateless, so one instance of each serves every
//! registry and every validation call. The pool constructs them once and
//! hands out shared handles indexed by [`Keyword::index`].
//!
//! The pool never caches validation results.

use std::sync::{Arc, OnceLock};

use oasv_core::keyword::KEYWORD_COUNT;
use oasv_core::Keyword;

use crate::keywords::{standard_validators, KeywordValidator};

/// One constructed validator per keyword.
#[derive(Debug, Clone)]
pub struct ValidatorPool {
    validators: Vec<Arc<dyn KeywordValidator>>,
}

impl ValidatorPool {
    /// Construct every standard validator.
    pub fn new() -> Self {
        let mut validators: Vec<Arc<dyn KeywordValidator>> = Vec::with_capacity(KEYWORD_COUNT);
        let mut built = standard_validators();
        built.sort_by_key(|v| v.keyword().index());
        validators.extend(built.into_iter().map(Arc::from));
        Self { validators }
    }

    /// The process-wide pool, built on first use.
    pub fn shared() -> &'static ValidatorPool {
        static POOL: OnceLock<ValidatorPool> = OnceLock::new();
        POOL.get_or_init(ValidatorPool::new)
    }

    /// The validator for `keyword`.
    pub fn get(&self, keyword: Keyword) -> Option<Arc<dyn KeywordValidator>> {
        self.validators
            .get(keyword.index())
            .filter(|v| v.keyword() == keyword)
            .cloned()
    }

    /// Number of validators held.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl Default for ValidatorPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_holds_every_keyword() {
        let pool = ValidatorPool::new();
        assert_eq!(pool.len(), KEYWORD_COUNT);
        for kw in Keyword::EVALUATION_ORDER {
            let v = pool.get(kw).expect("validator present");
            assert_eq!(v.keyword(), kw);
        }
    }

    #[test]
    fn shared_pool_is_a_singleton() {
        let a = ValidatorPool::shared() as *const ValidatorPool;
        let b = ValidatorPool::shared() as *const ValidatorPool;
        assert_eq!(a, b);
    }

    #[test]
    fn handles_are_shared_not_rebuilt() {
        let pool = ValidatorPool::shared();
        let first = pool.get(Keyword::Type).expect("type");
        let second = pool.get(Keyword::Type).expect("type");
        assert!(Arc::ptr_eq(&first, &second));
    }
}
