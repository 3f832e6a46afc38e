//! # Keyword Registry
//!
//! A [`KeywordRegistry`] decides which keywords an engine enforces. The
//! orchestrator asks the registry for each keyword present on a node and
//! silently skips keywords the registry does not carry, so a reduced
//! registry is a cheaper, looser validator rather than an error source.
//!
//! Name lookups go through [`Keyword::from_name`] once; dispatch inside the
//! hot loop is by enum index.

use std::fmt;
use std::sync::Arc;

use oasv_core::{ErrorKind, Keyword, ValidationError};

use crate::keywords::KeywordValidator;
use crate::pool::ValidatorPool;

/// Maps keywords to validators.
pub trait KeywordRegistry: Send + Sync + fmt::Debug {
    /// Registry name, for diagnostics.
    fn name(&self) -> &'static str;

    /// The validator for `keyword`, if this registry carries it.
    fn find(&self, keyword: Keyword) -> Option<Arc<dyn KeywordValidator>>;

    /// Every keyword this registry carries, in evaluation order.
    fn all(&self) -> Vec<Keyword>;

    /// The validator for `keyword`.
    ///
    /// # Errors
    ///
    /// `UnknownValidatorKeyword` when the registry does not carry it.
    fn get(&self, keyword: Keyword) -> Result<Arc<dyn KeywordValidator>, ValidationError> {
        self.find(keyword).ok_or_else(|| {
            ValidationError::configuration(
                ErrorKind::UnknownValidatorKeyword,
                keyword.as_str(),
                format!(
                    "no validator for keyword \"{keyword}\" in the {} registry",
                    self.name()
                ),
            )
            .with_param("keyword", keyword.as_str())
            .with_param("registry", self.name())
        })
    }

    /// The validator for a keyword spelled `name`.
    ///
    /// # Errors
    ///
    /// `UnknownValidatorKeyword` when `name` is not a keyword or the
    /// registry does not carry it.
    fn get_by_name(&self, name: &str) -> Result<Arc<dyn KeywordValidator>, ValidationError> {
        match Keyword::from_name(name) {
            Some(keyword) => self.get(keyword),
            None => Err(ValidationError::configuration(
                ErrorKind::UnknownValidatorKeyword,
                name,
                format!("\"{name}\" is not a validation keyword"),
            )
            .with_param("keyword", name)
            .with_param("registry", self.name())),
        }
    }

    /// Whether this registry carries `keyword`.
    fn carries(&self, keyword: Keyword) -> bool {
        self.find(keyword).is_some()
    }
}

/// Every keyword.
#[derive(Debug, Clone)]
pub struct StandardRegistry {
    pool: ValidatorPool,
}

impl StandardRegistry {
    /// A registry over the shared pool.
    pub fn new() -> Self {
        Self {
            pool: ValidatorPool::shared().clone(),
        }
    }
}

impl Default for StandardRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordRegistry for StandardRegistry {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn find(&self, keyword: Keyword) -> Option<Arc<dyn KeywordValidator>> {
        self.pool.get(keyword)
    }

    fn all(&self) -> Vec<Keyword> {
        Keyword::EVALUATION_ORDER.to_vec()
    }
}

/// Structural checks only: `type`, `required`, `properties`, `items`.
#[derive(Debug, Clone)]
pub struct LightweightRegistry {
    pool: ValidatorPool,
}

impl LightweightRegistry {
    /// Keywords carried by this registry.
    pub const KEYWORDS: [Keyword; 4] = [
        Keyword::Type,
        Keyword::Items,
        Keyword::Required,
        Keyword::Properties,
    ];

    /// A registry over the shared pool.
    pub fn new() -> Self {
        Self {
            pool: ValidatorPool::shared().clone(),
        }
    }
}

impl Default for LightweightRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KeywordRegistry for LightweightRegistry {
    fn name(&self) -> &'static str {
        "lightweight"
    }

    fn find(&self, keyword: Keyword) -> Option<Arc<dyn KeywordValidator>> {
        if Self::KEYWORDS.contains(&keyword) {
            self.pool.get(keyword)
        } else {
            None
        }
    }

    fn all(&self) -> Vec<Keyword> {
        Self::KEYWORDS.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_carries_everything() {
        let registry = StandardRegistry::new();
        assert_eq!(registry.all().len(), Keyword::EVALUATION_ORDER.len());
        for kw in Keyword::EVALUATION_ORDER {
            assert!(registry.carries(kw), "{kw}");
        }
    }

    #[test]
    fn lightweight_rejects_shape_keywords() {
        let registry = LightweightRegistry::new();
        assert!(registry.get(Keyword::Type).is_ok());
        let err = registry.get(Keyword::MinLength).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownValidatorKeyword);
        assert_eq!(err.param("registry").unwrap(), "lightweight");
    }

    #[test]
    fn lookup_by_name() {
        let registry = StandardRegistry::new();
        let v = registry.get_by_name("uniqueItems").unwrap();
        assert_eq!(v.keyword(), Keyword::UniqueItems);

        let err = registry.get_by_name("x-vendor").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownValidatorKeyword);
        assert!(err.is_configuration());
    }

    #[test]
    fn lightweight_keywords_are_in_evaluation_order() {
        let order: Vec<usize> = LightweightRegistry::KEYWORDS
            .iter()
            .map(|k| k.index())
            .collect();
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(order, sorted);
    }
}
