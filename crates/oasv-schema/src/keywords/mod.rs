//! # Keyword Validators
//!
//! One stateless [`KeywordValidator`] per [`Keyword`] variant. Validators are
//! constructed once by the [`ValidatorPool`](crate::pool::ValidatorPool) and
//! shared by every registry and every call.
//!
//! A validator is only invoked when its keyword is present on the node. It
//! decides for itself whether the keyword applies to the value's kind
//! (`minLength` ignores numbers, `properties` ignores arrays) and returns the
//! first violation it finds.
//!
//! ## Evaluation bookkeeping
//!
//! Applicators record which object keys and array indexes they validated in
//! an [`Evaluated`] set. `unevaluatedProperties` and `unevaluatedItems` run
//! last and only look at what nobody claimed.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use oasv_core::{Keyword, SchemaNode, ValidationError};
use serde_json::Value;

use crate::context::ValidationContext;

pub mod array;
pub mod composition;
pub mod numeric;
pub mod object;
pub mod string;
pub mod unevaluated;
pub mod value;

/// A stateless validator for one keyword.
pub trait KeywordValidator: Send + Sync + fmt::Debug {
    /// The keyword this validator implements.
    fn keyword(&self) -> Keyword;

    /// Check `instance` against the keyword as declared on `node`.
    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError>;
}

/// Object keys and array indexes claimed while validating one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluated {
    properties: HashSet<String>,
    items: BTreeSet<usize>,
    all_items: bool,
}

impl Evaluated {
    /// Claim an object key.
    pub fn mark_property(&mut self, name: &str) {
        if !self.properties.contains(name) {
            self.properties.insert(name.to_string());
        }
    }

    /// Claim an array index.
    pub fn mark_item(&mut self, index: usize) {
        self.items.insert(index);
    }

    /// Claim every array index.
    pub fn mark_all_items(&mut self) {
        self.all_items = true;
    }

    /// Whether `name` was claimed.
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains(name)
    }

    /// Whether `index` was claimed.
    pub fn has_item(&self, index: usize) -> bool {
        self.all_items || self.items.contains(&index)
    }

    /// Absorb the claims of a passing in-place subschema.
    pub fn merge(&mut self, other: Evaluated) {
        self.properties.extend(other.properties);
        self.items.extend(other.items);
        self.all_items |= other.all_items;
    }
}

/// A validator for every keyword, in evaluation order.
pub fn standard_validators() -> Vec<Box<dyn KeywordValidator>> {
    vec![
        Box::new(value::TypeValidator),
        Box::new(value::ConstValidator),
        Box::new(value::EnumValidator),
        Box::new(value::FormatValidator),
        Box::new(string::MinLengthValidator),
        Box::new(string::MaxLengthValidator),
        Box::new(string::PatternValidator),
        Box::new(numeric::MinimumValidator),
        Box::new(numeric::MaximumValidator),
        Box::new(numeric::ExclusiveMinimumValidator),
        Box::new(numeric::ExclusiveMaximumValidator),
        Box::new(numeric::MultipleOfValidator),
        Box::new(array::MinItemsValidator),
        Box::new(array::MaxItemsValidator),
        Box::new(array::UniqueItemsValidator),
        Box::new(array::PrefixItemsValidator),
        Box::new(array::ItemsValidator),
        Box::new(array::ContainsValidator),
        Box::new(object::MinPropertiesValidator),
        Box::new(object::MaxPropertiesValidator),
        Box::new(object::RequiredValidator),
        Box::new(object::DependentRequiredValidator),
        Box::new(object::PropertiesValidator),
        Box::new(object::PatternPropertiesValidator),
        Box::new(object::PropertyNamesValidator),
        Box::new(object::AdditionalPropertiesValidator),
        Box::new(composition::DiscriminatorValidator),
        Box::new(composition::AllOfValidator),
        Box::new(composition::AnyOfValidator),
        Box::new(composition::OneOfValidator),
        Box::new(composition::NotValidator),
        Box::new(composition::IfValidator),
        Box::new(composition::DependentSchemasValidator),
        Box::new(unevaluated::UnevaluatedPropertiesValidator),
        Box::new(unevaluated::UnevaluatedItemsValidator),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_validator_per_keyword_in_order() {
        let validators = standard_validators();
        let keywords: Vec<Keyword> = validators.iter().map(|v| v.keyword()).collect();
        assert_eq!(keywords, Keyword::EVALUATION_ORDER.to_vec());
    }

    #[test]
    fn evaluated_merge() {
        let mut outer = Evaluated::default();
        outer.mark_property("a");
        let mut inner = Evaluated::default();
        inner.mark_property("b");
        inner.mark_item(2);
        outer.merge(inner);
        assert!(outer.has_property("a"));
        assert!(outer.has_property("b"));
        assert!(outer.has_item(2));
        assert!(!outer.has_item(0));
        outer.mark_all_items();
        assert!(outer.has_item(0));
    }
}
