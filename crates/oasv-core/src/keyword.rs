//! # Keyword Identifiers
//!
//! The closed set of validation keywords understood by the engine. Each
//! variant is resolved to a validator once, when a registry is built, so
//! the hot path never matches on keyword strings.
//!
//! `$ref` and `nullable` are not listed: the orchestrator handles them
//! before any keyword runs. `then`/`else` ride on [`Keyword::If`] and
//! `minContains`/`maxContains` ride on [`Keyword::Contains`].

use std::fmt;

use serde::{Serialize, Serializer};

/// A validation keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Keyword {
    /// `type`
    Type,
    /// `const`
    Const,
    /// `enum`
    Enum,
    /// `format`
    Format,
    /// `minLength`
    MinLength,
    /// `maxLength`
    MaxLength,
    /// `pattern`
    Pattern,
    /// `minimum` (exclusive when paired with the boolean `exclusiveMinimum`)
    Minimum,
    /// `maximum` (exclusive when paired with the boolean `exclusiveMaximum`)
    Maximum,
    /// Numeric `exclusiveMinimum`
    ExclusiveMinimum,
    /// Numeric `exclusiveMaximum`
    ExclusiveMaximum,
    /// `multipleOf`
    MultipleOf,
    /// `minItems`
    MinItems,
    /// `maxItems`
    MaxItems,
    /// `uniqueItems`
    UniqueItems,
    /// `prefixItems`
    PrefixItems,
    /// `items`
    Items,
    /// `contains`, with `minContains`/`maxContains`
    Contains,
    /// `minProperties`
    MinProperties,
    /// `maxProperties`
    MaxProperties,
    /// `required`
    Required,
    /// `dependentRequired`
    DependentRequired,
    /// `properties`
    Properties,
    /// `patternProperties`
    PatternProperties,
    /// `propertyNames`
    PropertyNames,
    /// `additionalProperties`
    AdditionalProperties,
    /// `discriminator`
    Discriminator,
    /// `allOf`
    AllOf,
    /// `anyOf`
    AnyOf,
    /// `oneOf`
    OneOf,
    /// `not`
    Not,
    /// `if`, with `then`/`else`
    If,
    /// `dependentSchemas`
    DependentSchemas,
    /// `unevaluatedProperties`
    UnevaluatedProperties,
    /// `unevaluatedItems`
    UnevaluatedItems,
}

/// Number of keyword variants.
pub const KEYWORD_COUNT: usize = 35;

impl Keyword {
    /// Every keyword, in evaluation order.
    ///
    /// Shape keywords for different value kinds never apply to the same
    /// value, so a single global order reproduces the per-kind order.
    pub const EVALUATION_ORDER: [Keyword; KEYWORD_COUNT] = [
        Keyword::Type,
        Keyword::Const,
        Keyword::Enum,
        Keyword::Format,
        Keyword::MinLength,
        Keyword::MaxLength,
        Keyword::Pattern,
        Keyword::Minimum,
        Keyword::Maximum,
        Keyword::ExclusiveMinimum,
        Keyword::ExclusiveMaximum,
        Keyword::MultipleOf,
        Keyword::MinItems,
        Keyword::MaxItems,
        Keyword::UniqueItems,
        Keyword::PrefixItems,
        Keyword::Items,
        Keyword::Contains,
        Keyword::MinProperties,
        Keyword::MaxProperties,
        Keyword::Required,
        Keyword::DependentRequired,
        Keyword::Properties,
        Keyword::PatternProperties,
        Keyword::PropertyNames,
        Keyword::AdditionalProperties,
        Keyword::Discriminator,
        Keyword::AllOf,
        Keyword::AnyOf,
        Keyword::OneOf,
        Keyword::Not,
        Keyword::If,
        Keyword::DependentSchemas,
        Keyword::UnevaluatedProperties,
        Keyword::UnevaluatedItems,
    ];

    /// The keyword as spelled in a schema document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Const => "const",
            Self::Enum => "enum",
            Self::Format => "format",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::Pattern => "pattern",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::ExclusiveMinimum => "exclusiveMinimum",
            Self::ExclusiveMaximum => "exclusiveMaximum",
            Self::MultipleOf => "multipleOf",
            Self::MinItems => "minItems",
            Self::MaxItems => "maxItems",
            Self::UniqueItems => "uniqueItems",
            Self::PrefixItems => "prefixItems",
            Self::Items => "items",
            Self::Contains => "contains",
            Self::MinProperties => "minProperties",
            Self::MaxProperties => "maxProperties",
            Self::Required => "required",
            Self::DependentRequired => "dependentRequired",
            Self::Properties => "properties",
            Self::PatternProperties => "patternProperties",
            Self::PropertyNames => "propertyNames",
            Self::AdditionalProperties => "additionalProperties",
            Self::Discriminator => "discriminator",
            Self::AllOf => "allOf",
            Self::AnyOf => "anyOf",
            Self::OneOf => "oneOf",
            Self::Not => "not",
            Self::If => "if",
            Self::DependentSchemas => "dependentSchemas",
            Self::UnevaluatedProperties => "unevaluatedProperties",
            Self::UnevaluatedItems => "unevaluatedItems",
        }
    }

    /// Look a keyword up by its schema spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::EVALUATION_ORDER
            .iter()
            .copied()
            .find(|k| k.as_str() == name)
    }

    /// Position of this keyword in [`Keyword::EVALUATION_ORDER`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Keyword {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_order_matches_discriminants() {
        for (i, kw) in Keyword::EVALUATION_ORDER.iter().enumerate() {
            assert_eq!(kw.index(), i, "{kw} is out of place");
        }
    }

    #[test]
    fn names_round_trip() {
        for kw in Keyword::EVALUATION_ORDER {
            assert_eq!(Keyword::from_name(kw.as_str()), Some(kw));
        }
        assert_eq!(Keyword::from_name("minLenght"), None);
        assert_eq!(Keyword::from_name("$ref"), None);
    }

    #[test]
    fn composition_runs_after_shape_keywords() {
        assert!(Keyword::AllOf.index() > Keyword::AdditionalProperties.index());
        assert!(Keyword::If.index() > Keyword::Not.index());
        assert!(Keyword::UnevaluatedItems.index() > Keyword::DependentSchemas.index());
    }
}
