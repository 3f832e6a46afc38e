//! # Validation Error Taxonomy
//!
//! A [`ValidationError`] records one failing keyword: what kind of failure it
//! was, where it happened in the data ([`ValidationError::data_path`], a JSON
//! Pointer), where the constraint lives in the schema, a rendered message, a
//! machine-readable parameter map, and an optional suggestion.
//!
//! ## Families
//!
//! [`ErrorKind::family`] splits kinds into two disjoint families:
//!
//! - **Data**: the input violates the schema. This is the expected, per-request
//!   outcome of bad input.
//! - **Configuration**: the schema, a reference or the route table is broken.
//!   Callers should treat these as setup failures. The orchestrator never
//!   swallows them as a branch failure inside `anyOf`/`oneOf`/`not`/`if`.
//!
//! Errors are built once at the failing keyword and then only read.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Which family an error kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorFamily {
    /// The value does not satisfy the schema.
    Data,
    /// The schema, document or route table is malformed.
    Configuration,
}

/// Concrete failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // ---- data ----
    /// `type` did not match.
    TypeMismatch,
    /// Value not among `enum`.
    Enum,
    /// Value differs from `const`.
    Const,
    /// String shorter than `minLength`.
    MinLength,
    /// String longer than `maxLength`.
    MaxLength,
    /// Number below `minimum`.
    Minimum,
    /// Number above `maximum`.
    Maximum,
    /// Number not above the exclusive lower bound.
    ExclusiveMinimum,
    /// Number not below the exclusive upper bound.
    ExclusiveMaximum,
    /// Number not a multiple of `multipleOf`.
    MultipleOf,
    /// A `required` property is missing.
    Required,
    /// A `dependentRequired` property is missing.
    DependentRequired,
    /// String does not match `pattern`.
    PatternMismatch,
    /// Array shorter than `minItems`.
    MinItems,
    /// Array longer than `maxItems`.
    MaxItems,
    /// Array has duplicate elements under `uniqueItems`.
    UniqueItems,
    /// Element rejected by `items` or `prefixItems`.
    ItemsMismatch,
    /// `contains` matched too few or too many elements.
    ContainsMatch,
    /// Object has fewer than `minProperties` keys.
    MinProperties,
    /// Object has more than `maxProperties` keys.
    MaxProperties,
    /// A key not claimed by `properties`/`patternProperties` was rejected.
    AdditionalProperty,
    /// A key failed `propertyNames`.
    PropertyName,
    /// A key left unevaluated was rejected.
    UnevaluatedProperty,
    /// An index left unevaluated was rejected.
    UnevaluatedItem,
    /// Value does not satisfy its `format`.
    InvalidFormat,
    /// No `anyOf` branch passed.
    AnyOf,
    /// Zero or several `oneOf` branches passed.
    OneOf,
    /// The `not` subschema passed.
    Not,
    /// Discriminator property missing or naming no branch.
    Discriminator,

    // ---- configuration ----
    /// A reference cycle that does not consume data.
    CircularReference,
    /// `$ref` is not of the form `#/components/schemas/<Name>`.
    UnsupportedReferenceFormat,
    /// The referenced component schema does not exist.
    SchemaNotFound,
    /// The active registry carries no validator for the keyword.
    UnknownValidatorKeyword,
    /// No declared operation matches a method and path.
    OperationNotFound,
    /// A `pattern` or `patternProperties` key is not a valid regular expression.
    InvalidPattern,
}

impl ErrorKind {
    /// The family this kind belongs to.
    pub fn family(&self) -> ErrorFamily {
        match self {
            Self::CircularReference
            | Self::UnsupportedReferenceFormat
            | Self::SchemaNotFound
            | Self::UnknownValidatorKeyword
            | Self::OperationNotFound
            | Self::InvalidPattern => ErrorFamily::Configuration,
            _ => ErrorFamily::Data,
        }
    }

    /// Whether this kind is a configuration failure.
    pub fn is_configuration(&self) -> bool {
        self.family() == ErrorFamily::Configuration
    }

    /// Stable name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeMismatch => "TypeMismatch",
            Self::Enum => "Enum",
            Self::Const => "Const",
            Self::MinLength => "MinLength",
            Self::MaxLength => "MaxLength",
            Self::Minimum => "Minimum",
            Self::Maximum => "Maximum",
            Self::ExclusiveMinimum => "ExclusiveMinimum",
            Self::ExclusiveMaximum => "ExclusiveMaximum",
            Self::MultipleOf => "MultipleOf",
            Self::Required => "Required",
            Self::DependentRequired => "DependentRequired",
            Self::PatternMismatch => "PatternMismatch",
            Self::MinItems => "MinItems",
            Self::MaxItems => "MaxItems",
            Self::UniqueItems => "UniqueItems",
            Self::ItemsMismatch => "ItemsMismatch",
            Self::ContainsMatch => "ContainsMatch",
            Self::MinProperties => "MinProperties",
            Self::MaxProperties => "MaxProperties",
            Self::AdditionalProperty => "AdditionalProperty",
            Self::PropertyName => "PropertyName",
            Self::UnevaluatedProperty => "UnevaluatedProperty",
            Self::UnevaluatedItem => "UnevaluatedItem",
            Self::InvalidFormat => "InvalidFormat",
            Self::AnyOf => "AnyOf",
            Self::OneOf => "OneOf",
            Self::Not => "Not",
            Self::Discriminator => "Discriminator",
            Self::CircularReference => "CircularReference",
            Self::UnsupportedReferenceFormat => "UnsupportedReferenceFormat",
            Self::SchemaNotFound => "SchemaNotFound",
            Self::UnknownValidatorKeyword => "UnknownValidatorKeyword",
            Self::OperationNotFound => "OperationNotFound",
            Self::InvalidPattern => "InvalidPattern",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Label for a data path in human-facing text. The empty pointer is the root.
pub fn path_label(pointer: &str) -> &str {
    if pointer.is_empty() {
        "(root)"
    } else {
        pointer
    }
}

/// One failing keyword.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{}: {message}", path_label(.data_path))]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    kind: ErrorKind,
    data_path: String,
    schema_path: String,
    keyword: String,
    message: String,
    params: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
}

impl ValidationError {
    /// A located error.
    pub fn new(
        kind: ErrorKind,
        data_path: impl Into<String>,
        schema_path: impl Into<String>,
        keyword: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            data_path: data_path.into(),
            schema_path: schema_path.into(),
            keyword: keyword.into(),
            message: message.into(),
            params: BTreeMap::new(),
            suggestion: None,
        }
    }

    /// A configuration error raised outside any data location.
    pub fn configuration(
        kind: ErrorKind,
        keyword: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(kind, "", "", keyword, message)
    }

    /// Attach one machine-readable parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Attach a remediation hint.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Fill in the location of an error raised without one.
    ///
    /// Paths that are already set are kept.
    pub fn located_at(mut self, data_path: &str, schema_path: &str) -> Self {
        if self.data_path.is_empty() {
            self.data_path = data_path.to_string();
        }
        if self.schema_path.is_empty() {
            self.schema_path = schema_path.to_string();
        }
        self
    }

    /// Failure kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// JSON Pointer into the validated value; empty for the root.
    pub fn data_path(&self) -> &str {
        &self.data_path
    }

    /// Location of the failing keyword in the schema.
    pub fn schema_path(&self) -> &str {
        &self.schema_path
    }

    /// Keyword that failed.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Rendered message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Machine-readable parameters.
    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    /// One parameter.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Optional remediation hint.
    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    /// Whether this is a configuration failure.
    pub fn is_configuration(&self) -> bool {
        self.kind.is_configuration()
    }
}

/// One or more validation errors returned from a top-level call.
///
/// Never empty. Under the fail-fast contract it carries exactly one error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    errors: Vec<ValidationError>,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.first())?;
        if self.errors.len() > 1 {
            write!(f, " (and {} more)", self.errors.len() - 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

impl ValidationFailure {
    /// Errors in the order they were raised.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// The first error.
    pub fn first(&self) -> &ValidationError {
        &self.errors[0]
    }

    /// Consume into the error list.
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    /// Whether any error is a configuration failure.
    pub fn is_configuration(&self) -> bool {
        self.errors.iter().any(ValidationError::is_configuration)
    }
}

impl From<ValidationError> for ValidationFailure {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn families_are_disjoint() {
        assert_eq!(ErrorKind::TypeMismatch.family(), ErrorFamily::Data);
        assert_eq!(ErrorKind::UnevaluatedItem.family(), ErrorFamily::Data);
        assert_eq!(ErrorKind::CircularReference.family(), ErrorFamily::Configuration);
        assert_eq!(ErrorKind::OperationNotFound.family(), ErrorFamily::Configuration);
        assert!(ErrorKind::InvalidPattern.is_configuration());
    }

    #[test]
    fn display_uses_root_label_for_empty_pointer() {
        let err = ValidationError::new(ErrorKind::TypeMismatch, "", "#/type", "type", "expected string");
        assert_eq!(err.to_string(), "(root): expected string");

        let nested = ValidationError::new(ErrorKind::MinLength, "/name", "#/properties/name/minLength", "minLength", "too short");
        assert_eq!(nested.to_string(), "/name: too short");
    }

    #[test]
    fn params_and_suggestion() {
        let err = ValidationError::new(ErrorKind::Enum, "/color", "#/enum", "enum", "not allowed")
            .with_param("allowed", json!(["red", "green"]))
            .with_param("actual", "yellow")
            .with_suggestion("use one of: red, green");
        assert_eq!(err.param("actual"), Some(&json!("yellow")));
        assert_eq!(err.suggestion(), Some("use one of: red, green"));
    }

    #[test]
    fn located_at_only_fills_missing_paths() {
        let err = ValidationError::configuration(ErrorKind::SchemaNotFound, "$ref", "missing")
            .located_at("/owner", "#/properties/owner/$ref");
        assert_eq!(err.data_path(), "/owner");
        assert_eq!(err.schema_path(), "#/properties/owner/$ref");

        let kept = ValidationError::new(ErrorKind::Required, "/a", "#/required", "required", "x")
            .located_at("/b", "#/other");
        assert_eq!(kept.data_path(), "/a");
    }

    #[test]
    fn serializes_camel_case() {
        let err = ValidationError::new(ErrorKind::Required, "", "#/required", "required", "missing id")
            .with_param("property", "id");
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["kind"], "Required");
        assert_eq!(v["dataPath"], "");
        assert_eq!(v["params"]["property"], "id");
        assert!(v.get("suggestion").is_none());
    }

    #[test]
    fn failure_wraps_single_error() {
        let err = ValidationError::configuration(ErrorKind::CircularReference, "$ref", "cycle");
        let failure = ValidationFailure::from(err.clone());
        assert_eq!(failure.errors().len(), 1);
        assert_eq!(failure.first(), &err);
        assert!(failure.is_configuration());
        assert!(failure.to_string().contains("cycle"));
    }
}
