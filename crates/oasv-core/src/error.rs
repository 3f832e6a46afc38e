//! # Error Hierarchy
//!
//! Structured errors for building the schema and document models, built with
//! `thiserror`. Validation outcomes have their own taxonomy in
//! [`crate::violation`]; the types here describe a document that could not be
//! turned into a model at all.

use thiserror::Error;

/// Top-level error type for model construction.
#[derive(Error, Debug)]
pub enum OasvError {
    /// A schema object was malformed.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The OpenAPI document could not be decoded.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Canonical serialization for hashing failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// A schema object carries a keyword value of the wrong shape.
///
/// `path` is a JSON Pointer fragment into the schema (`#/properties/age`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// The value where a schema was expected is neither an object nor a boolean.
    #[error("{path}: expected a schema object or boolean, found {found}")]
    NotASchema {
        /// Location of the offending value.
        path: String,
        /// JSON type that was found instead.
        found: &'static str,
    },

    /// A keyword value has the wrong JSON type or range.
    #[error("{path}: invalid value for `{keyword}`: expected {expected}")]
    InvalidKeyword {
        /// Location of the offending keyword.
        path: String,
        /// Keyword name as spelled in the schema.
        keyword: String,
        /// Description of what the keyword requires.
        expected: &'static str,
    },

    /// `type` names something other than the seven primitive types.
    #[error("{path}: unknown type name \"{name}\"")]
    UnknownType {
        /// Location of the `type` keyword.
        path: String,
        /// The unrecognised type name.
        name: String,
    },
}

/// The OpenAPI document could not be decoded into the document model.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// JSON decoding failed.
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML decoding failed.
    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
