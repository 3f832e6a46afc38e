//! # Canonical Serialization
//!
//! [`CanonicalBytes`] is the only input accepted by the structural digest in
//! [`crate::digest`]. Two schemas that differ only in key order produce the
//! same canonical bytes, so compile caches can key on their hash.
//!
//! ## Rules
//!
//! 1. Object keys are sorted lexicographically at every depth.
//! 2. Separators are compact (no whitespace).
//! 3. Numbers, strings, booleans and null pass through unchanged. Floats are
//!    kept: schemas legitimately carry `multipleOf: 0.01`.
//!
//! The workspace enables `serde_json/preserve_order`, so sorting cannot be
//! left to `serde_json::Map`; the object is rebuilt in sorted order.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CanonicalizationError;

/// Bytes produced by key-sorted compact serialization.
///
/// The inner `Vec<u8>` is private; construct through [`CanonicalBytes::new()`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let sorted = sort_keys(value);
        Ok(Self(serde_json::to_vec(&sorted)?))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::with_capacity(entries.len());
            for (k, v) in entries {
                sorted.insert(k, sort_keys(v));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
