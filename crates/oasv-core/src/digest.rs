//! # Structural Digests
//!
//! [`ContentDigest`] identifies a schema by content. It can only be computed
//! from [`CanonicalBytes`], so every digest was produced from key-sorted data
//! and two structurally equal schemas always share one.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::CanonicalizationError;
use crate::schema::SchemaNode;

/// The hash algorithm used to compute a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

/// A digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a digest from raw bytes and algorithm.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Compute a SHA-256 digest from canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}

/// Structural hash of a schema node.
///
/// Keyword order inside the schema does not affect the result, and neither
/// do annotations (`title`, `description`, `default`, `example(s)`,
/// `readOnly`, `writeOnly`, `deprecated`) at any depth.
pub fn structural_hash(node: &SchemaNode) -> Result<ContentDigest, CanonicalizationError> {
    let canonical = CanonicalBytes::new(&node.without_annotations().to_value())?;
    Ok(sha256_digest(&canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(v: serde_json::Value) -> SchemaNode {
        SchemaNode::from_value(&v).unwrap()
    }

    #[test]
    fn test_known_sha256_vector() {
        let cb = CanonicalBytes::new(&json!({})).unwrap();
        assert_eq!(
            sha256_digest(&cb).to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn test_display_carries_algorithm() {
        let cb = CanonicalBytes::new(&json!({"a": 1})).unwrap();
        let s = sha256_digest(&cb).to_string();
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), 7 + 64);
    }

    #[test]
    fn test_structural_hash_ignores_keyword_order() {
        let a = node(json!({"type": "string", "minLength": 2, "maxLength": 5}));
        let b = node(json!({"maxLength": 5, "type": "string", "minLength": 2}));
        assert_eq!(structural_hash(&a).unwrap(), structural_hash(&b).unwrap());
    }

    #[test]
    fn test_structural_hash_ignores_annotations() {
        let plain = node(json!({
            "type": "object",
            "properties": {"title": {"type": "string"}}
        }));
        let documented = node(json!({
            "type": "object",
            "title": "Book",
            "description": "A catalogue entry",
            "example": {"title": "Dune"},
            "properties": {"title": {"type": "string", "description": "Display title", "readOnly": true}}
        }));
        assert_eq!(structural_hash(&plain).unwrap(), structural_hash(&documented).unwrap());

        // A property named like an annotation still counts.
        let renamed = node(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}}
        }));
        assert_ne!(structural_hash(&plain).unwrap(), structural_hash(&renamed).unwrap());
    }

    #[test]
    fn test_structural_hash_distinguishes_constraints() {
        let a = node(json!({"type": "string", "minLength": 2}));
        let b = node(json!({"type": "string", "minLength": 3}));
        assert_ne!(structural_hash(&a).unwrap(), structural_hash(&b).unwrap());
    }
}
