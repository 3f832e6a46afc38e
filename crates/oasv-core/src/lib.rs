#![deny(missing_docs)]

//! # oasv-core: Models Shared by the Validation Engine
//!
//! Leaf crate of the workspace. It has no internal crate dependencies and
//! holds the data the engine, router and CLI agree on:
//!
//! - [`SchemaNode`]: the recursive constraint tree, keyword fields grouped by
//!   category.
//! - [`OpenApiDocument`]: the read-only root aggregate with paths, operations
//!   and component schemas.
//! - [`Keyword`]: the closed set of validation keywords.
//! - [`ValidationError`] / [`ValidationFailure`]: the structured error
//!   taxonomy, split into data and configuration families.
//! - [`CanonicalBytes`] and [`structural_hash`]: key-order independent
//!   schema digests used by the compile cache.
//!
//! ## Design Principles
//!
//! 1. **Models are immutable after load.** Reference expansion and coercion
//!    produce new values; nothing edits a document in place.
//!
//! 2. **Declaration order is data.** `properties` and `paths` keep document
//!    order because fail-fast reporting and route tie-breaking depend on it.
//!
//! 3. **Structured errors.** `thiserror` types throughout, no `.unwrap()`
//!    outside tests.

pub mod canonical;
pub mod digest;
pub mod document;
pub mod error;
pub mod keyword;
pub mod ordered;
pub mod schema;
pub mod violation;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, structural_hash, ContentDigest, DigestAlgorithm};
pub use document::{
    Components, HttpMethod, Info, MediaType, OpenApiDocument, OperationObject, Parameter,
    ParameterLocation, PathItem, RequestBody, Response, Server, UnknownMethodError,
};
pub use error::{CanonicalizationError, DocumentError, OasvError, SchemaError};
pub use keyword::Keyword;
pub use ordered::OrderedMap;
pub use schema::{
    BoolOrSchema, Discriminator, ExclusiveBound, PrimitiveType, SchemaNode, TypeSet,
    COMPONENT_SCHEMA_PREFIX,
};
pub use violation::{ErrorFamily, ErrorKind, ValidationError, ValidationFailure};
