//! # Schema Compiler
//!
//! Turns a schema into a [`CompiledUnit`]: a lowered [`Program`] that runs
//! without the keyword registry, plus the equivalent Rust source text.
//!
//! A compiled unit reaches the same verdict as the interpreter (same error
//! kind at the same data path) for every ref-free schema, under the
//! interpreter's default options.
//!
//! ## Caching
//!
//! [`compile_with_cache`] keys units by the schema's structural hash, so two
//! schemas that differ only in keyword or property order share one unit.

mod emit;
mod program;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use oasv_core::{
    structural_hash, CanonicalizationError, ContentDigest, OpenApiDocument, SchemaNode,
    ValidationError, ValidationFailure,
};
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

pub use emit::emit;
pub use program::{Block, BlockId, Pattern, Program, Rule, Selector, Step};

use crate::resolver::ReferenceResolver;

/// Failures while compiling a schema.
#[derive(Error, Debug)]
pub enum CompileError {
    /// The schema still holds a `$ref` and no document was supplied.
    #[error("schema contains unresolved reference \"{reference}\"; compile with ref resolution")]
    UnresolvedReference {
        /// The first ref met.
        reference: String,
    },

    /// A ref could not be resolved.
    #[error("reference resolution failed: {}", .0.message())]
    Resolution(ValidationError),

    /// A keyword flagged present carried no operand.
    #[error("keyword \"{0}\" has no operand")]
    Inconsistent(&'static str),

    /// The schema could not be hashed.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
}

/// A compiled schema.
pub struct CompiledUnit {
    name: String,
    hash: ContentDigest,
    program: Program,
    source: String,
}

impl fmt::Debug for CompiledUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledUnit")
            .field("name", &self.name)
            .field("hash", &self.hash.to_hex())
            .field("blocks", &self.program.blocks().len())
            .field("steps", &self.program.step_count())
            .field("source_len", &self.source.len())
            .finish()
    }
}

impl CompiledUnit {
    fn build(name: &str, hash: ContentDigest, program: Program) -> Self {
        let source = emit(&program, name, &hash.to_hex());
        tracing::debug!(
            name,
            blocks = program.blocks().len(),
            steps = program.step_count(),
            "schema compiled"
        );
        Self {
            name: name.to_string(),
            hash,
            program,
            source,
        }
    }

    /// Name given at compile time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structural hash of the compiled schema.
    pub fn hash(&self) -> &ContentDigest {
        &self.hash
    }

    /// The lowered program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Emitted Rust source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Validate `value`, stopping at the first violation.
    ///
    /// # Errors
    ///
    /// The violation, wrapped in a [`ValidationFailure`].
    pub fn validate(&self, value: &Value) -> Result<(), ValidationFailure> {
        self.program.run(value).map_err(ValidationFailure::from)
    }
}

/// Compile a ref-free schema.
///
/// # Errors
///
/// [`CompileError::UnresolvedReference`] when the schema holds a `$ref`.
pub fn compile(schema: &SchemaNode, name: &str) -> Result<CompiledUnit, CompileError> {
    let hash = structural_hash(schema)?;
    let program = Program::lower(schema, None)?;
    Ok(CompiledUnit::build(name, hash, program))
}

/// Compile a schema whose refs point into `document`.
///
/// Every ref is expanded first, so recursive schemas are rejected with
/// `CircularReference`. Discriminators keep dispatching on the refs their
/// branches were declared with.
///
/// # Errors
///
/// [`CompileError::Resolution`] for unsupported, missing or circular refs.
pub fn compile_with_ref_resolution(
    schema: &SchemaNode,
    name: &str,
    document: &OpenApiDocument,
) -> Result<CompiledUnit, CompileError> {
    let resolver = ReferenceResolver::new(document);
    let expanded = resolver.expand(schema).map_err(CompileError::Resolution)?;
    let hash = structural_hash(&expanded)?;
    let program = Program::lower(schema, Some(resolver))?;
    Ok(CompiledUnit::build(name, hash, program))
}

/// Compile through `cache`, reusing the unit of any structurally equal
/// schema compiled before. A reused unit keeps its original name.
///
/// # Errors
///
/// As [`compile`].
pub fn compile_with_cache(
    schema: &SchemaNode,
    name: &str,
    cache: &CompileCache,
) -> Result<Arc<CompiledUnit>, CompileError> {
    let key = structural_hash(schema)?.to_hex();
    if let Some(unit) = cache.get(&key) {
        tracing::debug!(name, hash = %key, "compile cache hit");
        return Ok(unit);
    }
    tracing::debug!(name, hash = %key, "compile cache miss");
    let unit = Arc::new(compile(schema, name)?);
    Ok(cache.insert(key, unit))
}

/// Compiled units keyed by structural hash.
#[derive(Default)]
pub struct CompileCache {
    units: RwLock<HashMap<String, Arc<CompiledUnit>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl fmt::Debug for CompileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileCache")
            .field("units", &self.len())
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish()
    }
}

impl CompileCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The unit stored under a structural hash (hex).
    pub fn get(&self, hash: &str) -> Option<Arc<CompiledUnit>> {
        let found = self.units.read().get(hash).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Store a unit. If another thread stored one first, that one is kept
    /// and returned.
    pub fn insert(&self, hash: String, unit: Arc<CompiledUnit>) -> Arc<CompiledUnit> {
        self.units.write().entry(hash).or_insert(unit).clone()
    }

    /// Number of cached units.
    pub fn len(&self) -> usize {
        self.units.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.units.read().is_empty()
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookups that found nothing.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Drop every unit.
    pub fn clear(&self) {
        self.units.write().clear();
    }
}
