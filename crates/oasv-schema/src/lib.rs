#![deny(missing_docs)]

//! # oasv-schema: Schema Validation Engine
//!
//! Validates JSON values against the schemas of an OpenAPI 3.x document.
//!
//! ## Interpreter (`validator`)
//!
//! [`SchemaValidator`] walks a [`SchemaNode`](oasv_core::SchemaNode) keyword
//! by keyword, dispatching each to a [`KeywordValidator`](keywords::KeywordValidator)
//! looked up in a [`KeywordRegistry`]. Validators are stateless singletons
//! held by the [`ValidatorPool`]; registries only decide which keywords are
//! carried. Every call threads an immutable [`ValidationContext`] whose
//! [`Breadcrumb`]s yield the JSON Pointer of each error.
//!
//! Validation is fail-fast: the first violation, in keyword evaluation
//! order and document property order, is the only one reported.
//!
//! ## References (`resolver`)
//!
//! [`ReferenceResolver`] resolves `#/components/schemas/<Name>` refs. The
//! interpreter follows refs lazily and raises `CircularReference` only when
//! a ref re-enters itself without consuming data; expansion for the compiler
//! rejects any cycle.
//!
//! ## Compiler (`compiler`)
//!
//! [`compile`] lowers a schema into a [`Program`](compiler::Program) and
//! emits matching Rust source. [`compile_with_cache`] memoizes units by
//! structural hash.
//!
//! ## Crate Policy
//!
//! - Depends only on `oasv-core` internally.
//! - Configuration failures (bad refs, bad patterns, unknown keywords)
//!   always escape composition keywords; data failures inside `anyOf`,
//!   `oneOf`, `not` and `if` are expected outcomes.

pub mod checks;
pub mod coerce;
pub mod compiler;
pub mod context;
pub mod formats;
pub mod keywords;
pub mod patterns;
pub mod pool;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod validator;

pub use coerce::Coercer;
pub use compiler::{
    compile, compile_with_cache, compile_with_ref_resolution, CompileCache, CompileError,
    CompiledUnit,
};
pub use context::{Breadcrumb, PathSegment, ValidationContext};
pub use formats::{check_builtin, FormatRegistry};
pub use keywords::{Evaluated, KeywordValidator};
pub use patterns::PatternCache;
pub use pool::ValidatorPool;
pub use registry::{KeywordRegistry, LightweightRegistry, StandardRegistry};
pub use report::{
    ConciseFormatter, DetailedFormatter, ErrorFormat, ErrorFormatter, StructuredFormatter,
    UnknownFormatError,
};
pub use resolver::ReferenceResolver;
pub use validator::{NullablePolicy, SchemaValidator, ValidatorOptions, ValidatorProfile};
