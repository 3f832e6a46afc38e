//! # Schema Validation Orchestrator
//!
//! [`SchemaValidator`] walks one value against one [`SchemaNode`]:
//!
//! 1. A node with `$ref` defers to the referenced component and stops.
//! 2. `null` succeeds immediately when the node is nullable under the
//!    active [`NullablePolicy`].
//! 3. Every keyword present on the node and carried by the registry runs in
//!    `Keyword::EVALUATION_ORDER`. The first failure is returned.
//!
//! The engine is `Send + Sync` and holds no per-call state; everything a
//! call needs travels in the [`ValidationContext`].

use std::fmt;
use std::sync::Arc;

use oasv_core::{ErrorKind, OpenApiDocument, SchemaNode, ValidationError, ValidationFailure};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coerce::Coercer;
use crate::context::ValidationContext;
use crate::formats::FormatRegistry;
use crate::keywords::Evaluated;
use crate::patterns::PatternCache;
use crate::registry::{KeywordRegistry, LightweightRegistry, StandardRegistry};
use crate::resolver::ReferenceResolver;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How `null` interacts with a schema's declared type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullablePolicy {
    /// OpenAPI 3.0: `nullable: true` admits `null` regardless of `type`.
    #[default]
    Flag,
    /// OpenAPI 3.1: `nullable` is ignored; `null` must be listed in `type`.
    TypeOnly,
}

impl NullablePolicy {
    /// Parse a policy name (`flag`, `type-only`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "flag" | "nullable" => Some(Self::Flag),
            "type-only" | "type_only" | "type" => Some(Self::TypeOnly),
            _ => None,
        }
    }
}

/// Which keyword registry an engine uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidatorProfile {
    /// Every keyword.
    #[default]
    Standard,
    /// `type`, `required`, `properties` and `items` only.
    Lightweight,
}

impl ValidatorProfile {
    /// Parse a profile name (`standard`, `lightweight`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" | "full" => Some(Self::Standard),
            "lightweight" | "light" => Some(Self::Lightweight),
            _ => None,
        }
    }

    /// The registry this profile selects.
    pub fn registry(self) -> Arc<dyn KeywordRegistry> {
        match self {
            Self::Standard => Arc::new(StandardRegistry::new()),
            Self::Lightweight => Arc::new(LightweightRegistry::new()),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidatorOptions {
    /// Convert wire strings toward the declared type before validating.
    pub coerce_types: bool,
    /// Null handling.
    pub nullable_policy: NullablePolicy,
    /// Keyword registry selection.
    pub profile: ValidatorProfile,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The validation engine.
pub struct SchemaValidator {
    options: ValidatorOptions,
    document: Option<Arc<OpenApiDocument>>,
    registry: Arc<dyn KeywordRegistry>,
    formats: FormatRegistry,
    patterns: PatternCache,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("options", &self.options)
            .field("registry", &self.registry.name())
            .field("has_document", &self.document.is_some())
            .field("cached_patterns", &self.patterns.len())
            .finish()
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new(ValidatorOptions::default())
    }
}

impl SchemaValidator {
    /// An engine with the registry selected by `options.profile` and the
    /// built-in formats.
    pub fn new(options: ValidatorOptions) -> Self {
        Self {
            options,
            document: None,
            registry: options.profile.registry(),
            formats: FormatRegistry::with_builtins(),
            patterns: PatternCache::new(),
        }
    }

    /// Resolve `$ref`s against `document`.
    pub fn with_document(mut self, document: impl Into<Arc<OpenApiDocument>>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Replace the keyword registry.
    pub fn with_registry(mut self, registry: Arc<dyn KeywordRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the format registry.
    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    /// Engine options.
    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// The attached document, if any.
    pub fn document(&self) -> Option<&OpenApiDocument> {
        self.document.as_deref()
    }

    /// The keyword registry.
    pub fn registry(&self) -> &dyn KeywordRegistry {
        self.registry.as_ref()
    }

    /// The format registry.
    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// A resolver over the attached document.
    pub fn resolver(&self) -> Option<ReferenceResolver<'_>> {
        self.document().map(ReferenceResolver::new)
    }

    /// A coercer sharing this engine's document and pattern cache.
    pub fn coercer(&self) -> Coercer<'_> {
        Coercer::new(self.resolver()).with_patterns(&self.patterns)
    }

    /// A root context bound to this engine.
    pub fn context(&self) -> ValidationContext<'_> {
        ValidationContext::new(self)
    }

    // -- Entry points -------------------------------------------------------

    /// Validate `value` against `schema`, coercing first when enabled.
    ///
    /// # Errors
    ///
    /// The first violation, wrapped in a [`ValidationFailure`].
    pub fn validate(&self, value: &Value, schema: &SchemaNode) -> Result<(), ValidationFailure> {
        if self.options.coerce_types {
            let coerced = self.coercer().coerce(value, schema);
            return self.validate_in(&coerced, schema, &self.context()).map_err(Into::into);
        }
        self.validate_in(value, schema, &self.context())
            .map_err(Into::into)
    }

    /// Validate a raw wire string (path, query or header parameter).
    ///
    /// The string is always coerced toward the schema's type, since a
    /// parameter has no other way to carry a number or boolean.
    ///
    /// # Errors
    ///
    /// As [`validate`](Self::validate).
    pub fn validate_parameter(&self, raw: &str, schema: &SchemaNode) -> Result<(), ValidationFailure> {
        let value = self.coercer().coerce(&Value::String(raw.to_string()), schema);
        self.validate_in(&value, schema, &self.context())
            .map_err(Into::into)
    }

    /// Validate at an existing location.
    ///
    /// # Errors
    ///
    /// The first violation.
    pub fn validate_in(
        &self,
        value: &Value,
        schema: &SchemaNode,
        ctx: &ValidationContext<'_>,
    ) -> Result<(), ValidationError> {
        self.apply(value, schema, ctx).map(|_| ())
    }

    /// Validate and return the keys and indexes the schema claimed.
    ///
    /// # Errors
    ///
    /// The first violation.
    pub fn apply(
        &self,
        value: &Value,
        schema: &SchemaNode,
        ctx: &ValidationContext<'_>,
    ) -> Result<Evaluated, ValidationError> {
        let mut evaluated = Evaluated::default();
        self.evaluate(value, schema, ctx, &mut evaluated)?;
        Ok(evaluated)
    }

    /// Run one node's keywords, recording claims in `evaluated`.
    ///
    /// # Errors
    ///
    /// The first violation.
    pub fn evaluate(
        &self,
        value: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        if let Some(reference) = &node.reference {
            let trail = ctx.enter_ref(reference)?;
            let target = self.lookup(reference).map_err(|e| {
                e.located_at(&ctx.data_path(), &format!("{}/$ref", ctx.schema_path()))
            })?;
            let target_ctx = ctx.with_ref(&trail);
            evaluated.merge(self.apply(value, target, &target_ctx)?);
            return Ok(());
        }

        if value.is_null() && self.admits_null(node) {
            return Ok(());
        }

        for keyword in node.keywords() {
            let Some(validator) = self.registry.find(keyword) else {
                continue;
            };
            validator.validate(value, node, ctx, evaluated)?;
        }
        Ok(())
    }

    fn lookup(&self, reference: &str) -> Result<&SchemaNode, ValidationError> {
        match self.resolver() {
            Some(resolver) => resolver.lookup(reference),
            None => {
                ReferenceResolver::component_name(reference)?;
                Err(ValidationError::configuration(
                    ErrorKind::SchemaNotFound,
                    "$ref",
                    format!("cannot resolve \"{reference}\": no document attached"),
                )
                .with_param("reference", reference))
            }
        }
    }

    fn admits_null(&self, node: &SchemaNode) -> bool {
        match self.options.nullable_policy {
            NullablePolicy::Flag => node.types.nullable,
            NullablePolicy::TypeOnly => false,
        }
    }

    /// The compiled regex for `pattern`, cached for the engine's lifetime.
    ///
    /// # Errors
    ///
    /// The compile error. Failures are not cached.
    pub fn regex(&self, pattern: &str) -> Result<Arc<Regex>, regex::Error> {
        self.patterns.get(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(value: Value) -> SchemaNode {
        SchemaNode::from_value(&value).unwrap()
    }

    fn first_error(engine: &SchemaValidator, data: Value, s: &SchemaNode) -> ValidationError {
        engine.validate(&data, s).unwrap_err().first().clone()
    }

    #[test]
    fn test_fail_fast_reports_first_declared_property() {
        let engine = SchemaValidator::default();
        let s = schema(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": 3},
                "email": {"type": "string", "format": "email"},
                "age": {"type": "integer", "minimum": 18}
            }
        }));
        let failure = engine
            .validate(&json!({"name": "ab", "email": "invalid", "age": 15}), &s)
            .unwrap_err();
        assert_eq!(failure.errors().len(), 1);
        let err = failure.first();
        assert_eq!(err.kind(), ErrorKind::MinLength);
        assert_eq!(err.data_path(), "/name");
        assert_eq!(err.schema_path(), "#/properties/name/minLength");
    }

    #[test]
    fn test_enum_params() {
        let engine = SchemaValidator::default();
        let s = schema(json!({"type": "string", "enum": ["red", "green", "blue"]}));
        let err = first_error(&engine, json!("yellow"), &s);
        assert_eq!(err.kind(), ErrorKind::Enum);
        assert_eq!(err.param("allowed").unwrap(), &json!(["red", "green", "blue"]));
        assert_eq!(err.param("actual").unwrap(), &json!("yellow"));
    }

    #[test]
    fn test_nested_breadcrumb() {
        let engine = SchemaValidator::default();
        let s = schema(json!({
            "type": "object",
            "properties": {"level1": {"type": "object", "properties": {
                "level2": {"type": "object", "properties": {
                    "value": {"type": "integer"}
                }}
            }}}
        }));
        let err = first_error(&engine, json!({"level1": {"level2": {"value": "x"}}}), &s);
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.data_path(), "/level1/level2/value");
    }

    #[test]
    fn test_nullable_policy() {
        let s = schema(json!({"type": "string", "nullable": true}));
        assert!(SchemaValidator::default().validate(&Value::Null, &s).is_ok());

        let strict = SchemaValidator::new(ValidatorOptions {
            nullable_policy: NullablePolicy::TypeOnly,
            ..ValidatorOptions::default()
        });
        let err = first_error(&strict, Value::Null, &s);
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);

        let union = schema(json!({"type": ["string", "null"]}));
        assert!(strict.validate(&Value::Null, &union).is_ok());
    }

    #[test]
    fn test_coercion_toggle() {
        let s = schema(json!({"type": "integer", "minimum": 1}));
        let plain = SchemaValidator::default();
        assert_eq!(
            first_error(&plain, json!("666"), &s).kind(),
            ErrorKind::TypeMismatch
        );
        let coercing = SchemaValidator::new(ValidatorOptions {
            coerce_types: true,
            ..ValidatorOptions::default()
        });
        assert!(coercing.validate(&json!("666"), &s).is_ok());
        assert!(plain.validate_parameter("666", &s).is_ok());
        assert_eq!(
            plain.validate_parameter("0", &s).unwrap_err().first().kind(),
            ErrorKind::Minimum
        );
    }

    #[test]
    fn test_lightweight_profile_skips_shape_keywords() {
        let engine = SchemaValidator::new(ValidatorOptions {
            profile: ValidatorProfile::Lightweight,
            ..ValidatorOptions::default()
        });
        let s = schema(json!({
            "type": "object",
            "required": ["id"],
            "properties": {"id": {"type": "string", "minLength": 10}}
        }));
        assert!(engine.validate(&json!({"id": "short"}), &s).is_ok());
        assert_eq!(
            first_error(&engine, json!({}), &s).kind(),
            ErrorKind::Required
        );
        assert_eq!(
            first_error(&engine, json!({"id": 1}), &s).kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_ref_without_document() {
        let engine = SchemaValidator::default();
        let s = SchemaNode::reference("#/components/schemas/User");
        let err = first_error(&engine, json!({}), &s);
        assert_eq!(err.kind(), ErrorKind::SchemaNotFound);
        assert_eq!(err.schema_path(), "#/$ref");

        let remote = SchemaNode::reference("https://example.com/user.json");
        let err = first_error(&engine, json!({}), &remote);
        assert_eq!(err.kind(), ErrorKind::UnsupportedReferenceFormat);
    }

    #[test]
    fn test_regex_cache_reuses_compiled_pattern() {
        let engine = SchemaValidator::default();
        let a = engine.regex("^[a-z]+$").unwrap();
        let b = engine.regex("^[a-z]+$").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(engine.regex("(unclosed").is_err());
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let engine = SchemaValidator::default();
        let s = schema(json!({"anyOf": [{"type": "string", "pattern": "(unclosed"}, {"type": "string"}]}));
        let err = first_error(&engine, json!("abc"), &s);
        assert_eq!(err.kind(), ErrorKind::InvalidPattern);
        assert!(err.is_configuration());
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaValidator>();
    }
}
