//! # Type Coercion
//!
//! Opt-in, best-effort conversion of loosely typed wire values toward a
//! schema's declared type before validation:
//!
//! - numeric strings become integers or numbers;
//! - `true/false/1/0/yes/no/on/off` (any case) become booleans;
//! - objects and arrays are rebuilt with each member coerced against its own
//!   subschema (`properties`, `patternProperties`, `additionalProperties`,
//!   `prefixItems`, `items`).
//!
//! A composed schema is read through its `allOf`, `anyOf` and `oneOf`
//! branches and their `$ref`s, in declaration order: the first branch that
//! declares a `type` drives scalar conversion, and the first branch that
//! declares a member supplies its subschema.
//!
//! Coercion never fails. A value that cannot be converted is passed through
//! unchanged and the `type` keyword rejects it afterwards.

use oasv_core::{BoolOrSchema, PrimitiveType, SchemaNode};
use serde_json::{Map, Number, Value};

use crate::patterns::PatternCache;
use crate::resolver::ReferenceResolver;

/// Converts values toward their schema's declared types.
#[derive(Debug, Clone, Copy)]
pub struct Coercer<'d> {
    resolver: Option<ReferenceResolver<'d>>,
    patterns: &'d PatternCache,
}

impl Default for Coercer<'_> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<'d> Coercer<'d> {
    /// A coercer that follows `$ref`s through `resolver` when given one.
    /// Patterns compile through [`PatternCache::shared`].
    pub fn new(resolver: Option<ReferenceResolver<'d>>) -> Self {
        Self {
            resolver,
            patterns: PatternCache::shared(),
        }
    }

    /// Compile `patternProperties` through `patterns` instead.
    pub fn with_patterns(mut self, patterns: &'d PatternCache) -> Self {
        self.patterns = patterns;
        self
    }

    /// A coerced copy of `value`.
    pub fn coerce(&self, value: &Value, schema: &SchemaNode) -> Value {
        let mut shapes = Vec::new();
        self.shapes(schema, &mut Vec::new(), &mut shapes);
        match value {
            Value::String(s) => shapes
                .iter()
                .find(|node| node.types.types.is_some())
                .and_then(|node| coerce_scalar(s, node))
                .unwrap_or_else(|| value.clone()),
            Value::Object(map) => Value::Object(self.coerce_object(map, &shapes)),
            Value::Array(items) => Value::Array(self.coerce_array(items, &shapes)),
            _ => value.clone(),
        }
    }

    /// Collect `schema` and its composition branches with refs followed.
    ///
    /// `refs` holds the refs followed since the last step into the data, so
    /// a ref loop at one location stops instead of recursing.
    fn shapes<'s>(
        &self,
        schema: &'s SchemaNode,
        refs: &mut Vec<String>,
        out: &mut Vec<&'s SchemaNode>,
    ) where
        'd: 's,
    {
        if let Some(reference) = schema.reference.as_deref() {
            if let Some(target) = self.follow(reference, refs) {
                refs.push(reference.to_string());
                self.shapes(target, refs, out);
                refs.pop();
            }
            return;
        }
        out.push(schema);
        let composition = &schema.composition;
        for branch in composition
            .all_of
            .iter()
            .chain(&composition.any_of)
            .chain(&composition.one_of)
        {
            self.shapes(branch, refs, out);
        }
    }

    fn follow(&self, reference: &str, refs: &[String]) -> Option<&'d SchemaNode> {
        if refs.iter().any(|r| r == reference) {
            return None;
        }
        self.resolver?.lookup(reference).ok()
    }

    fn coerce_object(&self, map: &Map<String, Value>, shapes: &[&SchemaNode]) -> Map<String, Value> {
        map.iter()
            .map(|(key, member)| {
                let coerced = match self.member_schema(shapes, key) {
                    Some(child) => self.coerce(member, child),
                    None => member.clone(),
                };
                (key.clone(), coerced)
            })
            .collect()
    }

    fn member_schema<'s>(&self, shapes: &[&'s SchemaNode], key: &str) -> Option<&'s SchemaNode> {
        if let Some(node) = shapes.iter().copied().find_map(|s| s.object.property(key)) {
            return Some(node);
        }
        let by_pattern = shapes.iter().copied().find_map(|s| {
            s.object
                .pattern_properties
                .iter()
                .find(|(pattern, _)| self.patterns.get(pattern).is_ok_and(|re| re.is_match(key)))
                .map(|(_, node)| node)
        });
        if by_pattern.is_some() {
            return by_pattern;
        }
        shapes
            .iter()
            .copied()
            .find_map(|s| match &s.object.additional_properties {
                Some(BoolOrSchema::Schema(node)) => Some(node.as_ref()),
                _ => None,
            })
    }

    fn coerce_array(&self, items: &[Value], shapes: &[&SchemaNode]) -> Vec<Value> {
        let shape = shapes
            .iter()
            .copied()
            .find(|s| !s.array.prefix_items.is_empty() || s.array.items.is_some());
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let child = shape.and_then(|s| s.array.prefix_items.get(i).or(s.array.items.as_deref()));
                match child {
                    Some(child) => self.coerce(item, child),
                    None => item.clone(),
                }
            })
            .collect()
    }
}

/// Convert a wire string toward the first declared type it can become.
///
/// Returns `None` when the schema already accepts strings, declares no type,
/// or no conversion applies.
fn coerce_scalar(raw: &str, schema: &SchemaNode) -> Option<Value> {
    let types = schema.types.types.as_ref()?;
    if types.contains(PrimitiveType::String) {
        return None;
    }
    types.members().iter().find_map(|ty| match ty {
        PrimitiveType::Integer => parse_integer(raw),
        PrimitiveType::Number => parse_number(raw),
        PrimitiveType::Boolean => parse_boolean(raw).map(Value::Bool),
        PrimitiveType::Null => (raw.is_empty() || raw.eq_ignore_ascii_case("null")).then_some(Value::Null),
        _ => None,
    })
}

fn parse_integer(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Some(Value::Number(n.into()));
    }
    // "10.0" is an integer by value.
    let f = raw.parse::<f64>().ok().filter(|f| f.is_finite() && f.fract() == 0.0)?;
    if f.abs() < 9.007_199_254_740_992e15 {
        return Some(Value::Number((f as i64).into()));
    }
    Number::from_f64(f).map(Value::Number)
}

fn parse_number(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    let f = raw.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Number::from_f64(f).map(Value::Number)
}

fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oasv_core::OpenApiDocument;
    use serde_json::json;

    fn schema(value: Value) -> SchemaNode {
        SchemaNode::from_value(&value).unwrap()
    }

    fn coerce(value: Value, s: Value) -> Value {
        Coercer::default().coerce(&value, &schema(s))
    }

    #[test]
    fn numeric_strings() {
        assert_eq!(coerce(json!("666"), json!({"type": "integer"})), json!(666));
        assert_eq!(coerce(json!("-3"), json!({"type": "integer"})), json!(-3));
        assert_eq!(coerce(json!("10.0"), json!({"type": "integer"})), json!(10));
        assert_eq!(coerce(json!("1.5"), json!({"type": "number"})), json!(1.5));
        assert_eq!(coerce(json!("1.5"), json!({"type": "integer"})), json!("1.5"));
        assert_eq!(coerce(json!("abc"), json!({"type": "number"})), json!("abc"));
    }

    #[test]
    fn boolean_tokens() {
        for (raw, expected) in [
            ("true", true),
            ("FALSE", false),
            ("1", true),
            ("0", false),
            ("Yes", true),
            ("no", false),
            ("ON", true),
            ("off", false),
        ] {
            assert_eq!(coerce(json!(raw), json!({"type": "boolean"})), json!(expected), "{raw}");
        }
        assert_eq!(coerce(json!("maybe"), json!({"type": "boolean"})), json!("maybe"));
    }

    #[test]
    fn strings_stay_strings_when_allowed() {
        assert_eq!(
            coerce(json!("42"), json!({"type": ["string", "integer"]})),
            json!("42")
        );
        assert_eq!(coerce(json!("42"), json!({})), json!("42"));
    }

    #[test]
    fn recurses_through_members() {
        let s = json!({
            "type": "object",
            "properties": {
                "page": {"type": "integer"},
                "tags": {"type": "array", "items": {"type": "boolean"}}
            },
            "patternProperties": {"^x-": {"type": "number"}},
            "additionalProperties": {"type": "integer"}
        });
        let out = coerce(
            json!({"page": "2", "tags": ["yes", "off"], "x-rate": "0.5", "limit": "10", "q": "text"}),
            s,
        );
        assert_eq!(
            out,
            json!({"page": 2, "tags": [true, false], "x-rate": 0.5, "limit": 10, "q": "text"})
        );
    }

    #[test]
    fn prefix_items_then_items() {
        let out = coerce(
            json!(["1", "true", "3"]),
            json!({"prefixItems": [{"type": "integer"}, {"type": "boolean"}], "items": {"type": "number"}}),
        );
        assert_eq!(out, json!([1, true, 3]));
    }

    #[test]
    fn follows_refs_through_document() {
        let doc = OpenApiDocument::from_yaml_str(
            r##"
openapi: 3.1.0
info: { title: t, version: "1" }
paths: {}
components:
  schemas:
    Page:
      type: object
      properties:
        size: { type: integer }
    Loop:
      $ref: "#/components/schemas/Loop"
"##,
        )
        .unwrap();
        let coercer = Coercer::new(Some(ReferenceResolver::new(&doc)));
        let out = coercer.coerce(
            &json!({"size": "25"}),
            &SchemaNode::reference("#/components/schemas/Page"),
        );
        assert_eq!(out, json!({"size": 25}));

        // A ref loop passes the value through.
        let looped = coercer.coerce(&json!("5"), &SchemaNode::reference("#/components/schemas/Loop"));
        assert_eq!(looped, json!("5"));
    }

    const COMPOSED: &str = r##"
openapi: 3.1.0
info: { title: t, version: "1" }
paths: {}
components:
  schemas:
    Paging:
      type: object
      properties:
        size: { type: integer }
    Query:
      allOf:
        - $ref: "#/components/schemas/Paging"
        - type: object
          properties:
            page: { type: integer }
            debug: { type: boolean }
    Id:
      type: integer
    Filter:
      oneOf:
        - $ref: "#/components/schemas/Id"
        - type: string
          format: uuid
    Cycle:
      allOf:
        - $ref: "#/components/schemas/Cycle"
        - properties:
            n: { type: integer }
"##;

    #[test]
    fn composed_objects_coerce_members() {
        let doc = OpenApiDocument::from_yaml_str(COMPOSED).unwrap();
        let coercer = Coercer::new(Some(ReferenceResolver::new(&doc)));
        let out = coercer.coerce(
            &json!({"size": "10", "page": "2", "debug": "on", "q": "text"}),
            &SchemaNode::reference("#/components/schemas/Query"),
        );
        assert_eq!(out, json!({"size": 10, "page": 2, "debug": true, "q": "text"}));

        // First typed branch drives scalars.
        let id = coercer.coerce(&json!("7"), &SchemaNode::reference("#/components/schemas/Filter"));
        assert_eq!(id, json!(7));

        // A branch that refers back to itself is skipped, not followed forever.
        let out = coercer.coerce(&json!({"n": "3"}), &SchemaNode::reference("#/components/schemas/Cycle"));
        assert_eq!(out, json!({"n": 3}));
    }

    #[test]
    fn composed_query_passes_coercing_engine() {
        use crate::validator::{SchemaValidator, ValidatorOptions};
        use oasv_core::ErrorKind;

        let doc = OpenApiDocument::from_yaml_str(COMPOSED).unwrap();
        let query = SchemaNode::reference("#/components/schemas/Query");
        let payload = json!({"size": "10", "page": "2"});

        let coercing = SchemaValidator::new(ValidatorOptions {
            coerce_types: true,
            ..ValidatorOptions::default()
        })
        .with_document(doc.clone());
        assert!(coercing.validate(&payload, &query).is_ok());

        let strict = SchemaValidator::default().with_document(doc);
        let failure = strict.validate(&payload, &query).unwrap_err();
        assert_eq!(failure.first().kind(), ErrorKind::TypeMismatch);
        assert_eq!(failure.first().data_path(), "/size");
    }

    #[test]
    fn member_patterns_compile_once() {
        let cache = PatternCache::new();
        let coercer = Coercer::default().with_patterns(&cache);
        let s = schema(json!({"patternProperties": {"^x-": {"type": "integer"}}}));
        for _ in 0..3 {
            assert_eq!(coercer.coerce(&json!({"x-a": "1", "x-b": "2"}), &s), json!({"x-a": 1, "x-b": 2}));
        }
        assert_eq!(cache.len(), 1);
    }
}
