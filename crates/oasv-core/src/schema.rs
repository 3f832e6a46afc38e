//! # Schema Model
//!
//! [`SchemaNode`] is the recursive constraint tree for one JSON-Schema style
//! schema object. Keyword fields are grouped by category (type, value,
//! numeric, string, array, object, composition, unevaluated) so that every
//! present keyword on one node is still ANDed by the validator, without a
//! single flat record of forty optional fields.
//!
//! ## Construction
//!
//! Nodes are built from an already-decoded [`serde_json::Value`] with
//! [`SchemaNode::from_value`]. Boolean schemas are accepted wherever a schema
//! is: `true` becomes the empty node and `false` becomes `{"not": {}}`.
//! Unknown keywords (including `x-` extensions) are ignored.
//!
//! Both the OpenAPI 3.0 spelling (`nullable: true`, boolean
//! `exclusiveMinimum`) and the 3.1 / JSON Schema 2020-12 spelling
//! (`type: [.., "null"]`, numeric `exclusiveMinimum`) are understood.
//!
//! ## Ownership
//!
//! Nodes are owned by the [`OpenApiDocument`](crate::OpenApiDocument) and are
//! never mutated after construction. Reference expansion produces new trees.

use std::convert::Infallible;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::SchemaError;
use crate::keyword::Keyword;

// ---------------------------------------------------------------------------
// Primitive types
// ---------------------------------------------------------------------------

/// One of the seven JSON Schema primitive type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    /// `null`
    Null,
    /// `boolean`
    Boolean,
    /// `integer` (any number with a zero fractional part)
    Integer,
    /// `number`
    Number,
    /// `string`
    String,
    /// `array`
    Array,
    /// `object`
    Object,
}

impl PrimitiveType {
    /// All primitive types.
    pub const ALL: [PrimitiveType; 7] = [
        Self::Null,
        Self::Boolean,
        Self::Integer,
        Self::Number,
        Self::String,
        Self::Array,
        Self::Object,
    ];

    /// The type name as spelled in a schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Parse a type name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    /// The most specific type of a value. Integral numbers report `Integer`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if is_integral(n) => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Whether `value` is an instance of this type. `number` admits integers.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Null, Value::Null) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Integer, Value::Number(n)) => is_integral(n),
            (Self::Number, Value::Number(_)) => true,
            (Self::String, Value::String(_)) => true,
            (Self::Array, Value::Array(_)) => true,
            (Self::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a JSON number has no fractional part.
pub fn is_integral(n: &Number) -> bool {
    if n.is_i64() || n.is_u64() {
        return true;
    }
    n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

/// A single type or a union of types, in declaration order without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSet(Vec<PrimitiveType>);

impl TypeSet {
    /// A set with one member.
    pub fn single(ty: PrimitiveType) -> Self {
        Self(vec![ty])
    }

    /// A union; duplicates are dropped, first occurrence wins.
    pub fn union(types: impl IntoIterator<Item = PrimitiveType>) -> Self {
        let mut members = Vec::new();
        for ty in types {
            if !members.contains(&ty) {
                members.push(ty);
            }
        }
        Self(members)
    }

    /// Members in declaration order.
    pub fn members(&self) -> &[PrimitiveType] {
        &self.0
    }

    /// Whether the set names `ty`.
    pub fn contains(&self, ty: PrimitiveType) -> bool {
        self.0.contains(&ty)
    }

    /// Whether any member accepts `value`.
    pub fn matches(&self, value: &Value) -> bool {
        self.0.iter().any(|t| t.matches(value))
    }

    /// Names of the members, for messages and params.
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(|t| t.as_str()).collect()
    }

    fn to_value(&self) -> Value {
        match self.0.as_slice() {
            [single] => Value::String(single.as_str().to_string()),
            many => Value::Array(
                many.iter()
                    .map(|t| Value::String(t.as_str().to_string()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join("|"))
    }
}

// ---------------------------------------------------------------------------
// Keyword groups
// ---------------------------------------------------------------------------

/// `type` and the OpenAPI 3.0 `nullable` flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeConstraints {
    /// Declared type or union.
    pub types: Option<TypeSet>,
    /// OpenAPI 3.0 `nullable`.
    pub nullable: bool,
}

/// `const` and `enum`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueConstraints {
    /// `const`; a present `null` is `Some(Value::Null)`.
    pub const_value: Option<Value>,
    /// `enum`.
    pub enum_values: Option<Vec<Value>>,
}

/// Exclusive bound in either spelling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExclusiveBound {
    /// OpenAPI 3.0: makes the sibling `minimum`/`maximum` exclusive.
    Flag(bool),
    /// JSON Schema 2020-12: an independent exclusive limit.
    Limit(f64),
}

/// Numeric range keywords.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericConstraints {
    /// `minimum`
    pub minimum: Option<f64>,
    /// `maximum`
    pub maximum: Option<f64>,
    /// `exclusiveMinimum`
    pub exclusive_minimum: Option<ExclusiveBound>,
    /// `exclusiveMaximum`
    pub exclusive_maximum: Option<ExclusiveBound>,
    /// `multipleOf` (strictly positive)
    pub multiple_of: Option<f64>,
}

impl NumericConstraints {
    /// Whether `minimum` is made exclusive by the boolean form.
    pub fn minimum_is_exclusive(&self) -> bool {
        matches!(self.exclusive_minimum, Some(ExclusiveBound::Flag(true)))
    }

    /// Whether `maximum` is made exclusive by the boolean form.
    pub fn maximum_is_exclusive(&self) -> bool {
        matches!(self.exclusive_maximum, Some(ExclusiveBound::Flag(true)))
    }

    /// The numeric-form `exclusiveMinimum`, if any.
    pub fn exclusive_minimum_limit(&self) -> Option<f64> {
        match self.exclusive_minimum {
            Some(ExclusiveBound::Limit(v)) => Some(v),
            _ => None,
        }
    }

    /// The numeric-form `exclusiveMaximum`, if any.
    pub fn exclusive_maximum_limit(&self) -> Option<f64> {
        match self.exclusive_maximum {
            Some(ExclusiveBound::Limit(v)) => Some(v),
            _ => None,
        }
    }
}

/// String keywords.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringConstraints {
    /// `minLength` in Unicode scalar values.
    pub min_length: Option<u64>,
    /// `maxLength` in Unicode scalar values.
    pub max_length: Option<u64>,
    /// `pattern` (unanchored regular expression).
    pub pattern: Option<String>,
    /// `format` name. Also consulted for integers and numbers.
    pub format: Option<String>,
}

/// Array keywords.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayConstraints {
    /// `items`: applies to every element after `prefix_items`.
    pub items: Option<Box<SchemaNode>>,
    /// `prefixItems` (or the legacy array form of `items`).
    pub prefix_items: Vec<SchemaNode>,
    /// `contains`
    pub contains: Option<Box<SchemaNode>>,
    /// `minContains` (defaults to 1 when `contains` is present)
    pub min_contains: Option<u64>,
    /// `maxContains`
    pub max_contains: Option<u64>,
    /// `minItems`
    pub min_items: Option<u64>,
    /// `maxItems`
    pub max_items: Option<u64>,
    /// `uniqueItems`
    pub unique_items: bool,
}

/// Either a boolean switch or a subschema, as used by
/// `additionalProperties`, `unevaluatedProperties` and `unevaluatedItems`.
#[derive(Debug, Clone, PartialEq)]
pub enum BoolOrSchema {
    /// `true` admits anything; `false` rejects everything it applies to.
    Bool(bool),
    /// Each applicable value must validate against the schema.
    Schema(Box<SchemaNode>),
}

impl BoolOrSchema {
    fn to_value(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Schema(node) => node.to_value(),
        }
    }
}

/// Ordered `name → schema` pairs.
pub type NamedSchemas = Vec<(String, SchemaNode)>;

/// Object keywords.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectConstraints {
    /// `properties` in declaration order.
    pub properties: NamedSchemas,
    /// `patternProperties` in declaration order.
    pub pattern_properties: NamedSchemas,
    /// `propertyNames`
    pub property_names: Option<Box<SchemaNode>>,
    /// `additionalProperties`
    pub additional_properties: Option<BoolOrSchema>,
    /// `required`, de-duplicated, in declaration order.
    pub required: Vec<String>,
    /// `minProperties`
    pub min_properties: Option<u64>,
    /// `maxProperties`
    pub max_properties: Option<u64>,
    /// `dependentSchemas`
    pub dependent_schemas: NamedSchemas,
    /// `dependentRequired`
    pub dependent_required: Vec<(String, Vec<String>)>,
}

impl ObjectConstraints {
    /// Schema declared under `properties` for `name`.
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, node)| node)
    }
}

/// Composition keywords.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    /// `allOf`
    pub all_of: Vec<SchemaNode>,
    /// `anyOf`
    pub any_of: Vec<SchemaNode>,
    /// `oneOf`
    pub one_of: Vec<SchemaNode>,
    /// `not`
    pub not: Option<Box<SchemaNode>>,
    /// `if`
    pub if_schema: Option<Box<SchemaNode>>,
    /// `then`
    pub then_schema: Option<Box<SchemaNode>>,
    /// `else`
    pub else_schema: Option<Box<SchemaNode>>,
}

/// `unevaluatedProperties` and `unevaluatedItems`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnevaluatedConstraints {
    /// `unevaluatedProperties`
    pub properties: Option<BoolOrSchema>,
    /// `unevaluatedItems`
    pub items: Option<BoolOrSchema>,
}

/// OpenAPI discriminator for polymorphic `oneOf`/`anyOf`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discriminator {
    /// Name of the property whose value selects the branch.
    pub property_name: String,
    /// Explicit `value → $ref` (or bare component name) mapping.
    pub mapping: Vec<(String, String)>,
}

impl Discriminator {
    /// The `$ref` a discriminator value selects.
    ///
    /// Uses the explicit mapping when present; bare names in the mapping and
    /// unmapped values both refer to `#/components/schemas/<value>`.
    pub fn target_for(&self, value: &str) -> String {
        let target = self
            .mapping
            .iter()
            .find(|(k, _)| k == value)
            .map(|(_, v)| v.as_str())
            .unwrap_or(value);
        if target.starts_with('#') {
            target.to_string()
        } else {
            format!("{COMPONENT_SCHEMA_PREFIX}{target}")
        }
    }
}

/// Prefix of every supported `$ref`.
pub const COMPONENT_SCHEMA_PREFIX: &str = "#/components/schemas/";

/// Non-validating annotations, kept so resolved schemas round-trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    /// `title`
    pub title: Option<String>,
    /// `description`
    pub description: Option<String>,
    /// `default`
    pub default: Option<Value>,
    /// `example` and `examples`, merged.
    pub examples: Vec<Value>,
    /// `readOnly`
    pub read_only: bool,
    /// `writeOnly`
    pub write_only: bool,
    /// `deprecated`
    pub deprecated: bool,
}

// ---------------------------------------------------------------------------
// SchemaNode
// ---------------------------------------------------------------------------

/// One schema object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaNode {
    /// `$ref`. When set, the node defers entirely to the referenced schema.
    pub reference: Option<String>,
    /// Type keywords.
    pub types: TypeConstraints,
    /// `const` / `enum`.
    pub values: ValueConstraints,
    /// Numeric keywords.
    pub numeric: NumericConstraints,
    /// String keywords.
    pub string: StringConstraints,
    /// Array keywords.
    pub array: ArrayConstraints,
    /// Object keywords.
    pub object: ObjectConstraints,
    /// Composition keywords.
    pub composition: Composition,
    /// Unevaluated keywords.
    pub unevaluated: UnevaluatedConstraints,
    /// OpenAPI discriminator.
    pub discriminator: Option<Discriminator>,
    /// Annotations.
    pub annotations: Annotations,
}

impl SchemaNode {
    /// The boolean schema `false`: rejects every value.
    pub fn never() -> Self {
        Self {
            composition: Composition {
                not: Some(Box::default()),
                ..Composition::default()
            },
            ..Self::default()
        }
    }

    /// Whether this node is the boolean schema `false`.
    pub fn is_never(&self) -> bool {
        self.composition
            .not
            .as_deref()
            .is_some_and(|inner| *inner == SchemaNode::default())
            && *self == Self::never()
    }

    /// A node that only carries `$ref`.
    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            ..Self::default()
        }
    }

    /// A node with a single declared type.
    pub fn of_type(ty: PrimitiveType) -> Self {
        Self {
            types: TypeConstraints {
                types: Some(TypeSet::single(ty)),
                nullable: false,
            },
            ..Self::default()
        }
    }

    /// Whether validation of this node is driven by `$ref`.
    pub fn is_ref_only(&self) -> bool {
        self.reference.is_some()
    }

    /// Whether `keyword` is present on this node.
    pub fn has(&self, keyword: Keyword) -> bool {
        match keyword {
            Keyword::Type => self.types.types.is_some(),
            Keyword::Const => self.values.const_value.is_some(),
            Keyword::Enum => self.values.enum_values.is_some(),
            Keyword::Format => self.string.format.is_some(),
            Keyword::MinLength => self.string.min_length.is_some(),
            Keyword::MaxLength => self.string.max_length.is_some(),
            Keyword::Pattern => self.string.pattern.is_some(),
            Keyword::Minimum => self.numeric.minimum.is_some(),
            Keyword::Maximum => self.numeric.maximum.is_some(),
            Keyword::ExclusiveMinimum => self.numeric.exclusive_minimum_limit().is_some(),
            Keyword::ExclusiveMaximum => self.numeric.exclusive_maximum_limit().is_some(),
            Keyword::MultipleOf => self.numeric.multiple_of.is_some(),
            Keyword::MinItems => self.array.min_items.is_some(),
            Keyword::MaxItems => self.array.max_items.is_some(),
            Keyword::UniqueItems => self.array.unique_items,
            Keyword::PrefixItems => !self.array.prefix_items.is_empty(),
            Keyword::Items => self.array.items.is_some(),
            Keyword::Contains => self.array.contains.is_some(),
            Keyword::MinProperties => self.object.min_properties.is_some(),
            Keyword::MaxProperties => self.object.max_properties.is_some(),
            Keyword::Required => !self.object.required.is_empty(),
            Keyword::DependentRequired => !self.object.dependent_required.is_empty(),
            Keyword::Properties => !self.object.properties.is_empty(),
            Keyword::PatternProperties => !self.object.pattern_properties.is_empty(),
            Keyword::PropertyNames => self.object.property_names.is_some(),
            Keyword::AdditionalProperties => self.object.additional_properties.is_some(),
            Keyword::Discriminator => self.discriminator.is_some(),
            Keyword::AllOf => !self.composition.all_of.is_empty(),
            Keyword::AnyOf => !self.composition.any_of.is_empty(),
            Keyword::OneOf => !self.composition.one_of.is_empty(),
            Keyword::Not => self.composition.not.is_some(),
            Keyword::If => self.composition.if_schema.is_some(),
            Keyword::DependentSchemas => !self.object.dependent_schemas.is_empty(),
            Keyword::UnevaluatedProperties => self.unevaluated.properties.is_some(),
            Keyword::UnevaluatedItems => self.unevaluated.items.is_some(),
        }
    }

    /// Keywords present on this node, in evaluation order.
    pub fn keywords(&self) -> impl Iterator<Item = Keyword> + '_ {
        Keyword::EVALUATION_ORDER
            .into_iter()
            .filter(move |kw| self.has(*kw))
    }

    /// Every direct subschema of this node.
    pub fn subschemas(&self) -> Vec<&SchemaNode> {
        let mut out: Vec<&SchemaNode> = Vec::new();
        out.extend(self.array.items.as_deref());
        out.extend(self.array.prefix_items.iter());
        out.extend(self.array.contains.as_deref());
        out.extend(self.object.properties.iter().map(|(_, n)| n));
        out.extend(self.object.pattern_properties.iter().map(|(_, n)| n));
        out.extend(self.object.property_names.as_deref());
        if let Some(BoolOrSchema::Schema(node)) = &self.object.additional_properties {
            out.push(node);
        }
        out.extend(self.object.dependent_schemas.iter().map(|(_, n)| n));
        out.extend(self.composition.all_of.iter());
        out.extend(self.composition.any_of.iter());
        out.extend(self.composition.one_of.iter());
        out.extend(self.composition.not.as_deref());
        out.extend(self.composition.if_schema.as_deref());
        out.extend(self.composition.then_schema.as_deref());
        out.extend(self.composition.else_schema.as_deref());
        if let Some(BoolOrSchema::Schema(node)) = &self.unevaluated.properties {
            out.push(node);
        }
        if let Some(BoolOrSchema::Schema(node)) = &self.unevaluated.items {
            out.push(node);
        }
        out
    }

    /// Whether this node or any descendant carries `$ref`.
    pub fn contains_refs(&self) -> bool {
        self.reference.is_some() || self.subschemas().into_iter().any(|n| n.contains_refs())
    }

    /// Build a copy of this node with every direct subschema replaced by `f(child)`.
    ///
    /// The node's own `$ref` is left untouched; callers that expand references
    /// handle the node itself before descending.
    pub fn try_map_subschemas<E>(
        &self,
        mut f: impl FnMut(&SchemaNode) -> Result<SchemaNode, E>,
    ) -> Result<SchemaNode, E> {
        let mut out = self.clone();
        let mut boxed = |slot: &mut Option<Box<SchemaNode>>,
                         f: &mut dyn FnMut(&SchemaNode) -> Result<SchemaNode, E>|
         -> Result<(), E> {
            if let Some(node) = slot.as_mut() {
                **node = f(node)?;
            }
            Ok(())
        };
        boxed(&mut out.array.items, &mut f)?;
        boxed(&mut out.array.contains, &mut f)?;
        boxed(&mut out.object.property_names, &mut f)?;
        boxed(&mut out.composition.not, &mut f)?;
        boxed(&mut out.composition.if_schema, &mut f)?;
        boxed(&mut out.composition.then_schema, &mut f)?;
        boxed(&mut out.composition.else_schema, &mut f)?;
        for node in out
            .array
            .prefix_items
            .iter_mut()
            .chain(out.composition.all_of.iter_mut())
            .chain(out.composition.any_of.iter_mut())
            .chain(out.composition.one_of.iter_mut())
        {
            *node = f(node)?;
        }
        for (_, node) in out
            .object
            .properties
            .iter_mut()
            .chain(out.object.pattern_properties.iter_mut())
            .chain(out.object.dependent_schemas.iter_mut())
        {
            *node = f(node)?;
        }
        for slot in [
            &mut out.object.additional_properties,
            &mut out.unevaluated.properties,
            &mut out.unevaluated.items,
        ] {
            if let Some(BoolOrSchema::Schema(node)) = slot {
                **node = f(node)?;
            }
        }
        Ok(out)
    }

    /// A copy of this node and every subschema with annotations cleared.
    pub fn without_annotations(&self) -> SchemaNode {
        let mut out = match self
            .try_map_subschemas(|child| Ok::<_, Infallible>(child.without_annotations()))
        {
            Ok(node) => node,
            Err(never) => match never {},
        };
        out.annotations = Annotations::default();
        out
    }

    /// Parse a schema from a decoded JSON/YAML value.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        parse_node(value, "#")
    }

    /// Render the node back to its JSON form.
    pub fn to_value(&self) -> Value {
        let mut m = Map::new();
        if let Some(r) = &self.reference {
            m.insert("$ref".into(), Value::String(r.clone()));
        }
        if let Some(types) = &self.types.types {
            m.insert("type".into(), types.to_value());
        }
        if self.types.nullable {
            m.insert("nullable".into(), Value::Bool(true));
        }
        if let Some(c) = &self.values.const_value {
            m.insert("const".into(), c.clone());
        }
        if let Some(e) = &self.values.enum_values {
            m.insert("enum".into(), Value::Array(e.clone()));
        }
        let num = |v: f64| Number::from_f64(v).map_or(Value::Null, Value::Number);
        let bound = |b: &ExclusiveBound| match b {
            ExclusiveBound::Flag(f) => Value::Bool(*f),
            ExclusiveBound::Limit(v) => num(*v),
        };
        if let Some(v) = self.numeric.minimum {
            m.insert("minimum".into(), num(v));
        }
        if let Some(v) = self.numeric.maximum {
            m.insert("maximum".into(), num(v));
        }
        if let Some(b) = &self.numeric.exclusive_minimum {
            m.insert("exclusiveMinimum".into(), bound(b));
        }
        if let Some(b) = &self.numeric.exclusive_maximum {
            m.insert("exclusiveMaximum".into(), bound(b));
        }
        if let Some(v) = self.numeric.multiple_of {
            m.insert("multipleOf".into(), num(v));
        }
        let int = |v: u64| Value::Number(v.into());
        if let Some(v) = self.string.min_length {
            m.insert("minLength".into(), int(v));
        }
        if let Some(v) = self.string.max_length {
            m.insert("maxLength".into(), int(v));
        }
        if let Some(p) = &self.string.pattern {
            m.insert("pattern".into(), Value::String(p.clone()));
        }
        if let Some(f) = &self.string.format {
            m.insert("format".into(), Value::String(f.clone()));
        }
        if let Some(items) = &self.array.items {
            m.insert("items".into(), items.to_value());
        }
        if !self.array.prefix_items.is_empty() {
            m.insert("prefixItems".into(), nodes_to_value(&self.array.prefix_items));
        }
        if let Some(c) = &self.array.contains {
            m.insert("contains".into(), c.to_value());
        }
        if let Some(v) = self.array.min_contains {
            m.insert("minContains".into(), int(v));
        }
        if let Some(v) = self.array.max_contains {
            m.insert("maxContains".into(), int(v));
        }
        if let Some(v) = self.array.min_items {
            m.insert("minItems".into(), int(v));
        }
        if let Some(v) = self.array.max_items {
            m.insert("maxItems".into(), int(v));
        }
        if self.array.unique_items {
            m.insert("uniqueItems".into(), Value::Bool(true));
        }
        if !self.object.properties.is_empty() {
            m.insert("properties".into(), named_to_value(&self.object.properties));
        }
        if !self.object.pattern_properties.is_empty() {
            m.insert(
                "patternProperties".into(),
                named_to_value(&self.object.pattern_properties),
            );
        }
        if let Some(p) = &self.object.property_names {
            m.insert("propertyNames".into(), p.to_value());
        }
        if let Some(a) = &self.object.additional_properties {
            m.insert("additionalProperties".into(), a.to_value());
        }
        if !self.object.required.is_empty() {
            m.insert(
                "required".into(),
                Value::Array(
                    self.object
                        .required
                        .iter()
                        .map(|r| Value::String(r.clone()))
                        .collect(),
                ),
            );
        }
        if let Some(v) = self.object.min_properties {
            m.insert("minProperties".into(), int(v));
        }
        if let Some(v) = self.object.max_properties {
            m.insert("maxProperties".into(), int(v));
        }
        if !self.object.dependent_schemas.is_empty() {
            m.insert(
                "dependentSchemas".into(),
                named_to_value(&self.object.dependent_schemas),
            );
        }
        if !self.object.dependent_required.is_empty() {
            let deps: Map<String, Value> = self
                .object
                .dependent_required
                .iter()
                .map(|(k, names)| {
                    (
                        k.clone(),
                        Value::Array(names.iter().map(|n| Value::String(n.clone())).collect()),
                    )
                })
                .collect();
            m.insert("dependentRequired".into(), Value::Object(deps));
        }
        let c = &self.composition;
        if !c.all_of.is_empty() {
            m.insert("allOf".into(), nodes_to_value(&c.all_of));
        }
        if !c.any_of.is_empty() {
            m.insert("anyOf".into(), nodes_to_value(&c.any_of));
        }
        if !c.one_of.is_empty() {
            m.insert("oneOf".into(), nodes_to_value(&c.one_of));
        }
        if let Some(n) = &c.not {
            m.insert("not".into(), n.to_value());
        }
        if let Some(n) = &c.if_schema {
            m.insert("if".into(), n.to_value());
        }
        if let Some(n) = &c.then_schema {
            m.insert("then".into(), n.to_value());
        }
        if let Some(n) = &c.else_schema {
            m.insert("else".into(), n.to_value());
        }
        if let Some(u) = &self.unevaluated.properties {
            m.insert("unevaluatedProperties".into(), u.to_value());
        }
        if let Some(u) = &self.unevaluated.items {
            m.insert("unevaluatedItems".into(), u.to_value());
        }
        if let Some(d) = &self.discriminator {
            let mut dm = Map::new();
            dm.insert("propertyName".into(), Value::String(d.property_name.clone()));
            if !d.mapping.is_empty() {
                let mapping: Map<String, Value> = d
                    .mapping
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                dm.insert("mapping".into(), Value::Object(mapping));
            }
            m.insert("discriminator".into(), Value::Object(dm));
        }
        let a = &self.annotations;
        if let Some(t) = &a.title {
            m.insert("title".into(), Value::String(t.clone()));
        }
        if let Some(d) = &a.description {
            m.insert("description".into(), Value::String(d.clone()));
        }
        if let Some(d) = &a.default {
            m.insert("default".into(), d.clone());
        }
        if !a.examples.is_empty() {
            m.insert("examples".into(), Value::Array(a.examples.clone()));
        }
        if a.read_only {
            m.insert("readOnly".into(), Value::Bool(true));
        }
        if a.write_only {
            m.insert("writeOnly".into(), Value::Bool(true));
        }
        if a.deprecated {
            m.insert("deprecated".into(), Value::Bool(true));
        }
        Value::Object(m)
    }
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchemaNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        SchemaNode::from_value(&value).map_err(D::Error::custom)
    }
}

fn nodes_to_value(nodes: &[SchemaNode]) -> Value {
    Value::Array(nodes.iter().map(SchemaNode::to_value).collect())
}

fn named_to_value(named: &NamedSchemas) -> Value {
    Value::Object(
        named
            .iter()
            .map(|(k, node)| (k.clone(), node.to_value()))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Escape a key for use inside a JSON Pointer.
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn invalid(path: &str, keyword: &str, expected: &'static str) -> SchemaError {
    SchemaError::InvalidKeyword {
        path: path.to_string(),
        keyword: keyword.to_string(),
        expected,
    }
}

fn parse_node(value: &Value, path: &str) -> Result<SchemaNode, SchemaError> {
    let obj = match value {
        Value::Bool(true) => return Ok(SchemaNode::default()),
        Value::Bool(false) => return Ok(SchemaNode::never()),
        Value::Object(obj) => obj,
        other => {
            return Err(SchemaError::NotASchema {
                path: path.to_string(),
                found: json_type_name(other),
            })
        }
    };

    let mut node = SchemaNode::default();
    let mut items_is_tuple = false;
    let mut additional_items: Option<SchemaNode> = None;

    for (key, v) in obj {
        let at = format!("{path}/{}", escape_pointer_token(key));
        let k = key.as_str();
        match k {
            "$ref" => node.reference = Some(expect_str(v, &at, k)?.to_string()),
            "type" => node.types.types = Some(parse_type(v, &at)?),
            "nullable" => node.types.nullable = expect_bool(v, &at, k)?,
            "const" => node.values.const_value = Some(v.clone()),
            "enum" => node.values.enum_values = Some(expect_array(v, &at, k)?.clone()),
            "minimum" => node.numeric.minimum = Some(expect_f64(v, &at, k)?),
            "maximum" => node.numeric.maximum = Some(expect_f64(v, &at, k)?),
            "exclusiveMinimum" => node.numeric.exclusive_minimum = Some(parse_bound(v, &at, k)?),
            "exclusiveMaximum" => node.numeric.exclusive_maximum = Some(parse_bound(v, &at, k)?),
            "multipleOf" => {
                let m = expect_f64(v, &at, k)?;
                if m <= 0.0 {
                    return Err(invalid(&at, k, "a number greater than zero"));
                }
                node.numeric.multiple_of = Some(m);
            }
            "minLength" => node.string.min_length = Some(expect_u64(v, &at, k)?),
            "maxLength" => node.string.max_length = Some(expect_u64(v, &at, k)?),
            "pattern" => node.string.pattern = Some(expect_str(v, &at, k)?.to_string()),
            "format" => node.string.format = Some(expect_str(v, &at, k)?.to_string()),
            "items" => match v {
                Value::Array(arr) => {
                    items_is_tuple = true;
                    node.array.prefix_items = parse_list(arr, &at)?;
                }
                other => node.array.items = Some(Box::new(parse_node(other, &at)?)),
            },
            "prefixItems" => {
                node.array.prefix_items = parse_list(expect_array(v, &at, k)?, &at)?;
            }
            "additionalItems" => additional_items = Some(parse_node(v, &at)?),
            "contains" => node.array.contains = Some(Box::new(parse_node(v, &at)?)),
            "minContains" => node.array.min_contains = Some(expect_u64(v, &at, k)?),
            "maxContains" => node.array.max_contains = Some(expect_u64(v, &at, k)?),
            "minItems" => node.array.min_items = Some(expect_u64(v, &at, k)?),
            "maxItems" => node.array.max_items = Some(expect_u64(v, &at, k)?),
            "uniqueItems" => node.array.unique_items = expect_bool(v, &at, k)?,
            "properties" => node.object.properties = parse_named(v, &at, k)?,
            "patternProperties" => node.object.pattern_properties = parse_named(v, &at, k)?,
            "propertyNames" => node.object.property_names = Some(Box::new(parse_node(v, &at)?)),
            "additionalProperties" => {
                node.object.additional_properties = Some(parse_bool_or_schema(v, &at)?)
            }
            "required" => node.object.required = parse_names(v, &at, k)?,
            "minProperties" => node.object.min_properties = Some(expect_u64(v, &at, k)?),
            "maxProperties" => node.object.max_properties = Some(expect_u64(v, &at, k)?),
            "dependentSchemas" => node.object.dependent_schemas = parse_named(v, &at, k)?,
            "dependentRequired" => {
                let map = v.as_object().ok_or_else(|| invalid(&at, k, "an object"))?;
                let mut deps = Vec::with_capacity(map.len());
                for (name, names) in map {
                    let inner = format!("{at}/{}", escape_pointer_token(name));
                    deps.push((name.clone(), parse_names(names, &inner, k)?));
                }
                node.object.dependent_required = deps;
            }
            "allOf" => node.composition.all_of = parse_list(expect_array(v, &at, k)?, &at)?,
            "anyOf" => node.composition.any_of = parse_list(expect_array(v, &at, k)?, &at)?,
            "oneOf" => node.composition.one_of = parse_list(expect_array(v, &at, k)?, &at)?,
            "not" => node.composition.not = Some(Box::new(parse_node(v, &at)?)),
            "if" => node.composition.if_schema = Some(Box::new(parse_node(v, &at)?)),
            "then" => node.composition.then_schema = Some(Box::new(parse_node(v, &at)?)),
            "else" => node.composition.else_schema = Some(Box::new(parse_node(v, &at)?)),
            "unevaluatedProperties" => {
                node.unevaluated.properties = Some(parse_bool_or_schema(v, &at)?)
            }
            "unevaluatedItems" => node.unevaluated.items = Some(parse_bool_or_schema(v, &at)?),
            "discriminator" => node.discriminator = Some(parse_discriminator(v, &at)?),
            "title" => node.annotations.title = Some(expect_str(v, &at, k)?.to_string()),
            "description" => {
                node.annotations.description = Some(expect_str(v, &at, k)?.to_string())
            }
            "default" => node.annotations.default = Some(v.clone()),
            "example" => node.annotations.examples.insert(0, v.clone()),
            "examples" => node
                .annotations
                .examples
                .extend(expect_array(v, &at, k)?.iter().cloned()),
            "readOnly" => node.annotations.read_only = expect_bool(v, &at, k)?,
            "writeOnly" => node.annotations.write_only = expect_bool(v, &at, k)?,
            "deprecated" => node.annotations.deprecated = expect_bool(v, &at, k)?,
            _ => {}
        }
    }

    if items_is_tuple {
        if let Some(rest) = additional_items {
            node.array.items = Some(Box::new(rest));
        }
    }

    Ok(node)
}

fn expect_str<'v>(v: &'v Value, path: &str, keyword: &str) -> Result<&'v str, SchemaError> {
    v.as_str().ok_or_else(|| invalid(path, keyword, "a string"))
}

fn expect_bool(v: &Value, path: &str, keyword: &str) -> Result<bool, SchemaError> {
    v.as_bool().ok_or_else(|| invalid(path, keyword, "a boolean"))
}

fn expect_f64(v: &Value, path: &str, keyword: &str) -> Result<f64, SchemaError> {
    v.as_f64().ok_or_else(|| invalid(path, keyword, "a number"))
}

fn expect_u64(v: &Value, path: &str, keyword: &str) -> Result<u64, SchemaError> {
    if let Some(n) = v.as_u64() {
        return Ok(n);
    }
    // Integral floats such as `5.0` are accepted.
    match v.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
        _ => Err(invalid(path, keyword, "a non-negative integer")),
    }
}

fn expect_array<'v>(
    v: &'v Value,
    path: &str,
    keyword: &str,
) -> Result<&'v Vec<Value>, SchemaError> {
    v.as_array().ok_or_else(|| invalid(path, keyword, "an array"))
}

fn parse_type(v: &Value, path: &str) -> Result<TypeSet, SchemaError> {
    let name_to_type = |name: &str| {
        PrimitiveType::from_name(name).ok_or_else(|| SchemaError::UnknownType {
            path: path.to_string(),
            name: name.to_string(),
        })
    };
    match v {
        Value::String(name) => Ok(TypeSet::single(name_to_type(name)?)),
        Value::Array(names) => {
            let mut types = Vec::with_capacity(names.len());
            for name in names {
                let name = name
                    .as_str()
                    .ok_or_else(|| invalid(path, "type", "a type name or array of type names"))?;
                types.push(name_to_type(name)?);
            }
            Ok(TypeSet::union(types))
        }
        _ => Err(invalid(path, "type", "a type name or array of type names")),
    }
}

fn parse_bound(v: &Value, path: &str, keyword: &str) -> Result<ExclusiveBound, SchemaError> {
    match v {
        Value::Bool(b) => Ok(ExclusiveBound::Flag(*b)),
        Value::Number(n) => n
            .as_f64()
            .map(ExclusiveBound::Limit)
            .ok_or_else(|| invalid(path, keyword, "a boolean or number")),
        _ => Err(invalid(path, keyword, "a boolean or number")),
    }
}

fn parse_list(values: &[Value], path: &str) -> Result<Vec<SchemaNode>, SchemaError> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| parse_node(v, &format!("{path}/{i}")))
        .collect()
}

fn parse_named(v: &Value, path: &str, keyword: &str) -> Result<NamedSchemas, SchemaError> {
    let map = v.as_object().ok_or_else(|| invalid(path, keyword, "an object"))?;
    map.iter()
        .map(|(name, schema)| {
            let at = format!("{path}/{}", escape_pointer_token(name));
            Ok((name.clone(), parse_node(schema, &at)?))
        })
        .collect()
}

fn parse_names(v: &Value, path: &str, keyword: &str) -> Result<Vec<String>, SchemaError> {
    let arr = v
        .as_array()
        .ok_or_else(|| invalid(path, keyword, "an array of strings"))?;
    let mut names: Vec<String> = Vec::with_capacity(arr.len());
    for item in arr {
        let name = item
            .as_str()
            .ok_or_else(|| invalid(path, keyword, "an array of strings"))?;
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

fn parse_bool_or_schema(v: &Value, path: &str) -> Result<BoolOrSchema, SchemaError> {
    match v {
        Value::Bool(b) => Ok(BoolOrSchema::Bool(*b)),
        other => Ok(BoolOrSchema::Schema(Box::new(parse_node(other, path)?))),
    }
}

fn parse_discriminator(v: &Value, path: &str) -> Result<Discriminator, SchemaError> {
    let obj = v
        .as_object()
        .ok_or_else(|| invalid(path, "discriminator", "an object"))?;
    let property_name = obj
        .get("propertyName")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(path, "discriminator", "an object with `propertyName`"))?
        .to_string();
    let mut mapping = Vec::new();
    if let Some(m) = obj.get("mapping") {
        let m = m
            .as_object()
            .ok_or_else(|| invalid(path, "discriminator", "a string-to-string `mapping`"))?;
        for (k, target) in m {
            let target = target
                .as_str()
                .ok_or_else(|| invalid(path, "discriminator", "a string-to-string `mapping`"))?;
            mapping.push((k.clone(), target.to_string()));
        }
    }
    Ok(Discriminator {
        property_name,
        mapping,
    })
}
