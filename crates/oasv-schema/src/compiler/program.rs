//! Lowered validation programs.
//!
//! Lowering flattens a schema tree into numbered [`Block`]s, one per schema
//! node, each holding its keyword [`Step`]s in evaluation order with every
//! operand pre-extracted (regexes compiled, limits unpacked, subschemas
//! replaced by block ids). Refs are followed during lowering, so a program
//! never consults a document at run time.
//!
//! [`Program::run`] executes a program directly. Its verdicts (error kind
//! and data path) match the interpreter's for the same value.

use oasv_core::{
    BoolOrSchema, Discriminator, ErrorKind, SchemaNode, TypeSet, ValidationError,
};
use regex::Regex;
use serde_json::Value;

use super::CompileError;
use crate::checks;
use crate::context::{Breadcrumb, PathSegment};
use crate::formats::check_builtin;
use crate::keywords::Evaluated;
use crate::resolver::ReferenceResolver;

/// Index of a block in its program.
pub type BlockId = usize;

/// A compiled regular expression with its source. `regex` is `None` when
/// the source does not compile; using it raises `InvalidPattern`.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub(crate) source: String,
    pub(crate) regex: Option<Regex>,
}

impl Pattern {
    fn new(source: &str) -> Self {
        let regex = match Regex::new(source) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(pattern = source, error = %e, "schema pattern does not compile");
                None
            }
        };
        Self {
            source: source.to_string(),
            regex,
        }
    }
}

/// What to do with members no other keyword claimed.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Accept them.
    Allow,
    /// Reject the first one.
    Deny,
    /// Validate each against a block.
    Check(BlockId),
}

/// Discriminator-driven branch selection for `anyOf`/`oneOf`.
#[derive(Debug, Clone)]
pub struct Selector {
    pub(crate) discriminator: Discriminator,
    /// Original `$ref` of each branch, by branch position.
    pub(crate) branch_refs: Vec<Option<String>>,
}

impl Selector {
    pub(crate) fn select(&self, value: &Value) -> Option<usize> {
        let tag = value.get(&self.discriminator.property_name)?.as_str()?;
        let target = self.discriminator.target_for(tag);
        self.branch_refs
            .iter()
            .position(|r| r.as_deref() == Some(target.as_str()))
    }
}

/// One keyword, lowered.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum Step {
    Type(TypeSet),
    Const(Value),
    Enum(Vec<Value>),
    Format(String),
    MinLength(u64),
    MaxLength(u64),
    Pattern(Pattern),
    Minimum { limit: f64, exclusive: bool },
    Maximum { limit: f64, exclusive: bool },
    ExclusiveMinimum(f64),
    ExclusiveMaximum(f64),
    MultipleOf(f64),
    MinItems(u64),
    MaxItems(u64),
    UniqueItems,
    PrefixItems(Vec<BlockId>),
    Items { start: usize, block: BlockId },
    Contains { block: BlockId, min: u64, max: Option<u64> },
    MinProperties(u64),
    MaxProperties(u64),
    Required(Vec<String>),
    DependentRequired(Vec<(String, Vec<String>)>),
    Properties(Vec<(String, BlockId)>),
    PatternProperties(Vec<(Pattern, BlockId)>),
    PropertyNames(BlockId),
    AdditionalProperties { declared: Vec<String>, patterns: Vec<Pattern>, rule: Rule },
    Discriminator(Selector),
    AllOf(Vec<BlockId>),
    AnyOf { branches: Vec<BlockId>, selector: Option<Selector> },
    OneOf { branches: Vec<BlockId>, selector: Option<Selector> },
    Not(BlockId),
    If { condition: BlockId, then: Option<BlockId>, otherwise: Option<BlockId> },
    DependentSchemas(Vec<(String, BlockId)>),
    UnevaluatedProperties(Rule),
    UnevaluatedItems(Rule),
}

impl Step {
    /// The keyword this step enforces.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Type(_) => "type",
            Self::Const(_) => "const",
            Self::Enum(_) => "enum",
            Self::Format(_) => "format",
            Self::MinLength(_) => "minLength",
            Self::MaxLength(_) => "maxLength",
            Self::Pattern(_) => "pattern",
            Self::Minimum { .. } => "minimum",
            Self::Maximum { .. } => "maximum",
            Self::ExclusiveMinimum(_) => "exclusiveMinimum",
            Self::ExclusiveMaximum(_) => "exclusiveMaximum",
            Self::MultipleOf(_) => "multipleOf",
            Self::MinItems(_) => "minItems",
            Self::MaxItems(_) => "maxItems",
            Self::UniqueItems => "uniqueItems",
            Self::PrefixItems(_) => "prefixItems",
            Self::Items { .. } => "items",
            Self::Contains { .. } => "contains",
            Self::MinProperties(_) => "minProperties",
            Self::MaxProperties(_) => "maxProperties",
            Self::Required(_) => "required",
            Self::DependentRequired(_) => "dependentRequired",
            Self::Properties(_) => "properties",
            Self::PatternProperties(_) => "patternProperties",
            Self::PropertyNames(_) => "propertyNames",
            Self::AdditionalProperties { .. } => "additionalProperties",
            Self::Discriminator(_) => "discriminator",
            Self::AllOf(_) => "allOf",
            Self::AnyOf { .. } => "anyOf",
            Self::OneOf { .. } => "oneOf",
            Self::Not(_) => "not",
            Self::If { .. } => "if",
            Self::DependentSchemas(_) => "dependentSchemas",
            Self::UnevaluatedProperties(_) => "unevaluatedProperties",
            Self::UnevaluatedItems(_) => "unevaluatedItems",
        }
    }
}

/// One schema node, lowered.
#[derive(Debug, Clone, Default)]
pub struct Block {
    /// Schema fragment of the node, for error locations.
    pub path: String,
    /// `null` succeeds before any step.
    pub nullable: bool,
    /// The node is the boolean schema `false`.
    pub never: bool,
    /// Keyword steps in evaluation order.
    pub steps: Vec<Step>,
}

/// A lowered schema. Block 0 is the root.
#[derive(Debug, Clone, Default)]
pub struct Program {
    blocks: Vec<Block>,
}

// ---------------------------------------------------------------------------
// Lowering
// ---------------------------------------------------------------------------

impl Program {
    /// Lower `schema`, following refs through `resolver` when given one.
    ///
    /// # Errors
    ///
    /// [`CompileError::UnresolvedReference`] for a ref without a resolver;
    /// [`CompileError::Resolution`] for unsupported, missing or circular refs.
    pub fn lower(
        schema: &SchemaNode,
        resolver: Option<ReferenceResolver<'_>>,
    ) -> Result<Self, CompileError> {
        let mut lowering = Lowering {
            resolver,
            blocks: Vec::new(),
            stack: Vec::new(),
        };
        lowering.lower(schema, "#".to_string())?;
        Ok(Self {
            blocks: lowering.blocks,
        })
    }

    /// Every block, root first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Total number of steps.
    pub fn step_count(&self) -> usize {
        self.blocks.iter().map(|b| b.steps.len()).sum()
    }
}

struct Lowering<'r> {
    resolver: Option<ReferenceResolver<'r>>,
    blocks: Vec<Block>,
    stack: Vec<String>,
}

fn child_path(base: &str, keyword: &str, token: &str) -> String {
    format!(
        "{base}/{keyword}/{}",
        oasv_core::schema::escape_pointer_token(token)
    )
}

impl Lowering<'_> {
    fn lower(&mut self, node: &SchemaNode, path: String) -> Result<BlockId, CompileError> {
        if let Some(reference) = &node.reference {
            return self.lower_ref(reference);
        }
        let id = self.blocks.len();
        self.blocks.push(Block::default());
        let mut steps = Vec::new();
        for keyword in node.keywords() {
            steps.push(self.step(node, keyword, &path)?);
        }
        self.blocks[id] = Block {
            nullable: node.types.nullable,
            never: node.is_never(),
            steps,
            path,
        };
        Ok(id)
    }

    fn lower_ref(&mut self, reference: &str) -> Result<BlockId, CompileError> {
        let Some(resolver) = self.resolver else {
            return Err(CompileError::UnresolvedReference {
                reference: reference.to_string(),
            });
        };
        if self.stack.iter().any(|r| r == reference) {
            let mut chain = self.stack.clone();
            chain.push(reference.to_string());
            tracing::debug!(chain = ?chain, "reference cycle while lowering");
            return Err(CompileError::Resolution(
                ValidationError::configuration(
                    ErrorKind::CircularReference,
                    "$ref",
                    format!("circular reference: {}", chain.join(" -> ")),
                )
                .with_param("reference", reference)
                .with_param("chain", chain),
            ));
        }
        let target = resolver.lookup(reference).map_err(CompileError::Resolution)?;
        self.stack.push(reference.to_string());
        let lowered = self.lower(target, reference.to_string());
        self.stack.pop();
        lowered
    }

    fn lower_all(
        &mut self,
        nodes: &[SchemaNode],
        path: &str,
        keyword: &str,
    ) -> Result<Vec<BlockId>, CompileError> {
        nodes
            .iter()
            .enumerate()
            .map(|(i, n)| self.lower(n, format!("{path}/{keyword}/{i}")))
            .collect()
    }

    fn lower_named(
        &mut self,
        nodes: &[(String, SchemaNode)],
        path: &str,
        keyword: &str,
    ) -> Result<Vec<(String, BlockId)>, CompileError> {
        nodes
            .iter()
            .map(|(name, n)| Ok((name.clone(), self.lower(n, child_path(path, keyword, name))?)))
            .collect()
    }

    fn lower_rule(
        &mut self,
        rule: Option<&BoolOrSchema>,
        path: String,
    ) -> Result<Rule, CompileError> {
        Ok(match rule {
            None | Some(BoolOrSchema::Bool(true)) => Rule::Allow,
            Some(BoolOrSchema::Bool(false)) => Rule::Deny,
            Some(BoolOrSchema::Schema(node)) => Rule::Check(self.lower(node, path)?),
        })
    }

    fn step(
        &mut self,
        node: &SchemaNode,
        keyword: oasv_core::Keyword,
        path: &str,
    ) -> Result<Step, CompileError> {
        use oasv_core::Keyword as K;
        let missing = || CompileError::Inconsistent(keyword.as_str());
        let sub = |p: &str, kw: &str| format!("{p}/{kw}");
        Ok(match keyword {
            K::Type => Step::Type(node.types.types.clone().ok_or_else(missing)?),
            K::Const => Step::Const(node.values.const_value.clone().ok_or_else(missing)?),
            K::Enum => Step::Enum(node.values.enum_values.clone().ok_or_else(missing)?),
            K::Format => Step::Format(node.string.format.clone().ok_or_else(missing)?),
            K::MinLength => Step::MinLength(node.string.min_length.ok_or_else(missing)?),
            K::MaxLength => Step::MaxLength(node.string.max_length.ok_or_else(missing)?),
            K::Pattern => Step::Pattern(Pattern::new(
                node.string.pattern.as_deref().ok_or_else(missing)?,
            )),
            K::Minimum => Step::Minimum {
                limit: node.numeric.minimum.ok_or_else(missing)?,
                exclusive: node.numeric.minimum_is_exclusive(),
            },
            K::Maximum => Step::Maximum {
                limit: node.numeric.maximum.ok_or_else(missing)?,
                exclusive: node.numeric.maximum_is_exclusive(),
            },
            K::ExclusiveMinimum => {
                Step::ExclusiveMinimum(node.numeric.exclusive_minimum_limit().ok_or_else(missing)?)
            }
            K::ExclusiveMaximum => {
                Step::ExclusiveMaximum(node.numeric.exclusive_maximum_limit().ok_or_else(missing)?)
            }
            K::MultipleOf => Step::MultipleOf(node.numeric.multiple_of.ok_or_else(missing)?),
            K::MinItems => Step::MinItems(node.array.min_items.ok_or_else(missing)?),
            K::MaxItems => Step::MaxItems(node.array.max_items.ok_or_else(missing)?),
            K::UniqueItems => Step::UniqueItems,
            K::PrefixItems => {
                Step::PrefixItems(self.lower_all(&node.array.prefix_items, path, "prefixItems")?)
            }
            K::Items => {
                let items = node.array.items.as_deref().ok_or_else(missing)?;
                Step::Items {
                    start: node.array.prefix_items.len(),
                    block: self.lower(items, sub(path, "items"))?,
                }
            }
            K::Contains => {
                let contains = node.array.contains.as_deref().ok_or_else(missing)?;
                Step::Contains {
                    block: self.lower(contains, sub(path, "contains"))?,
                    min: node.array.min_contains.unwrap_or(1),
                    max: node.array.max_contains,
                }
            }
            K::MinProperties => Step::MinProperties(node.object.min_properties.ok_or_else(missing)?),
            K::MaxProperties => Step::MaxProperties(node.object.max_properties.ok_or_else(missing)?),
            K::Required => Step::Required(node.object.required.clone()),
            K::DependentRequired => Step::DependentRequired(node.object.dependent_required.clone()),
            K::Properties => {
                Step::Properties(self.lower_named(&node.object.properties, path, "properties")?)
            }
            K::PatternProperties => {
                let named =
                    self.lower_named(&node.object.pattern_properties, path, "patternProperties")?;
                Step::PatternProperties(
                    named
                        .into_iter()
                        .map(|(source, id)| (Pattern::new(&source), id))
                        .collect(),
                )
            }
            K::PropertyNames => {
                let names = node.object.property_names.as_deref().ok_or_else(missing)?;
                Step::PropertyNames(self.lower(names, sub(path, "propertyNames"))?)
            }
            K::AdditionalProperties => Step::AdditionalProperties {
                declared: node.object.properties.iter().map(|(n, _)| n.clone()).collect(),
                patterns: node
                    .object
                    .pattern_properties
                    .iter()
                    .map(|(p, _)| Pattern::new(p))
                    .collect(),
                rule: self.lower_rule(
                    node.object.additional_properties.as_ref(),
                    sub(path, "additionalProperties"),
                )?,
            },
            K::Discriminator => {
                let branches = if node.composition.one_of.is_empty() {
                    &node.composition.any_of
                } else {
                    &node.composition.one_of
                };
                Step::Discriminator(self.selector(node, branches).ok_or_else(missing)?)
            }
            K::AllOf => Step::AllOf(self.lower_all(&node.composition.all_of, path, "allOf")?),
            K::AnyOf => Step::AnyOf {
                selector: self.selector(node, &node.composition.any_of),
                branches: self.lower_all(&node.composition.any_of, path, "anyOf")?,
            },
            K::OneOf => Step::OneOf {
                selector: self.selector(node, &node.composition.one_of),
                branches: self.lower_all(&node.composition.one_of, path, "oneOf")?,
            },
            K::Not => {
                let not = node.composition.not.as_deref().ok_or_else(missing)?;
                Step::Not(self.lower(not, sub(path, "not"))?)
            }
            K::If => {
                let condition = node.composition.if_schema.as_deref().ok_or_else(missing)?;
                let condition = self.lower(condition, sub(path, "if"))?;
                let then = match node.composition.then_schema.as_deref() {
                    Some(n) => Some(self.lower(n, sub(path, "then"))?),
                    None => None,
                };
                let otherwise = match node.composition.else_schema.as_deref() {
                    Some(n) => Some(self.lower(n, sub(path, "else"))?),
                    None => None,
                };
                Step::If {
                    condition,
                    then,
                    otherwise,
                }
            }
            K::DependentSchemas => Step::DependentSchemas(self.lower_named(
                &node.object.dependent_schemas,
                path,
                "dependentSchemas",
            )?),
            K::UnevaluatedProperties => Step::UnevaluatedProperties(self.lower_rule(
                node.unevaluated.properties.as_ref(),
                sub(path, "unevaluatedProperties"),
            )?),
            K::UnevaluatedItems => Step::UnevaluatedItems(self.lower_rule(
                node.unevaluated.items.as_ref(),
                sub(path, "unevaluatedItems"),
            )?),
        })
    }

    fn selector(&self, node: &SchemaNode, branches: &[SchemaNode]) -> Option<Selector> {
        let discriminator = node.discriminator.clone()?;
        Some(Selector {
            discriminator,
            branch_refs: branches.iter().map(|b| b.reference.clone()).collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

type Outcome = Result<Evaluated, ValidationError>;

impl Program {
    /// Validate `value` against the root block.
    ///
    /// # Errors
    ///
    /// The first violation.
    pub fn run(&self, value: &Value) -> Result<(), ValidationError> {
        if self.blocks.is_empty() {
            return Ok(());
        }
        self.exec(0, value, &Breadcrumb::root()).map(|_| ())
    }

    fn exec(&self, id: BlockId, value: &Value, data: &Breadcrumb<'_>) -> Outcome {
        let mut evaluated = Evaluated::default();
        let Some(block) = self.blocks.get(id) else {
            return Ok(evaluated);
        };
        if value.is_null() && block.nullable {
            return Ok(evaluated);
        }
        for step in &block.steps {
            self.exec_step(block, step, value, data, &mut evaluated)?;
        }
        Ok(evaluated)
    }

    fn never(&self, id: BlockId) -> bool {
        self.blocks.get(id).is_some_and(|b| b.never)
    }

    fn exec_step(
        &self,
        block: &Block,
        step: &Step,
        value: &Value,
        data: &Breadcrumb<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let keyword = step.keyword();
        let fail = |kind: ErrorKind, message: String| {
            ValidationError::new(
                kind,
                data.to_pointer(),
                format!("{}/{keyword}", block.path),
                keyword,
                message,
            )
        };
        let fail_at = |member: PathSegment<'_>, kind: ErrorKind, message: String| {
            ValidationError::new(
                kind,
                data.push(member).to_pointer(),
                format!("{}/{keyword}", block.path),
                keyword,
                message,
            )
        };

        match step {
            Step::Type(types) => {
                if !types.matches(value) {
                    return Err(fail(
                        ErrorKind::TypeMismatch,
                        format!("expected {types}, found {}", checks::type_name(value)),
                    ));
                }
            }
            Step::Const(expected) => {
                if !checks::json_equal(value, expected) {
                    return Err(fail(
                        ErrorKind::Const,
                        format!("value must be {}", checks::render(expected)),
                    ));
                }
            }
            Step::Enum(allowed) => {
                if !allowed.iter().any(|v| checks::json_equal(value, v)) {
                    return Err(fail(
                        ErrorKind::Enum,
                        format!("value {} is not allowed", checks::render(value)),
                    ));
                }
            }
            Step::Format(format) => {
                if !check_builtin(format, value) {
                    return Err(fail(
                        ErrorKind::InvalidFormat,
                        format!("{} is not a valid {format}", checks::render(value)),
                    ));
                }
            }
            Step::MinLength(limit) => {
                if let Some(s) = value.as_str() {
                    if checks::char_length(s) < *limit {
                        return Err(fail(ErrorKind::MinLength, format!("shorter than {limit}")));
                    }
                }
            }
            Step::MaxLength(limit) => {
                if let Some(s) = value.as_str() {
                    if checks::char_length(s) > *limit {
                        return Err(fail(ErrorKind::MaxLength, format!("longer than {limit}")));
                    }
                }
            }
            Step::Pattern(pattern) => {
                if let Some(s) = value.as_str() {
                    let re = compiled(pattern, &fail)?;
                    if !re.is_match(s) {
                        return Err(fail(
                            ErrorKind::PatternMismatch,
                            format!("does not match pattern {:?}", pattern.source),
                        ));
                    }
                }
            }
            Step::Minimum { limit, exclusive } => {
                if let Some(v) = value.as_f64() {
                    if *exclusive && v <= *limit {
                        return Err(fail(ErrorKind::ExclusiveMinimum, bound("greater than", *limit)));
                    }
                    if !*exclusive && v < *limit {
                        return Err(fail(ErrorKind::Minimum, bound("at least", *limit)));
                    }
                }
            }
            Step::Maximum { limit, exclusive } => {
                if let Some(v) = value.as_f64() {
                    if *exclusive && v >= *limit {
                        return Err(fail(ErrorKind::ExclusiveMaximum, bound("less than", *limit)));
                    }
                    if !*exclusive && v > *limit {
                        return Err(fail(ErrorKind::Maximum, bound("at most", *limit)));
                    }
                }
            }
            Step::ExclusiveMinimum(limit) => {
                if value.as_f64().is_some_and(|v| v <= *limit) {
                    return Err(fail(ErrorKind::ExclusiveMinimum, bound("greater than", *limit)));
                }
            }
            Step::ExclusiveMaximum(limit) => {
                if value.as_f64().is_some_and(|v| v >= *limit) {
                    return Err(fail(ErrorKind::ExclusiveMaximum, bound("less than", *limit)));
                }
            }
            Step::MultipleOf(divisor) => {
                if let Value::Number(n) = value {
                    if !checks::is_multiple_of(n, *divisor) {
                        return Err(fail(
                            ErrorKind::MultipleOf,
                            format!("{n} is not a multiple of {}", checks::render_number(*divisor)),
                        ));
                    }
                }
            }
            Step::MinItems(limit) => {
                if value.as_array().is_some_and(|a| (a.len() as u64) < *limit) {
                    return Err(fail(ErrorKind::MinItems, format!("fewer than {limit} items")));
                }
            }
            Step::MaxItems(limit) => {
                if value.as_array().is_some_and(|a| (a.len() as u64) > *limit) {
                    return Err(fail(ErrorKind::MaxItems, format!("more than {limit} items")));
                }
            }
            Step::UniqueItems => {
                if let Some((i, j)) = value.as_array().and_then(|a| checks::find_duplicate(a)) {
                    return Err(fail(
                        ErrorKind::UniqueItems,
                        format!("items at indexes {i} and {j} are equal"),
                    ));
                }
            }
            Step::PrefixItems(blocks) => {
                if let Some(items) = value.as_array() {
                    for (i, (item, id)) in items.iter().zip(blocks).enumerate() {
                        if self.never(*id) {
                            return Err(fail_at(
                                PathSegment::Index(i),
                                ErrorKind::ItemsMismatch,
                                format!("item at index {i} is not allowed"),
                            ));
                        }
                        self.exec(*id, item, &data.push(PathSegment::Index(i)))?;
                        evaluated.mark_item(i);
                    }
                }
            }
            Step::Items { start, block: id } => {
                if let Some(items) = value.as_array() {
                    for (i, item) in items.iter().enumerate().skip(*start) {
                        if self.never(*id) {
                            return Err(fail_at(
                                PathSegment::Index(i),
                                ErrorKind::ItemsMismatch,
                                format!("item at index {i} is not allowed"),
                            ));
                        }
                        self.exec(*id, item, &data.push(PathSegment::Index(i)))?;
                    }
                    evaluated.mark_all_items();
                }
            }
            Step::Contains { block: id, min, max } => {
                if let Some(items) = value.as_array() {
                    let mut matched = Vec::new();
                    for (i, item) in items.iter().enumerate() {
                        match self.exec(*id, item, &data.push(PathSegment::Index(i))) {
                            Ok(_) => matched.push(i),
                            Err(e) if e.is_configuration() => return Err(e),
                            Err(_) => {}
                        }
                    }
                    let count = matched.len() as u64;
                    if count < *min || max.is_some_and(|m| count > m) {
                        return Err(fail(
                            ErrorKind::ContainsMatch,
                            format!("{count} matching item(s) is out of range"),
                        ));
                    }
                    for i in matched {
                        evaluated.mark_item(i);
                    }
                }
            }
            Step::MinProperties(limit) => {
                if value.as_object().is_some_and(|m| (m.len() as u64) < *limit) {
                    return Err(fail(ErrorKind::MinProperties, format!("fewer than {limit} properties")));
                }
            }
            Step::MaxProperties(limit) => {
                if value.as_object().is_some_and(|m| (m.len() as u64) > *limit) {
                    return Err(fail(ErrorKind::MaxProperties, format!("more than {limit} properties")));
                }
            }
            Step::Required(names) => {
                if let Some(map) = value.as_object() {
                    if let Some(missing) = names.iter().find(|n| !map.contains_key(*n)) {
                        return Err(fail(
                            ErrorKind::Required,
                            format!("missing required property \"{missing}\""),
                        ));
                    }
                }
            }
            Step::DependentRequired(rules) => {
                if let Some(map) = value.as_object() {
                    for (trigger, names) in rules {
                        if !map.contains_key(trigger) {
                            continue;
                        }
                        if let Some(missing) = names.iter().find(|n| !map.contains_key(*n)) {
                            return Err(fail(
                                ErrorKind::DependentRequired,
                                format!("property \"{missing}\" is required when \"{trigger}\" is present"),
                            ));
                        }
                    }
                }
            }
            Step::Properties(props) => {
                if let Some(map) = value.as_object() {
                    for (name, id) in props {
                        if let Some(member) = map.get(name) {
                            self.exec(*id, member, &data.push(PathSegment::Key(name)))?;
                            evaluated.mark_property(name);
                        }
                    }
                }
            }
            Step::PatternProperties(patterns) => {
                if let Some(map) = value.as_object() {
                    for (pattern, id) in patterns {
                        let re = compiled(pattern, &fail)?;
                        for (key, member) in map.iter().filter(|(k, _)| re.is_match(k)) {
                            self.exec(*id, member, &data.push(PathSegment::Key(key)))?;
                            evaluated.mark_property(key);
                        }
                    }
                }
            }
            Step::PropertyNames(id) => {
                if let Some(map) = value.as_object() {
                    for key in map.keys() {
                        match self.exec(*id, &Value::String(key.clone()), data) {
                            Ok(_) => {}
                            Err(e) if e.is_configuration() => return Err(e),
                            Err(e) => {
                                return Err(fail(
                                    ErrorKind::PropertyName,
                                    format!("property name \"{key}\" is invalid: {}", e.message()),
                                ))
                            }
                        }
                    }
                }
            }
            Step::AdditionalProperties {
                declared,
                patterns,
                rule,
            } => {
                if let Some(map) = value.as_object() {
                    for (key, member) in map {
                        if declared.iter().any(|d| d == key) {
                            continue;
                        }
                        let mut claimed = false;
                        for pattern in patterns {
                            if compiled(pattern, &fail)?.is_match(key) {
                                claimed = true;
                                break;
                            }
                        }
                        if claimed {
                            continue;
                        }
                        self.apply_rule(rule, key, member, data, &fail_at, ErrorKind::AdditionalProperty)?;
                        evaluated.mark_property(key);
                    }
                }
            }
            Step::Discriminator(selector) => {
                if let Some(map) = value.as_object() {
                    let property = &selector.discriminator.property_name;
                    match map.get(property) {
                        None => {
                            return Err(fail(
                                ErrorKind::Discriminator,
                                format!("missing discriminator property \"{property}\""),
                            ))
                        }
                        Some(tag) if !tag.is_string() => {
                            return Err(fail(
                                ErrorKind::Discriminator,
                                format!("discriminator property \"{property}\" must be a string"),
                            ))
                        }
                        Some(_) => {
                            if !selector.branch_refs.is_empty() && selector.select(value).is_none() {
                                return Err(fail(
                                    ErrorKind::Discriminator,
                                    "discriminator value does not select any schema".to_string(),
                                ));
                            }
                        }
                    }
                }
            }
            Step::AllOf(branches) => {
                for id in branches {
                    evaluated.merge(self.exec(*id, value, data)?);
                }
            }
            Step::AnyOf { branches, selector } => {
                if let Some(i) = selector.as_ref().and_then(|s| s.select(value)) {
                    evaluated.merge(self.exec(branches[i], value, data)?);
                    return Ok(());
                }
                for id in branches {
                    match self.exec(*id, value, data) {
                        Ok(claims) => {
                            evaluated.merge(claims);
                            return Ok(());
                        }
                        Err(e) if e.is_configuration() => return Err(e),
                        Err(_) => {}
                    }
                }
                return Err(fail(
                    ErrorKind::AnyOf,
                    format!("value does not match any of {} schemas", branches.len()),
                ));
            }
            Step::OneOf { branches, selector } => {
                if let Some(i) = selector.as_ref().and_then(|s| s.select(value)) {
                    evaluated.merge(self.exec(branches[i], value, data)?);
                    return Ok(());
                }
                let mut passing = Vec::new();
                for id in branches {
                    match self.exec(*id, value, data) {
                        Ok(claims) => passing.push(claims),
                        Err(e) if e.is_configuration() => return Err(e),
                        Err(_) => {}
                    }
                }
                if passing.len() != 1 {
                    return Err(fail(
                        ErrorKind::OneOf,
                        format!("value matches {} schemas, exactly one allowed", passing.len()),
                    ));
                }
                if let Some(claims) = passing.pop() {
                    evaluated.merge(claims);
                }
            }
            Step::Not(id) => match self.exec(*id, value, data) {
                Ok(_) => {
                    return Err(fail(
                        ErrorKind::Not,
                        "value must not match the schema under \"not\"".to_string(),
                    ))
                }
                Err(e) if e.is_configuration() => return Err(e),
                Err(_) => {}
            },
            Step::If {
                condition,
                then,
                otherwise,
            } => match self.exec(*condition, value, data) {
                Ok(claims) => {
                    evaluated.merge(claims);
                    if let Some(id) = then {
                        evaluated.merge(self.exec(*id, value, data)?);
                    }
                }
                Err(e) if e.is_configuration() => return Err(e),
                Err(_) => {
                    if let Some(id) = otherwise {
                        evaluated.merge(self.exec(*id, value, data)?);
                    }
                }
            },
            Step::DependentSchemas(rules) => {
                if let Some(map) = value.as_object() {
                    for (trigger, id) in rules {
                        if map.contains_key(trigger) {
                            evaluated.merge(self.exec(*id, value, data)?);
                        }
                    }
                }
            }
            Step::UnevaluatedProperties(rule) => {
                if let Some(map) = value.as_object() {
                    let leftover: Vec<(&String, &Value)> =
                        map.iter().filter(|(k, _)| !evaluated.has_property(k)).collect();
                    for (key, member) in leftover {
                        self.apply_rule(rule, key, member, data, &fail_at, ErrorKind::UnevaluatedProperty)?;
                        evaluated.mark_property(key);
                    }
                }
            }
            Step::UnevaluatedItems(rule) => {
                if let Some(items) = value.as_array() {
                    for (i, item) in items.iter().enumerate() {
                        if evaluated.has_item(i) {
                            continue;
                        }
                        match rule {
                            Rule::Allow => {}
                            Rule::Deny => {
                                return Err(fail_at(
                                    PathSegment::Index(i),
                                    ErrorKind::UnevaluatedItem,
                                    format!("item at index {i} is not evaluated by any schema"),
                                ))
                            }
                            Rule::Check(id) => {
                                self.exec(*id, item, &data.push(PathSegment::Index(i)))?;
                            }
                        }
                        evaluated.mark_item(i);
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_rule(
        &self,
        rule: &Rule,
        key: &str,
        member: &Value,
        data: &Breadcrumb<'_>,
        fail_at: &dyn Fn(PathSegment<'_>, ErrorKind, String) -> ValidationError,
        denied: ErrorKind,
    ) -> Result<(), ValidationError> {
        match rule {
            Rule::Allow => Ok(()),
            Rule::Deny => Err(fail_at(
                PathSegment::Key(key),
                denied,
                format!("property \"{key}\" is not allowed"),
            )),
            Rule::Check(id) => self
                .exec(*id, member, &data.push(PathSegment::Key(key)))
                .map(|_| ()),
        }
    }
}

fn compiled<'p>(
    pattern: &'p Pattern,
    fail: &dyn Fn(ErrorKind, String) -> ValidationError,
) -> Result<&'p Regex, ValidationError> {
    pattern.regex.as_ref().ok_or_else(|| {
        fail(
            ErrorKind::InvalidPattern,
            format!("invalid regular expression {:?}", pattern.source),
        )
    })
}

fn bound(relation: &str, limit: f64) -> String {
    format!("value must be {relation} {}", checks::render_number(limit))
}
