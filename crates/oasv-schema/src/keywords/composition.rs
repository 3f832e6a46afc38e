//! Composition keywords and the OpenAPI discriminator.
//!
//! Every branch runs against the same value with its own context and its own
//! [`Evaluated`] set; only a passing branch's claims are merged back. A data
//! failure inside `anyOf`, `oneOf`, `not` or `if` is an expected outcome of
//! trying a branch. A configuration failure is not, and always propagates.

use oasv_core::{ErrorKind, Keyword, SchemaNode, ValidationError};
use serde_json::{json, Value};

use super::{Evaluated, KeywordValidator};
use crate::context::{PathSegment, ValidationContext};

/// Branch of `branches` picked by the node's discriminator.
///
/// `None` when the node has no discriminator or the value does not select a
/// branch; the discriminator validator reports the latter before any
/// composition keyword runs.
pub(crate) fn discriminated_branch(
    instance: &Value,
    node: &SchemaNode,
    branches: &[SchemaNode],
) -> Option<usize> {
    let discriminator = node.discriminator.as_ref()?;
    let tag = instance.get(&discriminator.property_name)?.as_str()?;
    let target = discriminator.target_for(tag);
    branches
        .iter()
        .position(|b| b.reference.as_deref() == Some(target.as_str()))
}

fn branch_summary(index: usize, err: &ValidationError) -> Value {
    json!({
        "index": index,
        "kind": err.kind().as_str(),
        "dataPath": err.data_path(),
        "message": err.message(),
    })
}

/// `discriminator`: the tag property must be present and name a branch.
#[derive(Debug)]
pub struct DiscriminatorValidator;

impl KeywordValidator for DiscriminatorValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Discriminator
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(map), Some(discriminator)) = (instance.as_object(), &node.discriminator) else {
            return Ok(());
        };
        let property = discriminator.property_name.as_str();
        let Some(tag) = map.get(property) else {
            return Err(ctx
                .error(
                    ErrorKind::Discriminator,
                    Keyword::Discriminator,
                    format!("missing discriminator property \"{property}\""),
                )
                .with_param("propertyName", property)
                .with_suggestion(format!("add \"{property}\" naming the concrete schema")));
        };
        let Some(tag) = tag.as_str() else {
            return Err(ctx
                .error(
                    ErrorKind::Discriminator,
                    Keyword::Discriminator,
                    format!("discriminator property \"{property}\" must be a string"),
                )
                .with_param("propertyName", property)
                .with_param("actual", tag.clone()));
        };
        let branches = if node.composition.one_of.is_empty() {
            &node.composition.any_of
        } else {
            &node.composition.one_of
        };
        if branches.is_empty() || discriminated_branch(instance, node, branches).is_some() {
            return Ok(());
        }
        let known: Vec<&str> = branches.iter().filter_map(|b| b.reference.as_deref()).collect();
        Err(ctx
            .error(
                ErrorKind::Discriminator,
                Keyword::Discriminator,
                format!("discriminator value \"{tag}\" does not select any schema"),
            )
            .with_param("propertyName", property)
            .with_param("value", tag)
            .with_param("target", discriminator.target_for(tag))
            .with_param("candidates", known))
    }
}

/// `allOf`: every branch must pass.
#[derive(Debug)]
pub struct AllOfValidator;

impl KeywordValidator for AllOfValidator {
    fn keyword(&self) -> Keyword {
        Keyword::AllOf
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        for (i, branch) in node.composition.all_of.iter().enumerate() {
            let branch_ctx = ctx.in_place(PathSegment::KeywordIndex("allOf", i));
            evaluated.merge(ctx.engine().apply(instance, branch, &branch_ctx)?);
        }
        Ok(())
    }
}

/// `anyOf`: the first passing branch wins.
#[derive(Debug)]
pub struct AnyOfValidator;

impl KeywordValidator for AnyOfValidator {
    fn keyword(&self) -> Keyword {
        Keyword::AnyOf
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let branches = &node.composition.any_of;
        if let Some(i) = discriminated_branch(instance, node, branches) {
            let branch_ctx = ctx.in_place(PathSegment::KeywordIndex("anyOf", i));
            evaluated.merge(ctx.engine().apply(instance, &branches[i], &branch_ctx)?);
            return Ok(());
        }
        let mut failures = Vec::with_capacity(branches.len());
        for (i, branch) in branches.iter().enumerate() {
            let branch_ctx = ctx.in_place(PathSegment::KeywordIndex("anyOf", i));
            match ctx.engine().apply(instance, branch, &branch_ctx) {
                Ok(claims) => {
                    evaluated.merge(claims);
                    return Ok(());
                }
                Err(e) if e.is_configuration() => return Err(e),
                Err(e) => failures.push(branch_summary(i, &e)),
            }
        }
        Err(ctx
            .error(
                ErrorKind::AnyOf,
                Keyword::AnyOf,
                format!("value does not match any of {} schemas", branches.len()),
            )
            .with_param("branches", failures))
    }
}

/// `oneOf`: exactly one branch must pass.
#[derive(Debug)]
pub struct OneOfValidator;

impl KeywordValidator for OneOfValidator {
    fn keyword(&self) -> Keyword {
        Keyword::OneOf
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let branches = &node.composition.one_of;
        if let Some(i) = discriminated_branch(instance, node, branches) {
            let branch_ctx = ctx.in_place(PathSegment::KeywordIndex("oneOf", i));
            evaluated.merge(ctx.engine().apply(instance, &branches[i], &branch_ctx)?);
            return Ok(());
        }
        let mut passing: Vec<(usize, Evaluated)> = Vec::new();
        let mut failures = Vec::new();
        for (i, branch) in branches.iter().enumerate() {
            let branch_ctx = ctx.in_place(PathSegment::KeywordIndex("oneOf", i));
            match ctx.engine().apply(instance, branch, &branch_ctx) {
                Ok(claims) => passing.push((i, claims)),
                Err(e) if e.is_configuration() => return Err(e),
                Err(e) => failures.push(branch_summary(i, &e)),
            }
        }
        match passing.len() {
            1 => {
                if let Some((_, claims)) = passing.pop() {
                    evaluated.merge(claims);
                }
                Ok(())
            }
            0 => Err(ctx
                .error(
                    ErrorKind::OneOf,
                    Keyword::OneOf,
                    format!("value does not match any of {} schemas", branches.len()),
                )
                .with_param("passing", Vec::<usize>::new())
                .with_param("branches", failures)),
            _ => {
                let indexes: Vec<usize> = passing.iter().map(|(i, _)| *i).collect();
                Err(ctx
                    .error(
                        ErrorKind::OneOf,
                        Keyword::OneOf,
                        format!(
                            "value matches {} schemas (indexes {:?}), exactly one allowed",
                            indexes.len(),
                            indexes
                        ),
                    )
                    .with_param("passing", indexes))
            }
        }
    }
}

/// `not`: the subschema must fail.
#[derive(Debug)]
pub struct NotValidator;

impl KeywordValidator for NotValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Not
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let Some(schema) = node.composition.not.as_deref() else {
            return Ok(());
        };
        let not_ctx = ctx.in_place(PathSegment::Keyword("not"));
        match ctx.engine().apply(instance, schema, &not_ctx) {
            Ok(_) => {
                let message = if *schema == SchemaNode::default() {
                    "no value is allowed here".to_string()
                } else {
                    "value must not match the schema under \"not\"".to_string()
                };
                Err(ctx.error(ErrorKind::Not, Keyword::Not, message))
            }
            Err(e) if e.is_configuration() => Err(e),
            Err(_) => Ok(()),
        }
    }
}

/// `if`/`then`/`else`. The `if` outcome itself is never reported.
#[derive(Debug)]
pub struct IfValidator;

impl KeywordValidator for IfValidator {
    fn keyword(&self) -> Keyword {
        Keyword::If
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let Some(condition) = node.composition.if_schema.as_deref() else {
            return Ok(());
        };
        let engine = ctx.engine();
        let if_ctx = ctx.in_place(PathSegment::Keyword("if"));
        match engine.apply(instance, condition, &if_ctx) {
            Ok(claims) => {
                evaluated.merge(claims);
                if let Some(then) = node.composition.then_schema.as_deref() {
                    let then_ctx = ctx.in_place(PathSegment::Keyword("then"));
                    evaluated.merge(engine.apply(instance, then, &then_ctx)?);
                }
            }
            Err(e) if e.is_configuration() => return Err(e),
            Err(_) => {
                if let Some(otherwise) = node.composition.else_schema.as_deref() {
                    let else_ctx = ctx.in_place(PathSegment::Keyword("else"));
                    evaluated.merge(engine.apply(instance, otherwise, &else_ctx)?);
                }
            }
        }
        Ok(())
    }
}

/// `dependentSchemas`: each present trigger's schema applies to the whole object.
#[derive(Debug)]
pub struct DependentSchemasValidator;

impl KeywordValidator for DependentSchemasValidator {
    fn keyword(&self) -> Keyword {
        Keyword::DependentSchemas
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let Some(map) = instance.as_object() else {
            return Ok(());
        };
        for (trigger, schema) in &node.object.dependent_schemas {
            if !map.contains_key(trigger) {
                continue;
            }
            let dep_ctx = ctx.in_place(PathSegment::KeywordKey("dependentSchemas", trigger));
            evaluated.merge(ctx.engine().apply(instance, schema, &dep_ctx)?);
        }
        Ok(())
    }
}
