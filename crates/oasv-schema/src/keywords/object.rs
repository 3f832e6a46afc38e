//! Object keywords. Non-object values pass.
//!
//! Member checks walk the schema's declaration order, not the payload's, so
//! the first reported violation is stable regardless of how the client
//! serialised the object.

use oasv_core::{BoolOrSchema, ErrorKind, Keyword, SchemaNode, ValidationError};
use serde_json::{Map, Value};

use super::string::compiled_pattern;
use super::{Evaluated, KeywordValidator};
use crate::context::{PathSegment, ValidationContext};

/// `minProperties`
#[derive(Debug)]
pub struct MinPropertiesValidator;

impl KeywordValidator for MinPropertiesValidator {
    fn keyword(&self) -> Keyword {
        Keyword::MinProperties
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(map), Some(limit)) = (instance.as_object(), node.object.min_properties) else {
            return Ok(());
        };
        let count = map.len() as u64;
        if count >= limit {
            return Ok(());
        }
        Err(ctx
            .error(
                ErrorKind::MinProperties,
                Keyword::MinProperties,
                format!("object has {count} properties, at least {limit} required"),
            )
            .with_param("limit", limit)
            .with_param("actual", count))
    }
}

/// `maxProperties`
#[derive(Debug)]
pub struct MaxPropertiesValidator;

impl KeywordValidator for MaxPropertiesValidator {
    fn keyword(&self) -> Keyword {
        Keyword::MaxProperties
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(map), Some(limit)) = (instance.as_object(), node.object.max_properties) else {
            return Ok(());
        };
        let count = map.len() as u64;
        if count <= limit {
            return Ok(());
        }
        Err(ctx
            .error(
                ErrorKind::MaxProperties,
                Keyword::MaxProperties,
                format!("object has {count} properties, at most {limit} allowed"),
            )
            .with_param("limit", limit)
            .with_param("actual", count))
    }
}

/// `required`: reported at the object, naming the first missing property.
#[derive(Debug)]
pub struct RequiredValidator;

impl KeywordValidator for RequiredValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Required
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let Some(map) = instance.as_object() else {
            return Ok(());
        };
        let Some(missing) = node.object.required.iter().find(|name| !map.contains_key(*name))
        else {
            return Ok(());
        };
        Err(ctx
            .error(
                ErrorKind::Required,
                Keyword::Required,
                format!("missing required property \"{missing}\""),
            )
            .with_param("property", missing.as_str())
            .with_param("required", node.object.required.clone())
            .with_suggestion(format!("add the \"{missing}\" property")))
    }
}

/// `dependentRequired`
#[derive(Debug)]
pub struct DependentRequiredValidator;

impl KeywordValidator for DependentRequiredValidator {
    fn keyword(&self) -> Keyword {
        Keyword::DependentRequired
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let Some(map) = instance.as_object() else {
            return Ok(());
        };
        for (trigger, names) in &node.object.dependent_required {
            if !map.contains_key(trigger) {
                continue;
            }
            if let Some(missing) = names.iter().find(|name| !map.contains_key(*name)) {
                return Err(ctx
                    .error(
                        ErrorKind::DependentRequired,
                        Keyword::DependentRequired,
                        format!("property \"{missing}\" is required when \"{trigger}\" is present"),
                    )
                    .with_param("property", missing.as_str())
                    .with_param("dependent", trigger.as_str()));
            }
        }
        Ok(())
    }
}

/// `properties`
#[derive(Debug)]
pub struct PropertiesValidator;

impl KeywordValidator for PropertiesValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Properties
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
        for (name, schema) in &node.object.properties {
            let Some(member) = map.get(name) else {
                continue;
            };
            let child = ctx.with_key(name, PathSegment::KeywordKey("properties", name));
            ctx.engine().apply(member, schema, &child)?;
            evaluated.mark_property(name);
        }
        Ok(())
    }
}

/// `patternProperties`
#[derive(Debug)]
pub struct PatternPropertiesValidator;

impl KeywordValidator for PatternPropertiesValidator {
    fn keyword(&self) -> Keyword {
        Keyword::PatternProperties
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
        for (pattern, schema) in &node.object.pattern_properties {
            let re = compiled_pattern(ctx, Keyword::PatternProperties, pattern)?;
            for (key, member) in map.iter().filter(|(k, _)| re.is_match(k)) {
                let child = ctx.with_key(key, PathSegment::KeywordKey("patternProperties", pattern));
                ctx.engine().apply(member, schema, &child)?;
                evaluated.mark_property(key);
            }
        }
        Ok(())
    }
}

/// `propertyNames`: every key, as a string, must validate.
#[derive(Debug)]
pub struct PropertyNamesValidator;

impl KeywordValidator for PropertyNamesValidator {
    fn keyword(&self) -> Keyword {
        Keyword::PropertyNames
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(map), Some(schema)) = (instance.as_object(), node.object.property_names.as_deref())
        else {
            return Ok(());
        };
        for key in map.keys() {
            let name = Value::String(key.clone());
            let child = ctx.in_place(PathSegment::Keyword("propertyNames"));
            match ctx.engine().apply(&name, schema, &child) {
                Ok(_) => {}
                Err(e) if e.is_configuration() => return Err(e),
                Err(e) => {
                    return Err(ctx
                        .error(
                            ErrorKind::PropertyName,
                            Keyword::PropertyNames,
                            format!("property name \"{key}\" is invalid: {}", e.message()),
                        )
                        .with_param("property", key.as_str())
                        .with_param("reason", e.kind().as_str()))
                }
            }
        }
        Ok(())
    }
}

/// Whether `key` is claimed by `properties` or `patternProperties`.
fn is_declared(
    ctx: &ValidationContext<'_>,
    node: &SchemaNode,
    key: &str,
) -> Result<bool, ValidationError> {
    if node.object.property(key).is_some() {
        return Ok(true);
    }
    for (pattern, _) in &node.object.pattern_properties {
        if compiled_pattern(ctx, Keyword::PatternProperties, pattern)?.is_match(key) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn undeclared<'v>(
    ctx: &ValidationContext<'_>,
    node: &SchemaNode,
    map: &'v Map<String, Value>,
) -> Result<Vec<(&'v String, &'v Value)>, ValidationError> {
    let mut out = Vec::new();
    for (key, member) in map {
        if !is_declared(ctx, node, key)? {
            out.push((key, member));
        }
    }
    Ok(out)
}

/// `additionalProperties`: keys not claimed by `properties` or `patternProperties`.
#[derive(Debug)]
pub struct AdditionalPropertiesValidator;

impl KeywordValidator for AdditionalPropertiesValidator {
    fn keyword(&self) -> Keyword {
        Keyword::AdditionalProperties
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(map), Some(additional)) =
            (instance.as_object(), node.object.additional_properties.as_ref())
        else {
            return Ok(());
        };
        for (key, member) in undeclared(ctx, node, map)? {
            match additional {
                BoolOrSchema::Bool(true) => {}
                BoolOrSchema::Bool(false) => {
                    return Err(ctx
                        .member_error(
                            PathSegment::Key(key),
                            ErrorKind::AdditionalProperty,
                            "additionalProperties",
                            format!("property \"{key}\" is not allowed"),
                        )
                        .with_param("property", key.as_str())
                        .with_suggestion(format!("remove \"{key}\" or declare it under properties")));
                }
                BoolOrSchema::Schema(schema) => {
                    let child = ctx.with_key(key, PathSegment::Keyword("additionalProperties"));
                    ctx.engine().apply(member, schema, &child)?;
                }
            }
            evaluated.mark_property(key);
        }
        Ok(())
    }
}
