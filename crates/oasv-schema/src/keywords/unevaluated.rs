//! `unevaluatedProperties` and `unevaluatedItems`.
//!
//! These run after every other keyword on the node, so the [`Evaluated`]
//! set already holds the claims of `properties`, `patternProperties`,
//! `additionalProperties`, `prefixItems`, `items`, `contains` and of every
//! passing in-place subschema.

use oasv_core::{BoolOrSchema, ErrorKind, Keyword, SchemaNode, ValidationError};
use serde_json::Value;

use super::{Evaluated, KeywordValidator};
use crate::context::{PathSegment, ValidationContext};

/// `unevaluatedProperties`
#[derive(Debug)]
pub struct UnevaluatedPropertiesValidator;

impl KeywordValidator for UnevaluatedPropertiesValidator {
    fn keyword(&self) -> Keyword {
        Keyword::UnevaluatedProperties
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(map), Some(rule)) = (instance.as_object(), node.unevaluated.properties.as_ref())
        else {
            return Ok(());
        };
        let leftover: Vec<(&String, &Value)> =
            map.iter().filter(|(k, _)| !evaluated.has_property(k)).collect();
        for (key, member) in leftover {
            match rule {
                BoolOrSchema::Bool(true) => {}
                BoolOrSchema::Bool(false) => {
                    return Err(ctx
                        .member_error(
                            PathSegment::Key(key),
                            ErrorKind::UnevaluatedProperty,
                            "unevaluatedProperties",
                            format!("property \"{key}\" is not evaluated by any schema"),
                        )
                        .with_param("property", key.as_str()));
                }
                BoolOrSchema::Schema(schema) => {
                    let child = ctx.with_key(key, PathSegment::Keyword("unevaluatedProperties"));
                    ctx.engine().apply(member, schema, &child)?;
                }
            }
            evaluated.mark_property(key);
        }
        Ok(())
    }
}

/// `unevaluatedItems`
#[derive(Debug)]
pub struct UnevaluatedItemsValidator;

impl KeywordValidator for UnevaluatedItemsValidator {
    fn keyword(&self) -> Keyword {
        Keyword::UnevaluatedItems
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(items), Some(rule)) = (instance.as_array(), node.unevaluated.items.as_ref()) else {
            return Ok(());
        };
        for (i, item) in items.iter().enumerate() {
            if evaluated.has_item(i) {
                continue;
            }
            match rule {
                BoolOrSchema::Bool(true) => {}
                BoolOrSchema::Bool(false) => {
                    return Err(ctx
                        .member_error(
                            PathSegment::Index(i),
                            ErrorKind::UnevaluatedItem,
                            "unevaluatedItems",
                            format!("item at index {i} is not evaluated by any schema"),
                        )
                        .with_param("index", i));
                }
                BoolOrSchema::Schema(schema) => {
                    let child = ctx.with_index(i, PathSegment::Keyword("unevaluatedItems"));
                    ctx.engine().apply(item, schema, &child)?;
                }
            }
            evaluated.mark_item(i);
        }
        Ok(())
    }
}
