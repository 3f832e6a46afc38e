//! Array keywords. Non-array values pass.

use oasv_core::{ErrorKind, Keyword, SchemaNode, ValidationError};
use serde_json::Value;

use super::{Evaluated, KeywordValidator};
use crate::checks;
use crate::context::{PathSegment, ValidationContext};

/// `minItems`
#[derive(Debug)]
pub struct MinItemsValidator;

impl KeywordValidator for MinItemsValidator {
    fn keyword(&self) -> Keyword {
        Keyword::MinItems
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(items), Some(limit)) = (instance.as_array(), node.array.min_items) else {
            return Ok(());
        };
        let count = items.len() as u64;
        if count >= limit {
            return Ok(());
        }
        Err(ctx
            .error(
                ErrorKind::MinItems,
                Keyword::MinItems,
                format!("array has {count} items, at least {limit} required"),
            )
            .with_param("limit", limit)
            .with_param("actual", count))
    }
}

/// `maxItems`
#[derive(Debug)]
pub struct MaxItemsValidator;

impl KeywordValidator for MaxItemsValidator {
    fn keyword(&self) -> Keyword {
        Keyword::MaxItems
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(items), Some(limit)) = (instance.as_array(), node.array.max_items) else {
            return Ok(());
        };
        let count = items.len() as u64;
        if count <= limit {
            return Ok(());
        }
        Err(ctx
            .error(
                ErrorKind::MaxItems,
                Keyword::MaxItems,
                format!("array has {count} items, at most {limit} allowed"),
            )
            .with_param("limit", limit)
            .with_param("actual", count))
    }
}

/// `uniqueItems`
#[derive(Debug)]
pub struct UniqueItemsValidator;

impl KeywordValidator for UniqueItemsValidator {
    fn keyword(&self) -> Keyword {
        Keyword::UniqueItems
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let Some(items) = instance.as_array() else {
            return Ok(());
        };
        if !node.array.unique_items {
            return Ok(());
        }
        match checks::find_duplicate(items) {
            None => Ok(()),
            Some((first, second)) => Err(ctx
                .error(
                    ErrorKind::UniqueItems,
                    Keyword::UniqueItems,
                    format!("items at indexes {first} and {second} are equal"),
                )
                .with_param("duplicates", vec![first, second])),
        }
    }
}

fn rejected_item(ctx: &ValidationContext<'_>, keyword: Keyword, index: usize) -> ValidationError {
    ctx.member_error(
        PathSegment::Index(index),
        ErrorKind::ItemsMismatch,
        keyword.as_str(),
        format!("item at index {index} is not allowed"),
    )
    .with_param("index", index)
}

/// `prefixItems`: positional schemas for the leading elements.
#[derive(Debug)]
pub struct PrefixItemsValidator;

impl KeywordValidator for PrefixItemsValidator {
    fn keyword(&self) -> Keyword {
        Keyword::PrefixItems
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let Some(items) = instance.as_array() else {
            return Ok(());
        };
        for (i, (item, schema)) in items.iter().zip(&node.array.prefix_items).enumerate() {
            if schema.is_never() {
                return Err(rejected_item(ctx, Keyword::PrefixItems, i));
            }
            let child = ctx.with_index(i, PathSegment::KeywordIndex("prefixItems", i));
            ctx.engine().apply(item, schema, &child)?;
            evaluated.mark_item(i);
        }
        Ok(())
    }
}

/// `items`: applies to every element after the `prefixItems`.
#[derive(Debug)]
pub struct ItemsValidator;

impl KeywordValidator for ItemsValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Items
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(items), Some(schema)) = (instance.as_array(), node.array.items.as_deref()) else {
            return Ok(());
        };
        let start = node.array.prefix_items.len();
        for (i, item) in items.iter().enumerate().skip(start) {
            if schema.is_never() {
                return Err(rejected_item(ctx, Keyword::Items, i)
                    .with_param("limit", start));
            }
            let child = ctx.with_index(i, PathSegment::Keyword("items"));
            ctx.engine().apply(item, schema, &child)?;
        }
        evaluated.mark_all_items();
        Ok(())
    }
}

/// `contains`, bounded by `minContains` (default 1) and `maxContains`.
#[derive(Debug)]
pub struct ContainsValidator;

impl KeywordValidator for ContainsValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Contains
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(items), Some(schema)) = (instance.as_array(), node.array.contains.as_deref())
        else {
            return Ok(());
        };
        let mut matched = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let child = ctx.with_index(i, PathSegment::Keyword("contains"));
            match ctx.engine().apply(item, schema, &child) {
                Ok(_) => matched.push(i),
                Err(e) if e.is_configuration() => return Err(e),
                Err(_) => {}
            }
        }
        let min = node.array.min_contains.unwrap_or(1);
        let count = matched.len() as u64;
        let message = if count < min {
            Some(format!(
                "array must contain at least {min} matching item(s), found {count}"
            ))
        } else {
            node.array.max_contains.filter(|max| count > *max).map(|max| {
                format!("array must contain at most {max} matching item(s), found {count}")
            })
        };
        if let Some(message) = message {
            let mut err = ctx
                .error(ErrorKind::ContainsMatch, Keyword::Contains, message)
                .with_param("minContains", min)
                .with_param("matched", count);
            if let Some(max) = node.array.max_contains {
                err = err.with_param("maxContains", max);
            }
            return Err(err);
        }
        for i in matched {
            evaluated.mark_item(i);
        }
        Ok(())
    }
}
