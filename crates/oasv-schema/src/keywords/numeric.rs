//! Numeric range keywords. Non-numeric values pass.
//!
//! `minimum`/`maximum` honour the OpenAPI 3.0 boolean `exclusiveMinimum` /
//! `exclusiveMaximum`; the numeric 3.1 form has its own validators.

use oasv_core::{ErrorKind, Keyword, SchemaNode, ValidationError};
use serde_json::Value;

use super::{Evaluated, KeywordValidator};
use crate::checks;
use crate::context::ValidationContext;

fn bound_error(
    ctx: &ValidationContext<'_>,
    kind: ErrorKind,
    keyword: Keyword,
    relation: &str,
    limit: f64,
    actual: f64,
) -> ValidationError {
    ctx.error(
        kind,
        keyword,
        format!(
            "{} must be {relation} {}",
            checks::render_number(actual),
            checks::render_number(limit)
        ),
    )
    .with_param("limit", limit)
    .with_param("actual", actual)
}

/// `minimum`
#[derive(Debug)]
pub struct MinimumValidator;

impl KeywordValidator for MinimumValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Minimum
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(v), Some(limit)) = (instance.as_f64(), node.numeric.minimum) else {
            return Ok(());
        };
        if node.numeric.minimum_is_exclusive() {
            if v > limit {
                return Ok(());
            }
            return Err(bound_error(
                ctx,
                ErrorKind::ExclusiveMinimum,
                Keyword::Minimum,
                "greater than",
                limit,
                v,
            )
            .with_param("exclusive", true));
        }
        if v >= limit {
            return Ok(());
        }
        Err(bound_error(
            ctx,
            ErrorKind::Minimum,
            Keyword::Minimum,
            "greater than or equal to",
            limit,
            v,
        ))
    }
}

/// `maximum`
#[derive(Debug)]
pub struct MaximumValidator;

impl KeywordValidator for MaximumValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Maximum
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(v), Some(limit)) = (instance.as_f64(), node.numeric.maximum) else {
            return Ok(());
        };
        if node.numeric.maximum_is_exclusive() {
            if v < limit {
                return Ok(());
            }
            return Err(bound_error(
                ctx,
                ErrorKind::ExclusiveMaximum,
                Keyword::Maximum,
                "less than",
                limit,
                v,
            )
            .with_param("exclusive", true));
        }
        if v <= limit {
            return Ok(());
        }
        Err(bound_error(
            ctx,
            ErrorKind::Maximum,
            Keyword::Maximum,
            "less than or equal to",
            limit,
            v,
        ))
    }
}

/// Numeric `exclusiveMinimum`
#[derive(Debug)]
pub struct ExclusiveMinimumValidator;

impl KeywordValidator for ExclusiveMinimumValidator {
    fn keyword(&self) -> Keyword {
        Keyword::ExclusiveMinimum
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(v), Some(limit)) = (instance.as_f64(), node.numeric.exclusive_minimum_limit())
        else {
            return Ok(());
        };
        if v > limit {
            return Ok(());
        }
        Err(bound_error(
            ctx,
            ErrorKind::ExclusiveMinimum,
            Keyword::ExclusiveMinimum,
            "greater than",
            limit,
            v,
        ))
    }
}

/// Numeric `exclusiveMaximum`
#[derive(Debug)]
pub struct ExclusiveMaximumValidator;

impl KeywordValidator for ExclusiveMaximumValidator {
    fn keyword(&self) -> Keyword {
        Keyword::ExclusiveMaximum
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(v), Some(limit)) = (instance.as_f64(), node.numeric.exclusive_maximum_limit())
        else {
            return Ok(());
        };
        if v < limit {
            return Ok(());
        }
        Err(bound_error(
            ctx,
            ErrorKind::ExclusiveMaximum,
            Keyword::ExclusiveMaximum,
            "less than",
            limit,
            v,
        ))
    }
}

/// `multipleOf`
#[derive(Debug)]
pub struct MultipleOfValidator;

impl KeywordValidator for MultipleOfValidator {
    fn keyword(&self) -> Keyword {
        Keyword::MultipleOf
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Value::Number(n), Some(divisor)) = (instance, node.numeric.multiple_of) else {
            return Ok(());
        };
        if checks::is_multiple_of(n, divisor) {
            return Ok(());
        }
        Err(ctx
            .error(
                ErrorKind::MultipleOf,
                Keyword::MultipleOf,
                format!("{n} is not a multiple of {}", checks::render_number(divisor)),
            )
            .with_param("multipleOf", divisor)
            .with_param("actual", instance.clone()))
    }
}
