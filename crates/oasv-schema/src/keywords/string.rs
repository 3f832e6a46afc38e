//! `minLength`, `maxLength` and `pattern`. Non-string values pass.

use std::sync::Arc;

use oasv_core::{ErrorKind, Keyword, SchemaNode, ValidationError};
use regex::Regex;
use serde_json::Value;

use super::{Evaluated, KeywordValidator};
use crate::checks;
use crate::context::ValidationContext;

/// Compile `pattern` through the engine's regex cache, reporting a bad
/// expression as a configuration error at `keyword`.
pub(crate) fn compiled_pattern(
    ctx: &ValidationContext<'_>,
    keyword: Keyword,
    pattern: &str,
) -> Result<Arc<Regex>, ValidationError> {
    ctx.engine().regex(pattern).map_err(|e| {
        ctx.error(
            ErrorKind::InvalidPattern,
            keyword,
            format!("invalid regular expression {pattern:?}: {e}"),
        )
        .with_param("pattern", pattern)
    })
}

/// `minLength`
#[derive(Debug)]
pub struct MinLengthValidator;

impl KeywordValidator for MinLengthValidator {
    fn keyword(&self) -> Keyword {
        Keyword::MinLength
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(s), Some(limit)) = (instance.as_str(), node.string.min_length) else {
            return Ok(());
        };
        let length = checks::char_length(s);
        if length >= limit {
            return Ok(());
        }
        Err(ctx
            .error(
                ErrorKind::MinLength,
                Keyword::MinLength,
                format!("string is {length} characters long, at least {limit} required"),
            )
            .with_param("limit", limit)
            .with_param("actual", length))
    }
}

/// `maxLength`
#[derive(Debug)]
pub struct MaxLengthValidator;

impl KeywordValidator for MaxLengthValidator {
    fn keyword(&self) -> Keyword {
        Keyword::MaxLength
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(s), Some(limit)) = (instance.as_str(), node.string.max_length) else {
            return Ok(());
        };
        let length = checks::char_length(s);
        if length <= limit {
            return Ok(());
        }
        Err(ctx
            .error(
                ErrorKind::MaxLength,
                Keyword::MaxLength,
                format!("string is {length} characters long, at most {limit} allowed"),
            )
            .with_param("limit", limit)
            .with_param("actual", length))
    }
}

/// `pattern`: unanchored search.
#[derive(Debug)]
pub struct PatternValidator;

impl KeywordValidator for PatternValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Pattern
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let (Some(s), Some(pattern)) = (instance.as_str(), &node.string.pattern) else {
            return Ok(());
        };
        let re = compiled_pattern(ctx, Keyword::Pattern, pattern)?;
        if re.is_match(s) {
            return Ok(());
        }
        Err(ctx
            .error(
                ErrorKind::PatternMismatch,
                Keyword::Pattern,
                format!("{} does not match pattern {pattern:?}", checks::render(instance)),
            )
            .with_param("pattern", pattern.as_str())
            .with_param("actual", s))
    }
}
