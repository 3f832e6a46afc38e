//! `type`, `const`, `enum` and `format`.

use oasv_core::{ErrorKind, Keyword, PrimitiveType, SchemaNode, ValidationError};
use serde_json::Value;

use super::{Evaluated, KeywordValidator};
use crate::checks;
use crate::context::ValidationContext;

/// `type`: the value must be an instance of one of the declared types.
#[derive(Debug)]
pub struct TypeValidator;

impl KeywordValidator for TypeValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Type
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let Some(types) = &node.types.types else {
            return Ok(());
        };
        if types.matches(instance) {
            return Ok(());
        }
        let actual = checks::type_name(instance);
        let mut err = ctx
            .error(
                ErrorKind::TypeMismatch,
                Keyword::Type,
                format!("expected {types}, found {actual}"),
            )
            .with_param("expected", types.names())
            .with_param("actual", actual);
        if instance.is_null() && !node.types.nullable {
            err = err.with_suggestion("declare the schema nullable or add \"null\" to its type");
        } else if instance.is_string()
            && (types.contains(PrimitiveType::Integer) || types.contains(PrimitiveType::Number))
        {
            err = err.with_suggestion("send a JSON number or enable type coercion");
        }
        Err(err)
    }
}

/// `const`: the value must equal the declared value.
#[derive(Debug)]
pub struct ConstValidator;

impl KeywordValidator for ConstValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Const
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let Some(expected) = &node.values.const_value else {
            return Ok(());
        };
        if checks::json_equal(instance, expected) {
            return Ok(());
        }
        Err(ctx
            .error(
                ErrorKind::Const,
                Keyword::Const,
                format!("value must be {}", checks::render(expected)),
            )
            .with_param("expected", expected.clone())
            .with_param("actual", instance.clone()))
    }
}

/// `enum`: the value must equal one of the listed values.
#[derive(Debug)]
pub struct EnumValidator;

impl KeywordValidator for EnumValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Enum
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let Some(allowed) = &node.values.enum_values else {
            return Ok(());
        };
        if allowed.iter().any(|v| checks::json_equal(instance, v)) {
            return Ok(());
        }
        let listed: Vec<String> = allowed.iter().map(checks::render).collect();
        let mut err = ctx
            .error(
                ErrorKind::Enum,
                Keyword::Enum,
                format!(
                    "value {} is not one of [{}]",
                    checks::render(instance),
                    listed.join(", ")
                ),
            )
            .with_param("allowed", allowed.clone())
            .with_param("actual", instance.clone());
        if let Some(candidate) = instance
            .as_str()
            .and_then(|s| checks::closest_match(s, allowed))
        {
            err = err.with_suggestion(format!("did you mean \"{candidate}\"?"));
        }
        Err(err)
    }
}

/// `format`: delegates to the engine's format registry. Unknown names pass.
#[derive(Debug)]
pub struct FormatValidator;

impl KeywordValidator for FormatValidator {
    fn keyword(&self) -> Keyword {
        Keyword::Format
    }

    fn validate(
        &self,
        instance: &Value,
        node: &SchemaNode,
        ctx: &ValidationContext<'_>,
        _evaluated: &mut Evaluated,
    ) -> Result<(), ValidationError> {
        let Some(format) = &node.string.format else {
            return Ok(());
        };
        match ctx.engine().formats().check(format, instance) {
            Some(false) => Err(ctx
                .error(
                    ErrorKind::InvalidFormat,
                    Keyword::Format,
                    format!("{} is not a valid {format}", checks::render(instance)),
                )
                .with_param("format", format.as_str())
                .with_param("actual", instance.clone())),
            _ => Ok(()),
        }
    }
}
