//! # Error Formatting
//!
//! Rendering strategies for [`ValidationError`]s. Formatters are pure: they
//! build strings and never write anywhere.
//!
//! | format       | shape                                              |
//! |--------------|----------------------------------------------------|
//! | `concise`    | `/items/0/id: expected integer, found string`      |
//! | `detailed`   | multi-line block with schema path, params, hint    |
//! | `structured` | JSON object per error, JSON array for a list       |

use std::fmt;
use std::str::FromStr;

use oasv_core::violation::path_label;
use oasv_core::{ValidationError, ValidationFailure};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Renders validation errors.
pub trait ErrorFormatter: Send + Sync + fmt::Debug {
    /// Render one error.
    fn format_error(&self, error: &ValidationError) -> String;

    /// Render a list of errors.
    fn format_all(&self, errors: &[ValidationError]) -> String {
        errors
            .iter()
            .map(|e| self.format_error(e))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render every error of a failure.
    fn format_failure(&self, failure: &ValidationFailure) -> String {
        self.format_all(failure.errors())
    }
}

/// One line per error, prefixed by the data path (`(root)` for the root).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConciseFormatter;

impl ErrorFormatter for ConciseFormatter {
    fn format_error(&self, error: &ValidationError) -> String {
        format!("{}: {}", path_label(error.data_path()), error.message())
    }
}

/// A block per error with every field.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetailedFormatter;

impl ErrorFormatter for DetailedFormatter {
    fn format_error(&self, error: &ValidationError) -> String {
        let mut out = format!(
            "error[{}] at {}\n  message: {}\n  keyword: {}\n  schema:  {}",
            error.kind(),
            path_label(error.data_path()),
            error.message(),
            error.keyword(),
            error.schema_path(),
        );
        if !error.params().is_empty() {
            out.push_str("\n  params:");
            for (name, value) in error.params() {
                out.push_str(&format!("\n    {name}: {value}"));
            }
        }
        if let Some(hint) = error.suggestion() {
            out.push_str(&format!("\n  hint:    {hint}"));
        }
        out
    }

    fn format_all(&self, errors: &[ValidationError]) -> String {
        errors
            .iter()
            .map(|e| self.format_error(e))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// JSON output for machine consumers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredFormatter;

impl StructuredFormatter {
    /// The JSON object for one error.
    pub fn to_value(error: &ValidationError) -> Value {
        let mut entry = json!({
            "path": error.data_path(),
            "schemaPath": error.schema_path(),
            "kind": error.kind().as_str(),
            "keyword": error.keyword(),
            "message": error.message(),
            "params": error.params(),
        });
        if let (Some(hint), Some(obj)) = (error.suggestion(), entry.as_object_mut()) {
            obj.insert("suggestion".into(), Value::String(hint.to_string()));
        }
        entry
    }
}

impl ErrorFormatter for StructuredFormatter {
    fn format_error(&self, error: &ValidationError) -> String {
        Self::to_value(error).to_string()
    }

    fn format_all(&self, errors: &[ValidationError]) -> String {
        Value::Array(errors.iter().map(Self::to_value).collect()).to_string()
    }
}

/// Named formatter selection, as used in configuration files and flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorFormat {
    /// [`ConciseFormatter`]
    #[default]
    Concise,
    /// [`DetailedFormatter`]
    Detailed,
    /// [`StructuredFormatter`]
    Structured,
}

impl ErrorFormat {
    /// The formatter for this format.
    pub fn formatter(self) -> Box<dyn ErrorFormatter> {
        match self {
            Self::Concise => Box::new(ConciseFormatter),
            Self::Detailed => Box::new(DetailedFormatter),
            Self::Structured => Box::new(StructuredFormatter),
        }
    }

    /// Name as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concise => "concise",
            Self::Detailed => "detailed",
            Self::Structured => "structured",
        }
    }
}

impl fmt::Display for ErrorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised error format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error format \"{0}\" (expected concise, detailed or structured)")]
pub struct UnknownFormatError(pub String);

impl FromStr for ErrorFormat {
    type Err = UnknownFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concise" | "text" => Ok(Self::Concise),
            "detailed" | "verbose" => Ok(Self::Detailed),
            "structured" | "json" => Ok(Self::Structured),
            _ => Err(UnknownFormatError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oasv_core::ErrorKind;

    fn sample() -> ValidationError {
        ValidationError::new(
            ErrorKind::Enum,
            "/color",
            "#/properties/color/enum",
            "enum",
            "value \"yellow\" is not one of [\"red\", \"green\"]",
        )
        .with_param("allowed", json!(["red", "green"]))
        .with_param("actual", "yellow")
        .with_suggestion("did you mean \"green\"?")
    }

    #[test]
    fn concise_line() {
        let line = ConciseFormatter.format_error(&sample());
        assert_eq!(line, "/color: value \"yellow\" is not one of [\"red\", \"green\"]");
    }

    #[test]
    fn concise_root_label() {
        let err = ValidationError::new(ErrorKind::TypeMismatch, "", "#/type", "type", "expected object");
        assert_eq!(ConciseFormatter.format_error(&err), "(root): expected object");
    }

    #[test]
    fn detailed_block_lists_params_and_hint() {
        let block = DetailedFormatter.format_error(&sample());
        assert!(block.starts_with("error[Enum] at /color"));
        assert!(block.contains("schema:  #/properties/color/enum"));
        assert!(block.contains("actual: \"yellow\""));
        assert!(block.contains("hint:    did you mean \"green\"?"));
    }

    #[test]
    fn structured_is_json() {
        let text = StructuredFormatter.format_all(&[sample()]);
        let parsed: Value = serde_json::from_str(&text).unwrap();
        let entry = &parsed[0];
        assert_eq!(entry["path"], "/color");
        assert_eq!(entry["keyword"], "enum");
        assert_eq!(entry["params"]["allowed"], json!(["red", "green"]));
        assert_eq!(entry["suggestion"], "did you mean \"green\"?");
    }

    #[test]
    fn format_names() {
        assert_eq!("JSON".parse::<ErrorFormat>().unwrap(), ErrorFormat::Structured);
        assert_eq!("detailed".parse::<ErrorFormat>().unwrap(), ErrorFormat::Detailed);
        assert!("xml".parse::<ErrorFormat>().is_err());
    }
}
