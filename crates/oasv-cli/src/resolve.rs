//! # Resolve Subcommand
//!
//! Prints a component schema with every nested `$ref` expanded inline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use oasv_core::{OpenApiDocument, ValidationError};
use oasv_schema::ReferenceResolver;

use crate::config::CliConfig;
use crate::{load_document, schema_ref, EXIT_ERROR, EXIT_OK};

/// Serialization of the expanded schema.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// YAML.
    #[default]
    Yaml,
    /// Pretty-printed JSON.
    Json,
}

/// Arguments for `oasv resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// OpenAPI document (YAML or JSON).
    pub document: PathBuf,

    /// Component schema name, or a `#/components/schemas/...` ref.
    pub schema: String,

    /// Output serialization.
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,
}

/// Execute `oasv resolve`.
pub fn run_resolve(args: &ResolveArgs, config: &CliConfig) -> Result<u8> {
    let document = load_document(&args.document)?;
    match render(&document, &args.schema, args.output)? {
        Ok(text) => {
            print!("{text}");
            Ok(EXIT_OK)
        }
        Err(error) => {
            println!("{}", config.error_format.formatter().format_error(&error));
            Ok(EXIT_ERROR)
        }
    }
}

/// The expanded schema serialized as `output`, or the resolution error.
pub fn render(
    document: &OpenApiDocument,
    schema: &str,
    output: OutputFormat,
) -> Result<Result<String, ValidationError>> {
    let reference = schema_ref(schema);
    let expanded = match ReferenceResolver::new(document).resolve(&reference) {
        Ok(node) => node,
        Err(e) => return Ok(Err(e)),
    };
    let text = match output {
        OutputFormat::Yaml => serde_yaml::to_string(&expanded).context("failed to encode YAML")?,
        OutputFormat::Json => {
            let mut text =
                serde_json::to_string_pretty(&expanded).context("failed to encode JSON")?;
            text.push('\n');
            text
        }
    };
    Ok(Ok(text))
}
