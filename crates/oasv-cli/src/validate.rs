//! # Validate Subcommand
//!
//! Validates a payload file against either a named component schema
//! (`--schema Pet`) or the body schema of an operation
//! (`--method post --path /pets`, plus `--response 201` for a response
//! body). In operation mode the path parameters captured by the router are
//! validated first, against the schemas of the operation's effective path
//! parameters.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;

use oasv_core::{OpenApiDocument, ParameterLocation, SchemaNode, ValidationFailure};
use oasv_router::{OperationFinder, RouterError};
use oasv_schema::SchemaValidator;

use crate::config::CliConfig;
use crate::{failure_code, load_document, load_value, schema_ref, EXIT_OK};

/// Arguments for `oasv validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// OpenAPI document (YAML or JSON).
    pub document: PathBuf,

    /// Payload to validate (YAML or JSON, `-` for stdin).
    pub data: PathBuf,

    /// Component schema name, or a `#/components/schemas/...` ref.
    #[arg(long, conflicts_with_all = ["method", "path"])]
    pub schema: Option<String>,

    /// Method of the operation whose body is validated.
    #[arg(long, requires = "path")]
    pub method: Option<String>,

    /// Request path of the operation.
    #[arg(long, requires = "method")]
    pub path: Option<String>,

    /// Validate the response body for this status instead of the request body.
    #[arg(long, requires = "method")]
    pub response: Option<u16>,

    /// Media type to pick from the body's `content` map.
    #[arg(long)]
    pub media_type: Option<String>,
}

/// Which schema a payload is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A component schema, by name or ref.
    Schema(String),
    /// The request body of an operation, or its response body for a status.
    Operation {
        /// HTTP method.
        method: String,
        /// Request path, query allowed.
        path: String,
        /// Response status; `None` selects the request body.
        response: Option<u16>,
        /// Media type key.
        media_type: Option<String>,
    },
}

impl ValidateArgs {
    /// The target the flags describe.
    pub fn target(&self) -> Result<Target> {
        match (&self.schema, &self.method, &self.path) {
            (Some(name), _, _) => Ok(Target::Schema(name.clone())),
            (None, Some(method), Some(path)) => Ok(Target::Operation {
                method: method.clone(),
                path: path.clone(),
                response: self.response,
                media_type: self.media_type.clone(),
            }),
            _ => bail!("either --schema or --method with --path is required"),
        }
    }
}

/// Execute `oasv validate`.
pub fn run_validate(args: &ValidateArgs, config: &CliConfig) -> Result<u8> {
    let document = Arc::new(load_document(&args.document)?);
    let data = load_value(&args.data)?;
    let target = args.target()?;

    match check(&document, &target, &data, config)? {
        Ok(()) => {
            println!("OK: {}", args.data.display());
            Ok(EXIT_OK)
        }
        Err(failure) => {
            println!("FAIL: {}", args.data.display());
            println!("{}", config.error_format.formatter().format_failure(&failure));
            Ok(failure_code(&failure))
        }
    }
}

/// Validate `data` against `target`.
///
/// The outer `Result` carries operational errors (malformed templates,
/// unknown methods, operations without a body schema); the inner one is the
/// verdict.
pub fn check(
    document: &Arc<OpenApiDocument>,
    target: &Target,
    data: &Value,
    config: &CliConfig,
) -> Result<Result<(), ValidationFailure>> {
    let engine = SchemaValidator::new(config.options()).with_document(Arc::clone(document));

    match target {
        Target::Schema(name) => {
            let schema = SchemaNode::reference(schema_ref(name));
            Ok(engine.validate(data, &schema))
        }
        Target::Operation {
            method,
            path,
            response,
            media_type,
        } => {
            let finder = OperationFinder::new(document).context("failed to build route table")?;
            let op = match finder.find_str(method, path) {
                Ok(op) => op,
                Err(e @ RouterError::OperationNotFound { .. }) => {
                    return Ok(Err(e.to_validation_error().into()))
                }
                Err(e) => return Err(e.into()),
            };
            tracing::info!(
                operation = op.operation_id().unwrap_or("-"),
                template = op.template,
                "resolved operation"
            );

            for param in finder.parameters(&op) {
                if param.location != Some(ParameterLocation::Path) {
                    continue;
                }
                let (Some(schema), Some(raw)) = (&param.schema, op.path_param(&param.name)) else {
                    continue;
                };
                if let Err(failure) = engine.validate_parameter(raw, schema) {
                    let error = failure
                        .first()
                        .clone()
                        .with_param("parameter", param.name.as_str());
                    return Ok(Err(error.into()));
                }
            }

            let media = media_type.as_deref();
            let schema = match response {
                Some(status) => op.operation.response_schema(*status, media),
                None => op.operation.request_schema(media),
            };
            let Some(schema) = schema else {
                match response {
                    Some(status) => bail!(
                        "operation {} {} declares no body schema for response {status}",
                        op.method,
                        op.template
                    ),
                    None => bail!(
                        "operation {} {} declares no request body schema",
                        op.method,
                        op.template
                    ),
                }
            };
            Ok(engine.validate(data, schema))
        }
    }
}
