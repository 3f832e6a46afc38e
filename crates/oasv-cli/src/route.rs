//! # Route Subcommand
//!
//! Prints the operation a method and path resolve to, with the captured
//! path parameters.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use oasv_core::{OpenApiDocument, ValidationError};
use oasv_router::{OperationFinder, RouterError};

use crate::config::CliConfig;
use crate::{load_document, EXIT_INVALID, EXIT_OK};

/// Arguments for `oasv route`.
#[derive(Args, Debug)]
pub struct RouteArgs {
    /// OpenAPI document (YAML or JSON).
    pub document: PathBuf,

    /// HTTP method, any case.
    pub method: String,

    /// Request path; query and fragment are ignored.
    pub path: String,
}

/// Execute `oasv route`.
pub fn run_route(args: &RouteArgs, config: &CliConfig) -> Result<u8> {
    let document = load_document(&args.document)?;
    match describe(&document, &args.method, &args.path)? {
        Ok(text) => {
            print!("{text}");
            Ok(EXIT_OK)
        }
        Err(error) => {
            println!("{}", config.error_format.formatter().format_error(&error));
            Ok(EXIT_INVALID)
        }
    }
}

/// A text description of the matched operation, or the not-found error.
pub fn describe(
    document: &OpenApiDocument,
    method: &str,
    path: &str,
) -> Result<Result<String, ValidationError>> {
    let finder = OperationFinder::new(document).context("failed to build route table")?;
    let op = match finder.find_str(method, path) {
        Ok(op) => op,
        Err(e @ RouterError::OperationNotFound { .. }) => return Ok(Err(e.to_validation_error())),
        Err(e) => return Err(e.into()),
    };

    let mut out = String::new();
    writeln!(out, "{} {}", op.method, op.template)?;
    writeln!(out, "  operationId: {}", op.operation_id().unwrap_or("-"))?;
    if let Some(base) = &op.base_path {
        writeln!(out, "  basePath: {base}")?;
    }
    for (name, value) in &op.path_params {
        writeln!(out, "  {name} = {value}")?;
    }
    Ok(Ok(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oasv_core::ErrorKind;

    const DOC: &str = r#"
openapi: 3.0.3
info: { title: t, version: "1" }
servers: [{ url: /api }]
paths:
  /pets/{petId}:
    get: { operationId: showPet }
"#;

    #[test]
    fn describes_the_match() {
        let doc = OpenApiDocument::from_yaml_str(DOC).unwrap();
        let text = describe(&doc, "get", "/api/pets/7").unwrap().unwrap();
        assert!(text.starts_with("GET /pets/{petId}\n"));
        assert!(text.contains("operationId: showPet"));
        assert!(text.contains("basePath: /api"));
        assert!(text.contains("petId = 7"));
    }

    #[test]
    fn not_found_is_a_verdict() {
        let doc = OpenApiDocument::from_yaml_str(DOC).unwrap();
        let err = describe(&doc, "put", "/pets/7").unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationNotFound);
    }

    #[test]
    fn unknown_method_is_operational() {
        let doc = OpenApiDocument::from_yaml_str(DOC).unwrap();
        assert!(describe(&doc, "FETCH", "/pets/7").is_err());
    }
}
