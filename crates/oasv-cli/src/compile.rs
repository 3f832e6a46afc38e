//! # Compile Subcommand
//!
//! Compiles a component schema, refs resolved, and writes the emitted Rust
//! source to a file or stdout. The unit's structural hash is logged so two
//! builds of the same schema can be compared.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use oasv_core::{OpenApiDocument, SchemaNode};
use oasv_schema::{compile_with_ref_resolution, CompileError, CompiledUnit};

use crate::config::CliConfig;
use crate::{load_document, schema_ref, EXIT_ERROR, EXIT_OK};

/// Arguments for `oasv compile`.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// OpenAPI document (YAML or JSON).
    pub document: PathBuf,

    /// Component schema name, or a `#/components/schemas/...` ref.
    pub schema: String,

    /// Write the source here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Unit name embedded in the source. Defaults to the schema argument.
    #[arg(long)]
    pub name: Option<String>,
}

/// Execute `oasv compile`.
pub fn run_compile(args: &CompileArgs, config: &CliConfig) -> Result<u8> {
    let document = load_document(&args.document)?;
    let name = args.name.as_deref().unwrap_or(&args.schema);

    let unit = match build(&document, &args.schema, name) {
        Ok(unit) => unit,
        Err(CompileError::Resolution(error)) => {
            println!("{}", config.error_format.formatter().format_error(&error));
            return Ok(EXIT_ERROR);
        }
        Err(e) => return Err(e).with_context(|| format!("failed to compile {}", args.schema)),
    };

    tracing::info!(
        unit = unit.name(),
        hash = %unit.hash().to_hex(),
        blocks = unit.program().blocks().len(),
        steps = unit.program().step_count(),
        "compiled schema"
    );

    match &args.output {
        Some(path) => {
            std::fs::write(path, unit.source())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{} -> {}", unit.hash().to_hex(), path.display());
        }
        None => print!("{}", unit.source()),
    }
    Ok(EXIT_OK)
}

/// Compile the component `schema` under `name`.
pub fn build(
    document: &OpenApiDocument,
    schema: &str,
    name: &str,
) -> Result<CompiledUnit, CompileError> {
    let root = SchemaNode::reference(schema_ref(schema));
    compile_with_ref_resolution(&root, name, document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oasv_core::ErrorKind;
    use serde_json::json;

    const DOC: &str = r##"
openapi: 3.1.0
info: { title: t, version: "1" }
paths: {}
components:
  schemas:
    Size:
      type: integer
      minimum: 1
    Box:
      type: object
      required: [size]
      properties:
        size: { $ref: "#/components/schemas/Size" }
    Node:
      type: object
      properties:
        next: { $ref: "#/components/schemas/Node" }
"##;

    #[test]
    fn compiled_unit_validates() {
        let doc = OpenApiDocument::from_yaml_str(DOC).unwrap();
        let unit = build(&doc, "Box", "box").unwrap();
        assert_eq!(unit.name(), "box");
        assert!(unit.validate(&json!({"size": 3})).is_ok());
        let failure = unit.validate(&json!({"size": 0})).unwrap_err();
        assert_eq!(failure.first().kind(), ErrorKind::Minimum);
        assert_eq!(failure.first().data_path(), "/size");
    }

    #[test]
    fn recursive_schema_is_refused() {
        let doc = OpenApiDocument::from_yaml_str(DOC).unwrap();
        let err = build(&doc, "Node", "node").unwrap_err();
        let CompileError::Resolution(error) = err else {
            panic!("expected a resolution error");
        };
        assert_eq!(error.kind(), ErrorKind::CircularReference);
    }
}
