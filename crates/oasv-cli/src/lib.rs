//! # oasv-cli: Command-Line Interface
//!
//! The `oasv` binary drives the engine from the shell:
//!
//! - `oasv validate`: payload against a component schema or an operation.
//! - `oasv route`: which operation a method and path resolve to.
//! - `oasv resolve`: a component schema with every ref expanded.
//! - `oasv compile`: the Rust source of a compiled validator.
//!
//! ```bash
//! oasv validate petstore.yaml pet.json --schema Pet
//! oasv validate petstore.yaml body.json --method post --path /pets
//! oasv route petstore.yaml GET /pets/42
//! oasv resolve petstore.yaml Pet --output json
//! oasv compile petstore.yaml Pet -o pet_validator.rs
//! ```
//!
//! ## Exit Codes
//!
//! `0` success, `1` data validation failure (or, for `route`, no matching
//! operation), `2` configuration or operational error.
//!
//! ## Crate Policy
//!
//! Handlers parse input and print results; validation and routing live in
//! `oasv-schema` and `oasv-router`.

pub mod compile;
pub mod config;
pub mod resolve;
pub mod route;
pub mod validate;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use oasv_core::schema::escape_pointer_token;
use oasv_core::{OpenApiDocument, ValidationFailure, COMPONENT_SCHEMA_PREFIX};

/// Exit code for success.
pub const EXIT_OK: u8 = 0;
/// Exit code for a data validation failure.
pub const EXIT_INVALID: u8 = 1;
/// Exit code for configuration and operational errors.
pub const EXIT_ERROR: u8 = 2;

/// Load an OpenAPI document. `.json` files are read as JSON, anything else
/// as YAML.
pub fn load_document(path: &Path) -> Result<OpenApiDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read document {}", path.display()))?;
    let doc = if is_json(path) {
        OpenApiDocument::from_json_str(&text)
    } else {
        OpenApiDocument::from_yaml_str(&text)
    };
    doc.with_context(|| format!("failed to parse document {}", path.display()))
}

/// Load a payload. `-` reads stdin; JSON is a subset of YAML so anything
/// that is not `.json` goes through the YAML decoder.
pub fn load_value(path: &Path) -> Result<Value> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read payload from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read payload {}", path.display()))?
    };
    if is_json(path) {
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse JSON payload {}", path.display()))
    } else {
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse payload {}", path.display()))
    }
}

/// A component ref for `name`. Full `#/...` refs pass through.
pub fn schema_ref(name: &str) -> String {
    if name.starts_with("#/") {
        name.to_string()
    } else {
        format!("{COMPONENT_SCHEMA_PREFIX}{}", escape_pointer_token(name))
    }
}

/// Exit code for a failed validation.
pub fn failure_code(failure: &ValidationFailure) -> u8 {
    if failure.is_configuration() {
        EXIT_ERROR
    } else {
        EXIT_INVALID
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
