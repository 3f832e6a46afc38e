//! Subcommand handlers against documents and payloads on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oasv_cli::compile::{run_compile, CompileArgs};
use oasv_cli::config::{CliConfig, ConfigArgs};
use oasv_cli::resolve::{run_resolve, OutputFormat, ResolveArgs};
use oasv_cli::route::{run_route, RouteArgs};
use oasv_cli::validate::{check, run_validate, Target, ValidateArgs};
use oasv_cli::{load_document, load_value, EXIT_ERROR, EXIT_INVALID, EXIT_OK};
use oasv_core::ErrorKind;
use serde_json::json;

const PETSTORE: &str = r##"
openapi: 3.0.3
info: { title: Petstore, version: "1.0" }
servers:
  - url: https://pets.example.com/v1
paths:
  /pets:
    post:
      operationId: createPet
      requestBody:
        content:
          application/json:
            schema: { $ref: "#/components/schemas/NewPet" }
      responses:
        "201":
          description: created
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Pet" }
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        schema: { type: integer, minimum: 1 }
    get:
      operationId: showPet
      responses:
        default:
          description: pet
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Pet" }
components:
  schemas:
    NewPet:
      type: object
      required: [name]
      properties:
        name: { type: string, minLength: 2 }
        tag: { type: string, nullable: true }
        age: { type: integer, minimum: 0 }
    Pet:
      allOf:
        - $ref: "#/components/schemas/NewPet"
        - type: object
          required: [id]
          properties:
            id: { type: integer }
"##;

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        ws.write("petstore.yaml", PETSTORE);
        ws
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn validate_args(document: &Path, data: &Path) -> ValidateArgs {
    ValidateArgs {
        document: document.to_path_buf(),
        data: data.to_path_buf(),
        schema: None,
        method: None,
        path: None,
        response: None,
        media_type: None,
    }
}

#[test]
fn documents_and_payloads_load_from_yaml_and_json() {
    let ws = Workspace::new();
    let doc = load_document(&ws.path("petstore.yaml")).unwrap();
    assert!(doc.component_schema("Pet").is_some());

    let yaml = ws.write("pet.yaml", "name: Rex\nage: 3\n");
    let json_file = ws.write("pet.json", r#"{"name":"Rex","age":3}"#);
    assert_eq!(load_value(&yaml).unwrap(), load_value(&json_file).unwrap());

    let broken = ws.write("broken.json", "{");
    assert!(load_value(&broken).is_err());
    assert!(load_document(&ws.path("missing.yaml")).is_err());
}

#[test]
fn component_schema_verdicts() {
    let ws = Workspace::new();
    let doc = Arc::new(load_document(&ws.path("petstore.yaml")).unwrap());
    let config = CliConfig::default();
    let target = Target::Schema("NewPet".into());

    assert!(check(&doc, &target, &json!({"name": "Rex"}), &config)
        .unwrap()
        .is_ok());

    let failure = check(&doc, &target, &json!({"name": "R", "age": -1}), &config)
        .unwrap()
        .unwrap_err();
    assert_eq!(failure.errors().len(), 1);
    assert_eq!(failure.first().kind(), ErrorKind::MinLength);
    assert_eq!(failure.first().data_path(), "/name");

    let missing = check(&doc, &Target::Schema("Ghost".into()), &json!({}), &config)
        .unwrap()
        .unwrap_err();
    assert_eq!(missing.first().kind(), ErrorKind::SchemaNotFound);
}

#[test]
fn coercion_follows_configuration() {
    let ws = Workspace::new();
    let doc = Arc::new(load_document(&ws.path("petstore.yaml")).unwrap());
    let target = Target::Schema("NewPet".into());
    let payload = json!({"name": "Rex", "age": "4"});

    let strict = check(&doc, &target, &payload, &CliConfig::default())
        .unwrap()
        .unwrap_err();
    assert_eq!(strict.first().kind(), ErrorKind::TypeMismatch);

    let lenient = CliConfig {
        coerce_types: true,
        ..CliConfig::default()
    };
    assert!(check(&doc, &target, &payload, &lenient).unwrap().is_ok());
}

#[test]
fn operation_bodies_and_path_parameters() {
    let ws = Workspace::new();
    let doc = Arc::new(load_document(&ws.path("petstore.yaml")).unwrap());
    let config = CliConfig::default();
    let op = |method: &str, path: &str, response: Option<u16>| Target::Operation {
        method: method.into(),
        path: path.into(),
        response,
        media_type: None,
    };

    // Request body, with the server base path in front.
    assert!(check(&doc, &op("POST", "/v1/pets", None), &json!({"name": "Rex"}), &config)
        .unwrap()
        .is_ok());

    // Response body goes through allOf and the status-specific schema.
    let failure = check(&doc, &op("post", "/pets", Some(201)), &json!({"name": "Rex"}), &config)
        .unwrap()
        .unwrap_err();
    assert_eq!(failure.first().kind(), ErrorKind::Required);

    // `default` response, after the path parameter is coerced and checked.
    assert!(check(&doc, &op("GET", "/pets/9", Some(200)), &json!({"id": 9, "name": "Rex"}), &config)
        .unwrap()
        .is_ok());
    let failure = check(&doc, &op("GET", "/pets/0", Some(200)), &json!({}), &config)
        .unwrap()
        .unwrap_err();
    assert_eq!(failure.first().kind(), ErrorKind::Minimum);
    assert_eq!(failure.first().param("parameter"), Some(&json!("petId")));

    // Wrong method is a routing verdict, a missing body schema is an error.
    let failure = check(&doc, &op("DELETE", "/pets/9", None), &json!({}), &config)
        .unwrap()
        .unwrap_err();
    assert_eq!(failure.first().kind(), ErrorKind::OperationNotFound);
    assert!(check(&doc, &op("GET", "/pets/9", None), &json!({}), &config).is_err());
}

#[test]
fn exit_codes() {
    let ws = Workspace::new();
    let doc = ws.path("petstore.yaml");
    let config = CliConfig::default();
    let good = ws.write("good.json", r#"{"name":"Rex"}"#);
    let bad = ws.write("bad.json", r#"{"name":7}"#);

    let mut args = validate_args(&doc, &good);
    args.schema = Some("NewPet".into());
    assert_eq!(run_validate(&args, &config).unwrap(), EXIT_OK);

    let mut args = validate_args(&doc, &bad);
    args.schema = Some("NewPet".into());
    assert_eq!(run_validate(&args, &config).unwrap(), EXIT_INVALID);

    let mut args = validate_args(&doc, &good);
    args.schema = Some("Nope".into());
    assert_eq!(run_validate(&args, &config).unwrap(), EXIT_ERROR);

    // Neither --schema nor --method/--path.
    assert!(run_validate(&validate_args(&doc, &good), &config).is_err());

    let route = |method: &str, path: &str| RouteArgs {
        document: doc.clone(),
        method: method.into(),
        path: path.into(),
    };
    assert_eq!(run_route(&route("get", "/pets/1"), &config).unwrap(), EXIT_OK);
    assert_eq!(run_route(&route("get", "/owners"), &config).unwrap(), EXIT_INVALID);

    let resolve = ResolveArgs {
        document: doc.clone(),
        schema: "Pet".into(),
        output: OutputFormat::Json,
    };
    assert_eq!(run_resolve(&resolve, &config).unwrap(), EXIT_OK);
}

#[test]
fn compile_writes_source() {
    let ws = Workspace::new();
    let out = ws.path("pet_validator.rs");
    let args = CompileArgs {
        document: ws.path("petstore.yaml"),
        schema: "Pet".into(),
        output: Some(out.clone()),
        name: Some("pet".into()),
    };
    assert_eq!(run_compile(&args, &CliConfig::default()).unwrap(), EXIT_OK);
    let source = fs::read_to_string(out).unwrap();
    assert!(source.contains("Generated validator for `pet`"));
    assert!(source.contains("pub fn validate(data: &Value)"));
}

#[test]
fn config_file_feeds_the_handlers() {
    let ws = Workspace::new();
    let config_path = ws.write("oasv.yaml", "coerce_types: true\nerror_format: structured\n");
    let config = CliConfig::from_file(&config_path)
        .unwrap()
        .with_flags(&ConfigArgs::default())
        .unwrap();
    assert!(config.coerce_types);

    let doc = Arc::new(load_document(&ws.path("petstore.yaml")).unwrap());
    let target = Target::Schema("NewPet".into());
    assert!(check(&doc, &target, &json!({"name": "Rex", "age": "2"}), &config)
        .unwrap()
        .is_ok());
}
