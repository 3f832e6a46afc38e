//! Interpreter behaviour against a realistic document: error locations,
//! reference handling, discriminator dispatch and configuration failures.

use std::path::PathBuf;
use std::sync::Arc;

use oasv_core::{ErrorKind, OpenApiDocument, SchemaNode};
use oasv_schema::{SchemaValidator, ValidatorOptions};
use serde_json::{json, Value};

fn fixture() -> Arc<OpenApiDocument> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/store.yaml");
    let text = std::fs::read_to_string(&path).expect("fixture readable");
    Arc::new(OpenApiDocument::from_yaml_str(&text).expect("fixture parses"))
}

fn engine() -> SchemaValidator {
    SchemaValidator::default().with_document(fixture())
}

fn component(name: &str) -> SchemaNode {
    SchemaNode::reference(format!("#/components/schemas/{name}"))
}

fn first_error(engine: &SchemaValidator, value: Value, name: &str) -> oasv_core::ValidationError {
    engine
        .validate(&value, &component(name))
        .expect_err("value should be rejected")
        .first()
        .clone()
}

fn order() -> Value {
    json!({
        "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
        "status": "placed",
        "items": [{"sku": "ABC-1234", "quantity": 2, "note": null}],
        "shipTo": {"city": "Lisbon"},
        "billTo": {"city": "Porto", "zip": "4000"}
    })
}

#[test]
fn valid_order_passes() {
    assert!(engine().validate(&order(), &component("Order")).is_ok());
}

#[test]
fn nested_error_carries_full_pointer() {
    let mut value = order();
    value["items"][0]["quantity"] = json!(0);
    let err = first_error(&engine(), value, "Order");
    assert_eq!(err.kind(), ErrorKind::Minimum);
    assert_eq!(err.data_path(), "/items/0/quantity");
    assert_eq!(err.schema_path(), "#/components/schemas/Item/properties/quantity/minimum");
}

#[test]
fn fail_fast_reports_first_in_declaration_order() {
    let mut value = order();
    value["status"] = json!("lost");
    value["items"] = json!([]);
    let failure = engine().validate(&value, &component("Order")).unwrap_err();
    assert_eq!(failure.errors().len(), 1);
    assert_eq!(failure.first().kind(), ErrorKind::Enum);
    assert_eq!(failure.first().data_path(), "/status");
}

#[test]
fn enum_error_lists_allowed_values() {
    let mut value = order();
    value["status"] = json!("aproved");
    let err = first_error(&engine(), value, "Order");
    assert_eq!(err.param("allowed"), Some(&json!(["placed", "approved", "delivered"])));
    assert_eq!(err.param("actual"), Some(&json!("aproved")));
}

#[test]
fn sibling_refs_to_one_component_both_validate() {
    let mut value = order();
    value["billTo"] = json!({"zip": "4000"});
    let err = first_error(&engine(), value, "Order");
    assert_eq!(err.kind(), ErrorKind::Required);
    assert_eq!(err.data_path(), "/billTo");
}

#[test]
fn additional_property_is_located_at_member() {
    let mut value = order();
    value["items"][0]["colour"] = json!("red");
    let err = first_error(&engine(), value, "Order");
    assert_eq!(err.kind(), ErrorKind::AdditionalProperty);
    assert_eq!(err.data_path(), "/items/0/colour");
}

#[test]
fn recursive_schema_over_finite_data_passes() {
    let value = json!({"value": 1, "next": {"value": 2, "next": {"value": 3}}});
    assert!(engine().validate(&value, &component("Node")).is_ok());

    let bad = json!({"value": 1, "next": {"value": "two"}});
    let err = first_error(&engine(), bad, "Node");
    assert_eq!(err.data_path(), "/next/value");
}

#[test]
fn mutual_refs_at_one_location_are_circular() {
    let err = first_error(&engine(), json!({}), "A");
    assert_eq!(err.kind(), ErrorKind::CircularReference);
    assert!(err.is_configuration());
}

#[test]
fn self_ref_cycle_does_not_poison_the_engine() {
    let engine = engine();
    let err = first_error(&engine, json!(1), "Loop");
    assert_eq!(err.kind(), ErrorKind::CircularReference);
    // The same engine keeps working, and raises the cycle again.
    assert!(engine.validate(&order(), &component("Order")).is_ok());
    assert_eq!(first_error(&engine, json!(1), "Loop").kind(), ErrorKind::CircularReference);
}

#[test]
fn discriminator_selects_branch() {
    let engine = engine();
    assert!(engine
        .validate(&json!({"petType": "Cat", "lives": 7}), &component("Pet"))
        .is_ok());
    assert!(engine
        .validate(&json!({"petType": "kitty", "lives": 7}), &component("Pet"))
        .is_ok());

    let err = first_error(&engine, json!({"petType": "Dog", "lives": 7}), "Pet");
    assert_eq!(err.kind(), ErrorKind::Required);
    assert_eq!(err.schema_path(), "#/components/schemas/Dog/required");
}

#[test]
fn discriminator_failures() {
    let engine = engine();
    let missing = first_error(&engine, json!({"lives": 7}), "Pet");
    assert_eq!(missing.kind(), ErrorKind::Discriminator);

    let unknown = first_error(&engine, json!({"petType": "Fish"}), "Pet");
    assert_eq!(unknown.kind(), ErrorKind::Discriminator);
    assert_eq!(unknown.param("target"), Some(&json!("#/components/schemas/Fish")));
}

#[test]
fn unevaluated_properties_see_through_all_of() {
    let engine = engine();
    assert!(engine
        .validate(&json!({"name": "n", "tag": "t"}), &component("Tagged"))
        .is_ok());
    let err = first_error(&engine, json!({"name": "n", "extra": 1}), "Tagged");
    assert_eq!(err.kind(), ErrorKind::UnevaluatedProperty);
    assert_eq!(err.data_path(), "/extra");
}

#[test]
fn configuration_errors_escape_composition() {
    let engine = engine();
    let pattern = first_error(&engine, json!("abc"), "BadPattern");
    assert_eq!(pattern.kind(), ErrorKind::InvalidPattern);

    let missing = first_error(&engine, json!(1), "Negated");
    assert_eq!(missing.kind(), ErrorKind::SchemaNotFound);
    assert!(missing.is_configuration());
}

#[test]
fn coercion_is_opt_in() {
    let schema = SchemaNode::from_value(&json!({
        "type": "object",
        "properties": {"limit": {"type": "integer", "maximum": 50}}
    }))
    .unwrap();
    let value = json!({"limit": "20"});

    let strict = SchemaValidator::default();
    assert_eq!(
        strict.validate(&value, &schema).unwrap_err().first().kind(),
        ErrorKind::TypeMismatch
    );

    let lenient = SchemaValidator::new(ValidatorOptions {
        coerce_types: true,
        ..ValidatorOptions::default()
    });
    assert!(lenient.validate(&value, &schema).is_ok());
    let err = lenient
        .validate(&json!({"limit": "80"}), &schema)
        .unwrap_err();
    assert_eq!(err.first().kind(), ErrorKind::Maximum);
}

#[test]
fn parameters_are_always_coerced() {
    let schema = SchemaNode::from_value(&json!({"type": "integer", "minimum": 1})).unwrap();
    let engine = SchemaValidator::default();
    assert!(engine.validate_parameter("3", &schema).is_ok());
    assert_eq!(
        engine.validate_parameter("0", &schema).unwrap_err().first().kind(),
        ErrorKind::Minimum
    );
    assert_eq!(
        engine.validate_parameter("three", &schema).unwrap_err().first().kind(),
        ErrorKind::TypeMismatch
    );
}

#[test]
fn engine_is_shareable_across_threads() {
    let engine = Arc::new(engine());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let mut value = order();
                value["items"][0]["quantity"] = json!(i);
                engine.validate(&value, &component("Order")).is_ok()
            })
        })
        .collect();
    let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, vec![false, true, true, true]);
}
