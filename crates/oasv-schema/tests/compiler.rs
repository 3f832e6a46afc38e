//! Compiled units against the interpreter: verdict parity, structural-hash
//! caching and compilation of ref-bearing schemas.

use std::path::PathBuf;
use std::sync::Arc;

use oasv_core::{structural_hash, ErrorKind, OpenApiDocument, SchemaNode};
use oasv_schema::{
    compile, compile_with_cache, compile_with_ref_resolution, CompileCache, SchemaValidator,
};
use proptest::prelude::*;
use serde_json::{json, Value};

fn fixture() -> OpenApiDocument {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/store.yaml");
    let text = std::fs::read_to_string(path).expect("fixture readable");
    OpenApiDocument::from_yaml_str(&text).expect("fixture parses")
}

fn schema(v: Value) -> SchemaNode {
    SchemaNode::from_value(&v).unwrap()
}

fn verdict(result: Result<(), oasv_core::ValidationFailure>) -> Option<(ErrorKind, String)> {
    result
        .err()
        .map(|f| (f.first().kind(), f.first().data_path().to_string()))
}

fn account_schema() -> SchemaNode {
    schema(json!({
        "type": "object",
        "required": ["handle"],
        "properties": {
            "handle": {"type": "string", "minLength": 3, "maxLength": 12, "pattern": "^[a-z]"},
            "age": {"type": "integer", "minimum": 0, "maximum": 150},
            "ratio": {"type": "number", "exclusiveMinimum": 0, "multipleOf": 0.25},
            "roles": {
                "type": "array",
                "items": {"enum": ["admin", "user", "guest"]},
                "uniqueItems": true,
                "maxItems": 3
            },
            "contact": {
                "anyOf": [
                    {"type": "string", "format": "email"},
                    {"type": "object", "required": ["phone"]}
                ]
            }
        },
        "patternProperties": {"^x-": {"type": "string"}},
        "additionalProperties": false
    }))
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-5i64..200).prop_map(|n| json!(n)),
        prop_oneof![Just(0.25f64), Just(0.3), Just(-1.5), Just(7.75)].prop_map(|f| json!(f)),
        "[a-zA-Z@.]{0,14}".prop_map(Value::String),
    ]
}

fn account_value() -> impl Strategy<Value = Value> {
    let member = prop_oneof![
        leaf(),
        prop::collection::vec(
            prop_oneof![Just(json!("admin")), Just(json!("user")), Just(json!("root")), leaf()],
            0..5
        )
        .prop_map(Value::Array),
        Just(json!({"phone": "123"})),
        Just(json!({})),
    ];
    prop::collection::btree_map(
        prop_oneof![
            Just("handle".to_string()),
            Just("age".to_string()),
            Just("ratio".to_string()),
            Just("roles".to_string()),
            Just("contact".to_string()),
            Just("x-trace".to_string()),
            Just("other".to_string()),
        ],
        member,
        0..6,
    )
    .prop_map(|m| Value::Object(m.into_iter().collect()))
}

proptest! {
    /// The compiled unit and the interpreter agree on every value.
    #[test]
    fn compiled_and_interpreted_agree(value in account_value()) {
        let s = account_schema();
        let unit = compile(&s, "account").unwrap();
        let interpreted = verdict(SchemaValidator::default().validate(&value, &s));
        let compiled = verdict(unit.validate(&value));
        prop_assert_eq!(compiled, interpreted);
    }

    /// Non-object values fail `type` identically.
    #[test]
    fn scalars_agree(value in leaf()) {
        let s = account_schema();
        let unit = compile(&s, "account").unwrap();
        prop_assert_eq!(
            verdict(unit.validate(&value)),
            verdict(SchemaValidator::default().validate(&value, &s))
        );
    }
}

#[test]
fn structural_hash_ignores_keyword_order() {
    let a = schema(json!({"type": "integer", "minimum": 1, "maximum": 9}));
    let b = schema(json!({"maximum": 9, "type": "integer", "minimum": 1}));
    let c = schema(json!({"type": "integer", "minimum": 2, "maximum": 9}));
    assert_eq!(structural_hash(&a).unwrap(), structural_hash(&b).unwrap());
    assert_ne!(structural_hash(&a).unwrap(), structural_hash(&c).unwrap());
}

#[test]
fn cache_shares_units_across_threads() {
    let cache = Arc::new(CompileCache::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || compile_with_cache(&account_schema(), "account", &cache).unwrap())
        })
        .collect();
    let units: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(units.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(cache.len(), 1);
}

#[test]
fn ref_resolution_compiles_components() {
    let doc = fixture();
    let order = SchemaNode::reference("#/components/schemas/Order");
    let unit = compile_with_ref_resolution(&order, "Order", &doc).unwrap();
    let value = json!({
        "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
        "status": "placed",
        "items": [{"sku": "ABC-1234", "quantity": 0}]
    });
    let failure = unit.validate(&value).unwrap_err();
    assert_eq!(failure.first().kind(), ErrorKind::Minimum);
    assert_eq!(failure.first().data_path(), "/items/0/quantity");
    assert_eq!(
        failure.first().schema_path(),
        "#/components/schemas/Item/properties/quantity/minimum"
    );
}

#[test]
fn compiled_discriminator_dispatches_on_declared_refs() {
    let doc = fixture();
    let pet = SchemaNode::reference("#/components/schemas/Pet");
    let unit = compile_with_ref_resolution(&pet, "Pet", &doc).unwrap();
    let engine = SchemaValidator::default().with_document(doc);
    for value in [
        json!({"petType": "Cat", "lives": 3}),
        json!({"petType": "kitty", "lives": 3}),
        json!({"petType": "Dog", "lives": 3}),
        json!({"petType": "Fish"}),
        json!({"lives": 3}),
        json!({"petType": "Dog", "bark": true}),
    ] {
        assert_eq!(
            verdict(unit.validate(&value)),
            verdict(engine.validate(&value, &pet)),
            "{value}"
        );
    }
}

#[test]
fn discriminated_branch_is_followed_by_later_keywords() {
    let doc = fixture();
    let guarded = SchemaNode::reference("#/components/schemas/GuardedPet");
    let unit = compile_with_ref_resolution(&guarded, "GuardedPet", &doc).unwrap();
    let engine = SchemaValidator::default().with_document(doc);
    let value = json!({"petType": "Cat", "lives": 3, "forbidden": 1});
    assert_eq!(verdict(unit.validate(&value)), Some((ErrorKind::Not, String::new())));
    assert_eq!(verdict(unit.validate(&value)), verdict(engine.validate(&value, &guarded)));

    // The selected branch leaves its step through a label, never a return.
    let source = unit.source();
    assert!(source.contains("'step: {"));
    assert!(source.contains("break 'step;"));
    assert!(source.contains("\"Not\""));
}

#[test]
fn cache_ignores_documentation() {
    let cache = CompileCache::new();
    let bare = account_schema();
    let mut documented = account_schema().to_value();
    documented["title"] = json!("Account");
    documented["properties"]["handle"]["description"] = json!("Login name");
    let documented = schema(documented);
    let first = compile_with_cache(&bare, "bare", &cache).unwrap();
    let second = compile_with_cache(&documented, "documented", &cache).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
}

#[test]
fn emitted_source_names_the_unit() {
    let unit = compile(&account_schema(), "account").unwrap();
    assert!(unit.source().contains("Generated validator for `account`"));
    assert!(unit.source().contains(&unit.hash().to_hex()));
    assert!(unit.source().contains("pub fn validate(data: &Value)"));
}
