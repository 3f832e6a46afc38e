//! Emitted validators, built by rustc, against the interpreter: same error
//! kind at the same data path for every value.

use std::path::PathBuf;
use std::sync::OnceLock;

use oasv_core::{OpenApiDocument, SchemaNode, COMPONENT_SCHEMA_PREFIX};
use oasv_schema::SchemaValidator;
use proptest::prelude::*;
use serde_json::{json, Value};

fn engine() -> &'static SchemaValidator {
    static ENGINE: OnceLock<SchemaValidator> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../oasv-schema/tests/fixtures/store.yaml");
        let text = std::fs::read_to_string(path).expect("fixture readable");
        let doc = OpenApiDocument::from_yaml_str(&text).expect("fixture parses");
        SchemaValidator::default().with_document(doc)
    })
}

fn interpreted(component: &str, value: &Value) -> Option<(String, String)> {
    let root = SchemaNode::reference(format!("{COMPONENT_SCHEMA_PREFIX}{component}"));
    engine()
        .validate(value, &root)
        .err()
        .map(|f| (f.first().kind().as_str().to_string(), f.first().data_path().to_string()))
}

fn emitted(component: &str, value: &Value) -> Option<(String, String)> {
    oasv_generated::validate(component, value)
        .expect("component has an emitted validator")
        .err()
        .map(|(kind, path)| (kind.to_string(), path))
}

fn assert_agree(component: &str, value: &Value) {
    assert_eq!(
        emitted(component, value),
        interpreted(component, value),
        "{component} on {value}"
    );
}

#[test]
fn every_component_is_emitted() {
    for component in oasv_generated::COMPONENTS {
        assert!(oasv_generated::validate(component, &json!(null)).is_some());
    }
    assert!(oasv_generated::validate("Ghost", &json!(null)).is_none());
}

#[test]
fn discriminated_branch_does_not_skip_later_keywords() {
    let value = json!({"petType": "Cat", "lives": 3, "forbidden": 1});
    assert_eq!(
        emitted("GuardedPet", &value),
        Some(("Not".to_string(), String::new()))
    );
    assert_agree("GuardedPet", &value);
    assert_agree("GuardedPet", &json!({"petType": "Cat", "lives": 3}));
    assert_agree("GuardedPet", &json!({"petType": "Dog", "bark": true, "forbidden": 1}));
}

#[test]
fn fixed_values_agree() {
    let cases = [
        ("Order", json!({
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "status": "placed",
            "items": [{"sku": "ABC-1234", "quantity": 0}]
        })),
        ("Order", json!({
            "id": "not-a-uuid",
            "status": "placed",
            "items": [{"sku": "ABC-1234", "quantity": 1}]
        })),
        ("Order", json!({
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "status": "lost",
            "items": []
        })),
        ("Order", json!({
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "status": "delivered",
            "items": [{"sku": "ABC-1234", "quantity": 2, "note": null}],
            "shipTo": {"city": ""}
        })),
        ("Pet", json!({"petType": "kitty", "lives": 10})),
        ("Pet", json!({"petType": "Fish"})),
        ("Pet", json!({"lives": 3})),
        ("Tagged", json!({"name": "a", "tag": "b"})),
        ("Tagged", json!({"name": "a", "extra": true})),
        ("Tagged", json!({"name": 1})),
        ("Account", json!({"handle": "ab"})),
        ("Account", json!({"handle": "abc", "contact": {"phone": "1"}, "x-id": "7"})),
        ("Account", json!({"handle": "abc", "roles": ["admin", "admin"]})),
    ];
    for (component, value) in cases {
        assert_agree(component, &value);
    }
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

fn object_of(keys: &'static [&'static str], member: BoxedStrategy<Value>) -> impl Strategy<Value = Value> {
    prop::collection::btree_map(prop::sample::select(keys).prop_map(|k| k.to_string()), member, 0..6)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
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
    ]
    .boxed();
    object_of(&["handle", "age", "ratio", "roles", "contact", "x-trace", "other"], member)
}

fn pet_value() -> impl Strategy<Value = Value> {
    let member = prop_oneof![
        leaf(),
        Just(json!("Cat")),
        Just(json!("Dog")),
        Just(json!("kitty")),
        Just(json!("Fish")),
    ]
    .boxed();
    object_of(&["petType", "lives", "bark", "forbidden"], member)
}

fn tagged_value() -> impl Strategy<Value = Value> {
    object_of(&["name", "tag", "extra"], leaf().boxed())
}

proptest! {
    #[test]
    fn account_agrees(value in account_value()) {
        prop_assert_eq!(emitted("Account", &value), interpreted("Account", &value));
    }

    #[test]
    fn pets_agree(value in pet_value()) {
        prop_assert_eq!(emitted("Pet", &value), interpreted("Pet", &value));
        prop_assert_eq!(emitted("GuardedPet", &value), interpreted("GuardedPet", &value));
    }

    #[test]
    fn tagged_agrees(value in tagged_value()) {
        prop_assert_eq!(emitted("Tagged", &value), interpreted("Tagged", &value));
    }

    #[test]
    fn scalars_agree(value in leaf()) {
        for component in oasv_generated::COMPONENTS {
            prop_assert_eq!(emitted(component, &value), interpreted(component, &value));
        }
    }
}
