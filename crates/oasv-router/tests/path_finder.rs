//! Route resolution against a document with overlapping templates.

use oasv_core::{ErrorKind, HttpMethod, OpenApiDocument, ParameterLocation};
use oasv_router::{OperationFinder, RouterError};
use proptest::prelude::*;

const DOC: &str = r##"
openapi: 3.1.0
info: { title: users, version: "1" }
servers:
  - url: https://api.example.com/v2/
  - url: /internal
paths:
  /users/{id}:
    parameters:
      - { name: id, in: path, required: true, schema: { type: integer } }
      - { name: trace, in: header, schema: { type: string } }
    get:
      operationId: getUser
      parameters:
        - { name: trace, in: header, required: true, schema: { type: string, minLength: 8 } }
    delete:
      operationId: deleteUser
  /users/active:
    get:
      operationId: listActiveUsers
  /users/{id}/posts/{postId}:
    get:
      operationId: getPost
  /{collection}/{id}:
    get:
      operationId: genericGet
  /users/{name}:
    get:
      operationId: shadowed
  /:
    get:
      operationId: root
"##;

fn doc() -> OpenApiDocument {
    OpenApiDocument::from_yaml_str(DOC).unwrap()
}

#[test]
fn literal_template_beats_placeholder() {
    let d = doc();
    let finder = OperationFinder::new(&d).unwrap();
    let op = finder.find(HttpMethod::Get, "/users/active").unwrap();
    assert_eq!(op.operation_id(), Some("listActiveUsers"));
    assert!(op.path_params.is_empty());

    let op = finder.find(HttpMethod::Get, "/users/17").unwrap();
    assert_eq!(op.operation_id(), Some("getUser"));
    assert_eq!(op.path_param("id"), Some("17"));
    assert_eq!(op.template, "/users/{id}");
}

#[test]
fn equal_specificity_goes_to_first_declared() {
    let d = doc();
    let finder = OperationFinder::new(&d).unwrap();
    // `/users/{id}` and `/users/{name}` both have one placeholder.
    let op = finder.find(HttpMethod::Get, "/users/alice").unwrap();
    assert_eq!(op.operation_id(), Some("getUser"));
    // `/{collection}/{id}` has two, so it only wins when nothing else matches.
    let op = finder.find(HttpMethod::Get, "/orders/9").unwrap();
    assert_eq!(op.operation_id(), Some("genericGet"));
    assert_eq!(op.path_param("collection"), Some("orders"));
}

#[test]
fn multi_parameter_capture() {
    let d = doc();
    let finder = OperationFinder::new(&d).unwrap();
    let op = finder.find(HttpMethod::Get, "/users/3/posts/99").unwrap();
    assert_eq!(op.operation_id(), Some("getPost"));
    assert_eq!(
        op.path_params,
        vec![("id".to_string(), "3".to_string()), ("postId".to_string(), "99".to_string())]
    );
}

#[test]
fn query_fragment_and_base_path_are_ignored() {
    let d = doc();
    let finder = OperationFinder::new(&d).unwrap();
    assert_eq!(finder.base_paths(), ["/v2".to_string(), "/internal".to_string()]);

    let op = finder.find(HttpMethod::Get, "/v2/users/active?limit=5#x").unwrap();
    assert_eq!(op.operation_id(), Some("listActiveUsers"));
    assert_eq!(op.base_path.as_deref(), Some("/v2"));

    let op = finder.find(HttpMethod::Get, "/internal").unwrap();
    assert_eq!(op.operation_id(), Some("root"));

    let op = finder.find(HttpMethod::Get, "").unwrap();
    assert_eq!(op.operation_id(), Some("root"));
}

#[test]
fn method_is_part_of_the_match() {
    let d = doc();
    let finder = OperationFinder::new(&d).unwrap();
    let op = finder.find_str("delete", "/users/5").unwrap();
    assert_eq!(op.operation_id(), Some("deleteUser"));

    let err = finder.find(HttpMethod::Post, "/users/5").unwrap_err();
    let RouterError::OperationNotFound { allowed, .. } = &err else {
        panic!("expected OperationNotFound, got {err:?}");
    };
    assert!(allowed.contains(&HttpMethod::Get));
    assert!(allowed.contains(&HttpMethod::Delete));

    let validation = err.to_validation_error();
    assert_eq!(validation.kind(), ErrorKind::OperationNotFound);
    assert!(validation.is_configuration());
    assert!(validation.suggestion().is_some());
}

#[test]
fn unknown_path_and_method() {
    let d = doc();
    let finder = OperationFinder::new(&d).unwrap();
    assert!(matches!(
        finder.find(HttpMethod::Get, "/a/b/c/d"),
        Err(RouterError::OperationNotFound { .. })
    ));
    assert!(matches!(
        finder.find_str("FETCH", "/users/1"),
        Err(RouterError::UnknownMethod(_))
    ));
}

#[test]
fn operation_parameters_override_path_level() {
    let d = doc();
    let finder = OperationFinder::new(&d).unwrap();
    let op = finder.find(HttpMethod::Get, "/users/1").unwrap();
    let params = finder.parameters(&op);
    assert_eq!(params.len(), 2);
    let trace = params
        .iter()
        .find(|p| p.location == Some(ParameterLocation::Header))
        .unwrap();
    assert!(trace.required);
}

#[test]
fn malformed_template_is_reported_at_construction() {
    let d = OpenApiDocument::from_yaml_str(
        r#"
openapi: 3.1.0
info: { title: broken, version: "1" }
paths:
  /ok: { get: {} }
  "/users/{id":
    get: {}
"#,
    )
    .unwrap();
    let err = OperationFinder::new(&d).unwrap_err();
    assert!(matches!(err, RouterError::MalformedTemplate { ref template, .. } if template == "/users/{id"));
}

proptest! {
    /// Any single segment routes to the `/users/{id}` family with the segment captured.
    #[test]
    fn any_segment_is_captured(segment in "[a-zA-Z0-9_-]{1,16}") {
        let d = doc();
        let finder = OperationFinder::new(&d).unwrap();
        let op = finder.find(HttpMethod::Get, &format!("/users/{segment}")).unwrap();
        if segment == "active" {
            prop_assert_eq!(op.operation_id(), Some("listActiveUsers"));
        } else {
            prop_assert_eq!(op.operation_id(), Some("getUser"));
            prop_assert_eq!(op.path_param("id"), Some(segment.as_str()));
        }
    }
}
