//! # oasv-router: Operation Path Finder
//!
//! Resolves an HTTP method and request path to the [`OperationObject`]
//! an OpenAPI document declares for it, capturing path parameters by name.
//!
//! ```
//! use oasv_core::{HttpMethod, OpenApiDocument};
//! use oasv_router::OperationFinder;
//!
//! let doc = OpenApiDocument::from_yaml_str(r#"
//! openapi: 3.1.0
//! info: { title: users, version: "1" }
//! paths:
//!   /users/{id}:
//!     get: { operationId: getUser }
//!   /users/active:
//!     get: { operationId: listActive }
//! "#).unwrap();
//! let finder = OperationFinder::new(&doc).unwrap();
//! let op = finder.find(HttpMethod::Get, "/users/active?page=2").unwrap();
//! assert_eq!(op.operation_id(), Some("listActive"));
//! let op = finder.find(HttpMethod::Get, "/users/42").unwrap();
//! assert_eq!(op.path_param("id"), Some("42"));
//! ```
//!
//! [`OperationObject`]: oasv_core::OperationObject

pub mod error;
pub mod finder;
pub mod template;

pub use error::RouterError;
pub use finder::{Operation, OperationFinder};
pub use template::PathTemplate;
