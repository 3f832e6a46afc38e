//! # OpenAPI Document Model
//!
//! [`OpenApiDocument`] is the read-only root aggregate the engine works
//! against: path templates and their operations, component schemas that
//! `$ref`s point at, servers, webhooks and security requirements.
//!
//! Only the parts validation needs are modelled. Everything else in a real
//! document (tags, externalDocs, examples under media types, ...) is ignored
//! on load rather than rejected.
//!
//! `paths`, `webhooks` and component maps keep declaration order; the path
//! finder uses it to break ties between equally specific templates.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::DocumentError;
use crate::ordered::OrderedMap;
use crate::schema::SchemaNode;

/// Prefix of a `$ref` into `components.parameters`.
pub const COMPONENT_PARAMETER_PREFIX: &str = "#/components/parameters/";

// ---------------------------------------------------------------------------
// HTTP methods
// ---------------------------------------------------------------------------

/// The eight HTTP methods an OpenAPI path item can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
    /// HEAD
    Head,
    /// PATCH
    Patch,
    /// TRACE
    Trace,
}

impl HttpMethod {
    /// Every method, in path-item field order.
    pub const ALL: [HttpMethod; 8] = [
        Self::Get,
        Self::Put,
        Self::Post,
        Self::Delete,
        Self::Options,
        Self::Head,
        Self::Patch,
        Self::Trace,
    ];

    /// Upper-case wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string that names no HTTP method.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown HTTP method: {0}")]
pub struct UnknownMethodError(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMethodError(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Root of an OpenAPI 3.x document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// `openapi` version string, e.g. `3.1.0`.
    pub openapi: String,
    /// `info` block.
    #[serde(default)]
    pub info: Info,
    /// Declared servers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Path templates in declaration order.
    #[serde(default)]
    pub paths: OrderedMap<PathItem>,
    /// Reusable components.
    #[serde(default)]
    pub components: Components,
    /// Webhooks in declaration order.
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub webhooks: OrderedMap<PathItem>,
    /// Document-wide security requirements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
}

/// `info` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    #[serde(default)]
    pub title: String,
    /// API version (not the OpenAPI version).
    #[serde(default)]
    pub version: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One `servers[]` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Server URL; may be absolute or a path such as `/v1`.
    pub url: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `components` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    /// Named schemas, the only `$ref` targets schemas may use.
    #[serde(default)]
    pub schemas: OrderedMap<SchemaNode>,
    /// Named parameters.
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub parameters: OrderedMap<Parameter>,
    /// Security schemes, kept opaque.
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub security_schemes: OrderedMap<Value>,
}

/// Security requirement: scheme name to scopes.
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

/// All operations declared under one path template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// `get`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub get: Option<OperationObject>,
    /// `put`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<OperationObject>,
    /// `post`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<OperationObject>,
    /// `delete`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<OperationObject>,
    /// `options`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<OperationObject>,
    /// `head`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<OperationObject>,
    /// `patch`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<OperationObject>,
    /// `trace`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<OperationObject>,
    /// Parameters shared by every operation on this path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

impl PathItem {
    /// The operation declared for `method`, if any.
    pub fn operation(&self, method: HttpMethod) -> Option<&OperationObject> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }

    /// Declared operations in path-item field order.
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &OperationObject)> {
        HttpMethod::ALL
            .into_iter()
            .filter_map(move |m| self.operation(m).map(|op| (m, op)))
    }
}

/// One operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationObject {
    /// `operationId`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation-level parameters; these override path-level ones by name+location.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code (`200`, `4XX`, `default`).
    #[serde(default)]
    pub responses: OrderedMap<Response>,
    /// Operation-level security; `Some(vec![])` disables document security.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
    /// `deprecated`
    #[serde(default)]
    pub deprecated: bool,
}

impl OperationObject {
    /// Schema of the request body for `media_type`, or for the first declared
    /// JSON-like media type when `media_type` is `None`.
    pub fn request_schema(&self, media_type: Option<&str>) -> Option<&SchemaNode> {
        self.request_body
            .as_ref()
            .and_then(|body| select_media(&body.content, media_type))
    }

    /// Schema of the response for `status`.
    ///
    /// Falls back from the exact code to its range (`4XX`) and then to
    /// `default`.
    pub fn response_schema(&self, status: u16, media_type: Option<&str>) -> Option<&SchemaNode> {
        let exact = status.to_string();
        let range = format!("{}XX", status / 100);
        let response = self
            .responses
            .get(&exact)
            .or_else(|| self.responses.get(&range))
            .or_else(|| self.responses.get(&range.to_lowercase()))
            .or_else(|| self.responses.get("default"))?;
        select_media(&response.content, media_type)
    }
}

fn select_media<'a>(
    content: &'a OrderedMap<MediaType>,
    media_type: Option<&str>,
) -> Option<&'a SchemaNode> {
    let media = match media_type {
        Some(name) => content.get(name),
        None => content
            .iter()
            .find(|(name, _)| name.contains("json"))
            .or_else(|| content.iter().next())
            .map(|(_, m)| m),
    }?;
    media.schema.as_ref()
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Path segment.
    Path,
    /// Query string.
    Query,
    /// Header.
    Header,
    /// Cookie.
    Cookie,
}

/// A parameter, or a `$ref` to one in `components.parameters`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// `$ref` into `components.parameters`.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Parameter name.
    #[serde(default)]
    pub name: String,
    /// Location.
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ParameterLocation>,
    /// Whether the parameter must be present. Always true for path parameters.
    #[serde(default)]
    pub required: bool,
    /// Value schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
}

/// Request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether a body must be sent.
    #[serde(default)]
    pub required: bool,
    /// Media types in declaration order.
    #[serde(default)]
    pub content: OrderedMap<MediaType>,
}

/// Response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Media types in declaration order.
    #[serde(default)]
    pub content: OrderedMap<MediaType>,
}

/// One media type entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Payload schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaNode>,
}

impl OpenApiDocument {
    /// Decode a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        let doc: Self = serde_json::from_str(text)?;
        doc.loaded();
        Ok(doc)
    }

    /// Decode a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, DocumentError> {
        let doc: Self = serde_yaml::from_str(text)?;
        doc.loaded();
        Ok(doc)
    }

    /// Build from an already-decoded value.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let doc: Self = serde_json::from_value(value)?;
        doc.loaded();
        Ok(doc)
    }

    fn loaded(&self) {
        tracing::debug!(
            openapi = %self.openapi,
            paths = self.paths.len(),
            schemas = self.components.schemas.len(),
            "loaded OpenAPI document"
        );
    }

    /// A named component schema.
    pub fn component_schema(&self, name: &str) -> Option<&SchemaNode> {
        self.components.schemas.get(name)
    }

    /// Every operation, in declaration order of templates and then methods.
    pub fn operations(&self) -> impl Iterator<Item = (&str, HttpMethod, &OperationObject)> {
        self.paths.iter().flat_map(|(template, item)| {
            item.operations()
                .map(move |(method, op)| (template, method, op))
        })
    }

    /// Follow a parameter's `$ref` into `components.parameters`.
    ///
    /// Inline parameters are returned as-is. Returns `None` for a dangling
    /// or foreign reference.
    pub fn resolve_parameter<'a>(&'a self, parameter: &'a Parameter) -> Option<&'a Parameter> {
        match &parameter.reference {
            None => Some(parameter),
            Some(r) => r
                .strip_prefix(COMPONENT_PARAMETER_PREFIX)
                .and_then(|name| self.components.parameters.get(name)),
        }
    }

    /// Effective parameters of an operation: path-level parameters overridden
    /// by operation-level ones with the same name and location.
    pub fn effective_parameters<'a>(
        &'a self,
        item: &'a PathItem,
        operation: &'a OperationObject,
    ) -> Vec<&'a Parameter> {
        let mut out: Vec<&Parameter> = Vec::new();
        for p in item
            .parameters
            .iter()
            .chain(operation.parameters.iter())
            .filter_map(|p| self.resolve_parameter(p))
        {
            match out
                .iter_mut()
                .find(|q| q.name == p.name && q.location == p.location)
            {
                Some(slot) => *slot = p,
                None => out.push(p),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PETSTORE: &str = r##"
openapi: 3.1.0
info:
  title: Petstore
  version: "1.0"
servers:
  - url: https://api.example.com/v1
paths:
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        schema: {type: string}
    get:
      operationId: showPet
      parameters:
        - $ref: "#/components/parameters/Verbose"
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: {$ref: "#/components/schemas/Pet"}
        default:
          description: error
          content:
            application/json:
              schema: {type: object}
  /pets:
    post:
      operationId: createPet
      requestBody:
        required: true
        content:
          application/json:
            schema: {$ref: "#/components/schemas/Pet"}
      responses: {}
    get:
      operationId: listPets
      responses: {}
components:
  parameters:
    Verbose:
      name: verbose
      in: query
      schema: {type: boolean}
  schemas:
    Pet:
      type: object
      required: [name]
      properties:
        name: {type: string}
"##;

    fn petstore() -> OpenApiDocument {
        OpenApiDocument::from_yaml_str(PETSTORE).unwrap()
    }

    #[test]
    fn http_method_parsing_is_case_insensitive() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("Patch".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("FETCH".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn operations_in_declaration_order() {
        let doc = petstore();
        let ids: Vec<_> = doc
            .operations()
            .map(|(t, m, op)| (t, m, op.operation_id.clone().unwrap()))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("/pets/{petId}", HttpMethod::Get, "showPet".to_string()),
                ("/pets", HttpMethod::Get, "listPets".to_string()),
                ("/pets", HttpMethod::Post, "createPet".to_string()),
            ]
        );
    }

    #[test]
    fn request_and_response_schemas() {
        let doc = petstore();
        let create = doc.paths.get("/pets").unwrap().post.as_ref().unwrap();
        let body = create.request_schema(None).unwrap();
        assert_eq!(body.reference.as_deref(), Some("#/components/schemas/Pet"));

        let show = doc.paths.get("/pets/{petId}").unwrap().get.as_ref().unwrap();
        assert!(show.response_schema(200, None).unwrap().is_ref_only());
        assert!(!show.response_schema(404, None).unwrap().is_ref_only());
    }

    #[test]
    fn effective_parameters_merge_levels() {
        let doc = petstore();
        let item = doc.paths.get("/pets/{petId}").unwrap();
        let op = item.get.as_ref().unwrap();
        let names: Vec<&str> = doc
            .effective_parameters(item, op)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, ["petId", "verbose"]);
    }

    #[test]
    fn component_schema_lookup() {
        let doc = petstore();
        assert!(doc.component_schema("Pet").is_some());
        assert!(doc.component_schema("Owner").is_none());
        assert_eq!(doc.servers[0].url, "https://api.example.com/v1");
    }

    #[test]
    fn malformed_schema_is_a_document_error() {
        let err = OpenApiDocument::from_json_str(
            r#"{"openapi":"3.0.3","components":{"schemas":{"Bad":{"type":"int"}}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::Json(_)));
        assert!(err.to_string().contains("int"));
    }
}
