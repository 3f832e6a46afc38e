//! # Reference Resolver
//!
//! Resolves `$ref` pointers of the one supported form,
//! `#/components/schemas/<Name>`, against the owning document.
//!
//! - [`ReferenceResolver::lookup`] returns the named component as declared,
//!   without touching the refs inside it. The interpreter uses this and
//!   follows inner refs lazily as data is consumed.
//! - [`ReferenceResolver::resolve`] and [`ReferenceResolver::expand`] build a
//!   new, ref-free tree. The compiler and the `resolve` CLI command use these.
//!
//! Expansion keeps an explicit stack of the refs currently being expanded.
//! Meeting a ref that is already on the stack raises `CircularReference`. A
//! frame is popped on every exit, success or failure, so two sibling
//! properties may both point at the same component.
//!
//! Remote references, relative file references and pointers below a
//! component (`#/components/schemas/User/properties/id`) are rejected with
//! `UnsupportedReferenceFormat`.

use oasv_core::{
    ErrorKind, OpenApiDocument, SchemaNode, ValidationError, COMPONENT_SCHEMA_PREFIX,
};

/// Resolves component references against one document.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'d> {
    document: &'d OpenApiDocument,
}

impl<'d> ReferenceResolver<'d> {
    /// A resolver over `document`.
    pub fn new(document: &'d OpenApiDocument) -> Self {
        Self { document }
    }

    /// The document refs are resolved against.
    pub fn document(&self) -> &'d OpenApiDocument {
        self.document
    }

    /// The unescaped component name a reference points at.
    ///
    /// # Errors
    ///
    /// `UnsupportedReferenceFormat` for anything but a local component ref.
    pub fn component_name(reference: &str) -> Result<String, ValidationError> {
        let unsupported = |why: &str| {
            ValidationError::configuration(
                ErrorKind::UnsupportedReferenceFormat,
                "$ref",
                format!("unsupported reference \"{reference}\": {why}"),
            )
            .with_param("reference", reference)
            .with_suggestion(format!("use the form {COMPONENT_SCHEMA_PREFIX}<Name>"))
        };
        let Some(raw) = reference.strip_prefix(COMPONENT_SCHEMA_PREFIX) else {
            return Err(unsupported("only local component schemas can be referenced"));
        };
        if raw.is_empty() {
            return Err(unsupported("missing component name"));
        }
        if raw.contains('/') {
            return Err(unsupported("pointers below a component are not supported"));
        }
        Ok(unescape(raw))
    }

    /// The component a reference names, as declared.
    ///
    /// # Errors
    ///
    /// `UnsupportedReferenceFormat` or `SchemaNotFound`.
    pub fn lookup(&self, reference: &str) -> Result<&'d SchemaNode, ValidationError> {
        let name = Self::component_name(reference)?;
        self.document.component_schema(&name).ok_or_else(|| {
            let mut err = ValidationError::configuration(
                ErrorKind::SchemaNotFound,
                "$ref",
                format!("schema \"{name}\" is not defined under components.schemas"),
            )
            .with_param("reference", reference)
            .with_param("name", name.as_str());
            if let Some(candidate) = self.closest_component(&name) {
                err = err.with_suggestion(format!("did you mean \"{candidate}\"?"));
            }
            err
        })
    }

    /// The named component with every nested ref expanded.
    ///
    /// # Errors
    ///
    /// `CircularReference` if expansion re-enters a ref, plus every
    /// [`lookup`](Self::lookup) error.
    pub fn resolve(&self, reference: &str) -> Result<SchemaNode, ValidationError> {
        let mut stack = ResolutionStack::default();
        self.resolve_with(reference, &mut stack)
    }

    /// A copy of `node` with every ref expanded, the node's own included.
    ///
    /// # Errors
    ///
    /// As [`resolve`](Self::resolve).
    pub fn expand(&self, node: &SchemaNode) -> Result<SchemaNode, ValidationError> {
        let mut stack = ResolutionStack::default();
        self.expand_with(node, &mut stack)
    }

    fn resolve_with(
        &self,
        reference: &str,
        stack: &mut ResolutionStack,
    ) -> Result<SchemaNode, ValidationError> {
        if stack.contains(reference) {
            let chain = stack.chain_to(reference);
            tracing::debug!(chain = ?chain, "reference cycle during expansion");
            return Err(ValidationError::configuration(
                ErrorKind::CircularReference,
                "$ref",
                format!("circular reference: {}", chain.join(" -> ")),
            )
            .with_param("reference", reference)
            .with_param("chain", chain));
        }
        let target = self.lookup(reference)?;
        stack.push(reference);
        let expanded = self.expand_with(target, stack);
        stack.pop();
        expanded
    }

    fn expand_with(
        &self,
        node: &SchemaNode,
        stack: &mut ResolutionStack,
    ) -> Result<SchemaNode, ValidationError> {
        if let Some(reference) = &node.reference {
            return self.resolve_with(reference, stack);
        }
        node.try_map_subschemas(|child| self.expand_with(child, stack))
    }

    fn closest_component(&self, name: &str) -> Option<&'d str> {
        let lowered = name.to_ascii_lowercase();
        self.document
            .components
            .schemas
            .keys()
            .find(|candidate| candidate.to_ascii_lowercase() == lowered)
    }
}

/// Refs currently being expanded, outermost first.
#[derive(Debug, Default)]
struct ResolutionStack {
    frames: Vec<String>,
}

impl ResolutionStack {
    fn contains(&self, reference: &str) -> bool {
        self.frames.iter().any(|r| r == reference)
    }

    fn push(&mut self, reference: &str) {
        self.frames.push(reference.to_string());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    /// The frames from the first occurrence of `reference`, closed with it.
    fn chain_to(&self, reference: &str) -> Vec<String> {
        let start = self
            .frames
            .iter()
            .position(|r| r == reference)
            .unwrap_or(0);
        let mut chain: Vec<String> = self.frames[start..].to_vec();
        chain.push(reference.to_string());
        chain
    }
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use oasv_core::PrimitiveType;

    fn doc(yaml: &str) -> OpenApiDocument {
        OpenApiDocument::from_yaml_str(yaml).unwrap()
    }

    fn library() -> OpenApiDocument {
        doc(r##"
openapi: 3.1.0
info: { title: library, version: "1" }
paths: {}
components:
  schemas:
    Author:
      type: object
      properties:
        name: { type: string }
    Book:
      type: object
      properties:
        author: { $ref: "#/components/schemas/Author" }
        editor: { $ref: "#/components/schemas/Author" }
    Node:
      type: object
      properties:
        next: { $ref: "#/components/schemas/Node" }
    A:
      allOf: [{ $ref: "#/components/schemas/B" }]
    B:
      allOf: [{ $ref: "#/components/schemas/A" }]
    "a/b":
      type: string
"##)
    }

    #[test]
    fn lookup_returns_declared_node() {
        let d = library();
        let resolver = ReferenceResolver::new(&d);
        let book = resolver.lookup("#/components/schemas/Book").unwrap();
        assert!(book.object.property("author").unwrap().reference.is_some());
    }

    #[test]
    fn resolve_expands_sibling_refs_to_same_component() {
        let d = library();
        let resolver = ReferenceResolver::new(&d);
        let book = resolver.resolve("#/components/schemas/Book").unwrap();
        assert!(!book.contains_refs());
        for field in ["author", "editor"] {
            let expanded = book.object.property(field).unwrap();
            assert!(expanded.object.property("name").is_some(), "{field}");
        }
    }

    #[test]
    fn self_reference_is_circular() {
        let d = library();
        let resolver = ReferenceResolver::new(&d);
        let err = resolver.resolve("#/components/schemas/Node").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircularReference);
        assert_eq!(
            err.param("chain").unwrap(),
            &serde_json::json!(["#/components/schemas/Node", "#/components/schemas/Node"])
        );
    }

    #[test]
    fn cycle_does_not_poison_later_resolutions() {
        let d = library();
        let resolver = ReferenceResolver::new(&d);
        let err = resolver.resolve("#/components/schemas/A").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircularReference);
        assert!(resolver.resolve("#/components/schemas/Book").is_ok());
        assert!(resolver.resolve("#/components/schemas/Author").is_ok());
    }

    #[test]
    fn unsupported_formats() {
        let d = library();
        let resolver = ReferenceResolver::new(&d);
        for reference in [
            "https://example.com/schemas/User.json",
            "other.yaml#/components/schemas/User",
            "#/definitions/User",
            "#/components/schemas/",
            "#/components/schemas/Book/properties/author",
        ] {
            let err = resolver.lookup(reference).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedReferenceFormat, "{reference}");
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn missing_component() {
        let d = library();
        let resolver = ReferenceResolver::new(&d);
        let err = resolver.lookup("#/components/schemas/book").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaNotFound);
        assert_eq!(err.suggestion(), Some("did you mean \"Book\"?"));
    }

    #[test]
    fn escaped_names() {
        let d = library();
        let resolver = ReferenceResolver::new(&d);
        let node = resolver.lookup("#/components/schemas/a~1b").unwrap();
        assert!(node.types.types.as_ref().unwrap().contains(PrimitiveType::String));
    }

    #[test]
    fn expand_inline_node() {
        let d = library();
        let resolver = ReferenceResolver::new(&d);
        let inline = SchemaNode::from_value(&serde_json::json!({
            "type": "array",
            "items": { "$ref": "#/components/schemas/Author" }
        }))
        .unwrap();
        let expanded = resolver.expand(&inline).unwrap();
        assert!(!expanded.contains_refs());
        assert!(expanded.array.items.as_ref().unwrap().has(oasv_core::Keyword::Properties));
    }
}
