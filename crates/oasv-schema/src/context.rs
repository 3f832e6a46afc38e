//! # Validation Context
//!
//! A [`ValidationContext`] is the immutable bundle threaded through one
//! validation call: where we are in the data, where we are in the schema,
//! which `$ref`s were entered since the last step into the data, and the
//! engine that owns the registry, formats and resolver.
//!
//! ## Breadcrumbs
//!
//! [`Breadcrumb`] is a stack-linked path: every descent borrows its parent
//! and appends one segment, and ascent is simply dropping the child. Two
//! `anyOf` branches built from the same parent share the parent frame but
//! cannot see each other's segments, so no path state is ever shared by
//! mutation. Pointers are only rendered when an error is built.
//!
//! ## Reference trail
//!
//! Entering a `$ref` pushes it on a [`RefTrail`]. Stepping into a property
//! or array element clears the trail, since a recursive schema that consumes
//! data always terminates. Entering a ref that is already on the trail means
//! the schema loops at one data location, which is a `CircularReference`.

use oasv_core::{ErrorKind, Keyword, ValidationError};

use crate::validator::SchemaValidator;

/// One step of a breadcrumb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment<'a> {
    /// An object key.
    Key(&'a str),
    /// An array index.
    Index(usize),
    /// A keyword holding a single subschema (`not`, `items`, `then`, ...).
    Keyword(&'static str),
    /// A keyword holding named subschemas (`properties/name`).
    KeywordKey(&'static str, &'a str),
    /// A keyword holding a list of subschemas (`allOf/2`).
    KeywordIndex(&'static str, usize),
    /// Restart the schema path at a reference target.
    Anchor(&'a str),
}

/// Stack-linked path through the data or the schema.
#[derive(Debug, Clone, Copy)]
pub struct Breadcrumb<'a> {
    parent: Option<&'a Breadcrumb<'a>>,
    segment: Option<PathSegment<'a>>,
    depth: usize,
}

impl<'a> Breadcrumb<'a> {
    /// The empty path.
    pub const fn root() -> Self {
        Self {
            parent: None,
            segment: None,
            depth: 0,
        }
    }

    /// A child path with one more segment.
    pub fn push<'b>(&'b self, segment: PathSegment<'b>) -> Breadcrumb<'b> {
        Breadcrumb {
            parent: Some(self),
            segment: Some(segment),
            depth: self.depth + 1,
        }
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn segments(&self) -> Vec<PathSegment<'a>> {
        let mut out = Vec::with_capacity(self.depth);
        let mut cursor = Some(self);
        while let Some(crumb) = cursor {
            if let Some(seg) = crumb.segment {
                out.push(seg);
                if matches!(seg, PathSegment::Anchor(_)) {
                    break;
                }
            }
            cursor = crumb.parent;
        }
        out.reverse();
        out
    }

    /// Render as a JSON Pointer. The root renders as the empty string.
    pub fn to_pointer(&self) -> String {
        let mut out = String::new();
        for seg in self.segments() {
            match seg {
                PathSegment::Key(k) => {
                    out.push('/');
                    out.push_str(&escape(k));
                }
                PathSegment::Index(i) => {
                    out.push('/');
                    out.push_str(&i.to_string());
                }
                PathSegment::Keyword(kw) => {
                    out.push('/');
                    out.push_str(kw);
                }
                PathSegment::KeywordKey(kw, k) => {
                    out.push('/');
                    out.push_str(kw);
                    out.push('/');
                    out.push_str(&escape(k));
                }
                PathSegment::KeywordIndex(kw, i) => {
                    out.push('/');
                    out.push_str(kw);
                    out.push('/');
                    out.push_str(&i.to_string());
                }
                PathSegment::Anchor(target) => {
                    out.clear();
                    out.push_str(target.trim_start_matches('#'));
                }
            }
        }
        out
    }

    /// Render as a URI fragment (`#/properties/name`).
    pub fn to_fragment(&self) -> String {
        format!("#{}", self.to_pointer())
    }
}

impl Default for Breadcrumb<'_> {
    fn default() -> Self {
        Self::root()
    }
}

fn escape(token: &str) -> String {
    oasv_core::schema::escape_pointer_token(token)
}

/// `$ref`s entered since the last data descent, innermost first.
#[derive(Debug, Clone, Copy)]
pub struct RefTrail<'a> {
    parent: Option<&'a RefTrail<'a>>,
    reference: &'a str,
}

impl<'a> RefTrail<'a> {
    /// Whether `reference` is on this trail.
    pub fn contains(&self, reference: &str) -> bool {
        let mut cursor = Some(self);
        while let Some(link) = cursor {
            if link.reference == reference {
                return true;
            }
            cursor = link.parent;
        }
        false
    }

    /// References on the trail, outermost first.
    pub fn chain(&self) -> Vec<&'a str> {
        let mut out = Vec::new();
        let mut cursor = Some(self);
        while let Some(link) = cursor {
            out.push(link.reference);
            cursor = link.parent;
        }
        out.reverse();
        out
    }
}

/// Immutable per-call validation state.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    engine: &'a SchemaValidator,
    data: Breadcrumb<'a>,
    schema: Breadcrumb<'a>,
    refs: Option<&'a RefTrail<'a>>,
}

impl<'a> ValidationContext<'a> {
    /// A root context for `engine`.
    pub fn new(engine: &'a SchemaValidator) -> Self {
        Self {
            engine,
            data: Breadcrumb::root(),
            schema: Breadcrumb::root(),
            refs: None,
        }
    }

    /// The engine this context validates with.
    pub fn engine(&self) -> &'a SchemaValidator {
        self.engine
    }

    /// Step into an object member. `schema` names the keyword that owns the
    /// member's subschema.
    pub fn with_key<'b>(&'b self, key: &'b str, schema: PathSegment<'b>) -> ValidationContext<'b> {
        ValidationContext {
            engine: self.engine,
            data: self.data.push(PathSegment::Key(key)),
            schema: self.schema.push(schema),
            refs: None,
        }
    }

    /// Step into an array element.
    pub fn with_index<'b>(&'b self, index: usize, schema: PathSegment<'b>) -> ValidationContext<'b> {
        ValidationContext {
            engine: self.engine,
            data: self.data.push(PathSegment::Index(index)),
            schema: self.schema.push(schema),
            refs: None,
        }
    }

    /// Apply another subschema to the same value.
    pub fn in_place<'b>(&'b self, schema: PathSegment<'b>) -> ValidationContext<'b> {
        ValidationContext {
            engine: self.engine,
            data: self.data,
            schema: self.schema.push(schema),
            refs: self.refs,
        }
    }

    /// Build the trail link for entering `reference`.
    ///
    /// Fails with `CircularReference` if the reference was already entered
    /// at this data location.
    pub fn enter_ref<'b>(&'b self, reference: &'b str) -> Result<RefTrail<'b>, ValidationError> {
        if let Some(trail) = self.refs {
            if trail.contains(reference) {
                let mut chain: Vec<&str> = trail.chain();
                chain.push(reference);
                tracing::debug!(chain = ?chain, "reference cycle at one data location");
                return Err(self
                    .error_at(
                        ErrorKind::CircularReference,
                        "$ref",
                        format!("circular reference: {}", chain.join(" -> ")),
                    )
                    .with_param("reference", reference)
                    .with_param("chain", chain));
            }
        }
        Ok(RefTrail {
            parent: self.refs,
            reference,
        })
    }

    /// A context positioned at a reference target.
    pub fn with_ref<'b>(&'b self, trail: &'b RefTrail<'b>) -> ValidationContext<'b> {
        ValidationContext {
            engine: self.engine,
            data: self.data,
            schema: self.schema.push(PathSegment::Anchor(trail.reference)),
            refs: Some(trail),
        }
    }

    /// JSON Pointer of the current value.
    pub fn data_path(&self) -> String {
        self.data.to_pointer()
    }

    /// Fragment of the current schema node.
    pub fn schema_path(&self) -> String {
        self.schema.to_fragment()
    }

    /// Data breadcrumb.
    pub fn data(&self) -> &Breadcrumb<'a> {
        &self.data
    }

    /// Build an error for `keyword` at the current location.
    pub fn error(&self, kind: ErrorKind, keyword: Keyword, message: impl Into<String>) -> ValidationError {
        self.error_at(kind, keyword.as_str(), message)
    }

    /// Build an error located at a member of the current value (`Key` or
    /// `Index`), attributed to `keyword` on the current schema node.
    pub fn member_error(
        &self,
        member: PathSegment<'_>,
        kind: ErrorKind,
        keyword: &str,
        message: impl Into<String>,
    ) -> ValidationError {
        let data = self.data.push(member);
        let schema_path = format!("{}/{}", self.schema_path(), keyword);
        ValidationError::new(kind, data.to_pointer(), schema_path, keyword, message)
    }

    /// Build an error for a keyword spelled `keyword` at the current location.
    pub fn error_at(&self, kind: ErrorKind, keyword: &str, message: impl Into<String>) -> ValidationError {
        let schema_path = format!("{}/{}", self.schema_path(), keyword);
        ValidationError::new(kind, self.data_path(), schema_path, keyword, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_pointer_is_empty() {
        assert_eq!(Breadcrumb::root().to_pointer(), "");
        assert_eq!(Breadcrumb::root().to_fragment(), "#");
    }

    #[test]
    fn nested_pointer() {
        let root = Breadcrumb::root();
        let a = root.push(PathSegment::Key("level1"));
        let b = a.push(PathSegment::Key("level2"));
        let c = b.push(PathSegment::Index(3));
        assert_eq!(c.to_pointer(), "/level1/level2/3");
        assert_eq!(c.depth(), 3);
        // The parent is unchanged by the child's existence.
        assert_eq!(a.to_pointer(), "/level1");
    }

    #[test]
    fn sibling_branches_do_not_observe_each_other() {
        let root = Breadcrumb::root();
        let parent = root.push(PathSegment::Keyword("anyOf"));
        let left = parent.push(PathSegment::Index(0));
        let right = parent.push(PathSegment::Index(1));
        assert_eq!(left.to_pointer(), "/anyOf/0");
        assert_eq!(right.to_pointer(), "/anyOf/1");
    }

    #[test]
    fn keys_are_escaped() {
        let root = Breadcrumb::root();
        let crumb = root.push(PathSegment::KeywordKey("properties", "a/b~c"));
        assert_eq!(crumb.to_pointer(), "/properties/a~1b~0c");
    }

    #[test]
    fn anchor_restarts_schema_path() {
        let root = Breadcrumb::root();
        let props = root.push(PathSegment::KeywordKey("properties", "owner"));
        let target = props.push(PathSegment::Anchor("#/components/schemas/User"));
        let inner = target.push(PathSegment::KeywordKey("properties", "name"));
        assert_eq!(
            inner.to_fragment(),
            "#/components/schemas/User/properties/name"
        );
    }

    #[test]
    fn ref_trail_chain() {
        let outer = RefTrail {
            parent: None,
            reference: "#/components/schemas/A",
        };
        let inner = RefTrail {
            parent: Some(&outer),
            reference: "#/components/schemas/B",
        };
        assert!(inner.contains("#/components/schemas/A"));
        assert!(!outer.contains("#/components/schemas/B"));
        assert_eq!(
            inner.chain(),
            ["#/components/schemas/A", "#/components/schemas/B"]
        );
    }
}
