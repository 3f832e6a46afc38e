//! # Operation Finder
//!
//! Maps an HTTP method and request path to the operation a document
//! declares for it.
//!
//! ## Matching
//!
//! 1. The query string and fragment are dropped.
//! 2. The path is tried as given and with each server base path
//!    (`servers[].url`, path part only) removed from its front.
//! 3. Candidates are templates that declare the method and whose matcher
//!    accepts the path.
//! 4. The candidate with the fewest placeholders wins, so `/users/active`
//!    beats `/users/{id}`; ties go to the template declared first.

use oasv_core::{HttpMethod, OpenApiDocument, OperationObject, Parameter, PathItem};

use crate::error::RouterError;
use crate::template::PathTemplate;

/// A resolved operation with the captured path parameters.
#[derive(Debug, Clone)]
pub struct Operation<'d> {
    /// Matched method.
    pub method: HttpMethod,
    /// Matched template, as declared.
    pub template: &'d str,
    /// The path item holding the operation.
    pub path_item: &'d PathItem,
    /// The operation.
    pub operation: &'d OperationObject,
    /// Captured path parameters in template order.
    pub path_params: Vec<(String, String)>,
    /// Base path that was stripped, if any.
    pub base_path: Option<String>,
}

impl<'d> Operation<'d> {
    /// `operationId`, if declared.
    pub fn operation_id(&self) -> Option<&'d str> {
        self.operation.operation_id.as_deref()
    }

    /// A captured path parameter.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
struct Route<'d> {
    raw: &'d str,
    template: PathTemplate,
    item: &'d PathItem,
}

/// Route table over one document.
#[derive(Debug)]
pub struct OperationFinder<'d> {
    document: &'d OpenApiDocument,
    routes: Vec<Route<'d>>,
    base_paths: Vec<String>,
}

impl<'d> OperationFinder<'d> {
    /// Compile every path template of `document`.
    ///
    /// # Errors
    ///
    /// [`RouterError::MalformedTemplate`] for the first template that does
    /// not compile.
    pub fn new(document: &'d OpenApiDocument) -> Result<Self, RouterError> {
        let routes = document
            .paths
            .iter()
            .map(|(raw, item)| {
                Ok(Route {
                    raw,
                    template: PathTemplate::parse(raw)?,
                    item,
                })
            })
            .collect::<Result<Vec<_>, RouterError>>()?;
        let base_paths = document
            .servers
            .iter()
            .filter_map(|s| base_path(&s.url))
            .collect::<Vec<_>>();
        tracing::debug!(
            templates = routes.len(),
            base_paths = ?base_paths,
            "built operation route table"
        );
        Ok(Self {
            document,
            routes,
            base_paths,
        })
    }

    /// The document routes are drawn from.
    pub fn document(&self) -> &'d OpenApiDocument {
        self.document
    }

    /// Compiled templates in declaration order.
    pub fn templates(&self) -> impl Iterator<Item = &PathTemplate> {
        self.routes.iter().map(|r| &r.template)
    }

    /// Server base paths stripped before matching.
    pub fn base_paths(&self) -> &[String] {
        &self.base_paths
    }

    /// The operation declared for `method` on `path`.
    ///
    /// # Errors
    ///
    /// [`RouterError::OperationNotFound`], listing methods the path is
    /// declared for when it matched under another method.
    pub fn find(&self, method: HttpMethod, path: &str) -> Result<Operation<'d>, RouterError> {
        let path = strip_query(path);
        let mut best: Option<(usize, usize, Operation<'d>)> = None;
        let mut allowed: Vec<HttpMethod> = Vec::new();
        let variants = self.variants(path);

        for (order, route) in self.routes.iter().enumerate() {
            for &(base, candidate) in &variants {
                let Some(params) = route.template.captures(candidate) else {
                    continue;
                };
                let Some(operation) = route.item.operation(method) else {
                    for (m, _) in route.item.operations() {
                        if !allowed.contains(&m) {
                            allowed.push(m);
                        }
                    }
                    continue;
                };
                let rank = (route.template.placeholder_count(), order);
                if best.as_ref().is_some_and(|(p, o, _)| (*p, *o) <= rank) {
                    continue;
                }
                best = Some((
                    rank.0,
                    rank.1,
                    Operation {
                        method,
                        template: route.raw,
                        path_item: route.item,
                        operation,
                        path_params: params,
                        base_path: base.map(str::to_string),
                    },
                ));
            }
        }

        match best {
            Some((_, _, op)) => Ok(op),
            None => {
                allowed.sort();
                Err(RouterError::OperationNotFound {
                    method,
                    path: path.to_string(),
                    allowed,
                })
            }
        }
    }

    /// As [`find`](Self::find), parsing the method case-insensitively.
    ///
    /// # Errors
    ///
    /// [`RouterError::UnknownMethod`] or [`RouterError::OperationNotFound`].
    pub fn find_str(&self, method: &str, path: &str) -> Result<Operation<'d>, RouterError> {
        self.find(method.parse()?, path)
    }

    /// Effective parameters of a found operation, path-level ones overridden
    /// by operation-level ones.
    pub fn parameters(&self, operation: &Operation<'d>) -> Vec<&'d Parameter> {
        self.document
            .effective_parameters(operation.path_item, operation.operation)
    }

    /// The path as given, then with each matching base path removed.
    fn variants<'s, 'p>(&'s self, path: &'p str) -> Vec<(Option<&'s str>, &'p str)> {
        let mut out = vec![(None, path)];
        for base in &self.base_paths {
            if let Some(rest) = path.strip_prefix(base.as_str()) {
                if rest.is_empty() {
                    out.push((Some(base.as_str()), "/"));
                } else if rest.starts_with('/') {
                    out.push((Some(base.as_str()), rest));
                }
            }
        }
        out
    }
}

fn strip_query(path: &str) -> &str {
    let end = path.find(|c: char| c == '?' || c == '#').unwrap_or(path.len());
    match &path[..end] {
        "" => "/",
        p => p,
    }
}

/// The path part of a server URL, without its trailing slash. `None` for a
/// root path or a templated URL.
fn base_path(server_url: &str) -> Option<String> {
    if server_url.contains('{') {
        return None;
    }
    let path = if server_url.starts_with('/') {
        server_url.to_string()
    } else {
        match url::Url::parse(server_url) {
            Ok(url) => url.path().to_string(),
            Err(e) => {
                tracing::debug!(url = server_url, error = %e, "server url has no usable base path");
                return None;
            }
        }
    };
    let trimmed = path.trim_end_matches('/');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
