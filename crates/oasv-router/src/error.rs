//! Router errors.

use oasv_core::{ErrorKind, HttpMethod, UnknownMethodError, ValidationError};
use thiserror::Error;

/// Failures building or querying an [`OperationFinder`](crate::OperationFinder).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouterError {
    /// A path template could not be compiled.
    #[error("malformed path template \"{template}\": {reason}")]
    MalformedTemplate {
        /// The template as declared.
        template: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No declared operation matches.
    #[error("no operation matches {method} {path}")]
    OperationNotFound {
        /// Requested method.
        method: HttpMethod,
        /// Requested path, query and fragment removed.
        path: String,
        /// Templates that matched the path under another method.
        allowed: Vec<HttpMethod>,
    },

    /// The method string is not an HTTP method.
    #[error(transparent)]
    UnknownMethod(#[from] UnknownMethodError),
}

impl RouterError {
    /// The error as a validation error of kind `OperationNotFound`.
    pub fn to_validation_error(&self) -> ValidationError {
        let mut err = ValidationError::configuration(
            ErrorKind::OperationNotFound,
            "paths",
            self.to_string(),
        );
        if let Self::OperationNotFound {
            method,
            path,
            allowed,
        } = self
        {
            err = err
                .with_param("method", method.as_str())
                .with_param("path", path.as_str());
            if !allowed.is_empty() {
                let names: Vec<&str> = allowed.iter().map(HttpMethod::as_str).collect();
                err = err
                    .with_suggestion(format!("path is declared for {}", names.join(", ")))
                    .with_param("allowed", names);
            }
        }
        err
    }
}

impl From<RouterError> for ValidationError {
    fn from(err: RouterError) -> Self {
        err.to_validation_error()
    }
}
