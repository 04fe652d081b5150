//! OpenAPI example synthesis for EPS fixtures.
//!
//! This crate turns an OpenAPI document into concrete JSON examples:
//! - [`schema`] parses a component's `properties` map into a typed [`SchemaNode`] tree
//! - [`synthesize`] walks that tree and builds one example document per component
//! - [`document`] reads the OpenAPI JSON and extracts the literal request/response examples
//!   declared under `paths`
//!
//! Synthesis is pure and deterministic: no I/O and no randomness. Writing the results to disk
//! is the caller's job (see `eps-core`).

pub mod document;
pub mod schema;
pub mod synthesize;

pub use document::{Component, ExampleKind, ExtractedExample, OpenApiDocument};
pub use schema::{ArrayItems, PropertyMap, SchemaNode};
pub use synthesize::{generate_example, synthesize};

/// Errors raised while resolving a schema into an example.
///
/// Every variant carries the dotted property path (`Component.parent.property`) of the node
/// that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("{path} has no type, oneOf or anyOf properties.")]
    MissingType { path: String },

    #[error("{path} has no example or default!")]
    MissingExample { path: String },

    #[error("{path} is malformed: {reason}")]
    Malformed { path: String, reason: String },
}

impl SchemaError {
    /// Returns the dotted path of the offending property.
    pub fn path(&self) -> &str {
        match self {
            SchemaError::MissingType { path }
            | SchemaError::MissingExample { path }
            | SchemaError::Malformed { path, .. } => path,
        }
    }
}

/// Type alias for Results that can fail with a [`SchemaError`].
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors returned when reading an OpenAPI document.
#[derive(Debug, thiserror::Error)]
pub enum OpenApiError {
    #[error("invalid OpenAPI document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Type alias for Results that can fail with an [`OpenApiError`].
pub type OpenApiResult<T> = Result<T, OpenApiError>;

/// Renders the dotted path used in error messages: `path.join(".") + "." + name`.
pub(crate) fn dotted_path(path: &[String], name: &str) -> String {
    format!("{}.{}", path.join("."), name)
}
