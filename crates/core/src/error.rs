use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid fixture name: {0}")]
    InvalidFixtureName(String),
    #[error("failed to read {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create directory {}: {source}", .path.display())]
    DirCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to deserialize {}: {source}", .path.display())]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize JSON: {0}")]
    Serialization(serde_json::Error),
    #[error("FHIR error in {}: {source}", .path.display())]
    Fhir {
        path: PathBuf,
        #[source]
        source: fhir::FhirError,
    },

    #[error("identifier error: {0}")]
    Identifier(#[from] eps_identifiers::IdentifierError),
    #[error("OpenAPI error: {0}")]
    OpenApi(#[from] eps_openapi::OpenApiError),
    #[error("sandbox request failed: {0}")]
    Sandbox(String),
}

pub type ToolResult<T> = std::result::Result<T, ToolError>;
