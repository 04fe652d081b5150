//! # EPS Core
//!
//! Fixture maintenance workflows for the EPS example corpus.
//!
//! This crate owns everything that touches the filesystem:
//! - Locating stored exchanges under the examples root ([`fixtures`])
//! - Refreshing prescription identifiers and dates through a sandbox API ([`refresh`])
//! - Writing synthesized and extracted OpenAPI examples to disk ([`examples`])
//!
//! **No transport concerns**: the sandbox is reached through the [`SandboxClient`] trait; the live
//! HTTP client belongs in the `eps` binary.

pub mod config;
pub mod constants;
pub mod error;
pub mod examples;
pub mod fixtures;
pub mod refresh;
pub mod validation;

pub use config::CoreConfig;
pub use error::{ToolError, ToolResult};
pub use examples::{generate_examples, ExampleReport};
pub use fixtures::{find_prepare_requests, process_requests_for, FixtureName};
pub use refresh::{RefreshReport, RefreshService, RefreshedExchange, SandboxClient};

use serde_json::Value;
use std::fs;
use std::path::Path;

/// Reads and decodes a JSON file.
pub(crate) fn read_json(path: &Path) -> ToolResult<Value> {
    let contents = fs::read_to_string(path).map_err(|source| ToolError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ToolError::Deserialization {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `value` as JSON indented by two spaces, without a trailing newline.
pub(crate) fn write_json(path: &Path, value: &Value) -> ToolResult<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(ToolError::Serialization)?;
    write_text(path, &rendered)
}

pub(crate) fn write_text(path: &Path, contents: &str) -> ToolResult<()> {
    fs::write(path, contents).map_err(|source| ToolError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}
