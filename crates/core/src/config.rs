//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the workflows. Environment variables are read by the binary, never while a
//! workflow is running.

use crate::constants::{DEFAULT_API_PREFIX, DEFAULT_EXAMPLES_DIR};
use crate::{ToolError, ToolResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    examples_dir: PathBuf,
    api_prefix: String,
    validity_weeks: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidInput`] if `api_prefix` is empty or `validity_weeks` is zero.
    pub fn new(examples_dir: PathBuf, api_prefix: String, validity_weeks: u32) -> ToolResult<Self> {
        let api_prefix = api_prefix.trim().trim_matches('/').to_string();
        if api_prefix.is_empty() {
            return Err(ToolError::InvalidInput("api_prefix cannot be empty".into()));
        }

        if validity_weeks == 0 {
            return Err(ToolError::InvalidInput(
                "validity_weeks must be at least 1".into(),
            ));
        }

        Ok(Self {
            examples_dir,
            api_prefix,
            validity_weeks,
        })
    }

    /// Configuration with the default API prefix and validity period.
    pub fn with_defaults(examples_dir: PathBuf) -> Self {
        Self {
            examples_dir,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            validity_weeks: fhir::DEFAULT_VALIDITY_PERIOD_WEEKS,
        }
    }

    pub fn examples_dir(&self) -> &Path {
        &self.examples_dir
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn validity_weeks(&self) -> u32 {
        self.validity_weeks
    }
}

/// Resolve the example corpus directory without reading environment variables.
///
/// If `override_dir` is provided, it must be an existing directory. Otherwise this looks for
/// `models/examples/` relative to the current working directory and then walks up from
/// `CARGO_MANIFEST_DIR`.
pub fn resolve_examples_dir(override_dir: Option<PathBuf>) -> ToolResult<PathBuf> {
    if let Some(dir) = override_dir {
        if dir.is_dir() {
            return Ok(dir);
        }
        return Err(ToolError::InvalidInput(format!(
            "EPS_EXAMPLES_DIR override is not a directory: {}",
            dir.display()
        )));
    }

    let cwd_relative = PathBuf::from(DEFAULT_EXAMPLES_DIR);
    if cwd_relative.is_dir() {
        return Ok(cwd_relative);
    }

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let candidate = ancestor.join(DEFAULT_EXAMPLES_DIR);
        if candidate.is_dir() {
            return Ok(candidate);
        }
    }

    Err(ToolError::InvalidInput(format!(
        "could not locate {DEFAULT_EXAMPLES_DIR}/ directory"
    )))
}

/// Parse the validity period (in weeks) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default of four weeks.
pub fn validity_weeks_from_env_value(value: Option<String>) -> ToolResult<u32> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(fhir::DEFAULT_VALIDITY_PERIOD_WEEKS),
        Some(v) => match v.parse::<u32>() {
            Ok(weeks) if weeks > 0 => Ok(weeks),
            _ => Err(ToolError::InvalidInput(format!(
                "EPS_VALIDITY_WEEKS must be a positive whole number, got: '{v}'"
            ))),
        },
    }
}
