//! Input validation utilities.
//!
//! This module contains functions for validating user inputs before they are used to build
//! sandbox request URLs.

use crate::{ToolError, ToolResult};

/// Validates a sandbox API base URL and returns it without trailing slashes.
///
/// The base URL is joined with the API prefix and operation name: `{base}/FHIR/R4/$prepare`.
/// - Rejects empty or whitespace-only strings
/// - Requires an `http://` or `https://` scheme followed by a host
/// - Rejects whitespace, query strings and fragments
///
/// # Errors
///
/// Returns a `ToolError::InvalidInput` if the URL is unusable as a base.
pub fn validate_api_base_url(base_url: &str) -> ToolResult<String> {
    const MAX_URL_LEN: usize = 2048;

    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidInput(
            "API base URL cannot be empty".into(),
        ));
    }

    if trimmed.len() > MAX_URL_LEN {
        return Err(ToolError::InvalidInput(format!(
            "API base URL exceeds maximum length of {} characters",
            MAX_URL_LEN
        )));
    }

    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| {
            ToolError::InvalidInput(format!(
                "API base URL must start with http:// or https://, got: '{trimmed}'"
            ))
        })?;

    if rest.trim_matches('/').is_empty() || rest.starts_with('/') {
        return Err(ToolError::InvalidInput(format!(
            "API base URL has no host: '{trimmed}'"
        )));
    }

    if rest.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
        return Err(ToolError::InvalidInput(format!(
            "API base URL contains invalid characters: '{trimmed}'"
        )));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}
