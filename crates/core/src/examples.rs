//! OpenAPI example generation.
//!
//! Writes three directories under the output root:
//! - `resources/<Name>.json`: one synthesized example per component schema
//! - `requests/<json path>.json`: literal request body examples declared under `paths`
//! - `responses/<json path>.json`: literal response examples declared under `paths`
//!
//! Examples are written as compact JSON. A component whose schema cannot be synthesized is
//! logged and reported; the remaining components are still written.

use crate::constants::{JSON_EXTENSION, RESOURCES_DIR_NAME};
use crate::{write_text, ToolError, ToolResult};
use eps_openapi::{ExampleKind, OpenApiDocument, SchemaError};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of one example generation run.
#[derive(Debug, Default)]
pub struct ExampleReport {
    /// Every file written, in write order.
    pub written: Vec<PathBuf>,
    /// Components skipped because their schema could not be synthesized.
    pub failed: Vec<(String, SchemaError)>,
}

impl ExampleReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Generates every example for the OpenAPI document at `spec_path` into `out_dir`.
///
/// # Errors
///
/// Returns an error if the document cannot be read or parsed, or if a directory or file cannot be
/// written. Schema problems in individual components are reported in [`ExampleReport::failed`].
pub fn generate_examples(spec_path: &Path, out_dir: &Path) -> ToolResult<ExampleReport> {
    let json_text = fs::read_to_string(spec_path).map_err(|source| ToolError::FileRead {
        path: spec_path.to_path_buf(),
        source,
    })?;
    let document = OpenApiDocument::parse(&json_text)?;

    let resources_dir = out_dir.join(RESOURCES_DIR_NAME);
    let requests_dir = out_dir.join(ExampleKind::Requests.dir_name());
    let responses_dir = out_dir.join(ExampleKind::Responses.dir_name());
    for dir in [&resources_dir, &responses_dir, &requests_dir] {
        fs::create_dir_all(dir).map_err(|source| ToolError::DirCreation {
            path: dir.clone(),
            source,
        })?;
    }

    let mut report = ExampleReport::default();

    for (name, result) in document.synthesize_components() {
        match result {
            Ok(example) => {
                let path = resources_dir.join(format!("{name}.{JSON_EXTENSION}"));
                write_compact(&path, &Value::Object(example))?;
                report.written.push(path);
            }
            Err(e) => {
                tracing::warn!(component = name, error = %e, "skipping component example");
                report.failed.push((name.to_string(), e));
            }
        }
    }

    for kind in [ExampleKind::Responses, ExampleKind::Requests] {
        let dir = out_dir.join(kind.dir_name());
        for extracted in document.extract_examples(kind) {
            let path = dir.join(format!("{}.{JSON_EXTENSION}", extracted.name));
            write_compact(&path, &extracted.value)?;
            report.written.push(path);
        }
    }

    tracing::info!(
        written = report.written.len(),
        failed = report.failed.len(),
        out_dir = %out_dir.display(),
        "generated OpenAPI examples"
    );

    Ok(report)
}

/// Writes `value` as single-line JSON without whitespace between tokens.
fn write_compact(path: &Path, value: &Value) -> ToolResult<()> {
    let rendered = serde_json::to_string(value).map_err(ToolError::Serialization)?;
    write_text(path, &rendered)?;
    tracing::debug!(path = %path.display(), "wrote example");
    Ok(())
}
