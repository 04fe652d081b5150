//! Parameters resource helpers.

use crate::{FhirError, FhirResult};
use serde_json::Value;

/// Returns the `valueString` of the parameter named `timestamp`.
///
/// A `$prepare` response carries the signing timestamp this way; the same value is stamped
/// into the Provenance signatures of the matching process requests.
///
/// # Errors
///
/// Returns [`FhirError::MissingElement`] if no `timestamp` parameter with a string value
/// exists.
pub fn signature_timestamp(parameters: &Value) -> FhirResult<String> {
    parameter_value_string(parameters, "timestamp")
}

/// Returns the `valueString` of the first parameter called `name`.
pub fn parameter_value_string(parameters: &Value, name: &str) -> FhirResult<String> {
    parameters
        .get("parameter")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|p| p.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|p| p.get("valueString"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| FhirError::MissingElement(format!("Parameters.parameter[{name}].valueString")))
}
