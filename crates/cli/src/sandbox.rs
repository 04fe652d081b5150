//! Live sandbox client over HTTP.

use eps_core::constants::{CONVERT_OPERATION, PREPARE_OPERATION};
use eps_core::{SandboxClient, ToolError, ToolResult};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use uuid::Uuid;

/// Posts Bundles to `{base_url}/{api_prefix}/$prepare` and `.../$convert`.
pub struct HttpSandboxClient {
    client: Client,
    base_url: String,
    api_prefix: String,
}

impl HttpSandboxClient {
    pub fn new(base_url: String, api_prefix: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_prefix,
        }
    }

    fn operation_url(&self, operation: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api_prefix, operation)
    }

    fn post(&self, operation: &str, body: &Value) -> ToolResult<Response> {
        let url = self.operation_url(operation);
        let payload = serde_json::to_vec(body).map_err(ToolError::Serialization)?;
        let request_id = Uuid::new_v4().to_string();

        tracing::debug!(url = %url, request_id = %request_id, "posting to sandbox");

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Request-ID", request_id)
            .body(payload)
            .send()
            .map_err(|e| ToolError::Sandbox(format!("POST {url}: {e}")))?;

        if !response.status().is_success() {
            tracing::warn!(url = %url, status = %response.status(), "sandbox returned an error status");
        }

        Ok(response)
    }
}

impl SandboxClient for HttpSandboxClient {
    fn prepare(&self, request: &Value) -> ToolResult<Value> {
        self.post(PREPARE_OPERATION, request)?
            .json::<Value>()
            .map_err(|e| ToolError::Sandbox(format!("{PREPARE_OPERATION} response is not JSON: {e}")))
    }

    fn convert(&self, request: &Value) -> ToolResult<String> {
        self.post(CONVERT_OPERATION, request)?
            .text()
            .map_err(|e| ToolError::Sandbox(format!("{CONVERT_OPERATION} response unreadable: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_url() {
        let client = HttpSandboxClient::new("http://localhost:9000".into(), "FHIR/R4".into());

        assert_eq!(
            client.operation_url(PREPARE_OPERATION),
            "http://localhost:9000/FHIR/R4/$prepare"
        );
        assert_eq!(
            client.operation_url(CONVERT_OPERATION),
            "http://localhost:9000/FHIR/R4/$convert"
        );
    }
}
