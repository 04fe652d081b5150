//! OpenAPI document access.
//!
//! Reads the parts of an OpenAPI JSON document that example generation needs:
//! - `components.schemas.<Name>.properties`, one [`Component`] per schema, in declaration order
//! - `paths`, kept as raw JSON and walked by [`OpenApiDocument::extract_examples`]
//!
//! Literal examples are found at:
//! - responses: `paths.*.*.(response | responses.*).content.*.(example | examples.*.value)`
//! - requests: `paths.*.*.requestBody.content.*.(example | examples.*.value)`

use crate::synthesize::synthesize;
use crate::{OpenApiError, OpenApiResult, PropertyMap, SchemaError, SchemaResult};
use serde::Deserialize;
use serde_json::{Map, Value};

/// A named component schema.
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    pub name: String,
    pub schema: Value,
}

impl Component {
    /// Returns the component's `properties` object.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Malformed`] at the component name if the schema has no
    /// `properties` object (for example a bare enum or `allOf` composition).
    pub fn properties(&self) -> SchemaResult<&Map<String, Value>> {
        self.schema
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| SchemaError::Malformed {
                path: self.name.clone(),
                reason: "schema has no properties".into(),
            })
    }

    /// Synthesizes this component's example, rooted at the component name.
    pub fn synthesize(&self) -> SchemaResult<Map<String, Value>> {
        let path = vec![self.name.clone()];
        let properties = PropertyMap::from_json(self.properties()?, &path)?;
        synthesize(&properties, &path)
    }
}

/// Which literal examples to extract from `paths`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExampleKind {
    Requests,
    Responses,
}

impl ExampleKind {
    /// Output directory name for this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ExampleKind::Requests => "requests",
            ExampleKind::Responses => "responses",
        }
    }
}

/// A literal example lifted out of `paths`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedExample {
    /// Dotted JSON path of the example with `/` replaced by `_`, usable as a file stem.
    pub name: String,
    pub value: Value,
}

/// The parsed OpenAPI document.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenApiDocument {
    components: Vec<Component>,
    paths: Map<String, Value>,
}

impl OpenApiDocument {
    /// Parse an OpenAPI document from JSON text.
    ///
    /// This uses `serde_path_to_error` to surface the path (e.g. `components.schemas.Bundle`)
    /// of the failing field when the JSON does not match the expected shape.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiError::InvalidDocument`] if the text is not JSON or has no
    /// `components.schemas` object. Per-component problems surface later, from
    /// [`Component::synthesize`].
    pub fn parse(json_text: &str) -> OpenApiResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        let wire = serde_path_to_error::deserialize::<_, OpenApiWire>(&mut deserializer)
            .map_err(schema_mismatch)?;
        Ok(wire_to_domain(wire))
    }

    /// Parse an OpenAPI document from an already-decoded JSON value.
    pub fn from_value(value: Value) -> OpenApiResult<Self> {
        let wire =
            serde_path_to_error::deserialize::<_, OpenApiWire>(value).map_err(schema_mismatch)?;
        Ok(wire_to_domain(wire))
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Synthesizes every component in declaration order.
    ///
    /// Results are returned per component so a caller can report a failing schema and carry on
    /// with the rest.
    pub fn synthesize_components(&self) -> Vec<(&str, SchemaResult<Map<String, Value>>)> {
        self.components
            .iter()
            .map(|component| (component.name.as_str(), component.synthesize()))
            .collect()
    }

    /// Collects the literal request or response examples declared under `paths`.
    ///
    /// Matches whose path mentions `patch` are skipped: PATCH bodies are not FHIR resources.
    pub fn extract_examples(&self, kind: ExampleKind) -> Vec<ExtractedExample> {
        let mut found = Vec::new();

        for (path_key, path_item) in &self.paths {
            for (method, operation) in objects(path_item) {
                let prefix = ["paths", path_key.as_str(), method];
                let bodies: Vec<(Vec<&str>, &Value)> = match kind {
                    ExampleKind::Requests => operation
                        .get("requestBody")
                        .map(|body| (vec!["requestBody"], body))
                        .into_iter()
                        .collect(),
                    ExampleKind::Responses => {
                        let single = operation
                            .get("response")
                            .map(|body| (vec!["response"], body));
                        let keyed = operation
                            .get("responses")
                            .map(objects)
                            .into_iter()
                            .flatten()
                            .map(|(code, body)| (vec!["responses", code], body));
                        single.into_iter().chain(keyed).collect()
                    }
                };

                for (body_path, body) in bodies {
                    let Some(content) = body.get("content") else {
                        continue;
                    };
                    for (media_type, media) in objects(content) {
                        let base: Vec<&str> = prefix
                            .iter()
                            .copied()
                            .chain(body_path.iter().copied())
                            .chain(["content", media_type])
                            .collect();
                        collect_media_examples(&base, media, &mut found);
                    }
                }
            }
        }

        found
    }
}

fn collect_media_examples(base: &[&str], media: &Value, found: &mut Vec<ExtractedExample>) {
    if let Some(example) = media.get("example") {
        push_example(base, &["example"], example, found);
    }

    if let Some(examples) = media.get("examples") {
        for (example_name, example) in objects(examples) {
            if let Some(value) = example.get("value") {
                push_example(base, &["examples", example_name, "value"], value, found);
            }
        }
    }
}

fn push_example(base: &[&str], tail: &[&str], value: &Value, found: &mut Vec<ExtractedExample>) {
    let full_path = base
        .iter()
        .chain(tail.iter())
        .copied()
        .collect::<Vec<_>>()
        .join(".");

    if full_path.contains("patch") {
        tracing::debug!("skipping PATCH example {}", full_path);
        return;
    }

    found.push(ExtractedExample {
        name: full_path.replace('/', "_"),
        value: value.clone(),
    });
}

/// Iterates the entries of `value` when it is a JSON object; anything else yields nothing.
fn objects(value: &Value) -> impl Iterator<Item = (&str, &Value)> {
    value
        .as_object()
        .into_iter()
        .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v)))
}

fn schema_mismatch(err: serde_path_to_error::Error<serde_json::Error>) -> OpenApiError {
    let path = err.path().to_string();
    let source = err.into_inner();
    let path = if path.is_empty() || path == "." {
        "<root>"
    } else {
        path.as_str()
    };
    OpenApiError::InvalidDocument(format!("OpenAPI schema mismatch at {path}: {source}"))
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Deserialize)]
struct OpenApiWire {
    components: ComponentsWire,
    #[serde(default)]
    paths: Map<String, Value>,
}

#[derive(Deserialize)]
struct ComponentsWire {
    schemas: Map<String, Value>,
}

fn wire_to_domain(wire: OpenApiWire) -> OpenApiDocument {
    let components = wire
        .components
        .schemas
        .into_iter()
        .map(|(name, schema)| Component { name, schema })
        .collect();

    OpenApiDocument {
        components,
        paths: wire.paths,
    }
}
