//! Example synthesis over the typed schema tree.
//!
//! Rules per node kind:
//! - `OneOf`/`AnyOf` (untyped): the **first** alternative is synthesized
//! - `Array` with `oneOf`/`anyOf` items: one element **per** alternative
//! - `Array` with object items: a single-element array
//! - `Array` with leaf items: the items' example wrapped in a one-element array, else the
//!   array's own example used as-is
//! - `Object`: nested synthesis
//! - `Leaf`: its example
//!
//! The asymmetry between singleton and array alternatives is deliberate: a property needs one
//! exemplar, an array shows every variant.

use crate::schema::{ArrayItems, PropertyMap, SchemaNode};
use crate::{dotted_path, SchemaError, SchemaResult};
use serde_json::{Map, Value};

/// Builds an example document from a classified property map.
///
/// `path` locates the map (for a component, `[ComponentName]`); it only feeds error messages.
/// Output keys follow declaration order.
///
/// # Errors
///
/// Returns [`SchemaError::MissingType`] for an untyped property without alternatives and
/// [`SchemaError::MissingExample`] for a leaf (or leaf-item array) with neither `example` nor
/// `default`. Nothing is returned on failure.
pub fn synthesize(properties: &PropertyMap, path: &[String]) -> SchemaResult<Map<String, Value>> {
    let mut example = Map::new();

    for (name, node) in properties.iter() {
        let value = synthesize_node(node, path, name)?;
        example.insert(name.to_owned(), value);
    }

    Ok(example)
}

/// Classifies a raw `properties` object and synthesizes it in one step.
pub fn generate_example(
    properties: &Map<String, Value>,
    path: &[String],
) -> SchemaResult<Map<String, Value>> {
    let properties = PropertyMap::from_json(properties, path)?;
    synthesize(&properties, path)
}

fn synthesize_node(node: &SchemaNode, path: &[String], name: &str) -> SchemaResult<Value> {
    let child_path = || {
        let mut child = path.to_vec();
        child.push(name.to_owned());
        child
    };

    match node {
        SchemaNode::OneOf(first) | SchemaNode::AnyOf(first) => {
            synthesize(first, &child_path()).map(Value::Object)
        }
        SchemaNode::Untyped => Err(SchemaError::MissingType {
            path: dotted_path(path, name),
        }),
        SchemaNode::Array { items, example } => match items {
            ArrayItems::OneOf(alternatives) | ArrayItems::AnyOf(alternatives) => {
                let child_path = child_path();
                alternatives
                    .iter()
                    .map(|alternative| synthesize(alternative, &child_path).map(Value::Object))
                    .collect::<SchemaResult<Vec<_>>>()
                    .map(Value::Array)
            }
            ArrayItems::Object(item_properties) => {
                let item = synthesize(item_properties, &child_path())?;
                Ok(Value::Array(vec![Value::Object(item)]))
            }
            ArrayItems::Leaf {
                example: Some(item_example),
            } => Ok(Value::Array(vec![item_example.clone()])),
            ArrayItems::Leaf { example: None } => {
                example.clone().ok_or_else(|| SchemaError::MissingExample {
                    path: dotted_path(path, name),
                })
            }
        },
        SchemaNode::Object(nested) => synthesize(nested, &child_path()).map(Value::Object),
        SchemaNode::Leaf { example } => example.clone().ok_or_else(|| SchemaError::MissingExample {
            path: dotted_path(path, name),
        }),
    }
}
