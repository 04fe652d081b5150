//! Typed schema node model.
//!
//! OpenAPI property specifications arrive as untyped JSON. This module classifies each one into
//! a [`SchemaNode`] variant up front so synthesis is a single match over node kinds rather than
//! repeated key lookups.
//!
//! Classification follows the shape of the property spec:
//! - no `type`: `oneOf` → [`SchemaNode::OneOf`], else `anyOf` → [`SchemaNode::AnyOf`], else
//!   [`SchemaNode::Untyped`]
//! - `type: array` → [`SchemaNode::Array`] with [`ArrayItems`]
//! - `type: object` → [`SchemaNode::Object`]
//! - any other `type` → [`SchemaNode::Leaf`]
//!
//! Missing example values are *not* a parse error; they are reported by synthesis so that the
//! message names the leaf. Structural defects (an object without `properties`, an array without
//! `items`, an empty `oneOf`) are reported here.
//!
//! An untyped `oneOf`/`anyOf` property only keeps its first alternative; the rest are never read.
//! Array items keep every alternative.

use crate::{dotted_path, SchemaError, SchemaResult};
use serde_json::{Map, Value};

/// An ordered property map: property name to node, in declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyMap(Vec<(String, SchemaNode)>);

/// One classified property specification.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaNode {
    /// A scalar-typed property. `example` holds `example`, falling back to `default`.
    Leaf { example: Option<Value> },

    /// `type: object` with its nested properties.
    Object(PropertyMap),

    /// `type: array`. `example` is the array property's own `example`/`default`.
    Array {
        items: ArrayItems,
        example: Option<Value>,
    },

    /// Untyped node with `oneOf` alternatives, reduced to the first one.
    OneOf(PropertyMap),

    /// Untyped node with `anyOf` alternatives, reduced to the first one.
    AnyOf(PropertyMap),

    /// No `type`, `oneOf` or `anyOf`. Never resolvable.
    Untyped,
}

/// The `items` specification of an array node.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayItems {
    OneOf(Vec<PropertyMap>),
    AnyOf(Vec<PropertyMap>),
    Object(PropertyMap),
    /// Items of any non-object type. `example` holds the items' `example`/`default`.
    Leaf { example: Option<Value> },
}

impl PropertyMap {
    /// Classifies every property of a raw `properties` object.
    ///
    /// `path` is the location of the map itself (for a component, just its name); property
    /// errors are reported as `path.property`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Malformed`] for the first property whose structure cannot be
    /// classified.
    pub fn from_json(properties: &Map<String, Value>, path: &[String]) -> SchemaResult<Self> {
        properties
            .iter()
            .map(|(name, spec)| Ok((name.clone(), SchemaNode::from_json(spec, path, name)?)))
            .collect::<SchemaResult<Vec<_>>>()
            .map(Self)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.0.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, node)| node)
    }
}

impl FromIterator<(String, SchemaNode)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (String, SchemaNode)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl SchemaNode {
    /// Classifies the property spec `spec` found at `path.name`.
    pub fn from_json(spec: &Value, path: &[String], name: &str) -> SchemaResult<Self> {
        let malformed = |reason: &str| SchemaError::Malformed {
            path: dotted_path(path, name),
            reason: reason.to_owned(),
        };

        let spec = spec
            .as_object()
            .ok_or_else(|| malformed("property specification is not an object"))?;

        let Some(type_value) = spec.get("type") else {
            if let Some(alternatives) = spec.get("oneOf") {
                return first_alternative_from_json("oneOf", alternatives, path, name)
                    .map(SchemaNode::OneOf);
            }
            if let Some(alternatives) = spec.get("anyOf") {
                return first_alternative_from_json("anyOf", alternatives, path, name)
                    .map(SchemaNode::AnyOf);
            }
            return Ok(SchemaNode::Untyped);
        };

        let type_name = type_value
            .as_str()
            .ok_or_else(|| malformed("type is not a string"))?;

        match type_name {
            "array" => {
                let items = spec
                    .get("items")
                    .and_then(Value::as_object)
                    .ok_or_else(|| malformed("array has no items"))?;
                Ok(SchemaNode::Array {
                    items: ArrayItems::from_json(items, path, name)?,
                    example: example_or_default(spec),
                })
            }
            "object" => {
                let properties = spec
                    .get("properties")
                    .and_then(Value::as_object)
                    .ok_or_else(|| malformed("object has no properties"))?;
                Ok(SchemaNode::Object(PropertyMap::from_json(
                    properties,
                    &child_path(path, name),
                )?))
            }
            _ => Ok(SchemaNode::Leaf {
                example: example_or_default(spec),
            }),
        }
    }
}

impl ArrayItems {
    /// Classifies the `items` of the array property at `path.name`.
    fn from_json(items: &Map<String, Value>, path: &[String], name: &str) -> SchemaResult<Self> {
        // Alternatives inside array items may be empty: they fan out to an empty array.
        if let Some(alternatives) = items.get("oneOf") {
            return alternatives_from_json("items oneOf", alternatives, path, name)
                .map(ArrayItems::OneOf);
        }
        if let Some(alternatives) = items.get("anyOf") {
            return alternatives_from_json("items anyOf", alternatives, path, name)
                .map(ArrayItems::AnyOf);
        }

        if items.get("type").and_then(Value::as_str) == Some("object") {
            let properties = items
                .get("properties")
                .and_then(Value::as_object)
                .ok_or_else(|| SchemaError::Malformed {
                    path: dotted_path(path, name),
                    reason: "items object has no properties".into(),
                })?;
            return Ok(ArrayItems::Object(PropertyMap::from_json(
                properties,
                &child_path(path, name),
            )?));
        }

        Ok(ArrayItems::Leaf {
            example: example_or_default(items),
        })
    }
}

/// Parses only the first entry of a `oneOf`/`anyOf` list belonging to the property at
/// `path.name`. Later entries may be anything, including `$ref`s.
fn first_alternative_from_json(
    keyword: &str,
    alternatives: &Value,
    path: &[String],
    name: &str,
) -> SchemaResult<PropertyMap> {
    let malformed = |reason: String| SchemaError::Malformed {
        path: dotted_path(path, name),
        reason,
    };

    let first = alternatives
        .as_array()
        .ok_or_else(|| malformed(format!("{keyword} is not a list")))?
        .first()
        .ok_or_else(|| malformed(format!("{keyword} has no alternatives")))?;
    let properties = first
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed(format!("{keyword} alternative 0 has no properties")))?;

    PropertyMap::from_json(properties, &child_path(path, name))
}

/// Parses a `oneOf`/`anyOf` list of array items belonging to the property at `path.name`.
///
/// Each alternative must be an object with `properties`; its properties live under
/// `path.name`.
fn alternatives_from_json(
    keyword: &str,
    alternatives: &Value,
    path: &[String],
    name: &str,
) -> SchemaResult<Vec<PropertyMap>> {
    let malformed = |reason: String| SchemaError::Malformed {
        path: dotted_path(path, name),
        reason,
    };

    let alternatives = alternatives
        .as_array()
        .ok_or_else(|| malformed(format!("{keyword} is not a list")))?;
    let alternative_path = child_path(path, name);

    alternatives
        .iter()
        .enumerate()
        .map(|(index, alternative)| {
            let properties = alternative
                .get("properties")
                .and_then(Value::as_object)
                .ok_or_else(|| malformed(format!("{keyword} alternative {index} has no properties")))?;
            PropertyMap::from_json(properties, &alternative_path)
        })
        .collect()
}

/// `example` if present (even when `null`), else `default`.
fn example_or_default(spec: &Map<String, Value>) -> Option<Value> {
    spec.get("example").or_else(|| spec.get("default")).cloned()
}

fn child_path(path: &[String], name: &str) -> Vec<String> {
    let mut child = path.to_vec();
    child.push(name.to_owned());
    child
}
