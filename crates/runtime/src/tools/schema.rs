//! Normalization of provider parameter schemas into the subset the model
//! gateways accept.
//!
//! The gateways have no union support, so a `oneOf`/`anyOf` node is replaced
//! by its first alternative. Metadata keys that carry no meaning for
//! generation are stripped. Only object `properties` are walked; array and
//! primitive nodes keep their children as-is.

use serde_json::{Map, Value};

/// Keys removed from every visited node.
const METADATA_KEYS: [&str; 5] = ["title", "$ref", "$defs", "definitions", "$schema"];

/// Union keywords collapsed to their first alternative.
const UNION_KEYS: [&str; 2] = ["oneOf", "anyOf"];

/// A parsed schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// A node declaring `properties`; each property is a nested schema.
    Object {
        properties: Vec<(String, Schema)>,
        keywords: Map<String, Value>,
    },
    /// An array node; `items` is carried verbatim.
    Array { keywords: Map<String, Value> },
    /// Any other schema object.
    Primitive { keywords: Map<String, Value> },
    /// A non-object schema such as `true`.
    Opaque(Value),
}

impl Schema {
    /// Parse a JSON schema node, collapsing unions and dropping metadata.
    pub fn parse(value: &Value) -> Self {
        let Value::Object(node) = value else {
            return Self::Opaque(value.clone());
        };

        let first_alternative = UNION_KEYS
            .iter()
            .find_map(|key| node.get(*key).and_then(Value::as_array))
            .and_then(|alternatives| alternatives.first());
        if let Some(first) = first_alternative {
            return Self::parse(first);
        }

        let mut keywords: Map<String, Value> = node
            .iter()
            .filter(|(key, _)| {
                !METADATA_KEYS.contains(&key.as_str()) && !UNION_KEYS.contains(&key.as_str())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        match keywords.remove("properties") {
            Some(Value::Object(props)) => {
                let properties = props
                    .iter()
                    .map(|(name, schema)| (name.clone(), Self::parse(schema)))
                    .collect();
                return Self::Object {
                    properties,
                    keywords,
                };
            }
            Some(other) => {
                keywords.insert("properties".to_string(), other);
            }
            None => {}
        }

        let is_array = keywords.get("type").and_then(Value::as_str) == Some("array")
            || keywords.contains_key("items");
        if is_array {
            Self::Array { keywords }
        } else {
            Self::Primitive { keywords }
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Object {
                properties,
                mut keywords,
            } => {
                let properties = properties
                    .into_iter()
                    .map(|(name, schema)| (name, schema.into_value()))
                    .collect();
                keywords.insert("properties".to_string(), Value::Object(properties));
                Value::Object(keywords)
            }
            Self::Array { keywords } | Self::Primitive { keywords } => Value::Object(keywords),
            Self::Opaque(value) => value,
        }
    }
}

/// Normalize a schema. Pure and idempotent.
pub fn normalize(schema: &Value) -> Value {
    Schema::parse(schema).into_value()
}
