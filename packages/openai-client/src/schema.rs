//! Strict-mode JSON schemas derived from Rust types.
//!
//! OpenAI's `json_schema` response format in strict mode rejects schemas that
//! `schemars` emits by default. [`StructuredOutput::openai_schema`] rewrites
//! the generated schema so that:
//!
//! - every object with `properties` has `additionalProperties: false`
//! - every property is listed in `required` (optional fields stay nullable)
//! - `$ref`s into `definitions` are inlined, and `definitions`/`$schema` dropped
//!
//! Open maps (`HashMap<String, T>`) are not representable in strict mode;
//! model them as a list of key/value structs and convert after parsing.

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Types usable as a structured-output target.
///
/// Blanket-implemented for every `JsonSchema + DeserializeOwned` type.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Strict-mode compatible schema for `Self`.
    fn openai_schema() -> Value {
        let root = serde_json::to_value(schema_for!(Self)).unwrap_or_default();
        let definitions = root
            .get("definitions")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let mut schema = inline(root, &definitions);
        if let Value::Object(map) = &mut schema {
            map.remove("definitions");
            map.remove("$schema");
        }
        tighten(&mut schema);
        schema
    }

    /// Schema name sent alongside the schema (`^[a-zA-Z0-9_-]+$`).
    fn schema_name() -> String {
        <Self as JsonSchema>::schema_name()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Replace every `{"$ref": "#/definitions/X"}` with the definition of `X`.
fn inline(value: Value, definitions: &Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(name) = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
            {
                if let Some(def) = definitions.get(name) {
                    return inline(def.clone(), definitions);
                }
            }
            Value::Object(
                map.into_iter()
                    .filter(|(key, _)| key != "definitions")
                    .map(|(key, v)| (key, inline(v, definitions)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| inline(v, definitions))
                .collect(),
        ),
        other => other,
    }
}

/// Close objects and mark all of their properties required.
fn tighten(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let keys: Option<Vec<Value>> = map
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| props.keys().cloned().map(Value::String).collect());

            if let Some(keys) = keys {
                map.insert("additionalProperties".into(), Value::Bool(false));
                map.insert("required".into(), Value::Array(keys));
            }

            for child in map.values_mut() {
                tighten(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(tighten),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Criterion {
        text: String,
        optional_note: Option<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Draft {
        title: String,
        criteria: Vec<Criterion>,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Drafts {
        stories: Vec<Draft>,
    }

    fn required_of(schema: &Value) -> Vec<&str> {
        schema["required"]
            .as_array()
            .expect("required array")
            .iter()
            .filter_map(Value::as_str)
            .collect()
    }

    #[test]
    fn test_root_is_closed_and_complete() {
        let schema = Criterion::openai_schema();
        assert_eq!(schema["additionalProperties"], Value::Bool(false));

        let required = required_of(&schema);
        assert!(required.contains(&"text"));
        assert!(required.contains(&"optional_note"), "nullable fields stay required");
    }

    #[test]
    fn test_nested_refs_are_inlined() {
        let schema = Drafts::openai_schema();
        let text = serde_json::to_string(&schema).unwrap();

        assert!(!text.contains("$ref"), "no refs should survive: {text}");
        assert!(schema.get("definitions").is_none());
        assert!(schema.get("$schema").is_none());

        let draft = &schema["properties"]["stories"]["items"];
        assert_eq!(draft["type"], "object");
        assert_eq!(draft["additionalProperties"], Value::Bool(false));

        let criterion = &draft["properties"]["criteria"]["items"];
        assert_eq!(criterion["additionalProperties"], Value::Bool(false));
        assert_eq!(required_of(criterion).len(), 2);
    }

    #[test]
    fn test_schema_name_is_sanitized() {
        assert_eq!(<Drafts as StructuredOutput>::schema_name(), "Drafts");
        assert_eq!(<Vec<Draft> as StructuredOutput>::schema_name(), "Array_of_Draft");
    }
}
