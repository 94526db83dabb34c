use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: i64,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub quiz_id: Option<i64>,
    #[serde(rename = "question")]
    pub text: String,
    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing, deserialize_with = "deserialize_answer")]
    pub answer: Option<String>,
}

impl Question {
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Int(i64),
    String(String),
}

impl IdRepr {
    fn into_id<E: serde::de::Error>(self) -> std::result::Result<i64, E> {
        match self {
            IdRepr::Int(i) => Ok(i),
            IdRepr::String(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("Invalid identifier: {}", s))),
        }
    }
}

pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    IdRepr::deserialize(deserializer)?.into_id()
}

pub(crate) fn deserialize_optional_id<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IdRepr>::deserialize(deserializer)? {
        Some(repr) => repr.into_id().map(Some),
        None => Ok(None),
    }
}

/// Options arrive either as a JSON array or as a string holding an encoded
/// array. Anything unreadable becomes an empty option set.
fn deserialize_options<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = JsonValue::deserialize(deserializer)?;
    Ok(normalize_options(raw))
}

fn deserialize_answer<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = JsonValue::deserialize(deserializer)?;
    Ok(scalar_to_string(raw))
}

fn scalar_to_string(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn normalize_options(raw: JsonValue) -> Vec<String> {
    let items = match raw {
        JsonValue::Array(items) => items,
        JsonValue::String(encoded) => match serde_json::from_str::<JsonValue>(&encoded) {
            Ok(JsonValue::Array(items)) => items,
            Ok(other) => {
                tracing::warn!("Options string decoded to non-array value: {}", other);
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!("Malformed options payload, rendering no options: {}", e);
                return Vec::new();
            }
        },
        JsonValue::Null => return Vec::new(),
        other => {
            tracing::warn!("Unexpected options payload: {}", other);
            return Vec::new();
        }
    };

    let mut options: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let Some(option) = scalar_to_string(item) else {
            continue;
        };
        if !options.contains(&option) {
            options.push(option);
        }
    }
    options
}
