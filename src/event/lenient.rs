//! Deserializers for stringified property values

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountValue {
    Number(u64),
    Text(String),
}

/// `true`, `"true"`, `"1"`, `"yes"` and their negations; blank strings are unset
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<FlagValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(FlagValue::Bool(value)) => Ok(Some(value)),
        Some(FlagValue::Text(text)) => match text.trim().to_lowercase().as_str() {
            "" => Ok(None),
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            other => Err(D::Error::custom(format!(
                "invalid boolean value \"{other}\""
            ))),
        },
    }
}

/// Non-negative integer as a JSON number or decimal string; blank strings are unset
pub(crate) fn count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<CountValue>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(CountValue::Number(number)) => number,
        Some(CountValue::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<u64>().map_err(|e| {
                D::Error::custom(format!("invalid integer value \"{text}\": {e}"))
            })?
        }
    };
    u32::try_from(value)
        .map(Some)
        .map_err(|e| D::Error::custom(format!("integer value {value} is out of range: {e}")))
}
