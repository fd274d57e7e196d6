//! Lenient field readers for request forms.
//!
//! Any JSON scalar is accepted and turned into text or an integer, so a
//! wrongly typed value reaches `validate()` and is reported as a field
//! error instead of failing deserialization. Use with `#[serde(default)]`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Stand-in for integer fields holding something that is not an integer.
/// Every `range` check on request forms rejects it.
pub const NOT_AN_INTEGER: i64 = i64::MIN;

/// Objects and arrays read as empty text, which every check rejects
fn text_of(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => Some(String::new()),
    }
}

fn int_of(value: Value) -> Option<i64> {
    match value {
        Value::Null => None,
        Value::Number(n) => Some(n.as_i64().unwrap_or(NOT_AN_INTEGER)),
        Value::String(s) => Some(s.trim().parse().unwrap_or(NOT_AN_INTEGER)),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Some(NOT_AN_INTEGER),
    }
}

pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_of(Value::deserialize(deserializer)?).unwrap_or_default())
}

pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_of(Value::deserialize(deserializer)?))
}

/// Present-but-null becomes `Some(None)`; an absent field stays `None` through `#[serde(default)]`
pub fn nullable_text<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(text_of(Value::deserialize(deserializer)?)))
}

pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    text(deserializer).map(|s| s.trim().to_string())
}

pub fn optional_trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_text(deserializer).map(|s| s.map(|s| s.trim().to_string()))
}

/// Trimmed and lowercased
pub fn email<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    trimmed(deserializer).map(|s| s.to_lowercase())
}

/// JSON integers and numeric strings; query parameters always arrive as strings
pub fn optional_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(int_of(Value::deserialize(deserializer)?))
}
