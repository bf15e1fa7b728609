//! Secret service response envelope
//!
//! KV v2 wraps the stored key/value pairs one level below the top-level
//! `data`: `{"data":{"data":{"field":"value"},"metadata":{...}}}`. That
//! nesting is the only shape accepted here.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Number, Value};

use crate::error::SecretError;

/// Decoded secret service response
#[derive(Debug, Default, Deserialize)]
pub struct SecretEnvelope {
    #[serde(default)]
    pub data: Option<SecretData>,

    /// Present on auth responses
    #[serde(default)]
    pub auth: Option<AuthResult>,

    /// Error messages returned alongside non-success statuses
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Outer `data` object of a KV v2 read
#[derive(Debug, Default, Deserialize)]
pub struct SecretData {
    #[serde(default)]
    pub data: Option<HashMap<String, FieldValue>>,
}

/// Credential issued by an auth exchange
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResult {
    pub client_token: String,
    #[serde(default)]
    pub lease_duration: u64,
}

/// A stored field value, classified at decode time
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(Number),
    Other(Value),
}

impl FieldValue {
    /// Coerce to the string handed back to callers.
    ///
    /// Strings pass through, integral numbers render in base 10, and every
    /// other JSON type is rejected with the type name.
    pub fn coerce(&self) -> Result<String, &'static str> {
        match self {
            FieldValue::Text(s) => Ok(s.clone()),
            FieldValue::Number(n) => integer_string(n).ok_or("fractional number"),
            FieldValue::Other(v) => Err(json_type_name(v)),
        }
    }
}

fn integer_string(n: &Number) -> Option<String> {
    if let Some(i) = n.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.to_string());
    }
    n.as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| format!("{f:.0}"))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse a raw response body
pub fn decode(bytes: &[u8]) -> Result<SecretEnvelope, SecretError> {
    serde_json::from_slice(bytes).map_err(SecretError::Decode)
}

/// Pull `field` out of the nested data mapping
pub fn extract_field(envelope: &SecretEnvelope, field: &str) -> Result<String, SecretError> {
    let value = envelope
        .data
        .as_ref()
        .and_then(|outer| outer.data.as_ref())
        .and_then(|fields| fields.get(field))
        .ok_or_else(|| SecretError::no_data(field))?;

    value.coerce().map_err(|found| SecretError::WrongType {
        field: field.to_string(),
        found,
    })
}

/// Best-effort message for a non-success response
pub(crate) fn error_message(body: &[u8]) -> String {
    match decode(body) {
        Ok(envelope) if !envelope.errors.is_empty() => envelope.errors.join("; "),
        _ => String::from_utf8_lossy(body).trim().to_string(),
    }
}
