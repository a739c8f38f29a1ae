//! JSON event schema validation.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::ExtractionError;

/// Characters of the serialized payload included in alert log events.
const ALERT_PREVIEW_CHARS: usize = 200;

/// Primitive JSON type expected for a required field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl JsonType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Self::String,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Boolean,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
            Value::Null => Self::Null,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }
}

/// Required fields for inbound event payloads, checked in this order.
pub const EVENT_SCHEMA: &[(&str, JsonType)] = &[
    ("event", JsonType::String),
    ("timestamp", JsonType::String),
    ("payload", JsonType::Object),
];

/// Fields extracted from a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonFields {
    /// The decoded document (`null` if it could not be decoded).
    pub payload: Value,
    pub anomalies: Vec<String>,
    pub schema_valid: bool,
}

impl JsonFields {
    /// Decode and validate against [`EVENT_SCHEMA`].
    ///
    /// A decode failure is reported as an anomaly rather than an error.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(payload) => Self::from_value(payload),
            Err(e) => {
                let err = ExtractionError::Json(e);
                warn!(error = %err, "JSON document could not be decoded");
                Self {
                    payload: Value::Null,
                    anomalies: vec![err.to_string()],
                    schema_valid: false,
                }
            }
        }
    }

    pub fn from_value(payload: Value) -> Self {
        let (schema_valid, anomalies) = validate_json_schema(&payload, EVENT_SCHEMA);
        Self {
            payload,
            anomalies,
            schema_valid,
        }
    }

    /// The payload's own `timestamp`, when it is a string.
    pub fn timestamp(&self) -> Option<String> {
        self.payload
            .get("timestamp")
            .and_then(Value::as_str)
            .map(String::from)
    }

    /// Candidate action descriptions for the router.
    ///
    /// Invalid payloads also emit an alert log event.
    pub fn candidate_actions(&self) -> Vec<String> {
        if self.schema_valid {
            return vec!["Schema valid".to_string()];
        }
        let preview: String = self
            .payload
            .to_string()
            .chars()
            .take(ALERT_PREVIEW_CHARS)
            .collect();
        warn!(anomalies = ?self.anomalies, data = %preview, "JSON anomalies detected");
        vec![format!("Alert: {:?}", self.anomalies)]
    }
}

/// Check every required field of `schema` against `data`.
///
/// All fields are checked; the result lists every anomaly found, in schema
/// order. Valid iff there are none.
pub fn validate_json_schema(data: &Value, schema: &[(&str, JsonType)]) -> (bool, Vec<String>) {
    let mut anomalies = Vec::new();
    for (field, expected) in schema {
        match data.get(*field) {
            None => anomalies.push(format!("Missing field: {field}")),
            Some(value) => {
                let actual = JsonType::of(value);
                if actual != *expected {
                    anomalies.push(format!(
                        "Type error: {field} should be {}, got {}",
                        expected.name(),
                        actual.name()
                    ));
                }
            }
        }
    }
    (anomalies.is_empty(), anomalies)
}
