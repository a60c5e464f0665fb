//! Dataset records.
//!
//! One [`InputRecord`] is decoded per dataset line; one [`OutputRecord`] is
//! produced per input record. Both payloads are opaque JSON: the engine never
//! looks inside a provider request or response.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value as JsonValue, json};

/// One unit of work read from an input dataset object.
///
/// Wire shape: `{"recordId": <string>, "modelInput": <object>}`.
///
/// A non-string `recordId` is kept in its JSON text form (`7` becomes `"7"`).
/// A `modelInput` that is present is kept verbatim, `null` included; only an
/// absent field is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRecord {
    #[serde(default, deserialize_with = "record_id_text")]
    pub record_id: String,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub model_input: Option<JsonValue>,
}

fn record_id_text<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match JsonValue::deserialize(de)? {
        JsonValue::String(s) => s,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    })
}

fn present<'de, D: Deserializer<'de>>(de: D) -> Result<Option<JsonValue>, D::Error> {
    JsonValue::deserialize(de).map(Some)
}

impl InputRecord {
    pub fn new(record_id: impl Into<String>, model_input: JsonValue) -> Self {
        Self {
            record_id: record_id.into(),
            model_input: Some(model_input),
        }
    }

    /// The request payload, or `None` when it is absent or empty.
    ///
    /// `null`, `{}`, `[]` and `""` all count as "no input".
    pub fn payload(&self) -> Option<&JsonValue> {
        self.model_input.as_ref().filter(|v| !is_blank(v))
    }

    /// The value echoed back into the output record; `{}` when the field was absent.
    pub fn echo(&self) -> JsonValue {
        self.model_input.clone().unwrap_or_else(|| json!({}))
    }
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Object(m) => m.is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::String(s) => s.is_empty(),
        _ => false,
    }
}

/// One result written to an output dataset object.
///
/// Field order is the wire order: `modelInput`, `modelOutput`, `recordId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub model_input: JsonValue,
    pub model_output: JsonValue,
    pub record_id: String,
}

impl OutputRecord {
    pub fn success(record_id: impl Into<String>, model_input: JsonValue, body: JsonValue) -> Self {
        Self {
            model_input,
            model_output: body,
            record_id: record_id.into(),
        }
    }

    /// Failure is data: the message lands in `modelOutput.error`.
    pub fn failure(
        record_id: impl Into<String>,
        model_input: JsonValue,
        message: impl Into<String>,
    ) -> Self {
        Self {
            model_input,
            model_output: json!({ "error": message.into() }),
            record_id: record_id.into(),
        }
    }

    /// The error message when this record carries a failure.
    pub fn error_message(&self) -> Option<&str> {
        let obj = self.model_output.as_object()?;
        if obj.len() != 1 {
            return None;
        }
        obj.get("error").and_then(JsonValue::as_str)
    }
}
