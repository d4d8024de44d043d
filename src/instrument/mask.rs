//! Shallow field redaction for log views.
//!
//! Every function here works on a copy. Fields named in the mask list but
//! absent from the data are ignored.

use serde_json::Value;

use crate::instrument::call::Headers;

/// Replacement written in place of every masked value.
pub const REDACTION_MARKER: &str = "*****";

/// Copy `headers`, redacting every header whose name matches an entry of
/// `fields` case-insensitively. Names keep their original casing.
pub fn mask_headers(headers: &Headers, fields: &[String]) -> Headers {
    headers
        .iter()
        .map(|(name, value)| {
            if fields.iter().any(|f| f.eq_ignore_ascii_case(name)) {
                (name, REDACTION_MARKER)
            } else {
                (name, value)
            }
        })
        .collect()
}

/// Copy `value`, redacting matching top-level keys when it is a JSON object.
/// Any other JSON shape is returned as-is.
pub fn mask_fields(value: &Value, fields: &[String]) -> Value {
    let mut masked = value.clone();
    if let Value::Object(map) = &mut masked {
        for field in fields {
            if let Some(slot) = map.get_mut(field) {
                *slot = Value::String(REDACTION_MARKER.to_string());
            }
        }
    }
    masked
}
