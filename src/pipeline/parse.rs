//! Reply parsing: strip fencing, extract the JSON object.
//!
//! ## Why tolerate fences at all?
//!
//! Vision models routinely wrap their reply in ```` ```json … ``` ````
//! despite being told to output bare JSON. The fence is *structurally*
//! noise but *semantically* harmless, so the client strips it here with a
//! cheap deterministic rule instead of fighting it in the prompt. Any
//! deeper malformation (prose around the object, truncated output) is a
//! genuine extraction failure and is reported as such.

use crate::output::RawFields;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?\s*\n?(.*?)\n?```\s*$").unwrap());

/// Strip a single outer markdown fence, if present.
pub fn strip_fences(input: &str) -> &str {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(input),
        None => input.trim(),
    }
}

/// Parse a provider reply into the raw field object.
///
/// Accepts bare JSON or a fenced JSON block; anything that is not a JSON
/// *object* after unfencing is an error (arrays and scalars cannot carry
/// named fields).
pub fn parse_fields(reply: &str) -> Result<RawFields, String> {
    let body = strip_fences(reply);
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| format!("reply is not valid JSON: {e}"))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(format!(
            "reply is valid JSON but not an object (got {})",
            kind_of(&other)
        )),
    }
}

fn kind_of(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
