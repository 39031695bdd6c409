//! Record normalization: raw provider fields → [`ChequeRecord`].
//!
//! The provider's reply is treated as untrusted: keys may be missing,
//! values may be numbers instead of strings. Normalization flattens all
//! of that into a fixed-schema record where every absent field carries the
//! literal `"Not Found"` placeholder, tagged with the owning session.
//!
//! Normalization only ever runs on a successful extraction — a failed
//! extraction short-circuits in [`crate::process`] before reaching this
//! stage, so no placeholder-filled ghost records exist for failed images.

use crate::output::{ChequeRecord, RawFields};
use crate::session::Session;
use std::time::{SystemTime, UNIX_EPOCH};

/// Placeholder stored for any field the service did not return.
pub const NOT_FOUND: &str = "Not Found";

/// The six reply keys the service is asked for, in prompt order.
pub const SERVICE_KEYS: [&str; 6] = [
    "Bank Name",
    "Payee Name",
    "Amount",
    "Date",
    "Account Number",
    "Cheque Number",
];

/// Build the canonical record from raw fields.
pub fn normalize(fields: &RawFields, session: &Session) -> ChequeRecord {
    ChequeRecord {
        username: session.username.clone(),
        payee_name: field(fields, "Payee Name"),
        bank_name: field(fields, "Bank Name"),
        amount: field(fields, "Amount"),
        cheque_number: field(fields, "Cheque Number"),
        account_number: field(fields, "Account Number"),
        date: field(fields, "Date"),
        extracted_at: unix_now(),
    }
}

/// The extracted cheque number, when present — artifact metadata.
pub fn cheque_number(fields: &RawFields) -> Option<String> {
    fields.get("Cheque Number").map(value_to_string)
}

fn field(fields: &RawFields, key: &str) -> String {
    fields
        .get(key)
        .map(value_to_string)
        .unwrap_or_else(|| NOT_FOUND.to_string())
}

/// Render a JSON value as a field string.
///
/// Services occasionally return numbers for amounts or account numbers;
/// stringifying keeps the data instead of discarding it, and `null` is
/// treated the same as an omitted key.
fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => NOT_FOUND.to_string(),
        other => other.to_string(),
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
