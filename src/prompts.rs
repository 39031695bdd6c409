//! The instruction sent to the extraction provider.
//!
//! Centralising the prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing what the model is asked for
//!    (adding a field, tightening the output rules) is an edit in exactly
//!    one place.
//!
//! 2. **Testability** — unit tests can assert the instruction names every
//!    field the normalizer expects without spinning up a real provider.

/// The fixed instruction for cheque field extraction.
///
/// Enumerates the six target fields and requests a bare JSON object. The
/// reply keys must match [`crate::pipeline::normalize::SERVICE_KEYS`];
/// the client still tolerates fenced output (see
/// [`crate::pipeline::parse`]) because vision models routinely wrap JSON
/// in ```` ```json ```` despite instructions.
pub const EXTRACTION_PROMPT: &str = r#"Extract the following details from the cheque image:
1. Bank Name
2. Payee Name
3. Amount
4. Date
5. Account Number
6. Cheque Number
Return the details as a JSON object with exactly those keys.
If a field is not visible on the cheque, omit its key.
Output ONLY the JSON object, with no commentary."#;
