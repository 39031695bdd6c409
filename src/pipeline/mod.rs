//! Pipeline stages for cheque-image processing.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations (e.g. a different PDF backend) without touching other
//! stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ preprocess ──▶ encode ──▶ (provider) ──▶ parse ──▶ normalize
//! (classify) (lopdf)    (crop+Otsu)    (base64)                 (JSON)    (record)
//! ```
//!
//! 1. [`input`]      — classify the uploaded file as PDF or raster image
//! 2. [`extract`]    — pull embedded raster images out of PDF pages,
//!    preserving their native encoding
//! 3. [`preprocess`] — crop the region of interest, grayscale, binarize
//!    (skipped entirely in raw mode)
//! 4. [`encode`]     — base64-wrap image bytes for the provider request
//! 5. [`parse`]      — strip reply fencing and parse the JSON object
//! 6. [`normalize`]  — map raw fields into the placeholder-defaulted record

pub mod encode;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod parse;
pub mod preprocess;
