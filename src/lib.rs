//! # cheque2rec
//!
//! Extract structured records from scanned cheque PDFs and images using
//! Vision Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Scanned cheques defeat classic OCR: handwriting, bank-specific layouts,
//! stamps, and MICR lines come out garbled. Instead this crate hands the
//! scan to a VLM with a fixed instruction naming the six fields a cheque
//! carries, then normalizes the JSON reply into an immutable record tagged
//! with the uploading user.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / image
//!  │
//!  ├─ 1. Input      classify by magic bytes (PDF, PNG, JPEG)
//!  ├─ 2. Extract    pull embedded raster images out of PDF pages (lopdf),
//!  │                preserving their native encoding
//!  ├─ 3. Preprocess crop the region of interest, grayscale, Otsu binarize
//!  │                (optional — see PipelineMode)
//!  ├─ 4. Encode     image bytes → base64 payload
//!  ├─ 5. Provider   one synchronous VLM call per image (Gemini or custom)
//!  ├─ 6. Parse      strip reply fencing, parse the six-field JSON object
//!  └─ 7. Normalize  "Not Found" defaults, owner tag → ChequeRecord
//! ```
//!
//! Processing is strictly sequential: one document at a time, one image at
//! a time, each to completion before the next. A failed image is reported
//! and skipped; its siblings are unaffected.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cheque2rec::{process_document, MemoryRecordStore, ProcessingConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider resolved from GEMINI_API_KEY / GOOGLE_API_KEY
//!     let config = ProcessingConfig::default();
//!     let store = MemoryRecordStore::new();
//!     let session = Session::new("alice");
//!
//!     let report = process_document("cheques.pdf", &config, &session, &store).await?;
//!     for record in &report.records {
//!         println!("{}: {} — {}", record.cheque_number, record.payee_name, record.amount);
//!     }
//!     eprintln!(
//!         "{}/{} images extracted",
//!         report.stats.records_extracted, report.stats.images_found
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cheque2rec` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! cheque2rec = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod session;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CropRegion, PipelineMode, ProcessingConfig, ProcessingConfigBuilder};
pub use error::{ChequeError, ImageFailure};
pub use output::{
    ChequeRecord, DocumentFailure, ExtractedImage, ImageResult, RawExtractionArtifact, RawFields,
    RunReport, RunStats,
};
pub use process::{process_bytes, process_document, process_documents, process_documents_sync};
pub use progress::{NoopProgressCallback, RunProgressCallback};
pub use provider::{ExtractionProvider, GeminiProvider, ProviderError, DEFAULT_GEMINI_MODEL};
pub use session::Session;
pub use store::{MemoryRecordStore, RecordStore, StoreError};
