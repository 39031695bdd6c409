//! Output types: the normalized record, per-image results, and run stats.
//!
//! Everything here is serde-serializable so a whole [`RunReport`] can be
//! dumped as JSON for downstream reporting/export collaborators.

use crate::error::ImageFailure;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The raw JSON object returned by the extraction provider, keyed by the
/// service's field names (`"Payee Name"`, `"Bank Name"`, …).
pub type RawFields = serde_json::Map<String, serde_json::Value>;

/// A raster image pulled out of a PDF page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// 1-based page number the image came from.
    pub page: usize,
    /// 1-based position within the page's image listing.
    pub index: usize,
    /// File extension reflecting the preserved native encoding
    /// ("jpg", "jp2", "png", …).
    pub ext: String,
    /// Where the image was written (`{work_dir}/page{P}_img{I}.{ext}`).
    pub path: PathBuf,
}

/// The canonical, immutable output record for one successfully processed
/// cheque image.
///
/// Field values are either the extracted string or the literal
/// `"Not Found"` placeholder. Serialized field names match the record
/// store's document shape (and the provider's reply keys) rather than the
/// Rust identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChequeRecord {
    /// Owner of the record — the session user who uploaded the document.
    pub username: String,
    #[serde(rename = "Payee Name")]
    pub payee_name: String,
    #[serde(rename = "Bank Name")]
    pub bank_name: String,
    #[serde(rename = "Amount")]
    pub amount: String,
    #[serde(rename = "Cheque Number")]
    pub cheque_number: String,
    #[serde(rename = "Account Number")]
    pub account_number: String,
    #[serde(rename = "Date")]
    pub date: String,
    /// Seconds since the Unix epoch, captured at normalization.
    pub extracted_at: u64,
}

/// The raw provider reply persisted as a side file, keyed by a run-unique
/// id so a missing or duplicated cheque number can never overwrite an
/// earlier artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawExtractionArtifact {
    /// Run-unique identifier; also the file-name stem
    /// (`{artifact_id}_details.json`).
    pub artifact_id: String,
    /// The image the reply was produced from.
    pub source_image: PathBuf,
    /// Extracted cheque number, if the reply carried one. Metadata only —
    /// never used for naming.
    pub cheque_number: Option<String>,
    /// The parsed reply object, verbatim.
    pub response: serde_json::Value,
}

/// Outcome for a single image run through the pipeline.
///
/// Always produced — never dropped — so a single bad image doesn't erase
/// its trace from the report. Callers check `error` to decide whether
/// `record` exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    /// The image file handed to the pipeline.
    pub image: PathBuf,
    /// Artifact id assigned to this image's extraction attempt.
    pub artifact_id: String,
    /// The normalized record; `None` when extraction failed (the
    /// normalizer skips — no placeholder-filled record is created).
    pub record: Option<ChequeRecord>,
    /// The failure, when one occurred.
    pub error: Option<ImageFailure>,
    /// Wall-clock time spent on this image.
    pub duration_ms: u64,
}

/// A document (PDF or standalone image) that could not be processed at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub document: PathBuf,
    pub error: String,
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Input files accepted for processing.
    pub documents: usize,
    /// Input files that failed before yielding any image.
    pub documents_failed: usize,
    /// Images found across all documents (extracted + standalone).
    pub images_found: usize,
    /// Images that produced a record.
    pub records_extracted: usize,
    /// Images that failed at any stage.
    pub images_failed: usize,
    /// Total wall-clock time for the run.
    pub total_duration_ms: u64,
}

/// The full outcome of a processing run: the session's record collection
/// plus per-image and per-document detail.
///
/// `records` is the handoff to display/export collaborators; the rest is
/// for operators diagnosing partial failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Normalized records in processing order.
    pub records: Vec<ChequeRecord>,
    /// One entry per image attempted, success or failure.
    pub images: Vec<ImageResult>,
    /// Documents that failed wholesale (unreadable PDF, unsupported file).
    pub document_failures: Vec<DocumentFailure>,
    pub stats: RunStats,
}
