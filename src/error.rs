//! Error types for the cheque2rec library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ChequeError`] — **Fatal**: the run cannot proceed at all for the
//!   current document (unreadable input, unwritable working directory,
//!   provider not configured). Returned as `Err(ChequeError)` from the
//!   top-level `process*` functions or recorded per document.
//!
//! * [`ImageFailure`] — **Non-fatal**: a single image failed (undecodable
//!   file, out-of-bounds crop, extraction call error) but sibling images
//!   are fine. Stored inside [`crate::output::ImageResult`] so callers can
//!   inspect partial success rather than losing the whole batch to one bad
//!   scan.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first failed image, log and continue, or collect all failures for a
//! post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the cheque2rec library.
///
/// Image-level failures use [`ImageFailure`] and are stored in
/// [`crate::output::ImageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ChequeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file is neither a PDF nor a supported raster image.
    #[error("unsupported input '{path}': not a PDF, PNG, or JPEG (first bytes: {magic:?})")]
    UnsupportedInput { path: PathBuf, magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("cannot open PDF '{path}': {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    DocumentOpen { path: PathBuf, detail: String },

    // ── Provider errors ───────────────────────────────────────────────────
    /// The extraction provider is not initialised (missing API key etc.).
    #[error("extraction provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write to the working / artifact directory.
    #[error("i/o failure at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure for a single image.
///
/// Stored alongside [`crate::output::ImageResult`] when an image fails.
/// Processing of sibling images and later documents always continues.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageFailure {
    /// The raster file is missing or cannot be decoded.
    #[error("image '{path}': decode failed: {detail}")]
    Decode { path: PathBuf, detail: String },

    /// The crop rectangle does not fit inside the image.
    ///
    /// Fixed crop coordinates assume a known scan layout; a bounds
    /// violation is a configuration bug, not a transient condition.
    #[error(
        "image '{path}': crop {crop_x},{crop_y} {crop_w}x{crop_h} exceeds image bounds {img_w}x{img_h}"
    )]
    CropBounds {
        path: PathBuf,
        crop_x: u32,
        crop_y: u32,
        crop_w: u32,
        crop_h: u32,
        img_w: u32,
        img_h: u32,
    },

    /// The extraction call failed or returned unparsable output.
    ///
    /// Captured here, never raised past the extraction client; the
    /// normalizer must skip record creation when it sees this.
    #[error("image '{path}': extraction failed: {detail}")]
    Extraction { path: PathBuf, detail: String },
}
