//! Run orchestration: documents in, normalized records out.
//!
//! This is the eager, whole-batch entry point. Processing is strictly
//! sequential — each document, and each image within it, runs to
//! completion (preprocess → extract → normalize → insert) before the next
//! begins. There is no fan-out and no retry: the provider call is the only
//! network hop, one request is in flight at any moment, and a slow call
//! simply stalls that image.
//!
//! Failure isolation follows the image boundary: a bad image is recorded
//! and skipped, a bad document is recorded and the batch moves on, and
//! nothing already extracted or inserted is rolled back.

use crate::config::{PipelineMode, ProcessingConfig};
use crate::error::{ChequeError, ImageFailure};
use crate::output::{
    DocumentFailure, ImageResult, RawExtractionArtifact, RawFields, RunReport, RunStats,
};
use crate::pipeline::{encode, extract, input, normalize, parse, preprocess};
use crate::progress::notify;
use crate::prompts::EXTRACTION_PROMPT;
use crate::provider::{ExtractionProvider, GeminiProvider, DEFAULT_GEMINI_MODEL};
use crate::session::Session;
use crate::store::RecordStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Process a batch of uploaded documents for one session.
///
/// Accepts any mix of PDFs and standalone raster images. Returns a
/// [`RunReport`] carrying the session's record collection plus per-image
/// and per-document failure detail.
///
/// # Errors
/// Returns `Err(ChequeError)` only for run-level problems: no provider
/// configured, or the working/artifact directories cannot be prepared.
/// Per-document and per-image failures are reported inside the `Ok`
/// report instead.
pub async fn process_documents(
    inputs: &[PathBuf],
    config: &ProcessingConfig,
    session: &Session,
    store: &dyn RecordStore,
) -> Result<RunReport, ChequeError> {
    let run_start = Instant::now();
    info!(
        "starting run: {} document(s) for user '{}'",
        inputs.len(),
        session.username
    );

    // ── Step 1: Resolve the extraction provider ──────────────────────────
    let provider = resolve_provider(config)?;

    // ── Step 2: Prepare directories ──────────────────────────────────────
    prepare_working_dir(&config.work_dir, config.clear_work_dir)?;
    std::fs::create_dir_all(&config.artifact_dir).map_err(|e| ChequeError::Io {
        path: config.artifact_dir.clone(),
        source: e,
    })?;

    notify(&config.progress_callback, |cb| {
        cb.on_run_start(inputs.len())
    });

    let mut images_to_process: Vec<PathBuf> = Vec::new();
    let mut document_failures: Vec<DocumentFailure> = Vec::new();

    // ── Step 3: Classify inputs and extract embedded images ──────────────
    for (doc_index, input_path) in inputs.iter().enumerate() {
        let source = match input::classify(input_path) {
            Ok(s) => s,
            Err(e) => {
                warn!("document {}: {e}", input_path.display());
                notify(&config.progress_callback, |cb| {
                    cb.on_document_failed(doc_index, e.to_string())
                });
                document_failures.push(DocumentFailure {
                    document: input_path.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        match source {
            input::SourceDocument::Pdf(path) => {
                match extract::extract_images(&path, &config.work_dir) {
                    Ok(extracted) => {
                        notify(&config.progress_callback, |cb| {
                            cb.on_document_ready(doc_index, extracted.len())
                        });
                        images_to_process.extend(extracted.into_iter().map(|img| img.path));
                    }
                    Err(e) => {
                        warn!("document {}: {e}", path.display());
                        notify(&config.progress_callback, |cb| {
                            cb.on_document_failed(doc_index, e.to_string())
                        });
                        document_failures.push(DocumentFailure {
                            document: path,
                            error: e.to_string(),
                        });
                    }
                }
            }
            input::SourceDocument::Image(path) => {
                notify(&config.progress_callback, |cb| {
                    cb.on_document_ready(doc_index, 1)
                });
                images_to_process.push(path);
            }
        }
    }

    // ── Step 4: Run each image through the pipeline, in order ────────────
    let total_images = images_to_process.len();
    let mut image_results: Vec<ImageResult> = Vec::with_capacity(total_images);

    for (image_index, image_path) in images_to_process.iter().enumerate() {
        notify(&config.progress_callback, |cb| {
            cb.on_image_start(image_index + 1, total_images)
        });

        let result = process_image(image_path, config, provider.as_ref(), session).await;

        match (&result.record, &result.error) {
            (Some(record), None) => {
                if let Err(e) = store.insert(record).await {
                    // The record still exists in the report; losing the
                    // insert loses durability for this one record only.
                    warn!("image {}: {e}", image_path.display());
                }
                notify(&config.progress_callback, |cb| {
                    cb.on_image_complete(image_index + 1, total_images)
                });
            }
            (_, Some(err)) => {
                warn!("image {}: {err}", image_path.display());
                notify(&config.progress_callback, |cb| {
                    cb.on_image_failed(image_index + 1, total_images, err.to_string())
                });
            }
            _ => {}
        }

        image_results.push(result);
    }

    // ── Step 5: Assemble the report ──────────────────────────────────────
    let records: Vec<_> = image_results
        .iter()
        .filter_map(|r| r.record.clone())
        .collect();
    let stats = RunStats {
        documents: inputs.len(),
        documents_failed: document_failures.len(),
        images_found: total_images,
        records_extracted: records.len(),
        images_failed: image_results.iter().filter(|r| r.error.is_some()).count(),
        total_duration_ms: run_start.elapsed().as_millis() as u64,
    };

    info!(
        "run complete: {}/{} image(s) extracted in {}ms",
        stats.records_extracted, stats.images_found, stats.total_duration_ms
    );
    notify(&config.progress_callback, |cb| {
        cb.on_run_complete(stats.records_extracted)
    });

    Ok(RunReport {
        records,
        images: image_results,
        document_failures,
        stats,
    })
}

/// Process a single uploaded document (convenience wrapper).
pub async fn process_document(
    input: impl AsRef<Path>,
    config: &ProcessingConfig,
    session: &Session,
    store: &dyn RecordStore,
) -> Result<RunReport, ChequeError> {
    process_documents(
        &[input.as_ref().to_path_buf()],
        config,
        session,
        store,
    )
    .await
}

/// Process a document supplied as in-memory bytes.
///
/// Upload surfaces hand over buffers, not paths. The bytes are written to
/// a managed [`tempfile`] (classification still happens by magic bytes,
/// so the missing extension is irrelevant) and cleaned up automatically on
/// return or panic.
pub async fn process_bytes(
    bytes: &[u8],
    config: &ProcessingConfig,
    session: &Session,
    store: &dyn RecordStore,
) -> Result<RunReport, ChequeError> {
    use std::io::Write as _;
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| ChequeError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ChequeError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_path_buf();
    // `tmp` is dropped (and the file deleted) when processing returns
    process_documents(&[path], config, session, store).await
}

/// Synchronous wrapper around [`process_documents`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_documents_sync(
    inputs: &[PathBuf],
    config: &ProcessingConfig,
    session: &Session,
    store: &dyn RecordStore,
) -> Result<RunReport, ChequeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ChequeError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(process_documents(inputs, config, session, store))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the extraction provider, most-specific first.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed
///    it entirely; used as-is. This is also the seam tests use.
/// 2. **Environment key** — `GEMINI_API_KEY`, then `GOOGLE_API_KEY`, with
///    `config.model` or the default model.
fn resolve_provider(
    config: &ProcessingConfig,
) -> Result<Arc<dyn ExtractionProvider>, ChequeError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    for var in ["GEMINI_API_KEY", "GOOGLE_API_KEY"] {
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() {
                let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
                let provider = GeminiProvider::new(key, model, config.api_timeout_secs)
                    .map_err(|e| ChequeError::Internal(format!("HTTP client: {e}")))?;
                return Ok(Arc::new(provider));
            }
        }
    }

    Err(ChequeError::ProviderNotConfigured {
        provider: "gemini".into(),
        hint: "Set GEMINI_API_KEY (or GOOGLE_API_KEY), or supply a provider via \
               ProcessingConfig::builder().provider(...)."
            .into(),
    })
}

/// Create the working directory and sweep files left by earlier runs.
///
/// Only plain files are removed; the run owns this directory exclusively,
/// so the one-shot sweep is all the coordination needed.
fn prepare_working_dir(dir: &Path, clear: bool) -> Result<(), ChequeError> {
    std::fs::create_dir_all(dir).map_err(|e| ChequeError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    if !clear {
        return Ok(());
    }
    let entries = std::fs::read_dir(dir).map_err(|e| ChequeError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("could not clear {}: {e}", path.display());
            }
        }
    }
    Ok(())
}

/// Run one image through (preprocess →) extract → artifact → normalize.
///
/// Never returns an error: every failure is folded into the returned
/// [`ImageResult`] so the caller's loop stays uniform.
async fn process_image(
    image_path: &Path,
    config: &ProcessingConfig,
    provider: &dyn ExtractionProvider,
    session: &Session,
) -> ImageResult {
    let start = Instant::now();
    let artifact_id = Uuid::new_v4().simple().to_string();

    let outcome = extract_fields(image_path, config, provider, &artifact_id).await;

    let (record, error) = match outcome {
        Ok(fields) => (Some(normalize::normalize(&fields, session)), None),
        Err(failure) => (None, Some(failure)),
    };

    ImageResult {
        image: image_path.to_path_buf(),
        artifact_id,
        record,
        error,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

/// The extraction-client contract: image in → six-field object out, or a
/// single error marker. Nothing here panics or propagates past the
/// [`ImageFailure`] boundary.
async fn extract_fields(
    image_path: &Path,
    config: &ProcessingConfig,
    provider: &dyn ExtractionProvider,
    artifact_id: &str,
) -> Result<RawFields, ImageFailure> {
    // Build the payload the provider will see.
    let payload = match config.mode {
        PipelineMode::PreprocessThenExtract => {
            let binary = preprocess::preprocess(image_path, &config.crop)?;
            encode::encode_binary(&binary).map_err(|e| ImageFailure::Extraction {
                path: image_path.to_path_buf(),
                detail: format!("crop encoding failed: {e}"),
            })?
        }
        PipelineMode::ExtractRaw => {
            encode::encode_file(image_path).map_err(|e| ImageFailure::Decode {
                path: image_path.to_path_buf(),
                detail: e.to_string(),
            })?
        }
    };

    let reply = provider
        .extract(EXTRACTION_PROMPT, &payload)
        .await
        .map_err(|e| ImageFailure::Extraction {
            path: image_path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let fields = parse::parse_fields(&reply).map_err(|detail| ImageFailure::Extraction {
        path: image_path.to_path_buf(),
        detail,
    })?;

    write_artifact(image_path, config, artifact_id, &fields).map_err(|detail| {
        ImageFailure::Extraction {
            path: image_path.to_path_buf(),
            detail,
        }
    })?;

    Ok(fields)
}

/// Persist the verbatim reply, keyed by the run-unique artifact id.
///
/// The extracted cheque number rides along as metadata; it is never part
/// of the file name, so a missing or duplicated number cannot overwrite
/// an earlier artifact.
fn write_artifact(
    image_path: &Path,
    config: &ProcessingConfig,
    artifact_id: &str,
    fields: &RawFields,
) -> Result<(), String> {
    let artifact = RawExtractionArtifact {
        artifact_id: artifact_id.to_string(),
        source_image: image_path.to_path_buf(),
        cheque_number: normalize::cheque_number(fields),
        response: serde_json::Value::Object(fields.clone()),
    };
    let path = config
        .artifact_dir
        .join(format!("{artifact_id}_details.json"));
    let body = serde_json::to_string_pretty(&artifact)
        .map_err(|e| format!("artifact serialization failed: {e}"))?;
    std::fs::write(&path, body).map_err(|e| format!("artifact write failed: {e}"))?;
    debug!("wrote artifact {}", path.display());
    Ok(())
}
