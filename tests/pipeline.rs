//! End-to-end integration tests for cheque2rec.
//!
//! Everything here runs offline: PDFs are synthesized with lopdf and the
//! extraction provider is a scripted double. One live-API test exists at
//! the bottom, gated behind the `E2E_ENABLED` environment variable so it
//! never runs in CI unless explicitly requested.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use cheque2rec::pipeline::encode::ImagePayload;
use cheque2rec::{
    process_document, process_documents, ChequeError, CropRegion, ExtractionProvider,
    ImageFailure, MemoryRecordStore, PipelineMode, ProcessingConfig, ProviderError, RunReport,
    Session,
};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Scripted provider: hands out one reply per call, in order.
struct SequenceProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
}

impl SequenceProvider {
    fn new(replies: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }

    fn repeating(reply: &str) -> Arc<Self> {
        Self::new(vec![Ok(reply.to_string()); 16])
    }
}

#[async_trait]
impl ExtractionProvider for SequenceProvider {
    async fn extract(
        &self,
        _instruction: &str,
        _image: &ImagePayload,
    ) -> Result<String, ProviderError> {
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(detail)) => Err(ProviderError::Api(detail)),
            None => Err(ProviderError::Api("no scripted reply left".into())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ── Synthetic document helpers ───────────────────────────────────────────────

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            image::Rgb([240u8, 240, 240])
        } else {
            image::Rgb([30u8, 30, 30])
        }
    });
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

fn jpeg_image_stream(jpeg: &[u8], width: i64, height: i64) -> Stream {
    let mut stream = Stream::new(
        dictionary! {
            "Type" => Object::Name(b"XObject".to_vec()),
            "Subtype" => Object::Name(b"Image".to_vec()),
            "Width" => Object::Integer(width),
            "Height" => Object::Integer(height),
            "ColorSpace" => Object::Name(b"DeviceRGB".to_vec()),
            "BitsPerComponent" => Object::Integer(8),
            "Filter" => Object::Name(b"DCTDecode".to_vec()),
            "Length" => Object::Integer(jpeg.len() as i64),
        },
        jpeg.to_vec(),
    );
    stream.allows_compression = false;
    stream
}

/// Build a PDF with `images_per_page.len()` pages, each embedding the
/// given number of JPEG scans.
fn cheque_pdf(dir: &Path, name: &str, images_per_page: &[usize]) -> PathBuf {
    let jpeg = jpeg_bytes(120, 60);
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for &count in images_per_page {
        let mut xobjects = Dictionary::new();
        let mut content = String::new();
        for i in 0..count {
            let img_id = doc.add_object(Object::Stream(jpeg_image_stream(&jpeg, 120, 60)));
            let xname = format!("Im{i}");
            xobjects.set(xname.as_bytes().to_vec(), Object::Reference(img_id));
            content.push_str(&format!("q 612 0 0 792 0 0 cm /{xname} Do Q "));
        }
        let content_id = doc.add_object(Object::Stream(Stream::new(
            dictionary! {},
            content.into_bytes(),
        )));
        let page_id = doc.add_object(dictionary! {
            "Type" => Object::Name(b"Page".to_vec()),
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "XObject" => Object::Dictionary(xobjects),
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => Object::Name(b"Pages".to_vec()),
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => Object::Name(b"Catalog".to_vec()),
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

fn standalone_scan(dir: &Path, name: &str) -> PathBuf {
    let img = image::RgbImage::from_pixel(1400, 800, image::Rgb([225u8, 225, 225]));
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

fn config(dir: &Path, provider: Arc<dyn ExtractionProvider>) -> ProcessingConfig {
    ProcessingConfig::builder()
        .work_dir(dir.join("work"))
        .artifact_dir(dir.join("artifacts"))
        .provider(provider)
        .build()
        .expect("valid config")
}

const FULL_REPLY: &str = r#"{
    "Bank Name": "First National",
    "Payee Name": "Acme Corp",
    "Amount": "1,250.00",
    "Date": "2024-03-01",
    "Account Number": "12345678",
    "Cheque Number": "004211"
}"#;

// ── The spec's end-to-end scenario ───────────────────────────────────────────

/// 2-page PDF, one embedded image per page → two extracted files with the
/// expected names → two records tagged with the session user.
#[tokio::test]
async fn two_page_pdf_yields_two_owned_records() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = cheque_pdf(dir.path(), "cheques.pdf", &[1, 1]);
    let cfg = config(dir.path(), SequenceProvider::repeating(FULL_REPLY));
    let store = MemoryRecordStore::new();

    let report = process_document(&pdf, &cfg, &Session::new("alice"), &store)
        .await
        .unwrap();

    assert_eq!(report.stats.images_found, 2);
    assert_eq!(report.records.len(), 2);
    assert!(report.records.iter().all(|r| r.username == "alice"));
    assert_eq!(store.len(), 2);

    let work = dir.path().join("work");
    assert!(work.join("page1_img1.jpg").exists());
    assert!(work.join("page2_img1.jpg").exists());
}

#[tokio::test]
async fn pdf_without_embedded_images_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = cheque_pdf(dir.path(), "vector_only.pdf", &[0, 0]);
    let cfg = config(dir.path(), SequenceProvider::repeating(FULL_REPLY));
    let store = MemoryRecordStore::new();

    let report = process_document(&pdf, &cfg, &Session::new("alice"), &store)
        .await
        .unwrap();

    assert_eq!(report.stats.images_found, 0);
    assert!(report.records.is_empty());
    assert!(report.document_failures.is_empty());
}

#[tokio::test]
async fn mixed_batch_processes_pdf_and_standalone_image() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = cheque_pdf(dir.path(), "cheques.pdf", &[1]);
    let scan = standalone_scan(dir.path(), "walkin.png");
    let cfg = config(dir.path(), SequenceProvider::repeating(FULL_REPLY));
    let store = MemoryRecordStore::new();

    let report = process_documents(&[pdf, scan], &cfg, &Session::new("bob"), &store)
        .await
        .unwrap();

    assert_eq!(report.stats.documents, 2);
    assert_eq!(report.stats.images_found, 2);
    assert_eq!(report.records.len(), 2);
}

// ── Failure isolation ────────────────────────────────────────────────────────

/// One failing extraction must not lose its siblings, and must not leave a
/// placeholder record behind.
#[tokio::test]
async fn failed_image_does_not_abort_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = cheque_pdf(dir.path(), "cheques.pdf", &[1, 1, 1]);
    let provider = SequenceProvider::new(vec![
        Ok(FULL_REPLY.to_string()),
        Err("HTTP 503: overloaded".to_string()),
        Ok(FULL_REPLY.to_string()),
    ]);
    let cfg = config(dir.path(), provider);
    let store = MemoryRecordStore::new();

    let report = process_document(&pdf, &cfg, &Session::new("alice"), &store)
        .await
        .unwrap();

    assert_eq!(report.stats.images_found, 3);
    assert_eq!(report.records.len(), 2, "failed middle image skipped");
    assert_eq!(report.stats.images_failed, 1);
    assert_eq!(store.len(), 2);
    assert!(matches!(
        report.images[1].error,
        Some(ImageFailure::Extraction { .. })
    ));
    assert!(report.images[1].record.is_none());
}

#[tokio::test]
async fn corrupt_pdf_fails_that_document_only() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("corrupt.pdf");
    std::fs::write(&bad, b"%PDF-1.4 garbage that is not a pdf body").unwrap();
    let good = cheque_pdf(dir.path(), "good.pdf", &[1]);
    let cfg = config(dir.path(), SequenceProvider::repeating(FULL_REPLY));
    let store = MemoryRecordStore::new();

    let report = process_documents(&[bad, good], &cfg, &Session::new("alice"), &store)
        .await
        .unwrap();

    assert_eq!(report.stats.documents_failed, 1);
    assert_eq!(report.document_failures.len(), 1);
    assert_eq!(report.records.len(), 1, "good document still processed");
}

// ── Normalization through the full stack ─────────────────────────────────────

#[tokio::test]
async fn missing_fields_become_not_found_in_final_record() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = cheque_pdf(dir.path(), "cheques.pdf", &[1]);
    let cfg = config(
        dir.path(),
        SequenceProvider::repeating(r#"```json
{"Bank Name": "Union Bank", "Amount": "88.00"}
```"#),
    );
    let store = MemoryRecordStore::new();

    let report = process_document(&pdf, &cfg, &Session::new("alice"), &store)
        .await
        .unwrap();

    let record = &report.records[0];
    assert_eq!(record.bank_name, "Union Bank");
    assert_eq!(record.amount, "88.00");
    assert_eq!(record.payee_name, "Not Found");
    assert_eq!(record.cheque_number, "Not Found");
    assert_eq!(record.date, "Not Found");
    assert_eq!(record.account_number, "Not Found");
}

/// Artifacts are keyed per attempt: two replies carrying the same cheque
/// number must produce two distinct artifact files.
#[tokio::test]
async fn duplicate_cheque_numbers_do_not_clobber_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = cheque_pdf(dir.path(), "cheques.pdf", &[1, 1]);
    let cfg = config(dir.path(), SequenceProvider::repeating(FULL_REPLY));
    let store = MemoryRecordStore::new();

    let report = process_document(&pdf, &cfg, &Session::new("alice"), &store)
        .await
        .unwrap();

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].cheque_number, report.records[1].cheque_number);

    let artifacts: Vec<_> = std::fs::read_dir(dir.path().join("artifacts"))
        .unwrap()
        .flatten()
        .collect();
    assert_eq!(artifacts.len(), 2, "one artifact per attempt, none clobbered");
    assert_ne!(report.images[0].artifact_id, report.images[1].artifact_id);
}

// ── Preprocess mode ──────────────────────────────────────────────────────────

#[tokio::test]
async fn preprocess_mode_extracts_with_in_bounds_crop() {
    let dir = tempfile::tempdir().unwrap();
    let scan = standalone_scan(dir.path(), "scan.png"); // 1400x800
    let cfg = ProcessingConfig::builder()
        .work_dir(dir.path().join("work"))
        .artifact_dir(dir.path().join("artifacts"))
        .mode(PipelineMode::PreprocessThenExtract)
        .crop(CropRegion::new(910, 340, 370, 380))
        .provider(SequenceProvider::repeating(FULL_REPLY))
        .build()
        .unwrap();
    let store = MemoryRecordStore::new();

    let report = process_document(&scan, &cfg, &Session::new("alice"), &store)
        .await
        .unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.stats.images_failed, 0);
}

// ── Bytes input ──────────────────────────────────────────────────────────────

/// Uploads arrive as buffers; the tempfile has no extension, so this also
/// exercises magic-byte classification end to end.
#[tokio::test]
async fn in_memory_pdf_bytes_round_trip() {
    use cheque2rec::process_bytes;

    let dir = tempfile::tempdir().unwrap();
    let pdf = cheque_pdf(dir.path(), "cheques.pdf", &[1]);
    let bytes = std::fs::read(&pdf).unwrap();
    let cfg = config(dir.path(), SequenceProvider::repeating(FULL_REPLY));
    let store = MemoryRecordStore::new();

    let report = process_bytes(&bytes, &cfg, &Session::new("alice"), &store)
        .await
        .unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(store.len(), 1);
}

// ── Report shape ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn report_round_trips_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = cheque_pdf(dir.path(), "cheques.pdf", &[1]);
    let cfg = config(dir.path(), SequenceProvider::repeating(FULL_REPLY));
    let store = MemoryRecordStore::new();

    let report = process_document(&pdf, &cfg, &Session::new("alice"), &store)
        .await
        .unwrap();

    let json = serde_json::to_string_pretty(&report).expect("report must serialize");
    let back: RunReport = serde_json::from_str(&json).expect("report must deserialize");
    assert_eq!(back.stats.images_found, report.stats.images_found);
    assert_eq!(back.records, report.records);
}

#[tokio::test]
async fn unreadable_input_surfaces_as_document_failure() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path(), SequenceProvider::repeating(FULL_REPLY));
    let store = MemoryRecordStore::new();

    let report = process_documents(
        &[dir.path().join("missing.pdf")],
        &cfg,
        &Session::new("alice"),
        &store,
    )
    .await
    .unwrap();

    assert_eq!(report.document_failures.len(), 1);
    assert!(report.document_failures[0].error.contains("not found"));
}

#[tokio::test]
async fn invalid_config_rejected_before_any_work() {
    let err = ProcessingConfig::builder()
        .crop(CropRegion::new(0, 0, 0, 0))
        .build()
        .unwrap_err();
    assert!(matches!(err, ChequeError::InvalidConfig(_)));
}

// ── Live provider test (gated, needs a real API key) ─────────────────────────

/// Requires E2E_ENABLED=1 and GEMINI_API_KEY. Sends one tiny image to the
/// real service and only asserts the pipeline round-trips without a
/// transport error — field quality is the model's business, not ours.
#[tokio::test]
async fn live_gemini_extraction() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run live tests");
        return;
    }
    if std::env::var("GEMINI_API_KEY").is_err() {
        println!("SKIP — GEMINI_API_KEY not set");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let scan = standalone_scan(dir.path(), "live.png");
    let cfg = ProcessingConfig::builder()
        .work_dir(dir.path().join("work"))
        .artifact_dir(dir.path().join("artifacts"))
        .build()
        .unwrap();
    let store = MemoryRecordStore::new();

    let report = process_document(&scan, &cfg, &Session::new("live"), &store)
        .await
        .expect("run-level setup must succeed");

    println!(
        "live run: {} record(s), {} failure(s)",
        report.stats.records_extracted, report.stats.images_failed
    );
}
