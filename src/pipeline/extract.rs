//! Embedded-image extraction: pull raster XObjects out of PDF pages.
//!
//! ## Why object extraction instead of rasterisation?
//!
//! Scanned cheque PDFs are containers around the original scans: each page
//! carries the scan as an image XObject. Extracting that object preserves
//! the scanner's native encoding (usually JPEG) pixel-for-pixel, whereas
//! rendering the page would re-sample it at some arbitrary DPI and bake in
//! whatever the page transform does. Pages with no embedded images
//! (vector-only, text-only) simply yield nothing — there is no scan to
//! process.
//!
//! ## Encoding preservation
//!
//! * `DCTDecode` streams are JPEG files; written verbatim as `.jpg`.
//! * `JPXDecode` streams are JPEG 2000; written verbatim as `.jp2`.
//! * Streams whose decompressed content is already a self-contained image
//!   file are written as-is with a sniffed extension.
//! * Raw pixel streams (Flate or unfiltered) are reconstructed from
//!   `/Width`, `/Height`, `/BitsPerComponent`, `/ColorSpace` and written
//!   as `.png`.

use crate::error::ChequeError;
use crate::output::ExtractedImage;
use lopdf::{Dictionary, Document, Object};
use std::path::Path;
use tracing::{debug, info, warn};

/// Extract every embedded raster image from `pdf_path` into `output_dir`.
///
/// Pages are visited in document order; within a page, images keep their
/// `/XObject` dictionary listing order. Output names are
/// `page{P}_img{I}.{ext}` with P and I both 1-based, so a given document
/// layout always produces the same set of unique names.
///
/// An individual image that cannot be decoded is logged and skipped;
/// sibling images and later pages are unaffected. Files already written
/// before a failure are left in place.
///
/// # Errors
/// * [`ChequeError::DocumentOpen`] — the PDF itself is unreadable.
/// * [`ChequeError::Io`] — the output directory cannot be created or
///   written.
pub fn extract_images(
    pdf_path: &Path,
    output_dir: &Path,
) -> Result<Vec<ExtractedImage>, ChequeError> {
    std::fs::create_dir_all(output_dir).map_err(|e| ChequeError::Io {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let doc = Document::load(pdf_path).map_err(|e| ChequeError::DocumentOpen {
        path: pdf_path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut extracted = Vec::new();

    // get_pages() keys are 1-based page numbers in document order.
    for (page_no, page_id) in doc.get_pages() {
        let page_dict = match doc.get_object(page_id).and_then(Object::as_dict) {
            Ok(d) => d,
            Err(e) => {
                warn!("page {page_no}: not a dictionary ({e}), skipping");
                continue;
            }
        };

        let xobjects = match page_xobjects(&doc, page_dict) {
            Some(x) => x,
            None => continue, // no /Resources or no /XObject — nothing embedded
        };

        let mut image_index = 0usize;
        for (name, entry) in xobjects.iter() {
            let stream = match resolve(&doc, entry) {
                Object::Stream(s) => s,
                _ => continue,
            };
            if !is_image_subtype(&stream.dict) {
                continue;
            }
            image_index += 1;

            let (bytes, ext) = match image_bytes(&doc, stream) {
                Ok(pair) => pair,
                Err(detail) => {
                    warn!(
                        "page {page_no} image {image_index} ({}): {detail}, skipping",
                        String::from_utf8_lossy(name)
                    );
                    continue;
                }
            };

            let file_name = format!("page{page_no}_img{image_index}.{ext}");
            let path = output_dir.join(&file_name);
            std::fs::write(&path, &bytes).map_err(|e| ChequeError::Io {
                path: path.clone(),
                source: e,
            })?;

            debug!("extracted {} ({} bytes)", path.display(), bytes.len());
            extracted.push(ExtractedImage {
                page: page_no as usize,
                index: image_index,
                ext,
                path,
            });
        }
    }

    info!(
        "extracted {} embedded image(s) from {}",
        extracted.len(),
        pdf_path.display()
    );
    Ok(extracted)
}

/// Resolve a page's `/XObject` resource dictionary, following the page
/// tree's `/Parent` chain for inherited `/Resources`.
fn page_xobjects<'a>(doc: &'a Document, page_dict: &'a Dictionary) -> Option<&'a Dictionary> {
    let resources = resolve_inherited(doc, page_dict, b"Resources")?;
    let resources = resolve(doc, resources).as_dict().ok()?;
    let xobjects = resources.get(b"XObject").ok()?;
    resolve(doc, xobjects).as_dict().ok()
}

/// Look up `key` on the page, walking up `/Parent` links when absent.
fn resolve_inherited<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = dict;
    loop {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?;
        current = resolve(doc, parent).as_dict().ok()?;
    }
}

/// Follow a reference to its target, or return the object as-is.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Check `/Subtype /Image` on a stream dictionary.
fn is_image_subtype(dict: &Dictionary) -> bool {
    dict.get(b"Subtype")
        .map(|obj| matches!(obj, Object::Name(n) if n == b"Image"))
        .unwrap_or(false)
}

/// Check whether the stream's `/Filter` chain contains `name`.
fn has_filter(dict: &Dictionary, name: &[u8]) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => n == name,
        Ok(Object::Array(arr)) => arr
            .iter()
            .any(|o| matches!(o, Object::Name(n) if n == name)),
        _ => false,
    }
}

/// Turn an image stream into writable bytes plus the matching extension.
fn image_bytes(doc: &Document, stream: &lopdf::Stream) -> Result<(Vec<u8>, String), String> {
    if has_filter(&stream.dict, b"DCTDecode") {
        // DCTDecode = JPEG: the stream content IS the file. Decompress
        // first in case an outer Flate layer wraps it.
        let content = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        return Ok((content, "jpg".into()));
    }
    if has_filter(&stream.dict, b"JPXDecode") {
        let content = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        return Ok((content, "jp2".into()));
    }

    let content = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    // Some streams hold complete image files (TIFF, PNG) — keep them as-is.
    if let Ok(format) = image::guess_format(&content) {
        let ext = format
            .extensions_str()
            .first()
            .copied()
            .unwrap_or("bin")
            .to_string();
        return Ok((content, ext));
    }

    // Raw pixels: rebuild from the stream dictionary's geometry.
    let png = reconstruct_raw_image(doc, &stream.dict, &content)?;
    Ok((png, "png".into()))
}

/// Reconstruct a PNG from raw pixel data using PDF image metadata.
fn reconstruct_raw_image(
    doc: &Document,
    dict: &Dictionary,
    raw_pixels: &[u8],
) -> Result<Vec<u8>, String> {
    let width = get_int(dict, b"Width")? as u32;
    let height = get_int(dict, b"Height")? as u32;
    let bpc = get_int(dict, b"BitsPerComponent").unwrap_or(8) as u32;
    if bpc != 8 {
        return Err(format!("unsupported bits per component: {bpc}"));
    }

    let channels = color_channels(doc, dict);
    let expected = (width as usize) * (height as usize) * (channels as usize);
    if raw_pixels.len() < expected {
        return Err(format!(
            "pixel buffer too small: {} bytes, expected {expected} ({width}x{height}x{channels})",
            raw_pixels.len()
        ));
    }

    let img = match channels {
        1 => image::GrayImage::from_raw(width, height, raw_pixels[..expected].to_vec())
            .map(image::DynamicImage::ImageLuma8)
            .ok_or("failed to build grayscale image")?,
        3 => image::RgbImage::from_raw(width, height, raw_pixels[..expected].to_vec())
            .map(image::DynamicImage::ImageRgb8)
            .ok_or("failed to build RGB image")?,
        n => return Err(format!("unsupported channel count: {n}")),
    };

    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| format!("PNG encode failed: {e}"))?;
    Ok(buf.into_inner())
}

/// Channel count from `/ColorSpace`; defaults to RGB when absent or exotic.
fn color_channels(doc: &Document, dict: &Dictionary) -> u32 {
    let cs = match dict.get(b"ColorSpace") {
        Ok(obj) => resolve(doc, obj),
        Err(_) => return 3,
    };
    match cs {
        Object::Name(n) => match n.as_slice() {
            b"DeviceGray" => 1,
            b"DeviceRGB" => 3,
            b"DeviceCMYK" => 4,
            _ => 3,
        },
        _ => 3,
    }
}

fn get_int(dict: &Dictionary, key: &[u8]) -> Result<i64, String> {
    dict.get(key)
        .map_err(|_| format!("missing /{}", String::from_utf8_lossy(key)))?
        .as_i64()
        .map_err(|_| format!("/{} is not an integer", String::from_utf8_lossy(key)))
}
