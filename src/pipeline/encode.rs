//! Image encoding: file or in-memory raster → base64 [`ImagePayload`].
//!
//! Vision APIs accept images as base64 data embedded in the JSON request
//! body. Raw scans travel in their native encoding (the scanner's JPEG is
//! already as good as it gets); preprocessed crops are PNG-encoded because
//! PNG is lossless and a binarized crop compresses to almost nothing.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::GrayImage;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use super::input::sniff_mime;

/// A base64-encoded image ready for a provider request body.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// Base64 (standard alphabet, padded) image bytes.
    pub data: String,
    /// `image/png` or `image/jpeg`, sniffed from the encoded bytes.
    pub mime_type: String,
}

/// Encode an image file as-is, preserving its native encoding.
pub fn encode_file(path: &Path) -> Result<ImagePayload, std::io::Error> {
    let bytes = std::fs::read(path)?;
    let mime = sniff_mime(&bytes);
    let data = STANDARD.encode(&bytes);
    debug!("encoded {} → {} bytes base64 ({mime})", path.display(), data.len());
    Ok(ImagePayload {
        data,
        mime_type: mime.to_string(),
    })
}

/// PNG-encode a binarized crop and base64-wrap it.
pub fn encode_binary(img: &GrayImage) -> Result<ImagePayload, image::ImageError> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    let data = STANDARD.encode(&buf);
    debug!("encoded binary crop → {} bytes base64", data.len());
    Ok(ImagePayload {
        data,
        mime_type: "image/png".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn encode_binary_produces_png_payload() {
        let img = GrayImage::from_pixel(8, 8, Luma([255u8]));
        let payload = encode_binary(&img).expect("encode should succeed");
        assert_eq!(payload.mime_type, "image/png");

        let decoded = STANDARD.decode(&payload.data).expect("valid base64");
        assert_eq!(&decoded[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn encode_file_sniffs_jpeg_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.jpg");
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([9u8, 9, 9]));
        image::DynamicImage::ImageRgb8(img)
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .unwrap();

        let payload = encode_file(&path).unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert!(!payload.data.is_empty());
    }

    #[test]
    fn encode_missing_file_errors() {
        assert!(encode_file(Path::new("/no/such/file.png")).is_err());
    }
}
