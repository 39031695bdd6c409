//! Region preprocessing: crop, grayscale, binarize.
//!
//! Normalizes the surface handed to extraction when the pipeline runs in
//! [`crate::config::PipelineMode::PreprocessThenExtract`]. The threshold
//! is chosen by Otsu's method from the crop's own histogram — scans vary
//! in exposure and paper tint, so no fixed constant survives contact with
//! a second scanner.
//!
//! The stage is pure: identical input file + crop always yields an
//! identical raster. It returns the in-memory image and persists nothing.

use crate::config::CropRegion;
use crate::error::ImageFailure;
use image::GrayImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use std::path::Path;
use tracing::debug;

/// Crop `image_path` to `crop`, convert to grayscale, and binarize.
///
/// Validation happens in order, each with its own failure signal:
/// 1. the file must exist,
/// 2. it must decode as a color image,
/// 3. the crop must be a non-degenerate rectangle,
/// 4. the crop must lie fully inside the image bounds.
///
/// Steps 1–2 fail with [`ImageFailure::Decode`]; 3–4 with
/// [`ImageFailure::CropBounds`] — a bad rectangle means the configured
/// scan layout does not match this scan, which is a setup bug rather than
/// something to paper over.
///
/// The output is a crop-sized single-channel raster whose pixels are
/// exactly 0 or 255.
pub fn preprocess(image_path: &Path, crop: &CropRegion) -> Result<GrayImage, ImageFailure> {
    if !image_path.exists() {
        return Err(ImageFailure::Decode {
            path: image_path.to_path_buf(),
            detail: "file does not exist".into(),
        });
    }

    let decoded = image::open(image_path).map_err(|e| ImageFailure::Decode {
        path: image_path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let rgb = decoded.to_rgb8();
    let (img_w, img_h) = rgb.dimensions();

    if !crop.is_well_formed() || !crop.fits_within(img_w, img_h) {
        return Err(ImageFailure::CropBounds {
            path: image_path.to_path_buf(),
            crop_x: crop.x,
            crop_y: crop.y,
            crop_w: crop.width,
            crop_h: crop.height,
            img_w,
            img_h,
        });
    }

    let cropped = image::imageops::crop_imm(&rgb, crop.x, crop.y, crop.width, crop.height)
        .to_image();
    let gray = image::DynamicImage::ImageRgb8(cropped).to_luma8();

    let level = otsu_level(&gray);
    let binary = threshold(&gray, level, ThresholdType::Binary);
    debug!(
        "binarized {} crop {crop} at otsu level {level}",
        image_path.display()
    );

    Ok(binary)
}
