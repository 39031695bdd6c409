//! Configuration types for cheque processing runs.
//!
//! All pipeline behaviour is controlled through [`ProcessingConfig`], built
//! via its [`ProcessingConfigBuilder`]. Keeping every knob in one struct
//! makes it trivial to share configs across calls, log them, and diff two
//! runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely
//! on well-documented defaults for the rest.

use crate::error::ChequeError;
use crate::progress::RunProgressCallback;
use crate::provider::ExtractionProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// An axis-aligned rectangle in pixel space used to select a sub-image.
///
/// Must lie fully inside the source image: `x + width <= image.width` and
/// `y + height <= image.height`. The preprocessor validates this and
/// reports a violation as [`crate::error::ImageFailure::CropBounds`] —
/// fixed crop coordinates encode a known scan layout, so a violation is a
/// configuration bug rather than a recoverable runtime condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    /// Left edge of the crop, in pixels from the image's left border.
    pub x: u32,
    /// Top edge of the crop, in pixels from the image's top border.
    pub y: u32,
    /// Crop width in pixels. Must be non-zero.
    pub width: u32,
    /// Crop height in pixels. Must be non-zero.
    pub height: u32,
}

impl CropRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when both dimensions are non-zero.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// True when the region lies fully inside an `img_w` × `img_h` image.
    ///
    /// Uses checked arithmetic so a degenerate crop near `u32::MAX` cannot
    /// wrap around and pass the bounds check.
    pub fn fits_within(&self, img_w: u32, img_h: u32) -> bool {
        self.x.checked_add(self.width).is_some_and(|r| r <= img_w)
            && self.y.checked_add(self.height).is_some_and(|b| b <= img_h)
    }
}

impl Default for CropRegion {
    /// The courtesy-amount region of the reference scan layout.
    fn default() -> Self {
        Self::new(910, 340, 370, 380)
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Which image the extraction provider is shown.
///
/// The two modes exist because cropping + binarizing before extraction and
/// sending the raw scan are genuinely different pipelines with different
/// failure surfaces; callers pick one explicitly rather than the library
/// silently preferring either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PipelineMode {
    /// Send the original image untouched. The crop region is unused. (default)
    #[default]
    ExtractRaw,
    /// Crop + grayscale + Otsu-binarize first, then send the binary crop.
    PreprocessThenExtract,
}

/// Configuration for a cheque-processing run.
///
/// Built via [`ProcessingConfig::builder()`] or using
/// [`ProcessingConfig::default()`].
///
/// # Example
/// ```rust
/// use cheque2rec::{CropRegion, PipelineMode, ProcessingConfig};
///
/// let config = ProcessingConfig::builder()
///     .crop(CropRegion::new(910, 340, 370, 380))
///     .mode(PipelineMode::PreprocessThenExtract)
///     .work_dir("/tmp/cheque_images")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ProcessingConfig {
    /// Region of interest on the scan. Default: the reference layout's
    /// courtesy-amount block at (910, 340), 370 × 380 px.
    ///
    /// Only consulted in [`PipelineMode::PreprocessThenExtract`]; the raw
    /// mode sends the full scan and never touches it.
    pub crop: CropRegion,

    /// Which image variant the provider sees. Default: [`PipelineMode::ExtractRaw`].
    pub mode: PipelineMode,

    /// Directory that receives images extracted from PDFs (and, for
    /// standalone image inputs, nothing — those are read in place).
    /// Created if absent. Default: `./output_images`.
    pub work_dir: PathBuf,

    /// Directory that receives raw extraction artifacts
    /// (`{artifact_id}_details.json`). Created if absent.
    /// Default: `./extracted_data`.
    pub artifact_dir: PathBuf,

    /// Remove files left in `work_dir` by earlier runs before processing
    /// starts. Default: true.
    ///
    /// The working directory is written to only by the single active run,
    /// so a one-shot sweep at batch start is all the coordination needed.
    pub clear_work_dir: bool,

    /// Model identifier for the default provider, e.g. "gemini-1.5-flash".
    /// If None, the provider's default is used.
    pub model: Option<String>,

    /// Pre-constructed extraction provider. Takes precedence over
    /// environment-based provider resolution. This is also the seam tests
    /// use to substitute a mock.
    pub provider: Option<Arc<dyn ExtractionProvider>>,

    /// Per-request timeout for the provider call in seconds. Default: 60.
    ///
    /// There is no retry: a timed-out call fails that image and the run
    /// moves on to the next one.
    pub api_timeout_secs: u64,

    /// Per-image progress events. Default: None (no reporting).
    pub progress_callback: Option<Arc<dyn RunProgressCallback>>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            crop: CropRegion::default(),
            mode: PipelineMode::default(),
            work_dir: PathBuf::from("./output_images"),
            artifact_dir: PathBuf::from("./extracted_data"),
            clear_work_dir: true,
            model: None,
            provider: None,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ProcessingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingConfig")
            .field("crop", &self.crop)
            .field("mode", &self.mode)
            .field("work_dir", &self.work_dir)
            .field("artifact_dir", &self.artifact_dir)
            .field("clear_work_dir", &self.clear_work_dir)
            .field("model", &self.model)
            .field(
                "provider",
                &self.provider.as_ref().map(|_| "<dyn ExtractionProvider>"),
            )
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ProcessingConfig {
    /// Create a new builder for `ProcessingConfig`.
    pub fn builder() -> ProcessingConfigBuilder {
        ProcessingConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ProcessingConfig`].
#[derive(Debug)]
pub struct ProcessingConfigBuilder {
    config: ProcessingConfig,
}

impl ProcessingConfigBuilder {
    pub fn crop(mut self, crop: CropRegion) -> Self {
        self.config.crop = crop;
        self
    }

    pub fn mode(mut self, mode: PipelineMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.artifact_dir = dir.into();
        self
    }

    pub fn clear_work_dir(mut self, v: bool) -> Self {
        self.config.clear_work_dir = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn ExtractionProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn RunProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ProcessingConfig, ChequeError> {
        let c = &self.config;
        if !c.crop.is_well_formed() {
            return Err(ChequeError::InvalidConfig(format!(
                "crop region must have non-zero width and height, got {}",
                c.crop
            )));
        }
        if c.work_dir == c.artifact_dir {
            return Err(ChequeError::InvalidConfig(
                "work_dir and artifact_dir must differ — the working directory is cleared per run"
                    .into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_crop_matches_reference_layout() {
        let c = CropRegion::default();
        assert_eq!((c.x, c.y, c.width, c.height), (910, 340, 370, 380));
    }

    #[test]
    fn crop_bounds_checks() {
        let c = CropRegion::new(10, 10, 100, 50);
        assert!(c.fits_within(110, 60));
        assert!(!c.fits_within(109, 60));
        assert!(!c.fits_within(110, 59));
    }

    #[test]
    fn crop_bounds_does_not_overflow() {
        let c = CropRegion::new(u32::MAX, 0, 2, 2);
        assert!(!c.fits_within(u32::MAX, u32::MAX));
    }

    #[test]
    fn zero_dimension_crop_rejected_at_build() {
        let err = ProcessingConfig::builder()
            .crop(CropRegion::new(0, 0, 0, 10))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("non-zero"));
    }

    #[test]
    fn same_work_and_artifact_dir_rejected() {
        let err = ProcessingConfig::builder()
            .work_dir("/tmp/same")
            .artifact_dir("/tmp/same")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn default_mode_is_extract_raw() {
        assert_eq!(ProcessingConfig::default().mode, PipelineMode::ExtractRaw);
    }
}
