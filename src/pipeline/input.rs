//! Input classification: decide what kind of document a path holds.
//!
//! ## Why magic bytes instead of extensions?
//!
//! Upload surfaces routinely hand over files whose extension lies
//! (`scan.jpg` that is really a PDF export, `cheque.pdf` that is a renamed
//! photo). Sniffing the leading bytes gives the pipeline a truthful
//! classification and a meaningful [`ChequeError::UnsupportedInput`] for
//! everything else, instead of a confusing decoder failure three stages
//! later.

use crate::error::ChequeError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What a source file turned out to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDocument {
    /// A PDF container; embedded images still need extracting.
    Pdf(PathBuf),
    /// A standalone raster image, processed directly.
    Image(PathBuf),
}

impl SourceDocument {
    pub fn path(&self) -> &Path {
        match self {
            SourceDocument::Pdf(p) => p,
            SourceDocument::Image(p) => p,
        }
    }
}

/// Classify a file by its magic bytes.
///
/// Accepts `%PDF`, PNG, and JPEG. Anything else (including unreadable or
/// truncated files) is a fatal error for that document.
pub fn classify(path: &Path) -> Result<SourceDocument, ChequeError> {
    if !path.exists() {
        return Err(ChequeError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut magic = [0u8; 4];
    match std::fs::File::open(path) {
        Ok(mut f) => {
            if f.read_exact(&mut magic).is_err() {
                return Err(ChequeError::UnsupportedInput {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ChequeError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(ChequeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    let kind = if &magic == b"%PDF" {
        SourceDocument::Pdf(path.to_path_buf())
    } else if magic == [0x89, b'P', b'N', b'G'] || magic[..3] == [0xFF, 0xD8, 0xFF] {
        SourceDocument::Image(path.to_path_buf())
    } else {
        return Err(ChequeError::UnsupportedInput {
            path: path.to_path_buf(),
            magic,
        });
    };

    debug!("classified {} as {:?}", path.display(), kind);
    Ok(kind)
}

/// Mime type for a raster image file, from its magic bytes.
///
/// Used when building the provider payload; defaults to JPEG when the
/// leading bytes are unrecognised (the provider rejects the payload with a
/// clear error in that case, which beats guessing wrong silently here).
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.len() >= 4 && bytes[..4] == [0x89, b'P', b'N', b'G'] {
        "image/png"
    } else {
        "image/jpeg"
    }
}
