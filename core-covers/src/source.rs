//! Cover source classification
//!
//! Resolves how a downloaded attachment yields its cover exactly once, so
//! the extraction stage dispatches on a known variant instead of re-probing
//! MIME strings and extensions at every step.

use std::path::Path;

use crate::error::{CoverError, Result};

/// The two ways an attachment can produce a cover image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSource {
    /// EPUB container: use the declared cover image
    Epub,
    /// PDF: render the first page
    Pdf,
}

impl CoverSource {
    /// Classify a file by MIME type, falling back to the file extension
    ///
    /// The MIME type reported by the API wins when it is one we recognize;
    /// the extension only decides for missing or unrecognized MIME types.
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::UnsupportedFileType`] when neither the MIME
    /// type nor the extension identifies an EPUB or PDF.
    pub fn for_file(path: &Path, mime_type: Option<&str>) -> Result<Self> {
        match mime_type {
            Some("application/epub+zip") => return Ok(CoverSource::Epub),
            Some("application/pdf") => return Ok(CoverSource::Pdf),
            _ => {}
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "epub" => Ok(CoverSource::Epub),
            "pdf" => Ok(CoverSource::Pdf),
            _ => Err(CoverError::UnsupportedFileType { extension }),
        }
    }
}

/// Artifact file name derived from the source file, `{stem}.jpg`
///
/// Deterministic so repeat extractions address the same artifact.
pub fn cover_file_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("cover");

    format!("{}.jpg", stem)
}
