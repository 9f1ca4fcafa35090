//! Error types for cover extraction

use thiserror::Error;

/// Cover extraction errors
///
/// Callers treat these as per-item failures: the shelf item survives with
/// no cover rather than failing the refresh.
#[derive(Error, Debug)]
pub enum CoverError {
    /// File is neither an EPUB nor a PDF
    #[error("Unsupported file type for cover extraction: {extension}")]
    UnsupportedFileType { extension: String },

    /// EPUB opened fine but declares no cover image
    #[error("EPUB declares no cover image")]
    NoCoverDeclared,

    /// PDF opened fine but contains no pages
    #[error("PDF has no pages to render")]
    NoPages,

    /// Source file could not be opened as its claimed format
    #[error("Source file is corrupt or password-protected: {0}")]
    CorruptOrProtected(String),

    /// PDF rendering backend failed or is not installed
    #[error("PDF renderer unavailable: {0}")]
    Renderer(String),

    /// Image decoding, resizing or encoding failed
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cover operations
pub type Result<T> = std::result::Result<T, CoverError>;
