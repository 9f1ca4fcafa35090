//! Cover Artifact Extraction
//!
//! Extracts cover thumbnails from downloaded attachments: the declared
//! cover image for EPUBs, a first-page render for PDFs.
//!
//! ## Overview
//!
//! - Artifacts are JPEGs bounded to [`MAX_COVER_DIMENSION`] on both axes
//! - Extraction is at-most-once: an existing artifact short-circuits
//! - Decoding and rendering run on the blocking pool
//! - Pdfium handles are scoped to a single extraction, so the native
//!   library is released on every exit path
//!
//! ## Usage
//!
//! ```ignore
//! use core_covers::CoverExtractor;
//!
//! let extractor = CoverExtractor::new("/data/covers");
//! let artifact = extractor
//!     .extract(Path::new("/data/downloads/book.epub"), Some("application/epub+zip"))
//!     .await?;
//! ```

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{imageops::FilterType, DynamicImage, ImageFormat};
use pdfium_render::prelude::{
    PdfRenderConfig, Pdfium, PdfiumError, PdfiumInternalError,
};
use tracing::{debug, instrument};

use crate::error::{CoverError, Result};
use crate::source::{cover_file_name, CoverSource};

/// Upper bound for either artifact dimension, in pixels
pub const MAX_COVER_DIMENSION: u32 = 600;

/// Extracts cover artifacts into a covers directory
pub struct CoverExtractor {
    covers_dir: PathBuf,
    max_dimension: u32,
}

impl CoverExtractor {
    /// Create an extractor writing artifacts into `covers_dir`
    pub fn new(covers_dir: impl Into<PathBuf>) -> Self {
        Self {
            covers_dir: covers_dir.into(),
            max_dimension: MAX_COVER_DIMENSION,
        }
    }

    /// Create an extractor with a custom dimension bound
    pub fn with_max_dimension(covers_dir: impl Into<PathBuf>, max_dimension: u32) -> Self {
        Self {
            covers_dir: covers_dir.into(),
            max_dimension,
        }
    }

    /// Path the artifact for `source` is written to
    pub fn artifact_path(&self, source: &Path) -> PathBuf {
        self.covers_dir.join(cover_file_name(source))
    }

    /// Extract a cover artifact for a downloaded attachment
    ///
    /// Returns the artifact path. An artifact that already exists is
    /// returned untouched, so repeat refreshes never re-render.
    ///
    /// # Errors
    ///
    /// - [`CoverError::UnsupportedFileType`] for non-EPUB/PDF files
    /// - [`CoverError::NoCoverDeclared`] when an EPUB has no cover entry
    /// - [`CoverError::CorruptOrProtected`] when the source cannot be
    ///   opened as its claimed format
    #[instrument(skip(self), fields(source = %source.display()))]
    pub async fn extract(&self, source: &Path, mime_type: Option<&str>) -> Result<PathBuf> {
        let kind = CoverSource::for_file(source, mime_type)?;
        let target = self.artifact_path(source);

        if target.exists() {
            debug!("Cover artifact already present");
            return Ok(target);
        }

        tokio::fs::create_dir_all(&self.covers_dir).await?;

        let source = source.to_path_buf();
        let artifact = target.clone();
        let max_dimension = self.max_dimension;

        tokio::task::spawn_blocking(move || {
            extract_blocking(kind, &source, &artifact, max_dimension)
        })
        .await
        .map_err(|e| CoverError::Renderer(format!("Cover task failed: {}", e)))??;

        debug!("Cover artifact written");

        Ok(target)
    }
}

fn extract_blocking(
    kind: CoverSource,
    source: &Path,
    target: &Path,
    max_dimension: u32,
) -> Result<()> {
    let image = match kind {
        CoverSource::Epub => epub_cover_image(source)?,
        CoverSource::Pdf => pdf_first_page_image(source, max_dimension)?,
    };

    let bounded = fit_within(image, max_dimension);
    write_jpeg(&bounded, target)
}

/// Decode the EPUB's declared cover image
fn epub_cover_image(source: &Path) -> Result<DynamicImage> {
    let mut doc = epub::doc::EpubDoc::new(source)
        .map_err(|e| CoverError::CorruptOrProtected(format!("EPUB open failed: {}", e)))?;

    let (data, _mime) = doc.get_cover().ok_or(CoverError::NoCoverDeclared)?;

    Ok(image::load_from_memory(&data)?)
}

/// Render the first PDF page at the bounded size
fn pdf_first_page_image(source: &Path, max_dimension: u32) -> Result<DynamicImage> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| CoverError::Renderer(format!("Pdfium library unavailable: {:?}", e)))?;
    let pdfium = Pdfium::new(bindings);

    let document = pdfium
        .load_pdf_from_file(source, None)
        .map_err(classify_pdfium_error)?;

    let pages = document.pages();
    if pages.len() == 0 {
        return Err(CoverError::NoPages);
    }

    let page = pages.get(0).map_err(classify_pdfium_error)?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_dimension as i32)
        .set_maximum_width(max_dimension as i32)
        .set_maximum_height(max_dimension as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(classify_pdfium_error)?;

    Ok(bitmap.as_image())
}

/// Distinguish broken/protected documents from renderer problems
fn classify_pdfium_error(error: PdfiumError) -> CoverError {
    match error {
        PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError
            | PdfiumInternalError::SecurityError
            | PdfiumInternalError::FormatError
            | PdfiumInternalError::FileError,
        ) => CoverError::CorruptOrProtected(format!("{:?}", error)),
        other => CoverError::Renderer(format!("{:?}", other)),
    }
}

/// Scale down so neither dimension exceeds the bound, preserving aspect
/// ratio. Images already within bounds pass through unchanged.
fn fit_within(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    if image.width() <= max_dimension && image.height() <= max_dimension {
        return image;
    }

    image.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

/// Encode as JPEG and write the artifact
///
/// Alpha channels are dropped first since JPEG cannot carry them.
fn write_jpeg(image: &DynamicImage, target: &Path) -> Result<()> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());

    let mut buffer = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)?;

    std::fs::write(target, &buffer)?;

    Ok(())
}
