//! # Cover Extraction
//!
//! Cover thumbnail extraction for downloaded book attachments.
//!
//! ## Overview
//!
//! - **EPUB**: decodes the cover image the package declares
//! - **PDF**: renders the first page through Pdfium
//! - Artifacts are JPEGs bounded to 600px, written once per source file
//!
//! Extraction failures are per-item: callers log them and keep the item
//! on the shelf without a cover.

pub mod error;
pub mod extractor;
pub mod source;

pub use error::{CoverError, Result};
pub use extractor::{CoverExtractor, MAX_COVER_DIMENSION};
pub use source::{cover_file_name, CoverSource};
