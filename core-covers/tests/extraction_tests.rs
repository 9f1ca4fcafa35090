//! Integration tests for cover artifact extraction
//!
//! EPUB fixtures are assembled in-test from a minimal container so the
//! extraction path runs against real zip archives. PDF rendering needs
//! the native Pdfium library, which test environments do not carry; the
//! bounding math it shares with the EPUB path is unit tested instead.

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;

use core_covers::{CoverError, CoverExtractor};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const CHAPTER_XHTML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>One</title></head>
<body><p>First chapter.</p></body></html>"#;

const TOC_NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="fixture-book"/></head>
  <docTitle><text>Fixture Book</text></docTitle>
  <navMap>
    <navPoint id="ch1" playOrder="1">
      <navLabel><text>One</text></navLabel>
      <content src="chapter1.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([180, 40, 60])));
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .unwrap();
    buffer
}

/// Write a minimal EPUB 2 archive, optionally with a declared cover
fn write_epub(path: &Path, cover: Option<&[u8]>) {
    let file = File::create(path).unwrap();
    let mut archive = ZipWriter::new(file);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    archive.start_file("mimetype", stored).unwrap();
    archive.write_all(b"application/epub+zip").unwrap();

    archive.start_file("META-INF/container.xml", stored).unwrap();
    archive.write_all(CONTAINER_XML.as_bytes()).unwrap();

    let (cover_meta, cover_item) = if cover.is_some() {
        (
            r#"<meta name="cover" content="cover-image"/>"#,
            r#"<item id="cover-image" href="cover.jpg" media-type="image/jpeg"/>"#,
        )
    } else {
        ("", "")
    };

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="uid" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">fixture-book</dc:identifier>
    <dc:title>Fixture Book</dc:title>
    <dc:language>en</dc:language>
    {cover_meta}
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="chapter1" href="chapter1.xhtml" media-type="application/xhtml+xml"/>
    {cover_item}
  </manifest>
  <spine toc="ncx">
    <itemref idref="chapter1"/>
  </spine>
</package>"#
    );

    archive.start_file("OEBPS/content.opf", stored).unwrap();
    archive.write_all(opf.as_bytes()).unwrap();

    archive.start_file("OEBPS/chapter1.xhtml", stored).unwrap();
    archive.write_all(CHAPTER_XHTML.as_bytes()).unwrap();

    archive.start_file("OEBPS/toc.ncx", stored).unwrap();
    archive.write_all(TOC_NCX.as_bytes()).unwrap();

    if let Some(bytes) = cover {
        archive.start_file("OEBPS/cover.jpg", stored).unwrap();
        archive.write_all(bytes).unwrap();
    }

    archive.finish().unwrap();
}

#[tokio::test]
async fn test_extracts_declared_epub_cover_bounded_to_600() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("ATTACH01_the-dispossessed.epub");
    write_epub(&source, Some(&jpeg_bytes(1200, 900)));

    let extractor = CoverExtractor::new(dir.path().join("covers"));
    let artifact = extractor
        .extract(&source, Some("application/epub+zip"))
        .await
        .unwrap();

    assert_eq!(
        artifact,
        dir.path().join("covers/ATTACH01_the-dispossessed.jpg")
    );

    let written = image::open(&artifact).unwrap();
    assert_eq!(written.width(), 600);
    assert_eq!(written.height(), 450);
}

#[tokio::test]
async fn test_small_cover_is_not_upscaled() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("novella.epub");
    write_epub(&source, Some(&jpeg_bytes(200, 300)));

    let extractor = CoverExtractor::new(dir.path().join("covers"));
    let artifact = extractor.extract(&source, None).await.unwrap();

    let written = image::open(&artifact).unwrap();
    assert_eq!(written.width(), 200);
    assert_eq!(written.height(), 300);
}

#[tokio::test]
async fn test_epub_without_cover_reports_no_cover_declared() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("plain.epub");
    write_epub(&source, None);

    let extractor = CoverExtractor::new(dir.path().join("covers"));
    let result = extractor.extract(&source, None).await;

    assert!(matches!(result, Err(CoverError::NoCoverDeclared)));
    assert!(!extractor.artifact_path(&source).exists());
}

#[tokio::test]
async fn test_garbage_file_reports_corrupt() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("broken.epub");
    std::fs::write(&source, b"not an epub at all").unwrap();

    let extractor = CoverExtractor::new(dir.path().join("covers"));
    let result = extractor.extract(&source, None).await;

    assert!(matches!(result, Err(CoverError::CorruptOrProtected(_))));
}

#[tokio::test]
async fn test_existing_artifact_short_circuits() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("cached.epub");
    write_epub(&source, Some(&jpeg_bytes(1200, 900)));

    let covers_dir = dir.path().join("covers");
    std::fs::create_dir_all(&covers_dir).unwrap();

    let extractor = CoverExtractor::new(&covers_dir);
    std::fs::write(extractor.artifact_path(&source), b"sentinel").unwrap();

    let artifact = extractor.extract(&source, None).await.unwrap();

    assert_eq!(std::fs::read(&artifact).unwrap(), b"sentinel");
}

#[tokio::test]
async fn test_unsupported_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("book.mobi");
    std::fs::write(&source, b"mobi bytes").unwrap();

    let extractor = CoverExtractor::new(dir.path().join("covers"));
    let result = extractor.extract(&source, None).await;

    match result {
        Err(CoverError::UnsupportedFileType { extension }) => assert_eq!(extension, "mobi"),
        other => panic!("Expected UnsupportedFileType, got {:?}", other.map(|p| p.display().to_string())),
    }
}

#[tokio::test]
async fn test_mime_type_overrides_extension() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("book.bin");
    write_epub(&source, Some(&jpeg_bytes(640, 480)));

    let extractor = CoverExtractor::new(dir.path().join("covers"));
    let artifact = extractor
        .extract(&source, Some("application/epub+zip"))
        .await
        .unwrap();

    assert_eq!(artifact, dir.path().join("covers/book.jpg"));
    assert!(artifact.exists());
}
