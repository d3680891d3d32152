//! End-to-end tests that drive pdfium and the `tesseract` program.
//!
//! They are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested. pdfium is bound from
//! `PDFIUM_LIB_PATH` or the system library; `tesseract` must be on `PATH`
//! with English language data installed.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture

mod common;

use ocr2md::{
    inspect, ConverterConfig, DocumentConverter, ErrorKind, FileIntake, FormatRegistry,
    InputFormat, PageSelection, PipelineOptions, UploadedFile,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

/// Save the generated "Hello World" PDF through intake.
fn saved_hello_world(dir: &std::path::Path) -> PathBuf {
    FileIntake::new(dir)
        .save(&UploadedFile::new("hello.pdf", common::hello_world_pdf()))
        .unwrap()
        .into_path_buf()
}

/// Assert the markdown passes basic quality checks.
fn assert_markdown_quality(md: &str, context: &str) {
    assert!(!md.trim().is_empty(), "[{context}] Markdown is empty");
    assert!(
        md.ends_with('\n') && !md.ends_with("\n\n"),
        "[{context}] Markdown must end with exactly one newline"
    );
    assert!(
        !md.contains("\n\n\n"),
        "[{context}] Output has more than one consecutive blank line"
    );
    for ch in ['\u{200B}', '\u{FEFF}', '\u{200C}', '\u{200D}', '\u{2060}'] {
        assert!(
            !md.contains(ch),
            "[{context}] Output contains invisible char U+{:04X}",
            ch as u32
        );
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_forced_ocr_hello_world() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = saved_hello_world(dir.path());

    let converter = DocumentConverter::new(FormatRegistry::standard().route(&path));
    let result = converter.convert(&path).await.expect("conversion failed");
    let md = result.document.export_to_markdown();
    println!("{md}");

    assert_eq!(result.format, InputFormat::Pdf);
    assert_eq!(result.document.page_count, 1);
    assert_markdown_quality(&md, "hello/forced");
    assert!(md.contains("Hello World"), "OCR missed 'Hello World': {md:?}");
}

#[tokio::test]
async fn test_text_layer_without_ocr() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = saved_hello_world(dir.path());

    let options = PipelineOptions::builder().do_ocr(false).build().unwrap();
    let registry = FormatRegistry::empty().with_pipeline(InputFormat::Pdf, move || options.clone());
    let result = DocumentConverter::new(registry.route(&path))
        .convert(&path)
        .await
        .expect("conversion failed");
    let md = result.document.export_to_markdown();
    assert_markdown_quality(&md, "hello/text-layer");
    assert!(md.contains("Hello World"), "{md:?}");
}

#[tokio::test]
async fn test_selective_ocr_skips_pages_with_text() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = saved_hello_world(dir.path());

    // A missing tesseract only matters when a page needs OCR.
    let options = PipelineOptions::builder()
        .tesseract_cmd("/definitely/not/tesseract")
        .build()
        .unwrap();
    let registry = FormatRegistry::empty().with_pipeline(InputFormat::Pdf, move || options.clone());
    let result = DocumentConverter::new(registry.route(&path))
        .convert(&path)
        .await
        .expect("selective OCR should not need tesseract here");
    assert!(result.document.export_to_markdown().contains("Hello World"));
}

#[tokio::test]
async fn test_forced_ocr_with_missing_engine() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = saved_hello_world(dir.path());

    let options = PipelineOptions::builder()
        .force_full_page_ocr(true)
        .tesseract_cmd("/definitely/not/tesseract")
        .build()
        .unwrap();
    let registry = FormatRegistry::empty().with_pipeline(InputFormat::Pdf, move || options.clone());
    let err = DocumentConverter::new(registry.route(&path))
        .convert(&path)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OcrEngineUnavailable);
}

#[tokio::test]
async fn test_page_selection_out_of_range() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = saved_hello_world(dir.path());

    let config = ConverterConfig::builder()
        .pages(PageSelection::Single(5))
        .build()
        .unwrap();
    let err = DocumentConverter::new(FormatRegistry::standard().route(&path))
        .with_config(config)
        .convert(&path)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailure);
}

#[tokio::test]
async fn test_page_set_reaching_past_the_end() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = saved_hello_world(dir.path());

    let config = ConverterConfig::builder()
        .pages(PageSelection::Set(vec![1, 99]))
        .build()
        .unwrap();
    let err = DocumentConverter::new(FormatRegistry::standard().route(&path))
        .with_config(config)
        .convert(&path)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailure);
    assert!(err.to_string().contains("99"), "{err}");
}

#[tokio::test]
async fn test_inspect_hello_world() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = saved_hello_world(dir.path());

    let meta = inspect(&path, None).await.expect("inspect failed");
    assert_eq!(meta.page_count, 1);
}
