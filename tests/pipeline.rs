//! Integration tests that need neither pdfium nor tesseract.
//!
//! Run with:
//!   cargo test --test pipeline

mod common;

use ocr2md::pipeline::postprocess::clean_markdown;
use ocr2md::{
    DocumentConverter, ErrorKind, FileIntake, FormatOption, FormatOptionsMap, FormatRegistry,
    ImageFormatOption, InputFormat, PipelineOptions, UploadedFile,
};
use std::path::Path;

// ── Router ───────────────────────────────────────────────────────────────────

#[test]
fn standard_registry_routes_only_pdf() {
    let registry = FormatRegistry::standard();

    let map = registry.route("report.PDF");
    assert_eq!(map.len(), 1);
    match map.get(InputFormat::Pdf) {
        Some(FormatOption::Pdf(option)) => {
            assert_eq!(option.pipeline_options, PipelineOptions::full_page_ocr());
            assert!(option.pipeline_options.force_full_page_ocr);
        }
        other => panic!("expected PDF bundle, got {:?}", other),
    }

    for name in ["minutes.docx", "deck.pptx", "old.doc", "photo.JPEG"] {
        assert!(registry.route(name).is_empty(), "{name}");
    }
    assert!(registry.route("notes.txt").is_empty());
    assert!(registry.route("no_extension").is_empty());
}

#[test]
fn registry_accepts_new_builders() {
    let mut registry = FormatRegistry::standard();
    registry.register(InputFormat::Image, || {
        FormatOption::Image(ImageFormatOption {
            pipeline_options: PipelineOptions::full_page_ocr(),
        })
    });
    let map = registry.route("scan.jpg");
    assert_eq!(map.formats().collect::<Vec<_>>(), vec![InputFormat::Image]);
}

#[test]
fn each_route_builds_a_fresh_map() {
    let registry = FormatRegistry::standard();
    let a = registry.route("a.pdf");
    let b = registry.route("b.pdf");
    assert_eq!(a, b);
}

// ── Intake ───────────────────────────────────────────────────────────────────

#[test]
fn intake_overwrites_same_name() {
    let dir = tempfile::tempdir().unwrap();
    let intake = FileIntake::new(dir.path().join("uploads"));

    let first = intake
        .save(&UploadedFile::new("memo.docx", b"first".to_vec()))
        .unwrap();
    let second = intake
        .save(&UploadedFile::new("memo.docx", b"second version".to_vec()))
        .unwrap();

    assert_eq!(first, second);
    assert!(first.as_path().is_absolute());
    assert_eq!(std::fs::read(second.as_path()).unwrap(), b"second version");
}

#[test]
fn intake_rejects_traversal_and_unknown_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let intake = FileIntake::new(dir.path());
    for name in ["../evil.pdf", "a/b.pdf", "notes.txt", ""] {
        let err = intake
            .save(&UploadedFile::new(name, b"x".to_vec()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Intake, "{name:?}");
    }
}

// ── Converter preconditions ──────────────────────────────────────────────────

#[tokio::test]
async fn nonexistent_path_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone.pdf");
    let converter = DocumentConverter::new(FormatRegistry::standard().route(&path));
    let err = converter.convert(&path).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn txt_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "plain text").unwrap();
    let converter = DocumentConverter::new(FormatRegistry::standard().route(&path));
    let err = converter.convert(&path).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

#[tokio::test]
async fn legacy_doc_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let intake = FileIntake::new(dir.path());
    let mut ole = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    ole.resize(512, 0);
    let path = intake.save(&UploadedFile::new("old.doc", ole)).unwrap();

    let err = DocumentConverter::new(FormatOptionsMap::new())
        .convert(&path)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

#[tokio::test]
async fn broken_zip_is_conversion_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pptx");
    std::fs::write(&path, b"PK\x03\x04\x14\x00truncated").unwrap();
    let err = DocumentConverter::new(FormatOptionsMap::new())
        .convert(&path)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailure);
}

#[tokio::test]
async fn malformed_office_xml_is_an_error_not_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let intake = FileIntake::new(dir.path());
    let docx = common::ooxml_container(&[(
        "word/document.xml",
        r#"<w:document xmlns:w="w"><w:body><w:p><w:r><w:t>Kept paragraph</w:t></w:r></w:p><w:p></w:x></w:body></w:document>"#,
    )]);
    let pptx = common::ooxml_container(&[
        ("ppt/presentation.xml", r#"<p:presentation xmlns:p="p"/>"#),
        (
            "ppt/slides/slide1.xml",
            r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>Slide text</a:t></a:r></a:p><a:p></a:q></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
        ),
    ]);

    for (name, bytes) in [("broken.docx", docx), ("broken.pptx", pptx)] {
        let path = intake.save(&UploadedFile::new(name, bytes)).unwrap();
        let converter = DocumentConverter::new(FormatRegistry::standard().route(&path));
        let err = converter.convert(&path).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionFailure, "{name}: {err}");
    }
}

// ── Office documents end to end ──────────────────────────────────────────────

async fn upload_and_convert(dir: &Path, name: &str, bytes: Vec<u8>) -> String {
    let intake = FileIntake::new(dir.join("uploads"));
    let path = intake.save(&UploadedFile::new(name, bytes)).unwrap();
    let converter = DocumentConverter::new(FormatRegistry::standard().route(&path));
    let result = converter.convert(&path).await.unwrap();
    assert_eq!(result.input, path.as_path());
    result.document.export_to_markdown()
}

#[tokio::test]
async fn docx_upload_to_markdown() {
    let dir = tempfile::tempdir().unwrap();
    let md = upload_and_convert(dir.path(), "memo.docx", common::memo_docx()).await;
    assert_eq!(
        md,
        "## Budget\n\nSpending is on track.\n\n| Item | Cost |\n| --- | --- |\n| Paper | 3 |\n"
    );
}

#[tokio::test]
async fn pptx_upload_to_markdown() {
    let dir = tempfile::tempdir().unwrap();
    let md = upload_and_convert(dir.path(), "deck.pptx", common::two_slide_pptx()).await;
    assert_eq!(
        md,
        "## Agenda\n\nWelcome everyone\n\n## Next steps\n\nShip it\n"
    );
}

#[tokio::test]
async fn export_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let intake = FileIntake::new(dir.path());
    let path = intake
        .save(&UploadedFile::new("memo.docx", common::memo_docx()))
        .unwrap();
    let converter = DocumentConverter::new(FormatRegistry::standard().route(&path));

    let first = converter.convert(&path).await.unwrap().document;
    let second = converter.convert(&path).await.unwrap().document;
    assert_eq!(first, second);

    let md = first.export_to_markdown();
    assert_eq!(md, first.export_to_markdown());
    assert_eq!(clean_markdown(&md), md);
}

#[tokio::test]
async fn json_export_round_trips_labels() {
    let dir = tempfile::tempdir().unwrap();
    let intake = FileIntake::new(dir.path());
    let path = intake
        .save(&UploadedFile::new("deck.pptx", common::two_slide_pptx()))
        .unwrap();
    let result = DocumentConverter::new(FormatOptionsMap::new())
        .convert(&path)
        .await
        .unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&result.document.export_to_json().unwrap()).unwrap();
    assert_eq!(json["format"], "POWERPOINT");
    assert_eq!(json["page_count"], 2);
    assert_eq!(json["items"][0]["label"], "section_header");
    assert_eq!(json["items"][3]["page_no"], 2);
}
