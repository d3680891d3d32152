//! # ocr2md
//!
//! Convert uploaded PDF, Word, PowerPoint and JPEG files to Markdown, with
//! OCR and table-structure extraction.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Intake   persist bytes under the working directory → ResolvedPath
//!  ├─ 2. Options  PipelineOptions (OCR engine, full-page vs. selective OCR,
//!  │              table structure, cell matching)
//!  ├─ 3. Route    FormatRegistry: extension → FormatOptionsMap
//!  ├─ 4. Convert  DocumentConverter dispatches to the pdf / jpeg / docx /
//!  │              pptx backend → ConvertedDocument
//!  └─ 5. Export   deterministic Markdown (or JSON)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr2md::{DocumentConverter, FileIntake, FormatRegistry, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let upload = UploadedFile::from_path("scan.pdf")?;
//!     let path = FileIntake::default().save(&upload)?;
//!
//!     // Only PDFs are registered: full-page OCR with table structure.
//!     let options = FormatRegistry::standard().route(&path);
//!     let result = DocumentConverter::new(options).convert(&path).await?;
//!     print!("{}", result.document.export_to_markdown());
//!     Ok(())
//! }
//! ```
//!
//! ## OCR
//!
//! OCR runs the `tesseract` command-line program (`OcrEngine::TesseractCli`).
//! The other engine kinds can be selected but fail with
//! [`Ocr2MdError::OcrEngineUnavailable`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ocr2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod export;
pub mod format;
pub mod intake;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConverterConfig, ConverterConfigBuilder, OcrEngine, PageSelection, PageSeparator,
    PipelineOptions, PipelineOptionsBuilder,
};
pub use convert::{
    convert_sync, convert_to_markdown, inspect, ConversionResult, DocumentConverter,
};
pub use document::{ConvertedDocument, DocItem, ItemContent, TableData};
pub use error::{ErrorKind, Ocr2MdError};
pub use export::MarkdownOptions;
pub use format::{
    FormatOption, FormatOptionsMap, FormatRegistry, ImageFormatOption, InputFormat,
    PdfFormatOption,
};
pub use intake::{FileIntake, ResolvedPath, UploadedFile};
pub use pipeline::pdf::PdfMetadata;
