//! Conversion stages and per-format backends.
//!
//! ## Data Flow
//!
//! ```text
//!              ┌─▶ pdf ──┐  (pdfium text layer, page renders)
//! input ───────┼─▶ jpeg ─┼──▶ ocr ──▶ layout ──▶ ConvertedDocument
//! (format)     │         │  (tesseract TSV)  (lines, headings, tables)
//!              ├─▶ docx ─┤
//!              └─▶ pptx ─┘  (zip + quick-xml, no OCR)
//! ```
//!
//! 1. [`input`]  validates the path and sniffs the format
//! 2. [`pdf`] / [`jpeg`] produce positioned text cells, from the PDF text
//!    layer or from [`ocr`]; pdfium runs in `spawn_blocking`
//! 3. [`layout`] groups cells into headings, paragraphs, lists and tables
//! 4. [`docx`] / [`pptx`] read Office Open XML structure directly
//! 5. [`postprocess`] holds the deterministic text and Markdown cleanup rules

pub mod docx;
pub mod input;
pub mod jpeg;
pub mod layout;
pub mod ocr;
pub(crate) mod ooxml;
pub mod pdf;
pub mod postprocess;
pub mod pptx;
