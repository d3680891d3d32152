//! Configuration types for document conversion.
//!
//! Two structs hold every knob:
//!
//! * [`PipelineOptions`] : *what* the OCR / layout pipeline does to a PDF or
//!   image: OCR on or off, which engine, full-page or selective OCR, table
//!   structure and cell matching. Carried inside a format option bundle.
//! * [`ConverterConfig`] : *how* a single conversion request runs: page
//!   selection, OCR parallelism, timeout, PDF password.
//!
//! Both are plain values built fresh for every request and never mutated
//! afterwards.

use crate::error::Ocr2MdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OCR engine selection.
///
/// Only [`OcrEngine::TesseractCli`] can be driven by this crate; the other
/// engines are accepted in configuration but fail at conversion time with
/// [`Ocr2MdError::OcrEngineUnavailable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OcrEngine {
    /// Tesseract through its C API bindings.
    Tesseract,
    /// The `tesseract` command-line program, run as a child process. (default)
    #[default]
    TesseractCli,
    /// EasyOCR (Python, PyTorch).
    EasyOcr,
    /// Apple Vision framework OCR (macOS only).
    OcrMac,
    /// RapidOCR (ONNX runtime).
    RapidOcr,
}

impl OcrEngine {
    /// Every engine, in declaration order.
    pub const ALL: [OcrEngine; 5] = [
        OcrEngine::Tesseract,
        OcrEngine::TesseractCli,
        OcrEngine::EasyOcr,
        OcrEngine::OcrMac,
        OcrEngine::RapidOcr,
    ];

    /// Stable kebab-case identifier used in logs, errors and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrEngine::Tesseract => "tesseract",
            OcrEngine::TesseractCli => "tesseract-cli",
            OcrEngine::EasyOcr => "easyocr",
            OcrEngine::OcrMac => "ocrmac",
            OcrEngine::RapidOcr => "rapidocr",
        }
    }
}

impl fmt::Display for OcrEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrEngine {
    type Err = Ocr2MdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        OcrEngine::ALL
            .into_iter()
            .find(|e| e.as_str() == wanted)
            .ok_or_else(|| Ocr2MdError::InvalidConfig(format!("unknown OCR engine '{s}'")))
    }
}

/// Options for the PDF / image pipeline.
///
/// [`PipelineOptions::default()`] gives the converter defaults (selective
/// OCR); [`PipelineOptions::full_page_ocr()`] gives the fixed policy used for
/// PDFs by [`crate::format::FormatRegistry::standard`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Run OCR at all. Default: true.
    pub do_ocr: bool,

    /// Detect tables and emit them as Markdown tables. Default: true.
    pub do_table_structure: bool,

    /// Assign each word of a detected table to the column grid of the whole
    /// table. When false, every row's gap-separated segments are used as its
    /// cells in order. Default: true.
    pub table_cell_matching: bool,

    /// OCR engine. Default: [`OcrEngine::TesseractCli`].
    pub ocr_engine: OcrEngine,

    /// OCR every page even when it already has a text layer. Default: false.
    pub force_full_page_ocr: bool,

    /// Tesseract language codes, joined with `+`. Default: `["eng"]`.
    pub ocr_lang: Vec<String>,

    /// Program invoked for [`OcrEngine::TesseractCli`]. Default: `"tesseract"`.
    pub tesseract_cmd: String,

    /// Render scale for PDF pages (1.0 = 72 DPI). Range 0.5–8.0. Default: 2.0.
    pub images_scale: f32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            do_ocr: true,
            do_table_structure: true,
            table_cell_matching: true,
            ocr_engine: OcrEngine::default(),
            force_full_page_ocr: false,
            ocr_lang: vec!["eng".to_string()],
            tesseract_cmd: "tesseract".to_string(),
            images_scale: 2.0,
        }
    }
}

impl PipelineOptions {
    /// Fixed PDF policy: OCR, tables and cell matching on, Tesseract CLI,
    /// full-page OCR forced.
    pub fn full_page_ocr() -> Self {
        Self {
            do_ocr: true,
            do_table_structure: true,
            table_cell_matching: true,
            ocr_engine: OcrEngine::TesseractCli,
            force_full_page_ocr: true,
            ..Self::default()
        }
    }

    /// Create a builder seeded with [`PipelineOptions::default()`].
    pub fn builder() -> PipelineOptionsBuilder {
        PipelineOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Language argument passed to `tesseract -l`.
    pub fn lang_arg(&self) -> String {
        self.ocr_lang.join("+")
    }
}

/// Builder for [`PipelineOptions`].
#[derive(Debug)]
pub struct PipelineOptionsBuilder {
    options: PipelineOptions,
}

impl PipelineOptionsBuilder {
    /// Start from an existing value instead of the defaults.
    pub fn from_options(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn do_ocr(mut self, v: bool) -> Self {
        self.options.do_ocr = v;
        self
    }

    pub fn do_table_structure(mut self, v: bool) -> Self {
        self.options.do_table_structure = v;
        self
    }

    pub fn table_cell_matching(mut self, v: bool) -> Self {
        self.options.table_cell_matching = v;
        self
    }

    pub fn ocr_engine(mut self, engine: OcrEngine) -> Self {
        self.options.ocr_engine = engine;
        self
    }

    pub fn force_full_page_ocr(mut self, v: bool) -> Self {
        self.options.force_full_page_ocr = v;
        self
    }

    pub fn ocr_lang<I, S>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.ocr_lang = langs.into_iter().map(Into::into).collect();
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.options.tesseract_cmd = cmd.into();
        self
    }

    pub fn images_scale(mut self, scale: f32) -> Self {
        self.options.images_scale = scale;
        self
    }

    /// Build the options, validating constraints.
    pub fn build(self) -> Result<PipelineOptions, Ocr2MdError> {
        let o = &self.options;
        if o.ocr_lang.is_empty() || o.ocr_lang.iter().any(|l| l.trim().is_empty()) {
            return Err(Ocr2MdError::InvalidConfig(
                "OCR language list must contain at least one non-empty code".into(),
            ));
        }
        if !(0.5..=8.0).contains(&o.images_scale) {
            return Err(Ocr2MdError::InvalidConfig(format!(
                "images_scale must be 0.5–8.0, got {}",
                o.images_scale
            )));
        }
        if o.tesseract_cmd.trim().is_empty() {
            return Err(Ocr2MdError::InvalidConfig(
                "tesseract_cmd must not be empty".into(),
            ));
        }
        Ok(self.options)
    }
}

/// Per-request settings for [`crate::convert::DocumentConverter`].
///
/// Built via [`ConverterConfig::builder()`] or [`ConverterConfig::default()`].
///
/// # Example
/// ```rust
/// use ocr2md::{ConverterConfig, PageSelection};
///
/// let config = ConverterConfig::builder()
///     .pages(PageSelection::Range(1, 3))
///     .timeout_secs(120)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// PDF pages to convert. Default: all.
    pub pages: PageSelection,

    /// Pages OCRed concurrently. Default: 4.
    ///
    /// Each OCRed page is a separate `tesseract` process, so this bounds the
    /// number of child processes alive at once.
    pub concurrency: usize,

    /// Cancel the whole request after this many seconds. Default: none.
    pub timeout_secs: Option<u64>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            pages: PageSelection::default(),
            concurrency: 4,
            timeout_secs: None,
            password: None,
        }
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, Ocr2MdError> {
        if self.config.timeout_secs == Some(0) {
            return Err(Ocr2MdError::InvalidConfig(
                "timeout must be at least 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of a PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The highest requested page number when it lies past `total_pages`.
    pub fn beyond(&self, total_pages: usize) -> Option<usize> {
        let last = match self {
            PageSelection::All => return None,
            PageSelection::Single(p) => *p,
            PageSelection::Range(_, end) => *end,
            PageSelection::Set(pages) => pages.iter().copied().max()?,
        };
        (last > total_pages).then_some(last)
    }
}

/// How to separate pages in exported Markdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// No separator; pages joined with a blank line. (default)
    #[default]
    None,
    /// Horizontal rule: "---"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator block placed before page `page_num` (1-indexed).
    pub fn render(&self, page_num: usize) -> Option<String> {
        match self {
            PageSeparator::None => None,
            PageSeparator::HorizontalRule => Some("---".to_string()),
            PageSeparator::Comment => Some(format!("<!-- page {} -->", page_num)),
            PageSeparator::Custom(s) => Some(s.clone()),
        }
    }
}
