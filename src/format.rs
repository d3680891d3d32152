//! Input formats, format option bundles, and the format → options registry.
//!
//! A [`FormatOptionsMap`] tells the converter which options to use for each
//! [`InputFormat`]. It is produced per request by [`FormatRegistry::route`]:
//! the registry holds a builder function per format, and a format without a
//! registered builder gets no map entry, which makes the converter fall back to
//! [`FormatOption::default_for`].

use crate::config::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Extensions accepted at intake, lower-case.
pub const ALLOWED_EXTENSIONS: [&str; 7] = ["pdf", "doc", "docx", "ppt", "pptx", "jpg", "jpeg"];

/// Input document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InputFormat {
    /// PDF document (.pdf)
    Pdf,
    /// Word document (.doc, .docx)
    Word,
    /// PowerPoint presentation (.ppt, .pptx)
    PowerPoint,
    /// JPEG image (.jpg, .jpeg)
    Image,
}

impl InputFormat {
    /// Classify a bare extension (no dot), case-insensitively.
    ///
    /// Returns `None` for anything outside [`ALLOWED_EXTENSIONS`].
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(InputFormat::Pdf),
            "doc" | "docx" => Some(InputFormat::Word),
            "ppt" | "pptx" => Some(InputFormat::PowerPoint),
            "jpg" | "jpeg" => Some(InputFormat::Image),
            _ => None,
        }
    }

    /// Classify a path by its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Media type reported for uploads of this format with extension `ext`.
    pub fn media_type(ext: &str) -> &'static str {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => "application/pdf",
            "doc" => "application/msword",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "ppt" => "application/vnd.ms-powerpoint",
            "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            "jpg" | "jpeg" => "image/jpeg",
            _ => "application/octet-stream",
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InputFormat::Pdf => "PDF",
            InputFormat::Word => "WORD",
            InputFormat::PowerPoint => "POWERPOINT",
            InputFormat::Image => "IMAGE",
        };
        f.write_str(s)
    }
}

/// Options bundle for PDF input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfFormatOption {
    pub pipeline_options: PipelineOptions,
}

/// Options bundle for image input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFormatOption {
    pub pipeline_options: PipelineOptions,
}

/// A format-scoped options bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FormatOption {
    Pdf(PdfFormatOption),
    Image(ImageFormatOption),
    /// Word documents are read natively; nothing to configure.
    Word,
    /// PowerPoint decks are read natively; nothing to configure.
    PowerPoint,
}

impl FormatOption {
    /// Bundle used when the map has no entry for `format`.
    ///
    /// PDFs and images get [`PipelineOptions::default()`], i.e. selective OCR.
    pub fn default_for(format: InputFormat) -> Self {
        match format {
            InputFormat::Pdf => FormatOption::Pdf(PdfFormatOption {
                pipeline_options: PipelineOptions::default(),
            }),
            InputFormat::Image => FormatOption::Image(ImageFormatOption {
                pipeline_options: PipelineOptions::default(),
            }),
            InputFormat::Word => FormatOption::Word,
            InputFormat::PowerPoint => FormatOption::PowerPoint,
        }
    }

    /// The format this bundle configures.
    pub fn format(&self) -> InputFormat {
        match self {
            FormatOption::Pdf(_) => InputFormat::Pdf,
            FormatOption::Image(_) => InputFormat::Image,
            FormatOption::Word => InputFormat::Word,
            FormatOption::PowerPoint => InputFormat::PowerPoint,
        }
    }

    /// Pipeline options carried by the bundle, if any.
    pub fn pipeline_options(&self) -> Option<&PipelineOptions> {
        match self {
            FormatOption::Pdf(o) => Some(&o.pipeline_options),
            FormatOption::Image(o) => Some(&o.pipeline_options),
            FormatOption::Word | FormatOption::PowerPoint => None,
        }
    }
}

/// Mapping from [`InputFormat`] to its options bundle.
///
/// Entries are keyed by [`FormatOption::format`], so a PDF bundle can never
/// sit under the image key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatOptionsMap {
    entries: HashMap<InputFormat, FormatOption>,
}

impl FormatOptionsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bundle under its own format, returning the one it replaced.
    pub fn insert(&mut self, option: FormatOption) -> Option<FormatOption> {
        self.entries.insert(option.format(), option)
    }

    pub fn get(&self, format: InputFormat) -> Option<&FormatOption> {
        self.entries.get(&format)
    }

    /// Bundle for `format`, or the converter default when absent.
    pub fn resolve(&self, format: InputFormat) -> FormatOption {
        self.get(format)
            .cloned()
            .unwrap_or_else(|| FormatOption::default_for(format))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn formats(&self) -> impl Iterator<Item = InputFormat> + '_ {
        self.entries.keys().copied()
    }
}

impl FromIterator<FormatOption> for FormatOptionsMap {
    fn from_iter<T: IntoIterator<Item = FormatOption>>(iter: T) -> Self {
        let mut map = Self::new();
        for option in iter {
            map.insert(option);
        }
        map
    }
}

/// Builds the options bundle for one format.
pub type FormatOptionBuilder = Arc<dyn Fn() -> FormatOption + Send + Sync>;

/// Registry of per-format option builders.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    builders: HashMap<InputFormat, FormatOptionBuilder>,
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<_> = self.builders.keys().collect();
        formats.sort_by_key(|f| f.to_string());
        f.debug_struct("FormatRegistry")
            .field("formats", &formats)
            .finish()
    }
}

impl FormatRegistry {
    /// A registry with no builders: every format gets converter defaults.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard policy: OCR and table extraction are configured for PDF
    /// only, with full-page OCR forced.
    pub fn standard() -> Self {
        Self::empty().with_pipeline(InputFormat::Pdf, PipelineOptions::full_page_ocr)
    }

    /// Register (or replace) the builder for `format`.
    ///
    /// The builder's bundle must configure `format`; [`Self::route`] drops
    /// bundles that do not.
    pub fn register<F>(&mut self, format: InputFormat, builder: F) -> &mut Self
    where
        F: Fn() -> FormatOption + Send + Sync + 'static,
    {
        self.builders.insert(format, Arc::new(builder));
        self
    }

    /// Register a builder producing the pipeline options for a PDF or image
    /// bundle. Ignored for formats without pipeline options.
    pub fn with_pipeline<F>(mut self, format: InputFormat, options: F) -> Self
    where
        F: Fn() -> PipelineOptions + Send + Sync + 'static,
    {
        match format {
            InputFormat::Pdf => {
                self.register(format, move || {
                    FormatOption::Pdf(PdfFormatOption {
                        pipeline_options: options(),
                    })
                });
            }
            InputFormat::Image => {
                self.register(format, move || {
                    FormatOption::Image(ImageFormatOption {
                        pipeline_options: options(),
                    })
                });
            }
            InputFormat::Word | InputFormat::PowerPoint => {}
        }
        self
    }

    /// Remove the builder for `format`, restoring converter defaults.
    pub fn unregister(&mut self, format: InputFormat) -> &mut Self {
        self.builders.remove(&format);
        self
    }

    pub fn is_registered(&self, format: InputFormat) -> bool {
        self.builders.contains_key(&format)
    }

    /// Build the bundle for `format` if a builder is registered.
    pub fn build(&self, format: InputFormat) -> Option<FormatOption> {
        let option = self.builders.get(&format).map(|b| b())?;
        (option.format() == format).then_some(option)
    }

    /// Build the options map for a request on `path`.
    ///
    /// The map holds at most one entry: the bundle for the path's format, when
    /// a builder is registered for it. Unsupported extensions yield an empty
    /// map; the converter rejects them.
    pub fn route(&self, path: impl AsRef<Path>) -> FormatOptionsMap {
        let path = path.as_ref();
        let mut map = FormatOptionsMap::new();
        match InputFormat::from_path(path) {
            Some(format) => {
                if let Some(option) = self.build(format) {
                    map.insert(option);
                }
                debug!(
                    "Routed {} as {} ({} option entries)",
                    path.display(),
                    format,
                    map.len()
                );
            }
            None => debug!("No input format for {}", path.display()),
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OcrEngine;

    #[test]
    fn classifies_every_allowed_extension() {
        for ext in ALLOWED_EXTENSIONS {
            assert!(InputFormat::from_extension(ext).is_some(), "{ext}");
            assert!(
                InputFormat::from_extension(&ext.to_uppercase()).is_some(),
                "{ext}"
            );
        }
        assert_eq!(InputFormat::from_extension("DocX"), Some(InputFormat::Word));
        assert_eq!(InputFormat::from_extension("JPEG"), Some(InputFormat::Image));
        assert_eq!(InputFormat::from_extension("txt"), None);
        assert_eq!(InputFormat::from_extension("png"), None);
        assert_eq!(InputFormat::from_extension(""), None);
    }

    #[test]
    fn from_path_needs_an_extension() {
        assert_eq!(InputFormat::from_path("/app/report.PDF"), Some(InputFormat::Pdf));
        assert_eq!(InputFormat::from_path("/app/pdf"), None);
        assert_eq!(InputFormat::from_path("/app/slides.ppt"), Some(InputFormat::PowerPoint));
    }

    #[test]
    fn standard_route_for_pdf_has_one_forced_ocr_entry() {
        let map = FormatRegistry::standard().route("/app/scan.pdf");
        assert_eq!(map.len(), 1);
        let opts = map
            .get(InputFormat::Pdf)
            .and_then(FormatOption::pipeline_options)
            .expect("pdf entry");
        assert!(opts.do_ocr && opts.do_table_structure && opts.table_cell_matching);
        assert!(opts.force_full_page_ocr);
        assert_eq!(opts.ocr_engine, OcrEngine::TesseractCli);
    }

    #[test]
    fn standard_route_for_non_pdf_is_empty() {
        let registry = FormatRegistry::standard();
        for name in ["a.doc", "a.docx", "a.ppt", "a.pptx", "a.jpg", "a.JPEG", "a.txt"] {
            assert!(registry.route(name).is_empty(), "{name}");
        }
    }

    #[test]
    fn missing_entry_resolves_to_defaults() {
        let map = FormatOptionsMap::new();
        let option = map.resolve(InputFormat::Image);
        let opts = option.pipeline_options().unwrap();
        assert!(!opts.force_full_page_ocr);
        assert_eq!(map.resolve(InputFormat::Word), FormatOption::Word);
    }

    #[test]
    fn registering_an_image_builder_adds_an_entry() {
        let registry = FormatRegistry::standard().with_pipeline(InputFormat::Image, || {
            PipelineOptions::builder()
                .ocr_lang(["fra"])
                .build()
                .unwrap_or_default()
        });
        let map = registry.route("photo.jpg");
        assert_eq!(map.len(), 1);
        let lang = map
            .get(InputFormat::Image)
            .and_then(FormatOption::pipeline_options)
            .map(PipelineOptions::lang_arg);
        assert_eq!(lang.as_deref(), Some("fra"));
    }

    #[test]
    fn mismatched_builder_is_dropped() {
        let mut registry = FormatRegistry::empty();
        registry.register(InputFormat::Word, || FormatOption::PowerPoint);
        assert!(registry.build(InputFormat::Word).is_none());
        assert!(registry.route("memo.docx").is_empty());
    }

    #[test]
    fn each_route_builds_a_fresh_value() {
        let registry = FormatRegistry::standard();
        let a = registry.route("x.pdf");
        let b = registry.route("x.pdf");
        assert_eq!(a, b);
    }

    #[test]
    fn unregister_restores_defaults() {
        let mut registry = FormatRegistry::standard();
        registry.unregister(InputFormat::Pdf);
        assert!(!registry.is_registered(InputFormat::Pdf));
        assert!(registry.route("x.pdf").is_empty());
    }
}
