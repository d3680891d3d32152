//! Conversion entry points.
//!
//! [`DocumentConverter`] is the facade: given a path and a
//! [`FormatOptionsMap`], it validates the path, picks the backend for the
//! detected format and returns the whole [`ConvertedDocument`] or an error.
//! There is no partial output; a failure on any page fails the request.

use crate::config::ConverterConfig;
use crate::document::ConvertedDocument;
use crate::error::Ocr2MdError;
use crate::format::{FormatOption, FormatOptionsMap, FormatRegistry, InputFormat};
use crate::intake::{FileIntake, UploadedFile};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::pdf::{self, PdfMetadata};
use crate::pipeline::{docx, jpeg, pptx};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of one successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    /// The path that was converted.
    pub input: PathBuf,
    pub format: InputFormat,
    pub document: ConvertedDocument,
    pub duration_ms: u64,
}

/// Dispatches a path to the backend for its format.
#[derive(Debug, Clone)]
pub struct DocumentConverter {
    format_options: FormatOptionsMap,
    config: ConverterConfig,
}

impl DocumentConverter {
    pub fn new(format_options: FormatOptionsMap) -> Self {
        Self {
            format_options,
            config: ConverterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ConverterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn format_options(&self) -> &FormatOptionsMap {
        &self.format_options
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert the document at `path`.
    ///
    /// # Errors
    /// - [`Ocr2MdError::FileNotFound`] / [`Ocr2MdError::PermissionDenied`]
    ///   when the path cannot be read
    /// - [`Ocr2MdError::UnsupportedFormat`] for unknown extensions and legacy
    ///   binary Office files
    /// - [`Ocr2MdError::OcrEngineUnavailable`] when OCR is requested with an
    ///   engine that cannot run
    /// - [`Ocr2MdError::Timeout`] when `timeout_secs` elapses
    /// - any other variant for a document that cannot be converted
    pub async fn convert(&self, path: impl AsRef<Path>) -> Result<ConversionResult, Ocr2MdError> {
        let start = Instant::now();
        let path = path.as_ref();
        info!("Starting conversion: {}", path.display());

        let resolved = input::resolve_input(path)?;
        let option = self.format_options.resolve(resolved.format);

        let document = match self.config.timeout_secs {
            Some(secs) => tokio::time::timeout(
                Duration::from_secs(secs),
                self.dispatch(&resolved, &option),
            )
            .await
            .map_err(|_| {
                warn!("Conversion of {} timed out after {}s", path.display(), secs);
                Ocr2MdError::Timeout { secs }
            })??,
            None => self.dispatch(&resolved, &option).await?,
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Conversion complete: {} items over {} pages in {}ms",
            document.items.len(),
            document.page_count,
            duration_ms
        );
        Ok(ConversionResult {
            input: resolved.path,
            format: resolved.format,
            document,
            duration_ms,
        })
    }

    /// Persist an upload through `intake`, then convert the saved copy.
    pub async fn convert_upload(
        &self,
        intake: &FileIntake,
        file: &UploadedFile,
    ) -> Result<ConversionResult, Ocr2MdError> {
        let saved = intake.save(file)?;
        self.convert(saved.as_path()).await
    }

    async fn dispatch(
        &self,
        input: &ResolvedInput,
        option: &FormatOption,
    ) -> Result<ConvertedDocument, Ocr2MdError> {
        match option {
            FormatOption::Pdf(pdf_option) => {
                pdf::convert_pdf(input, &pdf_option.pipeline_options, &self.config).await
            }
            FormatOption::Image(image_option) => {
                jpeg::convert_image(input, &image_option.pipeline_options).await
            }
            FormatOption::Word => docx::convert_docx(input).await,
            FormatOption::PowerPoint => pptx::convert_pptx(input).await,
        }
    }
}

/// Convert `path` with the standard registry and return Markdown.
pub async fn convert_to_markdown(path: impl AsRef<Path>) -> Result<String, Ocr2MdError> {
    let path = path.as_ref();
    let converter = DocumentConverter::new(FormatRegistry::standard().route(path));
    let result = converter.convert(path).await?;
    Ok(result.document.export_to_markdown())
}

/// Synchronous wrapper around [`DocumentConverter::convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    converter: &DocumentConverter,
    path: impl AsRef<Path>,
) -> Result<ConversionResult, Ocr2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Ocr2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(converter.convert(path))
}

/// Read PDF metadata without converting content.
pub async fn inspect(path: impl AsRef<Path>, password: Option<&str>) -> Result<PdfMetadata, Ocr2MdError> {
    let resolved = input::resolve_input(path.as_ref())?;
    if resolved.format != InputFormat::Pdf {
        return Err(Ocr2MdError::UnsupportedFormat {
            path: resolved.path,
            detail: format!("metadata inspection needs a PDF, got {}", resolved.format),
        });
    }
    pdf::inspect_pdf(&resolved.path, password).await
}
