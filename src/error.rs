//! Error types for the ocr2md library.
//!
//! Every failure is fatal for the request that raised it: a conversion either
//! returns one complete [`crate::document::ConvertedDocument`] or an
//! [`Ocr2MdError`]. There is no partial-success path and nothing is retried.
//!
//! Variants are grouped into the coarse [`ErrorKind`] taxonomy so callers
//! can branch on *what class* of failure happened without matching every
//! variant.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the ocr2md library.
#[derive(Debug, Error)]
pub enum Ocr2MdError {
    // ── Intake errors ─────────────────────────────────────────────────────
    /// The upload was refused before anything was written.
    #[error("Upload '{name}' rejected: {reason}")]
    UploadRejected { name: String, reason: String },

    /// Writing the upload into the working directory failed.
    #[error("Failed to save upload to '{path}': {source}")]
    UploadWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Extension or content does not match a supported format.
    #[error("Unsupported format for '{path}': {detail}\nSupported: pdf, doc, docx, ppt, pptx, jpg, jpeg")]
    UnsupportedFormat { path: PathBuf, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The configured OCR engine cannot be driven on this host.
    #[error("OCR engine '{engine}' is not available.\n{hint}")]
    OcrEngineUnavailable { engine: String, hint: String },

    /// The OCR engine ran but failed on a page or image.
    #[error("OCR failed on page {page}: {detail}")]
    OcrFailed { page: usize, detail: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// The file has a supported extension but its content cannot be parsed.
    #[error("Document '{path}' is corrupt: {detail}")]
    CorruptDocument { path: PathBuf, detail: String },

    /// PDF requires a password but none (or a wrong one) was provided.
    #[error("PDF '{path}' is encrypted.\nProvide the password with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium for your platform, or set PDFIUM_LIB_PATH to the directory\n\
containing libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    /// The request exceeded the configured timeout and was cancelled.
    #[error("Conversion timed out after {secs}s\nIncrease --timeout or convert fewer pages.")]
    Timeout { secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Ocr2MdError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upload rejected or could not be written; conversion never started.
    Intake,
    /// The resolved path does not point at a readable file.
    NotFound,
    /// Extension or content is not one of the supported formats.
    UnsupportedFormat,
    /// The configured OCR engine is not installed or not drivable.
    OcrEngineUnavailable,
    /// Anything else: corrupt input, OCR crash, timeout, internal error.
    ConversionFailure,
}

impl Ocr2MdError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Ocr2MdError::UploadRejected { .. } | Ocr2MdError::UploadWriteFailed { .. } => {
                ErrorKind::Intake
            }
            Ocr2MdError::FileNotFound { .. } | Ocr2MdError::PermissionDenied { .. } => {
                ErrorKind::NotFound
            }
            Ocr2MdError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Ocr2MdError::OcrEngineUnavailable { .. } => ErrorKind::OcrEngineUnavailable,
            Ocr2MdError::OcrFailed { .. }
            | Ocr2MdError::CorruptDocument { .. }
            | Ocr2MdError::PasswordRequired { .. }
            | Ocr2MdError::PdfiumBindingFailed(_)
            | Ocr2MdError::Timeout { .. }
            | Ocr2MdError::InvalidConfig(_)
            | Ocr2MdError::Internal(_) => ErrorKind::ConversionFailure,
        }
    }
}
