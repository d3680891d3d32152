//! Input resolution: validate a local path and detect its format.
//!
//! Checks run in a fixed order so each failure maps to one error class:
//!
//! 1. the path exists → else [`Ocr2MdError::FileNotFound`]
//! 2. the file can be opened → else [`Ocr2MdError::PermissionDenied`]
//! 3. the extension is supported → else [`Ocr2MdError::UnsupportedFormat`]
//! 4. the leading bytes match the format → else
//!    [`Ocr2MdError::UnsupportedFormat`]
//!
//! Legacy binary Office files (`.doc`, `.ppt`, OLE compound documents) pass
//! the extension check but fail the content check.

use crate::error::Ocr2MdError;
use crate::format::InputFormat;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// PDF headers may be preceded by junk; readers scan the first kilobyte.
const PDF_HEADER_WINDOW: usize = 1024;

/// A validated local input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub path: PathBuf,
    pub format: InputFormat,
}

impl ResolvedInput {
    /// File name for document metadata.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Validate `path` and detect its format.
pub fn resolve_input(path: &Path) -> Result<ResolvedInput, Ocr2MdError> {
    if !path.exists() {
        return Err(Ocr2MdError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Ocr2MdError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(Ocr2MdError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    let format = InputFormat::from_path(path).ok_or_else(|| {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ocr2MdError::UnsupportedFormat {
            path: path.to_path_buf(),
            detail: if ext.is_empty() {
                "file has no extension".to_string()
            } else {
                format!("extension '{ext}' is not recognised")
            },
        }
    })?;

    let mut head = Vec::with_capacity(PDF_HEADER_WINDOW);
    file.by_ref()
        .take(PDF_HEADER_WINDOW as u64)
        .read_to_end(&mut head)
        .map_err(|e| Ocr2MdError::Internal(format!("failed to read '{}': {e}", path.display())))?;

    check_signature(path, format, &head)?;
    debug!("Resolved {} as {}", path.display(), format);
    Ok(ResolvedInput {
        path: path.to_path_buf(),
        format,
    })
}

fn check_signature(path: &Path, format: InputFormat, head: &[u8]) -> Result<(), Ocr2MdError> {
    let unsupported = |detail: &str| {
        Err(Ocr2MdError::UnsupportedFormat {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        })
    };

    if head.is_empty() {
        return unsupported("file is empty");
    }
    match format {
        InputFormat::Pdf => {
            if !head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
                return unsupported("no %PDF header found");
            }
        }
        InputFormat::Word | InputFormat::PowerPoint => {
            if head.starts_with(OLE_MAGIC) {
                return unsupported(
                    "legacy binary Office file (.doc/.ppt); save it as .docx/.pptx first",
                );
            }
            if !head.starts_with(ZIP_MAGIC) {
                return unsupported("not an Office Open XML (zip) container");
            }
        }
        InputFormat::Image => {
            if !head.starts_with(JPEG_MAGIC) {
                return unsupported("not a JPEG image");
            }
        }
    }
    Ok(())
}
