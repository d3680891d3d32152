//! File intake: persist an uploaded file under the working directory.
//!
//! The upload is written verbatim to `<workdir>/<name>`. A later upload with
//! the same name replaces the earlier one (last write wins). The write goes
//! through a temp file in the same directory followed by a rename, so a reader
//! of the resolved path sees either the old bytes or the new ones, never a
//! half-written file.

use crate::error::Ocr2MdError;
use crate::format::{InputFormat, ALLOWED_EXTENSIONS};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

/// Default working directory for saved uploads.
pub const DEFAULT_WORKDIR: &str = "uploads";

/// A file handed over by the upload collaborator.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Display name, including extension.
    pub name: String,
    pub content: Vec<u8>,
    /// Size declared by the uploader, in bytes.
    pub size: u64,
    /// Media type declared by the uploader.
    pub media_type: String,
}

impl UploadedFile {
    /// Build an upload whose declared size and media type follow from the
    /// content and the name's extension.
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        let name = name.into();
        let ext = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            size: content.len() as u64,
            media_type: InputFormat::media_type(&ext).to_string(),
            name,
            content,
        }
    }

    /// Read a local file as if it had been uploaded under its own file name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Ocr2MdError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Ocr2MdError::UploadRejected {
                name: path.display().to_string(),
                reason: "path has no UTF-8 file name".into(),
            })?
            .to_string();
        let content = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Ocr2MdError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => Ocr2MdError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Ocr2MdError::UploadRejected {
                name: name.clone(),
                reason: e.to_string(),
            },
        })?;
        Ok(Self::new(name, content))
    }

    /// Size in KiB, for display.
    pub fn size_kib(&self) -> f64 {
        self.size as f64 / 1024.0
    }
}

/// Absolute on-disk location of a persisted upload.
///
/// Only [`FileIntake::save`] creates one, so a `ResolvedPath` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Saves uploads into a fixed working directory.
#[derive(Debug, Clone)]
pub struct FileIntake {
    workdir: PathBuf,
}

impl Default for FileIntake {
    fn default() -> Self {
        Self::new(DEFAULT_WORKDIR)
    }
}

impl FileIntake {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Persist `file` and return its absolute path.
    ///
    /// # Errors
    /// [`Ocr2MdError::UploadRejected`] for empty names, names with path
    /// components, or extensions outside [`ALLOWED_EXTENSIONS`];
    /// [`Ocr2MdError::UploadWriteFailed`] when the directory or file cannot be
    /// written.
    pub fn save(&self, file: &UploadedFile) -> Result<ResolvedPath, Ocr2MdError> {
        validate_name(&file.name)?;

        if file.size != file.content.len() as u64 {
            warn!(
                "Upload '{}' declared {} bytes but carries {}",
                file.name,
                file.size,
                file.content.len()
            );
        }

        std::fs::create_dir_all(&self.workdir).map_err(|e| Ocr2MdError::UploadWriteFailed {
            path: self.workdir.clone(),
            source: e,
        })?;
        let dir = self
            .workdir
            .canonicalize()
            .map_err(|e| Ocr2MdError::UploadWriteFailed {
                path: self.workdir.clone(),
                source: e,
            })?;
        let target = dir.join(&file.name);

        let write_failed = |source: std::io::Error| Ocr2MdError::UploadWriteFailed {
            path: target.clone(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_failed)?;
        tmp.write_all(&file.content).map_err(write_failed)?;
        tmp.flush().map_err(write_failed)?;
        tmp.persist(&target)
            .map_err(|e| write_failed(e.error))?;

        info!(
            "Saved upload '{}' ({:.2} KB, {}) to {}",
            file.name,
            file.size_kib(),
            file.media_type,
            target.display()
        );
        Ok(ResolvedPath(target))
    }
}

fn validate_name(name: &str) -> Result<(), Ocr2MdError> {
    let reject = |reason: &str| {
        Err(Ocr2MdError::UploadRejected {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.trim().is_empty() {
        return reject("file name is empty");
    }
    let path = Path::new(name);
    let mut components = path.components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || name.contains('/') || name.contains('\\') {
        return reject("file name must not contain path components");
    }
    if InputFormat::from_path(path).is_none() {
        return reject(&format!(
            "extension not allowed (expected one of: {})",
            ALLOWED_EXTENSIONS.join(", ")
        ));
    }
    Ok(())
}
