//! PDF backend: text extraction, page rendering and OCR via pdfium.
//!
//! pdfium is not async-aware, so every pdfium call runs inside
//! `tokio::task::spawn_blocking`. Per selected page the blocking pass
//!
//! 1. extracts the native text layer as [`TextCell`]s (top-left origin), and
//! 2. renders the page to a PNG in a scratch directory when the page needs OCR.
//!
//! A page needs OCR when `do_ocr` is on and either full-page OCR is forced or
//! the page has no text layer. OCR then runs on up to `concurrency` pages at a
//! time with results kept in page order, and each page's cells go through
//! [`layout::analyze_page`].

use crate::config::{ConverterConfig, PageSelection, PipelineOptions};
use crate::document::ConvertedDocument;
use crate::error::Ocr2MdError;
use crate::format::InputFormat;
use crate::pipeline::input::ResolvedInput;
use crate::pipeline::layout::{self, BBox, LayoutOptions, TextCell};
use crate::pipeline::ocr::OcrRunner;
use futures::stream::{self, StreamExt};
use pdfium_render::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory holding the pdfium shared library. When unset the system
/// library search path is used.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Document-level metadata read without converting any page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// One selected page after the blocking pass.
#[derive(Debug)]
struct PageWork {
    /// 1-indexed.
    page_num: usize,
    text_cells: Vec<TextCell>,
    /// Rendered PNG awaiting OCR.
    image: Option<PathBuf>,
}

/// Bind pdfium from `PDFIUM_LIB_PATH` or the system library.
pub fn bind_pdfium() -> Result<Pdfium, Ocr2MdError> {
    let bindings = match std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            // Accept either the library file itself or its directory.
            let lib = if dir.is_file() {
                dir
            } else {
                Pdfium::pdfium_platform_library_name_at_path(&dir)
            };
            Pdfium::bind_to_library(&lib).map_err(|e| {
                Ocr2MdError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e))
            })?
        }
        None => Pdfium::bind_to_system_library()
            .map_err(|e| Ocr2MdError::PdfiumBindingFailed(format!("{:?}", e)))?,
    };
    Ok(Pdfium::new(bindings))
}

/// Convert a PDF into a [`ConvertedDocument`].
pub async fn convert_pdf(
    input: &ResolvedInput,
    options: &PipelineOptions,
    config: &ConverterConfig,
) -> Result<ConvertedDocument, Ocr2MdError> {
    // Resolve the engine before touching the file so a bad engine choice
    // fails the same way for every document.
    let runner = if options.do_ocr {
        Some(OcrRunner::resolve(options)?)
    } else {
        None
    };

    let scratch = tempfile::tempdir().map_err(|e| {
        Ocr2MdError::Internal(format!("failed to create scratch directory: {}", e))
    })?;

    let path = input.path.clone();
    let scratch_dir = scratch.path().to_path_buf();
    let job = BlockingJob {
        ocr: runner.is_some(),
        force_ocr: options.force_full_page_ocr,
        scale: options.images_scale,
        password: config.password.clone(),
        pages: config.pages.clone(),
    };
    let (total_pages, pages) =
        tokio::task::spawn_blocking(move || extract_pages_blocking(&path, &scratch_dir, &job))
            .await
            .map_err(|e| Ocr2MdError::Internal(format!("PDF task panicked: {}", e)))??;

    let ocr_pages = pages.iter().filter(|p| p.image.is_some()).count();
    info!(
        "PDF: {} of {} pages selected, {} to OCR",
        pages.len(),
        total_pages,
        ocr_pages
    );

    let runner = match runner {
        Some(r) if ocr_pages > 0 => {
            r.probe().await?;
            Some(r)
        }
        _ => None,
    };

    let runner_ref = runner.as_ref();
    let page_cells: Vec<Result<(usize, Vec<TextCell>), Ocr2MdError>> = stream::iter(pages)
        .map(|page| async move {
            match (page.image, runner_ref) {
                (Some(image), Some(runner)) => {
                    let cells = runner.recognize(&image, page.page_num).await?;
                    Ok::<_, Ocr2MdError>((page.page_num, cells))
                }
                _ => Ok((page.page_num, page.text_cells)),
            }
        })
        .buffered(config.concurrency.max(1))
        .collect()
        .await;

    let layout_options = LayoutOptions::from(options);
    let mut doc = ConvertedDocument::new(input.name(), InputFormat::Pdf);
    doc.page_count = total_pages;
    for result in page_cells {
        let (page_num, cells) = result?;
        let items = layout::analyze_page(cells, layout_options);
        debug!("Page {}: {} items", page_num, items.len());
        for item in items {
            doc.push(page_num, item);
        }
    }

    drop(scratch);
    Ok(doc)
}

/// Read document metadata without rendering pages.
pub async fn inspect_pdf(path: &Path, password: Option<&str>) -> Result<PdfMetadata, Ocr2MdError> {
    let path = path.to_path_buf();
    let password = password.map(str::to_string);
    tokio::task::spawn_blocking(move || inspect_blocking(&path, password.as_deref()))
        .await
        .map_err(|e| Ocr2MdError::Internal(format!("Metadata task panicked: {}", e)))?
}

// ── Blocking pdfium work ─────────────────────────────────────────────────────

struct BlockingJob {
    ocr: bool,
    force_ocr: bool,
    scale: f32,
    password: Option<String>,
    pages: PageSelection,
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, Ocr2MdError> {
    pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let detail = format!("{:?}", e);
        if detail.contains("Password") || detail.contains("password") {
            Ocr2MdError::PasswordRequired {
                path: path.to_path_buf(),
            }
        } else {
            Ocr2MdError::CorruptDocument {
                path: path.to_path_buf(),
                detail,
            }
        }
    })
}

fn extract_pages_blocking(
    path: &Path,
    scratch: &Path,
    job: &BlockingJob,
) -> Result<(usize, Vec<PageWork>), Ocr2MdError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, path, job.password.as_deref())?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;

    if let Some(page) = job.pages.beyond(total_pages) {
        return Err(Ocr2MdError::InvalidConfig(format!(
            "page {} requested but the document has {} pages",
            page, total_pages
        )));
    }
    let indices = job.pages.to_indices(total_pages);
    if indices.is_empty() {
        return Err(Ocr2MdError::InvalidConfig(format!(
            "page selection matches none of the document's {} pages",
            total_pages
        )));
    }

    let render_config = PdfRenderConfig::new().scale_page_by_factor(job.scale);
    let mut work = Vec::with_capacity(indices.len());

    for idx in indices {
        let page_num = idx + 1;
        let page = pages.get(idx as u16).map_err(|e| Ocr2MdError::CorruptDocument {
            path: path.to_path_buf(),
            detail: format!("page {}: {:?}", page_num, e),
        })?;

        let text_cells = page_text_cells(&page).unwrap_or_else(|e| {
            warn!("Page {}: text layer unreadable ({})", page_num, e);
            Vec::new()
        });

        let needs_ocr = job.ocr && (job.force_ocr || text_cells.is_empty());
        let image = if needs_ocr {
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| Ocr2MdError::OcrFailed {
                    page: page_num,
                    detail: format!("render failed: {:?}", e),
                })?;
            let png = scratch.join(format!("page-{:04}.png", page_num));
            bitmap
                .as_image()
                .save_with_format(&png, image::ImageFormat::Png)
                .map_err(|e| Ocr2MdError::OcrFailed {
                    page: page_num,
                    detail: format!("failed to write page image: {}", e),
                })?;
            debug!("Rendered page {} → {}", page_num, png.display());
            Some(png)
        } else {
            None
        };

        work.push(PageWork {
            page_num,
            text_cells,
            image,
        });
    }

    Ok((total_pages, work))
}

/// Native text segments of a page with the origin moved to the top-left.
fn page_text_cells(page: &PdfPage) -> Result<Vec<TextCell>, PdfiumError> {
    let page_height = page.height().value;
    let text = page.text()?;
    let mut cells = Vec::new();
    for segment in text.segments().iter() {
        let content = segment.text();
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        let bounds = segment.bounds();
        cells.push(TextCell::new(
            content,
            BBox::new(
                bounds.left().value,
                page_height - bounds.top().value,
                bounds.right().value,
                page_height - bounds.bottom().value,
            ),
        ));
    }
    Ok(cells)
}

fn inspect_blocking(path: &Path, password: Option<&str>) -> Result<PdfMetadata, Ocr2MdError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, path, password)?;
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    Ok(PdfMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}
