//! JPEG backend: an image is one page, OCRed directly by the engine.

use crate::config::PipelineOptions;
use crate::document::{ConvertedDocument, ItemContent};
use crate::error::Ocr2MdError;
use crate::format::InputFormat;
use crate::pipeline::input::ResolvedInput;
use crate::pipeline::layout::{self, LayoutOptions};
use crate::pipeline::ocr::OcrRunner;
use tracing::{debug, info};

pub async fn convert_image(
    input: &ResolvedInput,
    options: &PipelineOptions,
) -> Result<ConvertedDocument, Ocr2MdError> {
    let runner = if options.do_ocr {
        Some(OcrRunner::resolve(options)?)
    } else {
        None
    };

    // Decode the header up front so a truncated upload fails as corrupt
    // rather than as an OCR error.
    let path = input.path.clone();
    let (width, height) = tokio::task::spawn_blocking(move || image::image_dimensions(&path))
        .await
        .map_err(|e| Ocr2MdError::Internal(format!("Image task panicked: {}", e)))?
        .map_err(|e| Ocr2MdError::CorruptDocument {
            path: input.path.clone(),
            detail: e.to_string(),
        })?;
    info!("Image: {}x{} px", width, height);

    let mut doc = ConvertedDocument::new(input.name(), InputFormat::Image);
    doc.page_count = 1;

    if let Some(runner) = runner {
        runner.probe().await?;
        let cells = runner.recognize(&input.path, 1).await?;
        for item in layout::analyze_page(cells, LayoutOptions::from(options)) {
            doc.push(1, item);
        }
    }

    if doc.is_empty() {
        debug!("No text recognised; emitting a picture item");
        doc.push(1, ItemContent::Picture { caption: None });
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::input::resolve_input;

    fn write_jpeg(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("photo.jpg");
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]));
        img.save_with_format(&path, image::ImageFormat::Jpeg).unwrap();
        path
    }

    #[tokio::test]
    async fn without_ocr_an_image_is_a_picture() {
        let dir = tempfile::tempdir().unwrap();
        let input = resolve_input(&write_jpeg(dir.path())).unwrap();
        let options = PipelineOptions::builder().do_ocr(false).build().unwrap();
        let doc = convert_image(&input, &options).await.unwrap();
        assert_eq!(doc.page_count, 1);
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.export_to_markdown(), "<!-- image -->\n");
    }

    #[tokio::test]
    async fn truncated_jpeg_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00]).unwrap();
        let input = resolve_input(&path).unwrap();
        let options = PipelineOptions::builder().do_ocr(false).build().unwrap();
        let err = convert_image(&input, &options).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionFailure);
    }
}
