//! OCR: run the configured engine on a page image and return word cells.
//!
//! Only [`OcrEngine::TesseractCli`] is drivable. It runs
//!
//! ```text
//! tesseract <image> stdout -l <langs> tsv
//! ```
//!
//! as a child process and parses the TSV word boxes into
//! [`TextCell`]s for [`crate::pipeline::layout`]. Child processes are
//! spawned with `kill_on_drop`, so a request cancelled by its timeout does not
//! leave OCR processes behind.
//!
//! Every other engine is rejected with
//! [`Ocr2MdError::OcrEngineUnavailable`]; there is no fallback to another
//! engine.

use crate::config::{OcrEngine, PipelineOptions};
use crate::error::Ocr2MdError;
use crate::pipeline::layout::{BBox, TextCell};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// TSV `level` of a word row.
const TSV_WORD_LEVEL: u32 = 5;

/// A ready-to-run OCR engine.
#[derive(Debug, Clone)]
pub struct OcrRunner {
    cmd: String,
    lang: String,
}

impl OcrRunner {
    /// Select the runner for `options.ocr_engine`.
    ///
    /// This only checks that the engine kind is drivable; [`Self::probe`]
    /// checks that it is installed.
    pub fn resolve(options: &PipelineOptions) -> Result<Self, Ocr2MdError> {
        match options.ocr_engine {
            OcrEngine::TesseractCli => Ok(Self {
                cmd: options.tesseract_cmd.clone(),
                lang: options.lang_arg(),
            }),
            other => Err(Ocr2MdError::OcrEngineUnavailable {
                engine: other.to_string(),
                hint: unavailable_hint(other).to_string(),
            }),
        }
    }

    /// Check the engine binary runs; returns its version line.
    pub async fn probe(&self) -> Result<String, Ocr2MdError> {
        let output = Command::new(&self.cmd)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        // Older tesseract builds print the version on stderr.
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        let version = text.lines().next().unwrap_or_default().trim().to_string();
        if !output.status.success() || !version.to_ascii_lowercase().contains("tesseract") {
            return Err(Ocr2MdError::OcrEngineUnavailable {
                engine: OcrEngine::TesseractCli.to_string(),
                hint: format!(
                    "'{} --version' did not report a tesseract build (got {:?}).",
                    self.cmd, version
                ),
            });
        }
        info!("OCR engine: {} (-l {})", version, self.lang);
        Ok(version)
    }

    /// OCR one image file. `page_num` is only used in errors and logs.
    pub async fn recognize(&self, image: &Path, page_num: usize) -> Result<Vec<TextCell>, Ocr2MdError> {
        let output = Command::new(&self.cmd)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .arg("tsv")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.contains("Failed loading language") || stderr.contains("Could not initialize") {
                return Err(Ocr2MdError::OcrEngineUnavailable {
                    engine: OcrEngine::TesseractCli.to_string(),
                    hint: format!(
                        "Language data '{}' is not installed.\n{}",
                        self.lang, stderr
                    ),
                });
            }
            return Err(Ocr2MdError::OcrFailed {
                page: page_num,
                detail: format!("tesseract exited with {}: {}", output.status, stderr),
            });
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let cells = parse_tsv(&tsv);
        debug!("Page {}: OCR found {} words", page_num, cells.len());
        Ok(cells)
    }

    fn spawn_error(&self, e: std::io::Error) -> Ocr2MdError {
        if e.kind() == std::io::ErrorKind::NotFound {
            Ocr2MdError::OcrEngineUnavailable {
                engine: OcrEngine::TesseractCli.to_string(),
                hint: format!(
                    "Program '{}' was not found on PATH.\n\
                     Install tesseract (e.g. `apt install tesseract-ocr`, `brew install tesseract`)\n\
                     or pass --tesseract-cmd /path/to/tesseract.",
                    self.cmd
                ),
            }
        } else {
            Ocr2MdError::Internal(format!("failed to run '{}': {}", self.cmd, e))
        }
    }
}

fn unavailable_hint(engine: OcrEngine) -> &'static str {
    match engine {
        OcrEngine::Tesseract => {
            "The Tesseract C API is not linked into this build; use --ocr-engine tesseract-cli."
        }
        OcrEngine::EasyOcr | OcrEngine::RapidOcr => {
            "This engine needs a Python/ONNX runtime that this build does not drive; use --ocr-engine tesseract-cli."
        }
        OcrEngine::OcrMac => {
            "Apple Vision OCR is not driven by this build; use --ocr-engine tesseract-cli."
        }
        OcrEngine::TesseractCli => "",
    }
}

/// Parse `tesseract ... tsv` output into word cells.
///
/// Non-word rows, rows with negative confidence and blank words are skipped;
/// malformed rows are ignored.
pub fn parse_tsv(tsv: &str) -> Vec<TextCell> {
    tsv.lines()
        .filter(|l| !l.starts_with("level"))
        .filter_map(parse_tsv_row)
        .collect()
}

fn parse_tsv_row(line: &str) -> Option<TextCell> {
    let cols: Vec<&str> = line.splitn(12, '\t').collect();
    if cols.len() < 12 {
        return None;
    }
    let level: u32 = cols[0].parse().ok()?;
    if level != TSV_WORD_LEVEL {
        return None;
    }
    let conf: f32 = cols[10].trim().parse().ok()?;
    let text = cols[11].trim();
    if conf < 0.0 || text.is_empty() {
        return None;
    }
    let left: f32 = cols[6].parse().ok()?;
    let top: f32 = cols[7].parse().ok()?;
    let width: f32 = cols[8].parse().ok()?;
    let height: f32 = cols[9].parse().ok()?;
    Some(TextCell::new(
        text,
        BBox::new(left, top, left + width, top + height),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t1224\t1584\t-1\t
2\t1\t1\t0\t0\t0\t144\t140\t260\t34\t-1\t
4\t1\t1\t1\t1\t0\t144\t140\t260\t34\t-1\t
5\t1\t1\t1\t1\t1\t144\t140\t110\t34\t96.41\tHello
5\t1\t1\t1\t1\t2\t270\t141\t134\t33\t95.87\tWorld
5\t1\t1\t1\t1\t3\t410\t141\t10\t33\t12.00\t
";

    #[test]
    fn parses_word_rows_only() {
        let cells = parse_tsv(SAMPLE);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].text, "Hello");
        assert_eq!(cells[0].bbox, BBox::new(144.0, 140.0, 254.0, 174.0));
        assert_eq!(cells[1].text, "World");
    }

    #[test]
    fn ignores_malformed_rows() {
        assert!(parse_tsv("5\t1\t1\nnot a row\n").is_empty());
        assert!(parse_tsv("").is_empty());
    }

    #[test]
    fn only_tesseract_cli_resolves() {
        let base = PipelineOptions::default();
        assert!(OcrRunner::resolve(&base).is_ok());
        for engine in [
            OcrEngine::Tesseract,
            OcrEngine::EasyOcr,
            OcrEngine::OcrMac,
            OcrEngine::RapidOcr,
        ] {
            let options = PipelineOptions {
                ocr_engine: engine,
                ..PipelineOptions::default()
            };
            let err = OcrRunner::resolve(&options).unwrap_err();
            assert!(
                matches!(err, Ocr2MdError::OcrEngineUnavailable { .. }),
                "{engine}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn missing_binary_is_engine_unavailable() {
        let options = PipelineOptions {
            tesseract_cmd: "/definitely/not/tesseract".into(),
            ..PipelineOptions::default()
        };
        let runner = OcrRunner::resolve(&options).unwrap();
        let err = runner.probe().await.unwrap_err();
        assert!(matches!(err, Ocr2MdError::OcrEngineUnavailable { .. }), "{err}");
    }
}
