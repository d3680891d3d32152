//! CLI binary for ocr2md.
//!
//! A thin shim over the library crate: saves the input through
//! [`FileIntake`], maps CLI flags to `PipelineOptions` / `ConverterConfig`,
//! converts, and prints Markdown on stdout.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocr2md::{
    inspect, ConverterConfig, DocumentConverter, FileIntake, FormatRegistry, InputFormat,
    MarkdownOptions, OcrEngine, PageSelection, PageSeparator, PipelineOptions, UploadedFile,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Forced full-page OCR with table structure (the default policy for PDFs)
  ocr2md scan.pdf > scan.md

  # Only OCR pages without a text layer
  ocr2md --no-force-ocr report.pdf

  # Word and PowerPoint are read natively, no OCR needed
  ocr2md minutes.docx
  ocr2md deck.pptx --separator comment

  # German + English OCR on a scanned PDF
  ocr2md --lang deu,eng scan.pdf

  # Photos are OCRed with the default English settings
  ocr2md receipt.jpg

  # Structured output
  ocr2md --json report.pdf > report.json

  # PDF metadata only
  ocr2md --inspect-only report.pdf

SUPPORTED INPUT:
  pdf, docx, pptx, jpg, jpeg
  (OCR and table flags apply to PDF input only)
  (doc and ppt are accepted for upload but legacy binary files are rejected;
   save them as docx / pptx first)

OCR ENGINES:
  tesseract-cli (default)  runs the `tesseract` program; install it with
                           `apt install tesseract-ocr` or `brew install tesseract`
  tesseract, easyocr,      selectable but not drivable by this build; they fail
  ocrmac, rapidocr         with "OCR engine ... is not available"

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Directory containing libpdfium (or the library file itself)
  RUST_LOG          Override log filter (e.g. ocr2md=debug)
  OCR2MD_*          Every flag can be set from the environment, see --help
"#;

/// Convert PDF, Word, PowerPoint and JPEG files to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "ocr2md",
    version,
    about = "Convert PDF, Word, PowerPoint and JPEG files to Markdown with OCR and table extraction",
    long_about = "Save the input into a working directory, convert it into a structured \
document (OCR, layout and table-structure extraction) and print it as Markdown on stdout.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// File to convert.
    input: PathBuf,

    /// Directory uploads are saved into.
    #[arg(long, env = "OCR2MD_WORKDIR", default_value = ocr2md::intake::DEFAULT_WORKDIR)]
    workdir: PathBuf,

    /// OCR engine.
    #[arg(long, env = "OCR2MD_OCR_ENGINE", value_enum, default_value = "tesseract-cli")]
    ocr_engine: EngineArg,

    /// Only OCR PDF pages without a text layer instead of every page.
    #[arg(long, env = "OCR2MD_NO_FORCE_OCR")]
    no_force_ocr: bool,

    /// Disable OCR entirely; scanned pages yield no text.
    #[arg(long, env = "OCR2MD_NO_OCR")]
    no_ocr: bool,

    /// Disable table-structure extraction.
    #[arg(long, env = "OCR2MD_NO_TABLES")]
    no_tables: bool,

    /// Take table cells in reading order instead of matching them to columns.
    #[arg(long, env = "OCR2MD_NO_CELL_MATCHING")]
    no_cell_matching: bool,

    /// OCR languages (tesseract codes), comma separated.
    #[arg(long, env = "OCR2MD_LANG", default_value = "eng", value_delimiter = ',')]
    lang: Vec<String>,

    /// tesseract program to run.
    #[arg(long, env = "OCR2MD_TESSERACT_CMD", default_value = "tesseract")]
    tesseract_cmd: String,

    /// Page render scale for OCR (1.0 = 72 DPI).
    #[arg(long, env = "OCR2MD_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "OCR2MD_PAGES", default_value = "all")]
    pages: String,

    /// Page separator: none, hr, comment, or custom string.
    #[arg(long, env = "OCR2MD_SEPARATOR", default_value = "none")]
    separator: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "OCR2MD_PASSWORD")]
    password: Option<String>,

    /// Cancel the conversion after this many seconds.
    #[arg(long, env = "OCR2MD_TIMEOUT")]
    timeout: Option<u64>,

    /// Pages OCRed in parallel.
    #[arg(short, long, env = "OCR2MD_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Output the converted document as JSON instead of Markdown.
    #[arg(long, env = "OCR2MD_JSON")]
    json: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "OCR2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCR2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "OCR2MD_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EngineArg {
    Tesseract,
    TesseractCli,
    #[value(name = "easyocr")]
    EasyOcr,
    #[value(name = "ocrmac")]
    OcrMac,
    #[value(name = "rapidocr")]
    RapidOcr,
}

impl From<EngineArg> for OcrEngine {
    fn from(v: EngineArg) -> Self {
        match v {
            EngineArg::Tesseract => OcrEngine::Tesseract,
            EngineArg::TesseractCli => OcrEngine::TesseractCli,
            EngineArg::EasyOcr => OcrEngine::EasyOcr,
            EngineArg::OcrMac => OcrEngine::OcrMac,
            EngineArg::RapidOcr => OcrEngine::RapidOcr,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Intake ───────────────────────────────────────────────────────────
    let upload = UploadedFile::from_path(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let saved = FileIntake::new(&cli.workdir)
        .save(&upload)
        .context("Failed to save upload")?;

    // ── Build options ────────────────────────────────────────────────────
    let pipeline = build_pipeline_options(&cli)?;
    let config = build_config(&cli)?;
    let registry = build_registry(pipeline);
    let converter = DocumentConverter::new(registry.route(&saved)).with_config(config);

    // ── Run conversion ───────────────────────────────────────────────────
    let spinner = show_progress.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Converting");
        bar.set_message(upload.name.clone());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let outcome = converter.convert(&saved).await;
    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }
    let result = outcome.context("Conversion failed")?;

    if cli.json {
        let json =
            serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let options = MarkdownOptions::new().page_separator(parse_separator(&cli.separator));
        let markdown = result.document.export_to_markdown_with(&options);
        io::stdout()
            .lock()
            .write_all(markdown.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {}  {} pages  {} items  {}",
            green("✔"),
            bold(&result.document.name),
            result.document.page_count,
            result.document.items.len(),
            dim(&format!("{}ms", result.duration_ms)),
        );
    }

    Ok(())
}

/// Map CLI flags to `PipelineOptions`, starting from the full-page OCR policy.
fn build_pipeline_options(cli: &Cli) -> Result<PipelineOptions> {
    PipelineOptions::builder()
        .do_ocr(!cli.no_ocr)
        .force_full_page_ocr(!cli.no_force_ocr)
        .do_table_structure(!cli.no_tables)
        .table_cell_matching(!cli.no_cell_matching)
        .ocr_engine(cli.ocr_engine.into())
        .ocr_lang(cli.lang.iter().map(|l| l.trim()).filter(|l| !l.is_empty()))
        .tesseract_cmd(cli.tesseract_cmd.as_str())
        .images_scale(cli.scale)
        .build()
        .context("Invalid pipeline options")
}

/// Only PDFs carry the flag-built options; every other format routes to an
/// empty map and falls back to its default bundle.
fn build_registry(pipeline: PipelineOptions) -> FormatRegistry {
    FormatRegistry::empty().with_pipeline(InputFormat::Pdf, move || pipeline.clone())
}

/// Map CLI flags to `ConverterConfig`.
fn build_config(cli: &Cli) -> Result<ConverterConfig> {
    let mut builder = ConverterConfig::builder()
        .pages(parse_pages(&cli.pages)?)
        .concurrency(cli.concurrency);
    if let Some(secs) = cli.timeout {
        builder = builder.timeout_secs(secs);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.as_str());
    }
    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_parse() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages("3").unwrap(), PageSelection::Single(3));
        assert_eq!(parse_pages("2-4").unwrap(), PageSelection::Range(2, 4));
        assert_eq!(parse_pages("1, 3,5").unwrap(), PageSelection::Set(vec![1, 3, 5]));
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-2").is_err());
        assert!(parse_pages("x").is_err());
    }

    #[test]
    fn separator_parse() {
        assert_eq!(parse_separator("HR"), PageSeparator::HorizontalRule);
        assert_eq!(parse_separator("comment"), PageSeparator::Comment);
        assert_eq!(parse_separator("==="), PageSeparator::Custom("===".into()));
    }

    #[test]
    fn default_flags_give_full_page_ocr() {
        let cli = Cli::parse_from(["ocr2md", "scan.pdf"]);
        let options = build_pipeline_options(&cli).unwrap();
        assert_eq!(options, PipelineOptions::full_page_ocr());
    }

    #[test]
    fn flags_map_onto_options() {
        let cli = Cli::parse_from([
            "ocr2md",
            "scan.pdf",
            "--no-force-ocr",
            "--no-cell-matching",
            "--lang",
            "deu,eng",
            "--ocr-engine",
            "easyocr",
        ]);
        let options = build_pipeline_options(&cli).unwrap();
        assert!(!options.force_full_page_ocr);
        assert!(!options.table_cell_matching);
        assert_eq!(options.lang_arg(), "deu+eng");
        assert_eq!(options.ocr_engine, OcrEngine::EasyOcr);
    }

    #[test]
    fn registry_routes_pdf_only() {
        let cli = Cli::parse_from(["ocr2md", "scan.pdf", "--no-tables"]);
        let registry = build_registry(build_pipeline_options(&cli).unwrap());

        let map = registry.route("scan.pdf");
        assert_eq!(map.formats().collect::<Vec<_>>(), vec![InputFormat::Pdf]);
        for name in ["photo.jpg", "photo.JPEG", "memo.docx", "deck.pptx"] {
            assert!(registry.route(name).is_empty(), "{name}");
        }
    }
}
