//! PowerPoint backend: one page per slide, slides in numeric order.
//!
//! Per shape in `ppt/slides/slideN.xml`:
//! - centre-title placeholders become the document title, title placeholders
//!   section headers;
//! - other text frames become paragraphs, or list items when the paragraph
//!   carries a bullet (`a:buChar`, `a:buAutoNum`) or an indent level;
//! - `a:tbl` graphic frames become tables;
//! - pictures become picture items captioned by their alt text.

use crate::document::{ConvertedDocument, ItemContent, TableData};
use crate::error::Ocr2MdError;
use crate::format::InputFormat;
use crate::pipeline::input::ResolvedInput;
use crate::pipeline::ooxml::{self, attr, local_name};
use crate::pipeline::postprocess::clean_text;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use tracing::{debug, info};

pub async fn convert_pptx(input: &ResolvedInput) -> Result<ConvertedDocument, Ocr2MdError> {
    let path = input.path.clone();
    let name = input.name();
    tokio::task::spawn_blocking(move || convert_pptx_blocking(&path, name))
        .await
        .map_err(|e| Ocr2MdError::Internal(format!("PowerPoint task panicked: {}", e)))?
}

fn convert_pptx_blocking(path: &Path, name: String) -> Result<ConvertedDocument, Ocr2MdError> {
    let mut archive = ooxml::open_archive(path)?;
    let slides = slide_parts(archive.file_names());
    if slides.is_empty() && ooxml::read_part(&mut archive, path, "ppt/presentation.xml")?.is_none() {
        return Err(Ocr2MdError::CorruptDocument {
            path: path.to_path_buf(),
            detail: "missing part ppt/presentation.xml".to_string(),
        });
    }

    let mut doc = ConvertedDocument::new(name, InputFormat::PowerPoint);
    doc.page_count = slides.len();
    for (i, part) in slides.iter().enumerate() {
        let xml = ooxml::require_part(&mut archive, path, part)?;
        let items = parse_slide(&xml).map_err(|e| ooxml::malformed(path, part, e))?;
        debug!("Slide {} ({}): {} items", i + 1, part, items.len());
        for item in items {
            doc.push(i + 1, item);
        }
    }
    info!("PowerPoint: {} slides, {} items", doc.page_count, doc.items.len());
    Ok(doc)
}

/// `ppt/slides/slideN.xml` names sorted by `N`.
fn slide_parts<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut slides: Vec<(u32, String)> = names
        .filter_map(|n| {
            let num = n
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((num, n.to_string()))
        })
        .collect();
    slides.sort_by_key(|(num, _)| *num);
    slides.into_iter().map(|(_, n)| n).collect()
}

// ── Slide XML ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeRole {
    Title,
    Heading,
    Body,
}

#[derive(Debug, Default)]
struct TextParagraph {
    text: String,
    level: u8,
    bullet: Option<bool>,
}

#[derive(Debug, Default)]
struct SlideState {
    items: Vec<ItemContent>,
    role: Option<ShapeRole>,
    paragraphs: Vec<TextParagraph>,
    para: Option<TextParagraph>,
    in_text: bool,
    in_table: bool,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
    picture_caption: Option<String>,
}

fn parse_slide(xml: &str) -> Result<Vec<ItemContent>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut st = SlideState::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => st.start(&local_name(e), e),
            Ok(Event::Empty(ref e)) => st.empty(&local_name(e), e),
            Ok(Event::Text(ref e)) => {
                if st.in_text {
                    let text = e.unescape()?;
                    if let Some(p) = st.para.as_mut() {
                        p.text.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => st.end(e.local_name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(e),
            _ => {}
        }
    }
    Ok(st.items)
}

impl SlideState {
    fn start(&mut self, local: &str, e: &BytesStart) {
        match local {
            "sp" => {
                self.role = Some(ShapeRole::Body);
                self.paragraphs.clear();
            }
            "pic" => self.picture_caption = None,
            "p" => {
                self.para = Some(TextParagraph::default());
            }
            "t" => self.in_text = true,
            "tbl" => {
                self.in_table = true;
                self.rows.clear();
            }
            "tr" if self.in_table => self.row.clear(),
            "tc" if self.in_table => self.cell.clear(),
            _ => self.property(local, e),
        }
    }

    fn empty(&mut self, local: &str, e: &BytesStart) {
        match local {
            "br" => {
                if let Some(p) = self.para.as_mut() {
                    p.text.push(' ');
                }
            }
            _ => self.property(local, e),
        }
    }

    fn property(&mut self, local: &str, e: &BytesStart) {
        match local {
            "ph" => {
                let role = match attr(e, "type").as_deref() {
                    Some("ctrTitle") => ShapeRole::Title,
                    Some("title") => ShapeRole::Heading,
                    _ => ShapeRole::Body,
                };
                if self.role.is_some() {
                    self.role = Some(role);
                }
            }
            "cNvPr" => {
                self.picture_caption = attr(e, "descr").filter(|d| !d.trim().is_empty());
            }
            "pPr" => {
                if let Some(p) = self.para.as_mut() {
                    p.level = attr(e, "lvl").and_then(|v| v.parse().ok()).unwrap_or(0);
                }
            }
            "buChar" => {
                if let Some(p) = self.para.as_mut() {
                    p.bullet = Some(false);
                }
            }
            "buAutoNum" => {
                if let Some(p) = self.para.as_mut() {
                    p.bullet = Some(true);
                }
            }
            "buNone" => {
                if let Some(p) = self.para.as_mut() {
                    p.bullet = None;
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, local: &[u8]) {
        match local {
            b"t" => self.in_text = false,
            b"p" => {
                if let Some(p) = self.para.take() {
                    if self.in_table {
                        if !p.text.trim().is_empty() {
                            if !self.cell.is_empty() {
                                self.cell.push(' ');
                            }
                            self.cell.push_str(&p.text);
                        }
                    } else if self.role.is_some() {
                        self.paragraphs.push(p);
                    }
                }
            }
            b"tc" if self.in_table => {
                let cell = clean_text(&self.cell);
                self.row.push(cell);
            }
            b"tr" if self.in_table => {
                let row = std::mem::take(&mut self.row);
                self.rows.push(row);
            }
            b"tbl" => {
                self.in_table = false;
                let rows = std::mem::take(&mut self.rows);
                self.items.push(ItemContent::Table(TableData::from_rows(rows)));
            }
            b"sp" => self.finish_shape(),
            b"pic" => {
                let caption = self.picture_caption.take();
                self.items.push(ItemContent::Picture { caption });
            }
            _ => {}
        }
    }

    fn finish_shape(&mut self) {
        let role = self.role.take().unwrap_or(ShapeRole::Body);
        let paragraphs = std::mem::take(&mut self.paragraphs);
        match role {
            ShapeRole::Title | ShapeRole::Heading => {
                let text = clean_text(
                    &paragraphs
                        .iter()
                        .map(|p| p.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" "),
                );
                if role == ShapeRole::Title {
                    self.items.push(ItemContent::Title { text });
                } else {
                    self.items.push(ItemContent::SectionHeader { level: 1, text });
                }
            }
            ShapeRole::Body => {
                for p in paragraphs {
                    let text = clean_text(&p.text);
                    let item = match p.bullet {
                        Some(ordered) => ItemContent::ListItem {
                            text,
                            ordered,
                            level: p.level,
                        },
                        None if p.level > 0 => ItemContent::ListItem {
                            text,
                            ordered: false,
                            level: p.level,
                        },
                        None => ItemContent::Paragraph { text },
                    };
                    self.items.push(item);
                }
            }
        }
    }
}
