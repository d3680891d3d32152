//! Word backend: `word/document.xml` → document items.
//!
//! Headings come from paragraph styles (`Title`, `Heading 1`..`Heading 6`,
//! or any style with an outline level), list items from `w:numPr` or the
//! built-in `List Bullet`/`List Number` styles, tables from top-level
//! `w:tbl`. Text inside nested tables is flattened into the enclosing cell.
//! Word has no fixed pagination, so every item is on page 1.

use crate::document::{ConvertedDocument, ItemContent, TableData};
use crate::error::Ocr2MdError;
use crate::format::InputFormat;
use crate::pipeline::input::ResolvedInput;
use crate::pipeline::ooxml::{self, attr, local_name};
use crate::pipeline::postprocess::clean_text;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub async fn convert_docx(input: &ResolvedInput) -> Result<ConvertedDocument, Ocr2MdError> {
    let path = input.path.clone();
    let name = input.name();
    tokio::task::spawn_blocking(move || convert_docx_blocking(&path, name))
        .await
        .map_err(|e| Ocr2MdError::Internal(format!("Word task panicked: {}", e)))?
}

fn convert_docx_blocking(path: &Path, name: String) -> Result<ConvertedDocument, Ocr2MdError> {
    let mut archive = ooxml::open_archive(path)?;
    let styles = match ooxml::read_part(&mut archive, path, "word/styles.xml")? {
        Some(xml) => parse_styles(&xml).map_err(|e| ooxml::malformed(path, "word/styles.xml", e))?,
        None => HashMap::new(),
    };
    let numbering = match ooxml::read_part(&mut archive, path, "word/numbering.xml")? {
        Some(xml) => {
            parse_numbering(&xml).map_err(|e| ooxml::malformed(path, "word/numbering.xml", e))?
        }
        None => Numbering::default(),
    };
    let body = ooxml::require_part(&mut archive, path, "word/document.xml")?;
    let items = parse_document(&body, &styles, &numbering)
        .map_err(|e| ooxml::malformed(path, "word/document.xml", e))?;

    let mut doc = ConvertedDocument::new(name, InputFormat::Word);
    doc.page_count = 1;
    for item in items {
        doc.push(1, item);
    }
    info!(
        "Word: {} items ({} tables)",
        doc.items.len(),
        doc.table_count()
    );
    Ok(doc)
}

// ── Styles ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct Style {
    name: String,
    outline_level: Option<u8>,
}

fn parse_styles(xml: &str) -> Result<HashMap<String, Style>, quick_xml::Error> {
    let mut styles = HashMap::new();
    let mut reader = Reader::from_str(xml);
    let mut current: Option<(String, Style)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match local_name(e).as_str() {
                "style" => {
                    current = attr(e, "styleId").map(|id| (id, Style::default()));
                }
                "name" => {
                    if let (Some((_, style)), Some(v)) = (current.as_mut(), attr(e, "val")) {
                        style.name = v;
                    }
                }
                "outlineLvl" => {
                    if let Some((_, style)) = current.as_mut() {
                        style.outline_level = attr(e, "val").and_then(|v| v.parse().ok());
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"style" => {
                if let Some((id, style)) = current.take() {
                    styles.insert(id, style);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e),
            _ => {}
        }
    }
    Ok(styles)
}

// ── Numbering ────────────────────────────────────────────────────────────────

/// `(numId, ilvl)` → ordered?
#[derive(Debug, Default)]
struct Numbering {
    abstract_formats: HashMap<(String, u8), String>,
    num_to_abstract: HashMap<String, String>,
}

impl Numbering {
    fn is_ordered(&self, num_id: &str, level: u8) -> bool {
        self.num_to_abstract
            .get(num_id)
            .and_then(|abs| self.abstract_formats.get(&(abs.clone(), level)))
            .is_some_and(|fmt| fmt != "bullet" && fmt != "none")
    }
}

fn parse_numbering(xml: &str) -> Result<Numbering, quick_xml::Error> {
    let mut numbering = Numbering::default();
    let mut reader = Reader::from_str(xml);
    let mut abstract_id: Option<String> = None;
    let mut level: Option<u8> = None;
    let mut num_id: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match local_name(e).as_str() {
                "abstractNum" => abstract_id = attr(e, "abstractNumId"),
                "lvl" => level = attr(e, "ilvl").and_then(|v| v.parse().ok()),
                "numFmt" => {
                    if let (Some(abs), Some(lvl), Some(fmt)) =
                        (abstract_id.clone(), level, attr(e, "val"))
                    {
                        numbering.abstract_formats.insert((abs, lvl), fmt);
                    }
                }
                "num" => num_id = attr(e, "numId"),
                "abstractNumId" => {
                    if let (Some(num), Some(abs)) = (num_id.clone(), attr(e, "val")) {
                        numbering.num_to_abstract.insert(num, abs);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"abstractNum" => abstract_id = None,
                b"lvl" => level = None,
                b"num" => num_id = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e),
            _ => {}
        }
    }
    Ok(numbering)
}

// ── Body ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Paragraph {
    style: Option<String>,
    num_id: Option<String>,
    ilvl: u8,
    text: String,
    pictures: Vec<Option<String>>,
}

#[derive(Debug, Default)]
struct BodyState {
    items: Vec<ItemContent>,
    para: Option<Paragraph>,
    in_text: bool,
    table_depth: usize,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
}

fn parse_document(
    xml: &str,
    styles: &HashMap<String, Style>,
    numbering: &Numbering,
) -> Result<Vec<ItemContent>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut st = BodyState::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let local = local_name(e);
                match local.as_str() {
                    "p" => st.para = Some(Paragraph::default()),
                    "t" => st.in_text = true,
                    "tbl" => {
                        st.table_depth += 1;
                        if st.table_depth == 1 {
                            st.rows.clear();
                        }
                    }
                    "tr" if st.table_depth == 1 => st.row.clear(),
                    "tc" if st.table_depth == 1 => st.cell.clear(),
                    _ => st.paragraph_property(&local, e),
                }
            }
            Ok(Event::Empty(ref e)) => {
                let local = local_name(e);
                match local.as_str() {
                    "tab" | "br" | "cr" => {
                        if let Some(p) = st.para.as_mut() {
                            p.text.push(' ');
                        }
                    }
                    _ => st.paragraph_property(&local, e),
                }
            }
            Ok(Event::Text(ref e)) => {
                if st.in_text {
                    let text = e.unescape()?;
                    if let Some(p) = st.para.as_mut() {
                        p.text.push_str(&text);
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => st.in_text = false,
                b"p" => {
                    if let Some(p) = st.para.take() {
                        st.finish_paragraph(p, styles, numbering);
                    }
                }
                b"tc" if st.table_depth == 1 => {
                    let cell = clean_text(&st.cell);
                    st.row.push(cell);
                }
                b"tr" if st.table_depth == 1 => {
                    let row = std::mem::take(&mut st.row);
                    st.rows.push(row);
                }
                b"tbl" => {
                    st.table_depth = st.table_depth.saturating_sub(1);
                    if st.table_depth == 0 {
                        let rows = std::mem::take(&mut st.rows);
                        debug!("Word table: {} rows", rows.len());
                        st.items.push(ItemContent::Table(TableData::from_rows(rows)));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e),
            _ => {}
        }
    }
    Ok(st.items)
}

impl BodyState {
    fn paragraph_property(&mut self, local: &str, e: &quick_xml::events::BytesStart) {
        let Some(p) = self.para.as_mut() else {
            return;
        };
        match local {
            "pStyle" => p.style = attr(e, "val"),
            "numId" => p.num_id = attr(e, "val").filter(|v| v != "0"),
            "ilvl" => p.ilvl = attr(e, "val").and_then(|v| v.parse().ok()).unwrap_or(0),
            "docPr" => p.pictures.push(attr(e, "descr").filter(|d| !d.trim().is_empty())),
            _ => {}
        }
    }

    fn finish_paragraph(&mut self, p: Paragraph, styles: &HashMap<String, Style>, numbering: &Numbering) {
        if self.table_depth > 0 {
            if !p.text.trim().is_empty() {
                if !self.cell.is_empty() {
                    self.cell.push(' ');
                }
                self.cell.push_str(&p.text);
            }
            return;
        }

        let text = clean_text(&p.text);
        if !text.is_empty() {
            self.items.push(classify(&p, text, styles, numbering));
        }
        for caption in p.pictures {
            self.items.push(ItemContent::Picture { caption });
        }
    }
}

fn classify(p: &Paragraph, text: String, styles: &HashMap<String, Style>, numbering: &Numbering) -> ItemContent {
    let style = p.style.as_deref().unwrap_or_default();
    let info = styles.get(style);
    let style_name = info
        .map(|s| s.name.as_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(style)
        .to_ascii_lowercase()
        .replace(' ', "");

    if style_name == "title" {
        return ItemContent::Title { text };
    }
    if let Some(level) = style_name
        .strip_prefix("heading")
        .and_then(|n| n.parse::<u8>().ok())
        .or_else(|| info.and_then(|s| s.outline_level).filter(|l| *l < 9).map(|l| l + 1))
    {
        return ItemContent::SectionHeader {
            level: level.clamp(1, 6),
            text,
        };
    }
    if let Some(num_id) = p.num_id.as_deref() {
        return ItemContent::ListItem {
            text,
            ordered: numbering.is_ordered(num_id, p.ilvl),
            level: p.ilvl,
        };
    }
    if style_name.starts_with("listbullet") || style_name.starts_with("listnumber") {
        return ItemContent::ListItem {
            text,
            ordered: style_name.starts_with("listnumber"),
            level: 0,
        };
    }
    ItemContent::Paragraph { text }
}
