//! The structured document produced by conversion.
//!
//! A [`ConvertedDocument`] is a flat, reading-ordered list of [`DocItem`]s,
//! each tagged with the 1-indexed page it came from. Backends append items;
//! the exporter in [`crate::export`] turns them into Markdown.

use crate::error::Ocr2MdError;
use crate::export::{self, MarkdownOptions};
use crate::format::InputFormat;
use serde::{Deserialize, Serialize};

/// Structured output of one conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedDocument {
    /// File name of the source document.
    pub name: String,
    pub format: InputFormat,
    /// Number of pages (PDF), slides (PowerPoint) or 1 (Word, image) read.
    pub page_count: usize,
    pub items: Vec<DocItem>,
}

/// One positioned piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocItem {
    /// 1-indexed page or slide number.
    pub page_no: usize,
    #[serde(flatten)]
    pub content: ItemContent,
}

/// Content of a [`DocItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum ItemContent {
    /// Document title.
    Title { text: String },
    /// Section heading; level 1 is the top level below the title.
    SectionHeader { level: u8, text: String },
    Paragraph { text: String },
    ListItem {
        text: String,
        ordered: bool,
        /// Nesting depth, 0 for top level.
        level: u8,
    },
    Table(TableData),
    Picture { caption: Option<String> },
}

/// A table as a dense grid of cell texts. Row 0 is the header row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableData {
    pub num_rows: usize,
    pub num_cols: usize,
    pub grid: Vec<Vec<String>>,
}

impl TableData {
    /// Build from ragged rows; short rows are padded with empty cells.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let num_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let grid: Vec<Vec<String>> = rows
            .into_iter()
            .map(|mut r| {
                r.resize(num_cols, String::new());
                r
            })
            .collect();
        Self {
            num_rows: grid.len(),
            num_cols,
            grid,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0 || self.num_cols == 0
    }
}

impl ConvertedDocument {
    pub fn new(name: impl Into<String>, format: InputFormat) -> Self {
        Self {
            name: name.into(),
            format,
            page_count: 0,
            items: Vec::new(),
        }
    }

    /// Append an item on `page_no`. Empty text items are skipped.
    pub fn push(&mut self, page_no: usize, content: ItemContent) {
        let empty = match &content {
            ItemContent::Title { text }
            | ItemContent::SectionHeader { text, .. }
            | ItemContent::Paragraph { text }
            | ItemContent::ListItem { text, .. } => text.trim().is_empty(),
            ItemContent::Table(t) => t.is_empty(),
            ItemContent::Picture { .. } => false,
        };
        if !empty {
            self.items.push(DocItem { page_no, content });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items belonging to page `page_no`.
    pub fn page_items(&self, page_no: usize) -> impl Iterator<Item = &DocItem> {
        self.items.iter().filter(move |i| i.page_no == page_no)
    }

    /// Number of table items.
    pub fn table_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.content, ItemContent::Table(_)))
            .count()
    }

    /// Serialise to Markdown with default options.
    ///
    /// Pure and deterministic: the same document always yields the same bytes.
    pub fn export_to_markdown(&self) -> String {
        export::to_markdown(self, &MarkdownOptions::default())
    }

    /// Serialise to Markdown with explicit options.
    pub fn export_to_markdown_with(&self, options: &MarkdownOptions) -> String {
        export::to_markdown(self, options)
    }

    /// Serialise the structured document as pretty JSON.
    pub fn export_to_json(&self) -> Result<String, Ocr2MdError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Ocr2MdError::Internal(format!("JSON serialisation failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_pads_ragged_rows() {
        let t = TableData::from_rows(vec![
            vec!["a".into(), "b".into(), "c".into()],
            vec!["1".into()],
        ]);
        assert_eq!(t.num_rows, 2);
        assert_eq!(t.num_cols, 3);
        assert_eq!(t.grid[1], vec!["1", "", ""]);
    }

    #[test]
    fn push_skips_blank_text() {
        let mut doc = ConvertedDocument::new("x.pdf", InputFormat::Pdf);
        doc.push(1, ItemContent::Paragraph { text: "   ".into() });
        doc.push(1, ItemContent::Table(TableData::default()));
        assert!(doc.is_empty());
        doc.push(1, ItemContent::Picture { caption: None });
        assert_eq!(doc.items.len(), 1);
    }

    #[test]
    fn json_uses_label_tags() {
        let mut doc = ConvertedDocument::new("x.pdf", InputFormat::Pdf);
        doc.push(
            2,
            ItemContent::SectionHeader {
                level: 1,
                text: "Intro".into(),
            },
        );
        let json = doc.export_to_json().unwrap();
        assert!(json.contains("\"label\": \"section_header\""), "{json}");
        assert!(json.contains("\"page_no\": 2"), "{json}");
        assert!(json.contains("\"format\": \"PDF\""), "{json}");
    }
}
