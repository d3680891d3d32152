//! Markdown export of a [`ConvertedDocument`].
//!
//! Items are rendered in reading order and separated by a blank line;
//! consecutive list items stay on adjacent lines. The assembled text then goes
//! through [`crate::pipeline::postprocess::clean_markdown`], a fixed set of
//! pure string rules, so exporting the same document twice yields identical
//! bytes.

use crate::config::PageSeparator;
use crate::document::{ConvertedDocument, ItemContent, TableData};
use crate::pipeline::postprocess::clean_markdown;
use serde::{Deserialize, Serialize};

/// Options for Markdown export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownOptions {
    /// Separator inserted where a new page begins. Default: none.
    pub page_separator: PageSeparator,
    /// Emit `<!-- image -->` placeholders for pictures. Default: true.
    pub image_placeholders: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            page_separator: PageSeparator::None,
            image_placeholders: true,
        }
    }
}

impl MarkdownOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.page_separator = sep;
        self
    }
}

/// Render `doc` to Markdown.
pub fn to_markdown(doc: &ConvertedDocument, options: &MarkdownOptions) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut list_block: Vec<String> = Vec::new();
    let mut ordered_counters: Vec<usize> = Vec::new();
    let mut current_page: Option<usize> = None;

    let flush_list = |blocks: &mut Vec<String>, list: &mut Vec<String>, counters: &mut Vec<usize>| {
        if !list.is_empty() {
            blocks.push(list.join("\n"));
            list.clear();
        }
        counters.clear();
    };

    for item in &doc.items {
        if current_page.is_some_and(|p| p != item.page_no) {
            if let Some(sep) = options.page_separator.render(item.page_no) {
                flush_list(&mut blocks, &mut list_block, &mut ordered_counters);
                blocks.push(sep);
            }
        }
        current_page = Some(item.page_no);

        match &item.content {
            ItemContent::ListItem {
                text,
                ordered,
                level,
            } => {
                let depth = *level as usize;
                ordered_counters.resize(depth + 1, 0);
                let indent = "    ".repeat(depth);
                let marker = if *ordered {
                    ordered_counters[depth] += 1;
                    format!("{}.", ordered_counters[depth])
                } else {
                    "-".to_string()
                };
                list_block.push(format!("{indent}{marker} {}", single_line(text)));
            }
            other => {
                flush_list(&mut blocks, &mut list_block, &mut ordered_counters);
                if let Some(block) = render_block(other, options) {
                    blocks.push(block);
                }
            }
        }
    }
    flush_list(&mut blocks, &mut list_block, &mut ordered_counters);

    clean_markdown(&blocks.join("\n\n"))
}

fn render_block(content: &ItemContent, options: &MarkdownOptions) -> Option<String> {
    match content {
        ItemContent::Title { text } => Some(format!("# {}", single_line(text))),
        ItemContent::SectionHeader { level, text } => {
            let hashes = "#".repeat((*level as usize + 1).clamp(2, 6));
            Some(format!("{hashes} {}", single_line(text)))
        }
        ItemContent::Paragraph { text } => Some(text.trim().to_string()),
        ItemContent::Table(table) => render_table(table),
        ItemContent::Picture { caption } => {
            let mut parts = Vec::new();
            if options.image_placeholders {
                parts.push("<!-- image -->".to_string());
            }
            if let Some(c) = caption.as_deref().filter(|c| !c.trim().is_empty()) {
                parts.push(c.trim().to_string());
            }
            (!parts.is_empty()).then(|| parts.join("\n\n"))
        }
        ItemContent::ListItem { .. } => None,
    }
}

/// GFM table; row 0 is the header.
fn render_table(table: &TableData) -> Option<String> {
    if table.is_empty() {
        return None;
    }
    let row_line = |row: &[String]| {
        let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
        format!("| {} |", cells.join(" | "))
    };
    let mut lines = Vec::with_capacity(table.num_rows + 1);
    lines.push(row_line(&table.grid[0]));
    lines.push(format!("|{}", " --- |".repeat(table.num_cols)));
    for row in &table.grid[1..] {
        lines.push(row_line(row));
    }
    Some(lines.join("\n"))
}

fn escape_cell(text: &str) -> String {
    single_line(text).replace('|', "\\|")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
