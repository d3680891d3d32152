//! Layout analysis: positioned text cells → document items for one page.
//!
//! Input cells come either from OCR (one cell per recognised word) or from a
//! PDF text layer (one cell per text segment). Both use page coordinates with
//! the origin at the top-left corner.
//!
//! ```text
//! cells ──▶ lines ──▶ segments ──▶ tables | headers | list items | paragraphs
//! ```
//!
//! * A **line** is a set of cells whose vertical extents overlap.
//! * A **segment** is a run of cells in a line separated by less than
//!   [`SEGMENT_GAP_FACTOR`] × line height; wider gaps split columns.
//! * A run of at least [`MIN_TABLE_ROWS`] close lines with two or more
//!   segments each is a table candidate. Candidates whose cells read like
//!   prose (more than [`MAX_WORDS_PER_CELL`] words on average) are rejected,
//!   which keeps two-column page layouts out of tables.

use crate::config::PipelineOptions;
use crate::document::{ItemContent, TableData};
use crate::pipeline::postprocess::clean_text;
use once_cell::sync::Lazy;
use regex::Regex;

/// Gap between cells, in line heights, that starts a new segment.
pub const SEGMENT_GAP_FACTOR: f32 = 1.5;
/// Vertical gap, in line heights, that ends a paragraph.
pub const PARAGRAPH_GAP_FACTOR: f32 = 0.9;
/// Vertical gap, in line heights, allowed between table rows.
pub const TABLE_ROW_GAP_FACTOR: f32 = 2.5;
pub const MIN_TABLE_ROWS: usize = 2;
pub const MAX_WORDS_PER_CELL: f32 = 6.0;

/// Axis-aligned box, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BBox {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        (self.right - self.left).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }

    pub fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    fn vertical_overlap(&self, other: &BBox) -> f32 {
        self.bottom.min(other.bottom) - self.top.max(other.top)
    }
}

/// A positioned run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextCell {
    pub text: String,
    pub bbox: BBox,
}

impl TextCell {
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Switches taken from [`PipelineOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    pub detect_tables: bool,
    pub cell_matching: bool,
}

impl From<&PipelineOptions> for LayoutOptions {
    fn from(o: &PipelineOptions) -> Self {
        Self {
            detect_tables: o.do_table_structure,
            cell_matching: o.table_cell_matching,
        }
    }
}

#[derive(Debug)]
struct Segment {
    cells: Vec<TextCell>,
    bbox: BBox,
}

impl Segment {
    fn text(&self) -> String {
        join_cells(&self.cells)
    }

    fn word_count(&self) -> usize {
        self.cells
            .iter()
            .map(|c| c.text.split_whitespace().count())
            .sum()
    }
}

#[derive(Debug)]
struct Line {
    cells: Vec<TextCell>,
    bbox: BBox,
    segments: Vec<Segment>,
}

impl Line {
    fn new(cell: TextCell) -> Self {
        Self {
            bbox: cell.bbox,
            cells: vec![cell],
            segments: Vec::new(),
        }
    }

    fn height(&self) -> f32 {
        self.bbox.height().max(1.0)
    }

    fn accepts(&self, cell: &TextCell) -> bool {
        let min_h = self.height().min(cell.bbox.height().max(1.0));
        self.bbox.vertical_overlap(&cell.bbox) > 0.5 * min_h
    }

    fn push(&mut self, cell: TextCell) {
        self.bbox = self.bbox.union(&cell.bbox);
        self.cells.push(cell);
    }

    /// Sort cells left to right and split them into segments.
    fn finish(&mut self) {
        self.cells.sort_by(|a, b| a.bbox.left.total_cmp(&b.bbox.left));
        let threshold = self.height() * SEGMENT_GAP_FACTOR;
        let mut segments: Vec<Segment> = Vec::new();
        for cell in &self.cells {
            match segments.last_mut() {
                Some(seg) if cell.bbox.left - seg.bbox.right <= threshold => {
                    seg.bbox = seg.bbox.union(&cell.bbox);
                    seg.cells.push(cell.clone());
                }
                _ => segments.push(Segment {
                    cells: vec![cell.clone()],
                    bbox: cell.bbox,
                }),
            }
        }
        self.segments = segments;
    }

    fn text(&self) -> String {
        join_cells(&self.cells)
    }

    fn gap_to(&self, next: &Line) -> f32 {
        next.bbox.top - self.bbox.bottom
    }
}

fn join_cells(cells: &[TextCell]) -> String {
    cells
        .iter()
        .map(|c| c.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn the cells of one page into document items in reading order.
pub fn analyze_page(cells: Vec<TextCell>, options: LayoutOptions) -> Vec<ItemContent> {
    let lines = group_lines(cells);
    if lines.is_empty() {
        return Vec::new();
    }
    let median_h = median(lines.iter().map(Line::height).collect());

    let mut items = Vec::new();
    let mut pending: Vec<&Line> = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if options.detect_tables {
            let end = tabular_run_end(&lines, i);
            if end - i >= MIN_TABLE_ROWS {
                if let Some(table) = build_table(&lines[i..end], options.cell_matching) {
                    flush_text(&mut pending, median_h, &mut items);
                    items.push(ItemContent::Table(table));
                    i = end;
                    continue;
                }
            }
        }
        pending.push(&lines[i]);
        i += 1;
    }
    flush_text(&mut pending, median_h, &mut items);
    items
}

fn group_lines(cells: Vec<TextCell>) -> Vec<Line> {
    let mut cells: Vec<TextCell> = cells
        .into_iter()
        .filter(|c| !c.text.trim().is_empty())
        .collect();
    cells.sort_by(|a, b| {
        a.bbox
            .center_y()
            .total_cmp(&b.bbox.center_y())
            .then(a.bbox.left.total_cmp(&b.bbox.left))
    });

    let mut lines: Vec<Line> = Vec::new();
    for cell in cells {
        match lines.last_mut() {
            Some(line) if line.accepts(&cell) => line.push(cell),
            _ => lines.push(Line::new(cell)),
        }
    }
    for line in &mut lines {
        line.finish();
    }
    lines
}

fn median(mut values: Vec<f32>) -> f32 {
    if values.is_empty() {
        return 1.0;
    }
    values.sort_by(f32::total_cmp);
    values[values.len() / 2]
}

/// End (exclusive) of the run of multi-segment lines starting at `start`.
fn tabular_run_end(lines: &[Line], start: usize) -> usize {
    let mut end = start;
    while end < lines.len() && lines[end].segments.len() >= 2 {
        if end > start {
            let prev = &lines[end - 1];
            if prev.gap_to(&lines[end]) > prev.height() * TABLE_ROW_GAP_FACTOR {
                break;
            }
        }
        end += 1;
    }
    end
}

fn build_table(rows: &[Line], cell_matching: bool) -> Option<TableData> {
    let segments: Vec<&Segment> = rows.iter().flat_map(|r| r.segments.iter()).collect();
    let words: usize = segments.iter().map(|s| s.word_count()).sum();
    if segments.is_empty() || words as f32 / segments.len() as f32 > MAX_WORDS_PER_CELL {
        return None;
    }

    let grid: Vec<Vec<String>> = if cell_matching {
        let columns = column_grid(segments.iter().map(|s| (s.bbox.left, s.bbox.right)));
        if columns.len() < 2 {
            return None;
        }
        rows.iter().map(|row| match_cells(row, &columns)).collect()
    } else {
        rows.iter()
            .map(|row| row.segments.iter().map(|s| clean_text(&s.text())).collect())
            .collect()
    };

    let table = TableData::from_rows(grid);
    (table.num_cols >= 2).then_some(table)
}

/// Merge overlapping horizontal intervals into column bands, left to right.
fn column_grid(intervals: impl Iterator<Item = (f32, f32)>) -> Vec<(f32, f32)> {
    let mut intervals: Vec<(f32, f32)> = intervals.collect();
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut columns: Vec<(f32, f32)> = Vec::new();
    for (left, right) in intervals {
        match columns.last_mut() {
            Some(col) if left <= col.1 => col.1 = col.1.max(right),
            _ => columns.push((left, right)),
        }
    }
    columns
}

/// Assign every word of `row` to the column band containing its centre, or
/// the nearest band.
fn match_cells(row: &Line, columns: &[(f32, f32)]) -> Vec<String> {
    let mut cells: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
    for cell in &row.cells {
        let x = cell.bbox.center_x();
        let col = columns
            .iter()
            .enumerate()
            .map(|(i, &(l, r))| {
                let distance = if x < l {
                    l - x
                } else if x > r {
                    x - r
                } else {
                    0.0
                };
                (i, distance)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        cells[col].push(cell.text.trim());
    }
    cells
        .into_iter()
        .map(|words| clean_text(&words.join(" ")))
        .collect()
}

static RE_LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?P<bullet>[•◦▪‣·\-\*])|\(?(?P<num>\d{1,3}|[a-z])[.)])\s+(?P<rest>.+)$")
        .unwrap()
});

/// `Some((ordered, text_without_marker))` when `text` starts with a list marker.
fn list_marker(text: &str) -> Option<(bool, String)> {
    let caps = RE_LIST_MARKER.captures(text.trim())?;
    let ordered = caps.name("num").is_some();
    Some((ordered, caps["rest"].to_string()))
}

/// Heading level for a line of height `h` on a page whose median line height
/// is `median_h`.
fn heading_level(h: f32, median_h: f32, text: &str) -> Option<u8> {
    let words = text.split_whitespace().count();
    if words == 0 || words > 12 || text.trim_end().ends_with(['.', ',', ';']) {
        return None;
    }
    let ratio = h / median_h.max(1.0);
    if ratio >= 1.8 {
        Some(1)
    } else if ratio >= 1.3 {
        Some(2)
    } else {
        None
    }
}

/// Turn buffered non-table lines into headers, list items and paragraphs.
fn flush_text(lines: &mut Vec<&Line>, median_h: f32, items: &mut Vec<ItemContent>) {
    let mut para: Vec<&Line> = Vec::new();
    // Left edge and text of the list item still accepting continuation lines.
    let mut open_item: Option<(f32, bool, String)> = None;

    fn close_para(para: &mut Vec<&Line>, items: &mut Vec<ItemContent>) {
        if para.is_empty() {
            return;
        }
        let text = para.iter().map(|l| l.text()).collect::<Vec<_>>().join("\n");
        items.push(ItemContent::Paragraph {
            text: clean_text(&text),
        });
        para.clear();
    }

    fn close_item(open: &mut Option<(f32, bool, String)>, items: &mut Vec<ItemContent>) {
        if let Some((_, ordered, text)) = open.take() {
            items.push(ItemContent::ListItem {
                text: clean_text(&text),
                ordered,
                level: 0,
            });
        }
    }

    let mut prev: Option<&Line> = None;
    for line in lines.drain(..) {
        let text = line.text();
        let close_gap = prev.is_some_and(|p| p.gap_to(line) <= p.height() * PARAGRAPH_GAP_FACTOR);
        let continues_item = close_gap
            && open_item
                .as_ref()
                .is_some_and(|(left, _, _)| line.bbox.left > *left + line.height() * 0.5);

        if let Some(level) = heading_level(line.height(), median_h, &text) {
            close_para(&mut para, items);
            close_item(&mut open_item, items);
            items.push(ItemContent::SectionHeader {
                level,
                text: clean_text(&text),
            });
        } else if let Some((ordered, rest)) = list_marker(&text) {
            close_para(&mut para, items);
            close_item(&mut open_item, items);
            open_item = Some((line.bbox.left, ordered, rest));
        } else if continues_item {
            if let Some((_, _, item_text)) = open_item.as_mut() {
                item_text.push('\n');
                item_text.push_str(&text);
            }
        } else {
            close_item(&mut open_item, items);
            if !close_gap {
                close_para(&mut para, items);
            }
            para.push(line);
        }
        prev = Some(line);
    }
    close_item(&mut open_item, items);
    close_para(&mut para, items);
}
