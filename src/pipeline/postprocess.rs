//! Post-processing: deterministic text cleanup.
//!
//! Two entry points:
//!
//! * [`clean_text`] normalises a single run of recognised or extracted text
//!   before it becomes a document item (ligatures, invisible characters,
//!   end-of-line hyphenation, whitespace).
//! * [`clean_markdown`] normalises the assembled Markdown in the exporter.
//!
//! Every rule is a pure `&str → String` function with no shared state, so the
//! same input always yields the same output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all text rules to one text run.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 3. Expand typographic ligatures (ﬁ, ﬂ, ﬀ, ﬃ, ﬄ)
/// 4. Join words hyphenated across a line break
/// 5. Collapse runs of spaces and tabs
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = expand_ligatures(&s);
    let s = join_hyphenated_breaks(&s);
    collapse_inline_whitespace(&s)
}

/// Apply all Markdown rules to exporter output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Trim trailing whitespace per line
/// 3. Collapse 2+ consecutive blank lines down to 1
/// 4. Strip invisible Unicode
/// 5. Ensure the text ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

// ── Line endings ─────────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Trailing whitespace ──────────────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Blank lines ──────────────────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Final newline ────────────────────────────────────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Invisible characters ─────────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Ligatures ────────────────────────────────────────────────────────────────

fn expand_ligatures(input: &str) -> String {
    input
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

// ── Hyphenation ──────────────────────────────────────────────────────────────
//
// A lower-case letter, a hyphen at end of line, then a lower-case letter on
// the next line is a word split by the layout ("docu-\nment"). Upper-case
// continuations are left alone ("Jean-\nPaul" stays hyphenated-looking but on
// one line).

static RE_HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Ll})-[ \t]*\n[ \t]*(\p{Ll})").unwrap());
static RE_LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]*\n[ \t]*").unwrap());

fn join_hyphenated_breaks(input: &str) -> String {
    let joined = RE_HYPHEN_BREAK.replace_all(input, "$1$2");
    RE_LINE_BREAK.replace_all(&joined, " ").to_string()
}

// ── Inline whitespace ────────────────────────────────────────────────────────

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

fn collapse_inline_whitespace(input: &str) -> String {
    RE_SPACES.replace_all(input.trim(), " ").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
