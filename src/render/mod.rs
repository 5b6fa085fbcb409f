// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Text renderer for service responses.
//!
//! Answers and summaries come back as plain text with light markdown:
//! `*`/`-`/`•` bullets, `1.` numbered items and `**bold**` spans. This module
//! turns them into HTML that is safe to insert into a page, or into styled
//! terminal text for the CLI.
//!
//! Rendering is a single forward pass over the lines with one piece of
//! state, the kind of list currently open. Input is untrusted; every piece
//! of text content is escaped before it is wrapped in a tag, and nothing in
//! here can fail.
//!
//! # Example
//!
//! ```
//! use docuverse::render::render;
//!
//! let html = render("Findings:\n* **fast**\n* cheap");
//! assert_eq!(
//!     html,
//!     "<p>Findings:</p><ul><li><strong>fast</strong></li><li>cheap</li></ul>",
//! );
//! assert_eq!(render(None), "");
//! ```

mod inline;
mod terminal;

pub use inline::{escape_html, format_inline, format_inline_terminal, strip_terminal_controls};
pub use terminal::render_terminal;

use std::sync::LazyLock;

use regex::Regex;

static BULLET_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[*\-•]\s+").expect("Bullet marker regex is valid"));

// ASCII digits only; `\d` would also accept other scripts' numerals.
static NUMBER_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.\s+").expect("Number marker regex is valid"));

/// Kind of list a block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Unordered => "ul",
            Self::Ordered => "ol",
        }
    }
}

/// Which list, if any, is open while scanning lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListState {
    #[default]
    None,
    Unordered,
    Ordered,
}

impl ListState {
    pub fn open_list(self) -> Option<ListKind> {
        match self {
            Self::None => None,
            Self::Unordered => Some(ListKind::Unordered),
            Self::Ordered => Some(ListKind::Ordered),
        }
    }
}

impl From<ListKind> for ListState {
    fn from(kind: ListKind) -> Self {
        match kind {
            ListKind::Unordered => Self::Unordered,
            ListKind::Ordered => Self::Ordered,
        }
    }
}

/// One structural piece of rendered output.
///
/// Text carried by `ListItem` and `Paragraph` is the raw trimmed content with
/// the list marker removed; inline formatting happens when the block is
/// written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    ListOpen(ListKind),
    ListItem(String),
    ListClose(ListKind),
    Paragraph(String),
    LineBreak,
}

/// Classification of a single trimmed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Item(ListKind, &'a str),
    Text(&'a str),
    Blank,
}

impl<'a> Line<'a> {
    /// Classify a line; surrounding whitespace is ignored.
    pub fn classify(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        if let Some(marker) = BULLET_MARKER.find(trimmed) {
            Line::Item(ListKind::Unordered, &trimmed[marker.end()..])
        } else if let Some(marker) = NUMBER_MARKER.find(trimmed) {
            Line::Item(ListKind::Ordered, &trimmed[marker.end()..])
        } else if trimmed.is_empty() {
            Line::Blank
        } else {
            Line::Text(trimmed)
        }
    }

    fn list_state(&self) -> ListState {
        match self {
            Line::Item(kind, _) => (*kind).into(),
            _ => ListState::None,
        }
    }
}

/// Ordered fragments produced from one input string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedBlock {
    fragments: Vec<Fragment>,
}

impl RenderedBlock {
    /// Scan `text` line by line and build its fragment sequence.
    ///
    /// Any open list is closed as soon as a line is not an item of that same
    /// kind, including a switch between bullets and numbers, and at the end
    /// of input.
    pub fn parse(text: &str) -> Self {
        let mut fragments = Vec::new();
        if text.is_empty() {
            return Self { fragments };
        }

        let mut state = ListState::None;
        for raw in text.split('\n') {
            let line = Line::classify(raw);
            let wanted = line.list_state();

            if wanted != state {
                if let Some(open) = state.open_list() {
                    fragments.push(Fragment::ListClose(open));
                }
                if let Some(next) = wanted.open_list() {
                    fragments.push(Fragment::ListOpen(next));
                }
                state = wanted;
            }

            fragments.push(match line {
                Line::Item(_, content) => Fragment::ListItem(content.to_string()),
                Line::Text(content) => Fragment::Paragraph(content.to_string()),
                Line::Blank => Fragment::LineBreak,
            });
        }

        if let Some(open) = state.open_list() {
            fragments.push(Fragment::ListClose(open));
        }

        Self { fragments }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Concatenate every fragment as HTML, with no separator.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::ListOpen(kind) => {
                    out.push('<');
                    out.push_str(kind.tag());
                    out.push('>');
                }
                Fragment::ListClose(kind) => {
                    out.push_str("</");
                    out.push_str(kind.tag());
                    out.push('>');
                }
                Fragment::ListItem(content) => {
                    out.push_str("<li>");
                    out.push_str(&format_inline(content));
                    out.push_str("</li>");
                }
                Fragment::Paragraph(content) => {
                    out.push_str("<p>");
                    out.push_str(&format_inline(content));
                    out.push_str("</p>");
                }
                Fragment::LineBreak => out.push_str("<br>"),
            }
        }
        out
    }
}

/// Render lightweight markdown to HTML. Absent or empty input yields `""`.
pub fn render<'a>(text: impl Into<Option<&'a str>>) -> String {
    match text.into() {
        Some(text) => RenderedBlock::parse(text).to_html(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Remove the tags this renderer emits, leaving only text content.
    fn strip_known_tags(html: &str) -> String {
        let tags = [
            "<ul>", "</ul>", "<ol>", "</ol>", "<li>", "</li>", "<p>", "</p>", "<br>",
            "<strong>", "</strong>",
        ];
        let mut out = html.to_string();
        for tag in tags {
            out = out.replace(tag, "");
        }
        out
    }

    #[test]
    fn test_empty_and_absent_input() {
        assert_eq!(render(""), "");
        assert_eq!(render(None), "");
        assert!(RenderedBlock::parse("").is_empty());
    }

    #[test]
    fn test_bullet_list() {
        let block = RenderedBlock::parse("* a\n* b");
        assert_eq!(
            block.fragments(),
            &[
                Fragment::ListOpen(ListKind::Unordered),
                Fragment::ListItem("a".into()),
                Fragment::ListItem("b".into()),
                Fragment::ListClose(ListKind::Unordered),
            ]
        );
        assert_eq!(block.to_html(), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn test_all_bullet_markers() {
        assert_eq!(
            render("* a\n- b\n• c"),
            "<ul><li>a</li><li>b</li><li>c</li></ul>"
        );
    }

    #[test]
    fn test_numbered_list_closes_as_ordered() {
        assert_eq!(
            render("1. first\n2. second"),
            "<ol><li>first</li><li>second</li></ol>"
        );
    }

    #[test]
    fn test_switching_list_kinds_closes_previous() {
        assert_eq!(
            render("1. one\n* dot\n2. two"),
            "<ol><li>one</li></ol><ul><li>dot</li></ul><ol><li>two</li></ol>"
        );
    }

    #[test]
    fn test_paragraph_break_paragraph() {
        let block = RenderedBlock::parse("line1\n\nline2");
        assert_eq!(
            block.fragments(),
            &[
                Fragment::Paragraph("line1".into()),
                Fragment::LineBreak,
                Fragment::Paragraph("line2".into()),
            ]
        );
        assert_eq!(block.to_html(), "<p>line1</p><br><p>line2</p>");
    }

    #[test]
    fn test_list_closed_before_following_text() {
        assert_eq!(
            render("Intro\n- a\n- b\nOutro"),
            "<p>Intro</p><ul><li>a</li><li>b</li></ul><p>Outro</p>"
        );
    }

    #[test]
    fn test_blank_line_ends_list() {
        assert_eq!(
            render("* a\n\n* b"),
            "<ul><li>a</li></ul><br><ul><li>b</li></ul>"
        );
    }

    #[test]
    fn test_lines_are_trimmed() {
        assert_eq!(render("   indented  \n\t* item  "), "<p>indented</p><ul><li>item</li></ul>");
    }

    #[test]
    fn test_markers_require_whitespace() {
        assert_eq!(render("*emphasis*"), "<p>*emphasis*</p>");
        assert_eq!(render("-5 degrees"), "<p>-5 degrees</p>");
        assert_eq!(render("3.14 is pi"), "<p>3.14 is pi</p>");
        assert_eq!(render("*"), "<p>*</p>");
    }

    #[test]
    fn test_bold_line_is_not_a_bullet() {
        assert_eq!(
            render("**bold** and *not bold*"),
            "<p><strong>bold</strong> and *not bold*</p>"
        );
    }

    #[test]
    fn test_bold_inside_items() {
        assert_eq!(
            render("1. **Key:** value"),
            "<ol><li><strong>Key:</strong> value</li></ol>"
        );
    }

    #[test]
    fn test_crlf_input() {
        assert_eq!(render("a\r\nb"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_untrusted_input_is_escaped() {
        let inputs = [
            "<script>alert('x')</script>",
            "* <img src=x onerror=alert(1)>",
            "1. a && b > c",
            "**<b>**",
            "Tom & Jerry <3",
        ];
        for input in inputs {
            let text = strip_known_tags(&render(input));
            assert!(!text.contains('<'), "unescaped '<' in {text:?}");
            assert!(!text.contains('>'), "unescaped '>' in {text:?}");
            let bare_amp = text
                .match_indices('&')
                .any(|(i, _)| !["&amp;", "&lt;", "&gt;"].iter().any(|e| text[i..].starts_with(e)));
            assert!(!bare_amp, "unescaped '&' in {text:?}");
        }
    }

    #[test]
    fn test_plain_text_only_gains_paragraph() {
        assert_eq!(render("nothing to escape here"), "<p>nothing to escape here</p>");
    }

    #[test]
    fn test_classify() {
        assert_eq!(Line::classify("  - x "), Line::Item(ListKind::Unordered, "x"));
        assert_eq!(Line::classify("10.  y"), Line::Item(ListKind::Ordered, "y"));
        assert_eq!(Line::classify("   "), Line::Blank);
        assert_eq!(Line::classify("plain"), Line::Text("plain"));
    }
}
