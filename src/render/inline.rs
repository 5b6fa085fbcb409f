// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Inline formatting applied inside a single paragraph or list item.
//!
//! Only `**bold**` spans are recognised. Single-asterisk emphasis is left as
//! literal text so that stray bullet markers never turn into italics.

use std::borrow::Cow;
use std::sync::LazyLock;

use colored::Colorize;
use regex::{Captures, Regex};

/// Minimal `**...**` span; the shortest match wins so a line may hold several.
static BOLD_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("Bold span regex is valid"));

/// Escape the three HTML-significant characters.
///
/// `&` must be replaced first, otherwise the entities produced for `<` and
/// `>` would be escaped a second time.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape `text` and wrap every `**...**` span in `<strong>`.
///
/// # Example
///
/// ```
/// use docuverse::render::format_inline;
///
/// assert_eq!(
///     format_inline("**a** < b"),
///     "<strong>a</strong> &lt; b",
/// );
/// ```
pub fn format_inline(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let escaped = escape_html(text);
    match BOLD_SPAN.replace_all(&escaped, "<strong>${1}</strong>") {
        Cow::Borrowed(_) => escaped,
        Cow::Owned(replaced) => replaced,
    }
}

/// Drop escape sequences and control characters other than tab.
///
/// Applied to service text before it is written to a terminal, so a reply
/// cannot retitle the window, move the cursor or clear the screen.
pub fn strip_terminal_controls(text: &str) -> String {
    // Tabs are split out first; the escape parser treats them as controls.
    text.split('\t')
        .map(|piece| {
            strip_ansi_escapes::strip_str(piece)
                .chars()
                .filter(|c| !c.is_control())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\t")
}

/// Terminal counterpart of [`format_inline`]: no escaping, bold via ANSI.
pub fn format_inline_terminal(text: &str) -> String {
    BOLD_SPAN
        .replace_all(text, |caps: &Captures<'_>| caps[1].bold().to_string())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_order() {
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("<b>"), "&lt;b&gt;");
        // An existing entity is escaped once, not twice.
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
    }

    #[test]
    fn test_bold_spans_are_minimal() {
        assert_eq!(
            format_inline("**one** and **two**"),
            "<strong>one</strong> and <strong>two</strong>"
        );
    }

    #[test]
    fn test_single_asterisks_stay_literal() {
        assert_eq!(
            format_inline("**bold** and *not bold*"),
            "<strong>bold</strong> and *not bold*"
        );
    }

    #[test]
    fn test_unmatched_markers_are_literal() {
        assert_eq!(format_inline("**open only"), "**open only");
        assert_eq!(format_inline("****"), "****");
    }

    #[test]
    fn test_bold_content_is_escaped() {
        assert_eq!(
            format_inline("**<script>**"),
            "<strong>&lt;script&gt;</strong>"
        );
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(format_inline("plain words"), "plain words");
        assert_eq!(format_inline(""), "");
    }

    #[test]
    fn test_strip_terminal_controls() {
        assert_eq!(strip_terminal_controls("\u{1b}]0;pwned\u{07}\u{1b}[2Jhello"), "hello");
        assert_eq!(strip_terminal_controls("\u{1b}[31mred\u{1b}[0m"), "red");
        assert_eq!(strip_terminal_controls("a\tb\rc\u{08}\u{7f}d\u{9b}"), "a\tbcd");
        assert_eq!(strip_terminal_controls("plain **text**"), "plain **text**");
    }

    #[test]
    fn test_terminal_keeps_raw_characters() {
        let out = format_inline_terminal("a < b & c");
        assert_eq!(out, "a < b & c");
        assert!(format_inline_terminal("**x**").contains('x'));
        assert!(!format_inline_terminal("**x**").contains("**"));
    }
}
