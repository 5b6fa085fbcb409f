// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Plain terminal output for a [`RenderedBlock`].
//!
//! Escape sequences and control characters in the content are removed
//! before the renderer adds its own bold styling.

use super::{format_inline_terminal, strip_terminal_controls, Fragment, ListKind, RenderedBlock};

/// Indent applied to list items.
const ITEM_INDENT: &str = "  ";

impl RenderedBlock {
    /// Write the block as terminal text, one line per paragraph or item.
    ///
    /// Ordered lists are renumbered from 1, matching what a browser does
    /// with an `<ol>`.
    pub fn to_terminal(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        let mut counter: Option<usize> = None;

        for fragment in self.fragments() {
            match fragment {
                Fragment::ListOpen(ListKind::Ordered) => counter = Some(0),
                Fragment::ListOpen(ListKind::Unordered) | Fragment::ListClose(_) => counter = None,
                Fragment::ListItem(content) => {
                    let marker = match counter.as_mut() {
                        Some(n) => {
                            *n += 1;
                            format!("{}.", n)
                        }
                        None => "•".to_string(),
                    };
                    lines.push(format!(
                        "{}{} {}",
                        ITEM_INDENT,
                        marker,
                        format_inline_terminal(&strip_terminal_controls(content))
                    ));
                }
                Fragment::Paragraph(content) => {
                    lines.push(format_inline_terminal(&strip_terminal_controls(content)))
                }
                Fragment::LineBreak => lines.push(String::new()),
            }
        }

        lines.join("\n")
    }
}

/// Render lightweight markdown for display in a terminal.
pub fn render_terminal<'a>(text: impl Into<Option<&'a str>>) -> String {
    match text.into() {
        Some(text) => RenderedBlock::parse(text).to_terminal(),
        None => String::new(),
    }
}
