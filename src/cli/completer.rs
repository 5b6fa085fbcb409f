// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Tab completion and hints for the chat slash commands.
//!
//! ```text
//! > /
//!   /help      - Show all commands
//!   /history   - Show the conversation so far
//!   /summarize - Summarize a document
//!   ...
//!
//! > /summarize <Tab>
//!   12 (annual-report.pdf)
//!   13 (notes.txt)
//! ```

use std::borrow::Cow;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hint, Hinter};
use rustyline::validate::Validator;
use rustyline::{Context, Helper, Result};

use crate::types::DocumentRef;

/// A slash command understood by the chat loop.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    /// Argument placeholder shown in help, e.g. `[doc_id]`.
    pub args: Option<&'static str>,
    /// Whether the argument completes to a document id.
    pub completes_documents: bool,
}

impl CommandInfo {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            aliases: &[],
            description,
            args: None,
            completes_documents: false,
        }
    }

    pub const fn with_aliases(
        name: &'static str,
        aliases: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Self {
            name,
            aliases,
            description,
            args: None,
            completes_documents: false,
        }
    }

    pub const fn with_args(mut self, args: &'static str) -> Self {
        self.args = Some(args);
        self
    }

    pub const fn with_document_arg(mut self, args: &'static str) -> Self {
        self.args = Some(args);
        self.completes_documents = true;
        self
    }

    /// True if `input` is a prefix of the name or an alias.
    pub fn matches(&self, input: &str) -> bool {
        let input_lower = input.to_lowercase();
        self.name.starts_with(&input_lower)
            || self.aliases.iter().any(|a| a.starts_with(&input_lower))
    }

    pub fn exact_match(&self, input: &str) -> bool {
        let input_lower = input.to_lowercase();
        self.name == input_lower || self.aliases.iter().any(|a| *a == input_lower)
    }

    pub fn display_string(&self) -> String {
        match self.args {
            Some(args) => format!("{} {} - {}", self.name, args, self.description),
            None => format!("{} - {}", self.name, self.description),
        }
    }
}

pub static COMMANDS: &[CommandInfo] = &[
    CommandInfo::with_aliases("/help", &["/h", "/?"], "Show all commands"),
    CommandInfo::new("/history", "Show the conversation so far"),
    CommandInfo::new("/clear", "Start the conversation over"),
    CommandInfo::new("/docs", "List uploaded documents"),
    CommandInfo::new("/summarize", "Summarize a document").with_document_arg("[doc_id]"),
    CommandInfo::new("/upload", "Upload a .pdf or .txt file").with_args("<path>"),
    CommandInfo::with_aliases("/exit", &["/quit", "/q"], "Leave the chat"),
];

/// Completer, hinter and highlighter for the chat prompt.
#[derive(Debug, Default)]
pub struct DocuverseHelper {
    /// Documents known from the last listing, for `/summarize` completion.
    documents: Vec<DocumentRef>,
}

impl DocuverseHelper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_documents(&mut self, documents: Vec<DocumentRef>) {
        self.documents = documents;
    }

    fn get_completions(&self, line: &str, pos: usize) -> Vec<Pair> {
        let input = &line[..pos];
        if !input.starts_with('/') {
            return Vec::new();
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.len() <= 1 && !input.ends_with(' ') {
            return self.complete_command(input);
        }

        let command = parts.first().copied().unwrap_or("");
        let prefix = if input.ends_with(' ') {
            ""
        } else {
            parts.last().copied().unwrap_or("")
        };
        self.complete_document_id(command, prefix, input)
    }

    fn complete_command(&self, input: &str) -> Vec<Pair> {
        COMMANDS
            .iter()
            .filter(|cmd| cmd.matches(input))
            .map(|cmd| Pair {
                display: cmd.display_string(),
                replacement: format!("{} ", cmd.name),
            })
            .collect()
    }

    fn complete_document_id(&self, command: &str, prefix: &str, full_input: &str) -> Vec<Pair> {
        let Some(cmd) = COMMANDS.iter().find(|c| c.exact_match(command)) else {
            return Vec::new();
        };
        if !cmd.completes_documents {
            return Vec::new();
        }

        let base = &full_input[..full_input.len() - prefix.len()];
        self.documents
            .iter()
            .filter(|doc| doc.id.starts_with(prefix))
            .map(|doc| Pair {
                display: format!("{} ({})", doc.id, doc.filename),
                replacement: format!("{}{}", base, doc.id),
            })
            .collect()
    }

    fn get_hint(&self, line: &str) -> Option<CommandHint> {
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }

        let matches: Vec<_> = COMMANDS.iter().filter(|cmd| cmd.matches(line)).collect();
        if matches.len() != 1 {
            return None;
        }

        let cmd = matches[0];
        let remaining = cmd.name.get(line.len()..)?;
        let hint = match cmd.args {
            Some(args) => format!("{} {} - {}", remaining, args, cmd.description),
            None => format!("{} - {}", remaining, cmd.description),
        };
        Some(CommandHint {
            display: hint,
            completion: remaining.to_string(),
        })
    }
}

/// Dim text shown after the cursor.
#[derive(Debug, Clone)]
pub struct CommandHint {
    display: String,
    completion: String,
}

impl Hint for CommandHint {
    fn display(&self) -> &str {
        &self.display
    }

    fn completion(&self) -> Option<&str> {
        Some(&self.completion)
    }
}

impl Completer for DocuverseHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Result<(usize, Vec<Pair>)> {
        let start = if line.starts_with('/') { 0 } else { pos };
        Ok((start, self.get_completions(line, pos)))
    }
}

impl Hinter for DocuverseHelper {
    type Hint = CommandHint;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }
        self.get_hint(line)
    }
}

impl Highlighter for DocuverseHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{}\x1b[0m", hint))
    }

    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if !line.starts_with('/') {
            return Cow::Borrowed(line);
        }

        let (command, rest) = match line.split_once(' ') {
            Some((command, rest)) => (command, Some(rest)),
            None => (line, None),
        };

        if COMMANDS.iter().any(|c| c.exact_match(command)) {
            let colored_cmd = format!("\x1b[36m{}\x1b[0m", command);
            match rest {
                Some(rest) => Cow::Owned(format!("{} {}", colored_cmd, rest)),
                None => Cow::Owned(colored_cmd),
            }
        } else if COMMANDS.iter().any(|c| c.matches(command)) {
            Cow::Owned(format!("\x1b[33m{}\x1b[0m", line))
        } else {
            Cow::Owned(format!("\x1b[31m{}\x1b[0m", line))
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Validator for DocuverseHelper {}

impl Helper for DocuverseHelper {}

/// Print the slash command reference.
pub fn show_help() {
    println!("\nAvailable commands:\n");
    for cmd in COMMANDS {
        let aliases = if cmd.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", cmd.aliases.join(", "))
        };
        let args = cmd.args.map_or(String::new(), |a| format!(" {}", a));

        println!("  \x1b[36m{}{}\x1b[0m{} - {}", cmd.name, args, aliases, cmd.description);
    }
    println!("\nAnything else is sent as a question about your documents.\n");
}

/// Split a slash command into its canonical name and arguments.
///
/// Returns `None` for ordinary questions and unknown commands.
pub fn parse_command(input: &str) -> Option<(&'static str, Vec<&str>)> {
    let input = input.trim();
    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input.split_whitespace();
    let command = get_canonical_command(parts.next()?)?;
    Some((command, parts.collect()))
}

pub fn is_slash_command(input: &str) -> bool {
    input.trim().starts_with('/')
}

/// Canonical name for a command or alias.
pub fn get_canonical_command(input: &str) -> Option<&'static str> {
    COMMANDS.iter().find(|c| c.exact_match(input)).map(|c| c.name)
}
