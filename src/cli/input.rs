// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Line input for the chat loop.
//!
//! [`InteractiveInput`] wraps rustyline with slash command completion and a
//! history file in the docuverse home. [`SimpleInput`] reads plain lines
//! from stdin for piped use.

use anyhow::{Context, Result};
use rustyline::history::{DefaultHistory, History};
use rustyline::{ColorMode, CompletionType, Config, EditMode, Editor};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use super::completer::DocuverseHelper;
use crate::types::DocumentRef;

const HISTORY_FILE: &str = "chat_history.txt";

const MAX_HISTORY_ENTRIES: usize = 1000;

/// Source of chat lines. `Ok(None)` means end of input.
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Refresh the documents offered for completion. No-op by default.
    fn set_documents(&mut self, _documents: Vec<DocumentRef>) {}
}

/// Interactive prompt with tab completion and persistent history.
pub struct InteractiveInput {
    editor: Editor<DocuverseHelper, DefaultHistory>,
    history_path: Option<PathBuf>,
}

impl InteractiveInput {
    /// Create the editor, loading history from `home` when given.
    pub fn new(home: Option<PathBuf>) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .history_ignore_dups(true)?
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .color_mode(ColorMode::Enabled)
            .auto_add_history(true)
            .max_history_size(MAX_HISTORY_ENTRIES)?
            .build();

        let mut editor = Editor::with_config(config).context("Failed to create input editor")?;
        editor.set_helper(Some(DocuverseHelper::new()));
        editor.bind_sequence(
            rustyline::KeyEvent::new('\t', rustyline::Modifiers::NONE),
            rustyline::Cmd::Complete,
        );

        let history_path = home.map(|dir| dir.join(HISTORY_FILE));
        if let Some(ref path) = history_path {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    tracing::debug!("HISTORY_LOAD_FAILED | path={} error=\"{}\"", path.display(), e);
                }
            }
        }

        Ok(Self {
            editor,
            history_path,
        })
    }

    fn save_history(&mut self) {
        if let Some(ref path) = self.history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = self.editor.save_history(path) {
                tracing::debug!("HISTORY_SAVE_FAILED | path={} error=\"{}\"", path.display(), e);
            }
        }
    }

    pub fn history_len(&self) -> usize {
        self.editor.history().len()
    }
}

impl LineReader for InteractiveInput {
    /// Ctrl+C yields an empty line; Ctrl+D ends input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                self.save_history();
                Ok(Some(line))
            }
            Err(rustyline::error::ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(rustyline::error::ReadlineError::Eof) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Input error: {}", e)),
        }
    }

    fn set_documents(&mut self, documents: Vec<DocumentRef>) {
        if let Some(helper) = self.editor.helper_mut() {
            helper.set_documents(documents);
        }
    }
}

/// Plain line reader for non-interactive input.
pub struct SimpleInput<R> {
    reader: R,
    echo_prompt: bool,
}

impl SimpleInput<std::io::BufReader<std::io::Stdin>> {
    pub fn stdin() -> Self {
        Self {
            reader: std::io::BufReader::new(std::io::stdin()),
            echo_prompt: true,
        }
    }
}

impl<R: BufRead> SimpleInput<R> {
    /// Read from any buffered source without printing prompts.
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            echo_prompt: false,
        }
    }
}

impl<R: BufRead> LineReader for SimpleInput<R> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        if self.echo_prompt {
            print!("{}", prompt);
            std::io::stdout().flush()?;
        }

        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line.trim_end().to_string())),
            Err(e) => Err(anyhow::anyhow!("Input error: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_simple_input_reads_lines_until_eof() {
        let mut input = SimpleInput::from_reader(Cursor::new("first question\r\n/docs\n"));
        assert_eq!(input.read_line("> ").unwrap().as_deref(), Some("first question"));
        assert_eq!(input.read_line("> ").unwrap().as_deref(), Some("/docs"));
        assert_eq!(input.read_line("> ").unwrap(), None);
    }

    #[test]
    fn test_simple_input_ignores_documents() {
        let mut input = SimpleInput::from_reader(Cursor::new(""));
        input.set_documents(Vec::new());
        assert_eq!(input.read_line("> ").unwrap(), None);
    }
}
