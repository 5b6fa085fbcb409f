// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Interactive chat input for docuverse.
//!
//! - **Tab Completion**: slash commands, and document ids for `/summarize`
//! - **Hints**: the rest of a uniquely matched command in dim text
//! - **History**: arrow keys recall earlier questions across runs
//!
//! ## Example
//!
//! ```no_run
//! use docuverse::cli::{parse_command, show_help, InteractiveInput, LineReader};
//!
//! let mut input = InteractiveInput::new(None)?;
//! while let Some(line) = input.read_line("you> ")? {
//!     match parse_command(&line) {
//!         Some(("/help", _)) => show_help(),
//!         Some(("/exit", _)) => break,
//!         Some(_) => {}
//!         None => println!("asking: {}", line),
//!     }
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod completer;
pub mod input;

pub use completer::{
    get_canonical_command, is_slash_command, parse_command, show_help, CommandInfo,
    DocuverseHelper, COMMANDS,
};

pub use input::{InteractiveInput, LineReader, SimpleInput};
