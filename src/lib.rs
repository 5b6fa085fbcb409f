// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! docuverse - Terminal client for the DocuVerse document service
//!
//! Upload documents, ask questions about them and summarize them from the
//! command line. Answers come back as lightweight markup (bullets, numbered
//! items, `**bold**`) and are rendered either for the terminal or as a safe
//! HTML fragment.
//!
//! # Core Modules
//!
//! - [`render`] - Markup-to-HTML and markup-to-terminal rendering
//! - [`api`] - HTTP client for the DocuVerse service
//! - [`storage`] - Persistent key/value store backing the client state
//! - [`session`] - Login session restored across runs
//! - [`history`] - Persisted chat conversation
//! - [`app`] - Dashboard actions tying the pieces together
//! - [`cli`] - Interactive chat input
//! - [`config`] - Client configuration
//! - [`error`] - Consistent error formatting utilities

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod render;
pub mod session;
pub mod storage;
pub mod types;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use app::{App, AppError, AskReply, Summary};
pub use config::Config;
pub use history::ChatHistory;
pub use render::{escape_html, format_inline, render, render_terminal, RenderedBlock};
pub use session::{Session, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use types::{ChatMessage, DocumentRef, Role};
