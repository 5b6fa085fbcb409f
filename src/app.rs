// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Dashboard actions.
//!
//! [`App`] ties the session, the chat history and the API client together
//! and implements what each dashboard tab does: log in or sign up, upload a
//! document, chat, list documents and summarize one.
//!
//! Validation problems are reported before any request is sent. Remote
//! failures are turned into a readable message taken from the response body,
//! or a fixed fallback, and never change earlier state.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::api::{ApiClient, ApiError, UploadResponse};
use crate::history::ChatHistory;
use crate::session::{Session, SessionStore};
use crate::storage::{KeyValueStore, StoreError};
use crate::types::{ChatMessage, DocumentRef};

pub const MISSING_CREDENTIALS: &str = "Username and password are required";
pub const SELECT_FILE: &str = "Please select a file";
pub const SELECT_DOCUMENT: &str = "Please select a document to summarize";
pub const NO_DOCUMENTS: &str = "No documents uploaded yet. Upload a document first.";
pub const NO_SUMMARY: &str = "No summary available";

const AUTH_FALLBACK: &str = "Authentication failed";
const UPLOAD_FALLBACK: &str = "Upload failed";
const ASK_FALLBACK: &str = "Failed to get response";
const SUMMARY_FALLBACK: &str = "Failed to generate summary";
const DOCUMENTS_FALLBACK: &str = "Failed to load documents";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not logged in")]
    NotAuthenticated,

    /// Rejected before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// The service call failed; `message` is what the user should see.
    #[error("{message}")]
    Remote {
        message: String,
        #[source]
        source: ApiError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    fn validation(message: &str) -> Self {
        Self::Validation(message.to_string())
    }

    /// The underlying API error, for remote failures.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Body detail when present, then the transport message, then `fallback`.
fn describe_failure(err: &ApiError, fallback: &str) -> String {
    if let Some(detail) = err.detail() {
        return detail.to_string();
    }
    let transport = err.to_string();
    if transport.trim().is_empty() {
        fallback.to_string()
    } else {
        transport
    }
}

/// A generated summary and the document it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub document_id: String,
    pub text: String,
}

/// Bot reply recorded by [`App::ask`].
#[derive(Debug)]
pub struct AskReply<'a> {
    pub message: &'a ChatMessage,
    /// Set when the request failed and `message` describes the failure.
    pub error: Option<ApiError>,
}

impl AskReply<'_> {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Application state for one user of the client.
pub struct App {
    sessions: SessionStore,
    history: ChatHistory,
    api: ApiClient,
}

impl App {
    /// Restore the session and chat history from `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, api: ApiClient) -> Result<Self, StoreError> {
        let sessions = SessionStore::init(Arc::clone(&store))?;
        let history = ChatHistory::load(store)?;
        Ok(Self {
            sessions,
            history,
            api,
        })
    }

    pub fn session(&self) -> &Session {
        self.sessions.session()
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Log in, creating the account first when `signup` is set.
    pub async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
        signup: bool,
    ) -> Result<&Session, AppError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AppError::validation(MISSING_CREDENTIALS));
        }

        let remote = |source: ApiError| AppError::Remote {
            message: describe_failure(&source, AUTH_FALLBACK),
            source,
        };

        if signup {
            let created = self.api.signup(username, password).await.map_err(remote)?;
            tracing::info!(
                "ACCOUNT_CREATED | id={} username={}",
                created.id.as_deref().unwrap_or("?"),
                created.username.as_deref().unwrap_or(username)
            );
        }

        let login = self.api.login(username, password).await.map_err(remote)?;
        self.sessions
            .login(login.access_token, login.user_id, login.username)?;
        Ok(self.sessions.session())
    }

    /// End the session and drop the conversation.
    pub fn logout(&mut self) -> Result<(), AppError> {
        self.sessions.logout()?;
        self.history.discard();
        Ok(())
    }

    /// Upload a document and describe the result.
    pub async fn upload(&self, path: Option<&Path>) -> Result<(UploadResponse, String), AppError> {
        let path = match path {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => return Err(AppError::validation(SELECT_FILE)),
        };
        if !path.is_file() {
            return Err(AppError::Validation(format!(
                "{}: {} is not a readable file",
                SELECT_FILE,
                path.display()
            )));
        }

        let creds = self
            .sessions
            .session()
            .credentials()
            .ok_or(AppError::NotAuthenticated)?;

        let uploaded = self
            .api
            .upload(path, creds.user_id, creds.token)
            .await
            .map_err(|source| AppError::Remote {
                message: describe_failure(&source, UPLOAD_FALLBACK),
                source,
            })?;

        tracing::info!(
            "DOCUMENT_UPLOADED | file={} chars={}",
            uploaded.filename,
            uploaded.text_length
        );
        let message = format!(
            "File \"{}\" uploaded successfully! ({} chars)",
            uploaded.filename, uploaded.text_length
        );
        Ok((uploaded, message))
    }

    /// Ask a question and record both sides of the exchange.
    ///
    /// Blank questions are ignored and return `None`. A failed request is
    /// recorded as a bot message starting with "Error:" rather than
    /// returned as an error; the reply carries the [`ApiError`] in that case.
    pub async fn ask(&mut self, question: &str) -> Result<Option<AskReply<'_>>, AppError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(None);
        }

        let creds = self
            .sessions
            .session()
            .credentials()
            .ok_or(AppError::NotAuthenticated)?;

        self.history.push(ChatMessage::user(question))?;

        let (reply, error) = match self.api.ask(question, creds.user_id, creds.token).await {
            Ok(response) => (ChatMessage::bot(response.answer), None),
            Err(e) => {
                tracing::warn!("ASK_FAILED | error=\"{}\"", e);
                let reply =
                    ChatMessage::bot(format!("Error: {}", e.detail().unwrap_or(ASK_FALLBACK)));
                (reply, Some(e))
            }
        };

        let message = self.history.push(reply)?;
        Ok(Some(AskReply { message, error }))
    }

    /// Start the conversation over from the greeting.
    pub fn clear_history(&mut self) -> Result<(), AppError> {
        self.history.clear()?;
        Ok(())
    }

    /// The user's documents.
    pub async fn documents(&self) -> Result<Vec<DocumentRef>, AppError> {
        let creds = self
            .sessions
            .session()
            .credentials()
            .ok_or(AppError::NotAuthenticated)?;

        let list = self
            .api
            .list_documents(creds.user_id, creds.token)
            .await
            .map_err(|source| {
                tracing::warn!("DOCUMENTS_FAILED | error=\"{}\"", source);
                AppError::Remote {
                    message: describe_failure(&source, DOCUMENTS_FALLBACK),
                    source,
                }
            })?;
        Ok(list.documents)
    }

    /// Summarize `doc_id`, or the first listed document when none is given.
    pub async fn summarize(&self, doc_id: Option<&str>) -> Result<Summary, AppError> {
        let creds = self
            .sessions
            .session()
            .credentials()
            .ok_or(AppError::NotAuthenticated)?;

        let document_id = match doc_id.map(str::trim) {
            Some("") => return Err(AppError::validation(SELECT_DOCUMENT)),
            Some(id) => id.to_string(),
            None => match self.documents().await?.into_iter().next() {
                Some(first) => first.id,
                None => return Err(AppError::validation(NO_DOCUMENTS)),
            },
        };

        let response = self
            .api
            .summarize(creds.user_id, &document_id, creds.token)
            .await
            .map_err(|source| AppError::Remote {
                message: source.detail().unwrap_or(SUMMARY_FALLBACK).to_string(),
                source,
            })?;

        let text = response
            .summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| NO_SUMMARY.to_string());

        tracing::info!("DOCUMENT_SUMMARIZED | doc_id={} chars={}", document_id, text.len());
        Ok(Summary { document_id, text })
    }
}
