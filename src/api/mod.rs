// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! DocuVerse HTTP API client
//!
//! Typed access to the remote service: account creation and login,
//! document upload, questions, summaries and the document listing.
//! Authenticated calls carry the session token as a bearer credential.
//!
//! Requests are sent once. There is no retry, and no timeout unless one is
//! configured; a failure is reported to the caller as an [`ApiError`].
//!
//! # Example
//!
//! ```no_run
//! use docuverse::api::ApiClient;
//!
//! # async fn example() -> Result<(), docuverse::api::ApiError> {
//! let client = ApiClient::new("https://docuverse.example.com", None)?;
//! let login = client.login("ada", "secret").await?;
//! let answer = client.ask("What is the refund policy?", &login.user_id, &login.access_token).await?;
//! println!("{}", answer.answer);
//! # Ok(())
//! # }
//! ```

mod wire;

pub use wire::{
    AskResponse, DocumentList, LoginResponse, SignupResponse, SummarizeResponse, UploadResponse,
};

use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Body fields checked, in order, for a human-readable failure message.
const ERROR_MESSAGE_FIELDS: [&str; 3] = ["detail", "error", "summary"];

/// Errors from a remote call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{}", status_text(*.status, .message.as_deref()))]
    Status {
        status: u16,
        message: Option<String>,
    },

    /// The configured base URL cannot carry a request path.
    #[error("invalid service URL: {0}")]
    InvalidUrl(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// The file to upload could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn status_text(status: u16, message: Option<&str>) -> String {
    match message {
        Some(message) => message.to_string(),
        None => format!("Request failed with status code {}", status),
    }
}

impl ApiError {
    /// Message taken from the error response body, if the service sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the service rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

/// Pull a readable message out of an error body.
///
/// Checks `detail`, `error` and `summary` in that order. FastAPI validation
/// failures send `detail` as a list of objects; the first `msg` is used.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    for field in ERROR_MESSAGE_FIELDS {
        match value.get(field) {
            Some(serde_json::Value::String(text)) if !text.trim().is_empty() => {
                return Some(text.clone());
            }
            Some(serde_json::Value::Array(items)) => {
                if let Some(msg) = items
                    .iter()
                    .find_map(|item| item.get("msg").and_then(|m| m.as_str()))
                {
                    return Some(msg.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Client for the DocuVerse service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a client for `base_url`. `timeout` of `None` waits indefinitely.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("docuverse/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ApiError::Client)?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Base URL extended by `segments`, each percent-encoded as one segment.
    fn url_with_segments(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let invalid = || ApiError::InvalidUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Create an account. The service answers with the new id and username.
    pub async fn signup(&self, username: &str, password: &str) -> Result<SignupResponse, ApiError> {
        let request = self
            .client
            .post(self.url("/signup"))
            .json(&wire::Credentials { username, password });
        self.send("/signup", request).await
    }

    /// Exchange credentials for a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let request = self
            .client
            .post(self.url("/login"))
            .json(&wire::Credentials { username, password });
        self.send("/login", request).await
    }

    /// Upload a document for `user_id`.
    pub async fn upload(
        &self,
        path: &Path,
        user_id: &str,
        token: &str,
    ) -> Result<UploadResponse, ApiError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        tracing::debug!("API_UPLOAD | file={} bytes={}", filename, bytes.len());

        let mut part = Part::bytes(bytes).file_name(filename.clone());
        if let Some(mime) = mime_for(&filename) {
            part = part.mime_str(mime).map_err(ApiError::Client)?;
        }
        let form = Form::new()
            .part("file", part)
            .text("user_id", user_id.to_string());

        let request = self
            .client
            .post(self.url("/upload"))
            .bearer_auth(token)
            .multipart(form);
        self.send("/upload", request).await
    }

    /// Ask a question against every document the user uploaded.
    pub async fn ask(&self, question: &str, user_id: &str, token: &str) -> Result<AskResponse, ApiError> {
        let form = Form::new()
            .text("question", question.to_string())
            .text("user_id", user_id.to_string());
        let request = self
            .client
            .post(self.url("/ask"))
            .bearer_auth(token)
            .multipart(form);
        self.send("/ask", request).await
    }

    /// Summarize one document.
    pub async fn summarize(
        &self,
        user_id: &str,
        doc_id: &str,
        token: &str,
    ) -> Result<SummarizeResponse, ApiError> {
        let form = Form::new()
            .text("user_id", user_id.to_string())
            .text("doc_id", doc_id.to_string());
        let request = self
            .client
            .post(self.url("/summarize"))
            .bearer_auth(token)
            .multipart(form);
        self.send("/summarize", request).await
    }

    /// List the user's documents.
    pub async fn list_documents(&self, user_id: &str, token: &str) -> Result<DocumentList, ApiError> {
        let url = self.url_with_segments(&["documents", user_id])?;
        let endpoint = url.path().to_string();
        let request = self.client.get(url).bearer_auth(token);
        self.send(&endpoint, request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        tracing::debug!("API_REQUEST | endpoint={}", endpoint);

        let response = request.send().await.map_err(|e| {
            tracing::warn!("API_NETWORK_ERROR | endpoint={} error=\"{}\"", endpoint, e);
            ApiError::Network(e)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(ApiError::Network)?;

        if !status.is_success() {
            let message = extract_error_message(&body);
            tracing::warn!(
                "API_REJECTED | endpoint={} status={} detail=\"{}\"",
                endpoint,
                status.as_u16(),
                message.as_deref().unwrap_or("")
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

/// Content type for the file kinds the service accepts.
fn mime_for(filename: &str) -> Option<&'static str> {
    let extension = Path::new(filename)
        .extension()?
        .to_string_lossy()
        .to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}
