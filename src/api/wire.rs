// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Request and response bodies of the DocuVerse HTTP API.

use serde::{Deserialize, Serialize};

use crate::types::{de_id, de_opt_id, DocumentRef};

/// Body of `/signup` and `/login`.
#[derive(Debug, Serialize)]
pub(crate) struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupResponse {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(deserialize_with = "de_id")]
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    #[serde(default)]
    pub text_length: usize,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub chunks: Option<usize>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizeResponse {
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentList {
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}
