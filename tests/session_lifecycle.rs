// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! End-to-end client flows: session persistence across restarts and the
//! dashboard actions against a mocked service.

use std::sync::Arc;

use docuverse::api::ApiClient;
use docuverse::app::{App, AppError, NO_DOCUMENTS, NO_SUMMARY};
use docuverse::history::{CHAT_HISTORY_KEY, GREETING};
use docuverse::session::{TOKEN_KEY, USERNAME_KEY, USER_ID_KEY};
use docuverse::storage::{FileStore, KeyValueStore};
use docuverse::types::{ChatMessage, Role};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn file_store(dir: &TempDir) -> Arc<dyn KeyValueStore> {
    Arc::new(FileStore::open(dir.path()).unwrap())
}

async fn mock_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-123",
            "token_type": "bearer",
            "user_id": 7,
            "username": "ada"
        })))
        .mount(server)
        .await;
}

async fn logged_in_app(server: &MockServer, dir: &TempDir) -> App {
    mock_login(server).await;
    let api = ApiClient::new(server.uri(), None).unwrap();
    let mut app = App::new(file_store(dir), api).unwrap();
    app.authenticate("ada", "secret", false).await.unwrap();
    app
}

#[tokio::test]
async fn login_survives_restart_and_logout_clears_everything() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    {
        let app = logged_in_app(&server, &dir).await;
        assert!(app.session().is_authenticated());
        assert_eq!(app.session().display_name(), "ada");
    }

    // A new process sees the same session.
    let api = ApiClient::new(server.uri(), None).unwrap();
    let mut app = App::new(file_store(&dir), api).unwrap();
    assert!(app.session().is_authenticated());
    assert_eq!(app.session().user_id(), Some("7"));
    assert_eq!(app.session().token(), Some("tok-123"));

    app.logout().unwrap();
    assert!(!app.session().is_authenticated());

    let store = file_store(&dir);
    for key in [TOKEN_KEY, USER_ID_KEY, USERNAME_KEY, CHAT_HISTORY_KEY] {
        assert_eq!(store.get(key).unwrap(), None, "{key} should be removed");
    }
}

#[tokio::test]
async fn signup_then_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "username": "ada"})))
        .expect(1)
        .mount(&server)
        .await;
    mock_login(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let api = ApiClient::new(server.uri(), None).unwrap();
    let mut app = App::new(file_store(&dir), api).unwrap();
    let session = app.authenticate("ada", "secret", true).await.unwrap();
    assert_eq!(session.username(), Some("ada"));
}

#[tokio::test]
async fn rejected_login_keeps_session_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let api = ApiClient::new(server.uri(), None).unwrap();
    let mut app = App::new(file_store(&dir), api).unwrap();

    match app.authenticate("ada", "wrong", false).await {
        Err(AppError::Remote { message, .. }) => assert_eq!(message, "Invalid credentials"),
        other => panic!("expected remote error, got {:?}", other.map(|_| ())),
    }
    assert!(!app.session().is_authenticated());
    assert_eq!(file_store(&dir).get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn chat_exchange_is_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .and(body_string_contains("What is the refund policy?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "1. Keep the receipt\n2. Return within **30 days**"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    {
        let mut app = logged_in_app(&server, &dir).await;
        let reply = app.ask("  What is the refund policy?  ").await.unwrap().unwrap();
        assert!(!reply.failed());
        assert_eq!(reply.message.role, Role::Bot);
        assert!(reply.message.content.contains("30 days"));
    }

    let api = ApiClient::new(server.uri(), None).unwrap();
    let app = App::new(file_store(&dir), api).unwrap();
    let messages = app.history().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0], ChatMessage::system(GREETING));
    assert_eq!(messages[1], ChatMessage::user("What is the refund policy?"));
    assert_eq!(messages[2].role, Role::Bot);
}

#[tokio::test]
async fn failed_question_becomes_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "No documents found. Please upload first."})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = logged_in_app(&server, &dir).await;
    let reply = app.ask("anything?").await.unwrap().unwrap();
    assert!(reply.failed());
    assert_eq!(reply.error.as_ref().and_then(|e| e.status()), Some(400));
    assert_eq!(reply.message.role, Role::Bot);
    assert_eq!(reply.message.content, "Error: No documents found. Please upload first.");
    assert_eq!(app.history().len(), 3);
}

#[tokio::test]
async fn answer_that_reads_like_an_error_is_not_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Error: 404 appears in the log on line 3"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = logged_in_app(&server, &dir).await;
    let reply = app.ask("What does the log say?").await.unwrap().unwrap();
    assert!(!reply.failed());
    assert!(reply.error.is_none());
    assert_eq!(reply.message.content, "Error: 404 appears in the log on line 3");
}

#[tokio::test]
async fn failed_question_without_detail_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = logged_in_app(&server, &dir).await;
    let reply = app.ask("anything?").await.unwrap().unwrap();
    assert!(reply.failed());
    assert_eq!(reply.message.content, "Error: Failed to get response");
}

#[tokio::test]
async fn upload_reports_filename_and_length() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "ok",
            "doc_id": 12,
            "filename": "notes.txt",
            "chunks": 1,
            "text_length": 17
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let app = logged_in_app(&server, &dir).await;

    let file = dir.path().join("notes.txt");
    std::fs::write(&file, "quarterly numbers").unwrap();

    let (response, message) = app.upload(Some(&file)).await.unwrap();
    assert_eq!(response.doc_id.as_deref(), Some("12"));
    assert_eq!(message, "File \"notes.txt\" uploaded successfully! (17 chars)");
}

#[tokio::test]
async fn rejected_upload_uses_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "Only .pdf and .txt files are supported"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let app = logged_in_app(&server, &dir).await;

    let file = dir.path().join("image.png");
    std::fs::write(&file, [0u8, 1, 2]).unwrap();

    match app.upload(Some(&file)).await {
        Err(AppError::Remote { message, .. }) => {
            assert_eq!(message, "Only .pdf and .txt files are supported")
        }
        other => panic!("expected remote error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn summarize_defaults_to_first_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [
                {"id": 12, "filename": "annual-report.pdf"},
                {"id": 13, "filename": "notes.txt"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/summarize"))
        .and(body_string_contains("12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": "- Revenue grew\n- Costs fell"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let app = logged_in_app(&server, &dir).await;
    let summary = app.summarize(None).await.unwrap();
    assert_eq!(summary.document_id, "12");
    assert_eq!(summary.text, "- Revenue grew\n- Costs fell");
}

#[tokio::test]
async fn summarize_without_documents_is_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"documents": []})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let app = logged_in_app(&server, &dir).await;
    match app.summarize(None).await {
        Err(AppError::Validation(message)) => assert_eq!(message, NO_DOCUMENTS),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_summary_reads_as_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/summarize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let app = logged_in_app(&server, &dir).await;
    let summary = app.summarize(Some("12")).await.unwrap();
    assert_eq!(summary.text, NO_SUMMARY);
}

#[tokio::test]
async fn failed_summary_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/summarize"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let app = logged_in_app(&server, &dir).await;
    match app.summarize(Some("12")).await {
        Err(AppError::Remote { message, .. }) => assert_eq!(message, "Failed to generate summary"),
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn rejected_token_surfaces_from_listing_and_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents/7"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Could not validate credentials"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let app = logged_in_app(&server, &dir).await;

    match app.documents().await {
        Err(AppError::Remote { message, source }) => {
            assert_eq!(message, "Could not validate credentials");
            assert!(source.is_unauthorized());
        }
        other => panic!("expected remote error, got {other:?}"),
    }

    let err = app.summarize(None).await.unwrap_err();
    assert!(err.api_error().is_some_and(|e| e.is_unauthorized()));
    assert_eq!(err.to_string(), "Could not validate credentials");
}

#[tokio::test]
async fn failed_listing_without_detail_has_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents/7"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let app = logged_in_app(&server, &dir).await;
    match app.documents().await {
        Err(AppError::Remote { message, .. }) => {
            assert_eq!(message, "Request failed with status code 500")
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[test]
fn corrupt_history_recovers_on_startup() {
    let dir = tempfile::tempdir().unwrap();
    file_store(&dir).set(CHAT_HISTORY_KEY, "{not json").unwrap();

    let api = ApiClient::new("http://127.0.0.1:9", None).unwrap();
    let app = App::new(file_store(&dir), api).unwrap();
    assert_eq!(app.history().messages(), &[ChatMessage::system(GREETING)]);
}
