//! Common test utilities
//!
//! Fakes for the Telegram seam plus helpers for building upload requests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use http_body_util::BodyExt;
use teloxide::types::ChatId;
use tempfile::TempDir;

use tunnel::core::config::{Settings, TelegramCredentials};
use tunnel::server::AppState;
use tunnel::telegram::{Connector, DocumentSender, ForwardError};

pub const BOUNDARY: &str = "tunnel-test-boundary";
pub const CHAT_ID: &str = "-1001234567890";

/// One recorded `send_document` call.
#[derive(Debug, Clone)]
pub struct SentDocument {
    pub chat_id: ChatId,
    pub file_name: String,
    pub caption: String,
    pub content: Vec<u8>,
}

/// How the fake sender answers.
#[derive(Debug, Clone, Copy)]
pub enum SendMode {
    Succeed,
    RateLimited,
}

pub struct RecordingSender {
    mode: SendMode,
    sent: Mutex<Vec<SentDocument>>,
}

#[async_trait]
impl DocumentSender for RecordingSender {
    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        file_name: &str,
        caption: String,
    ) -> Result<(), ForwardError> {
        let content = std::fs::read(path).map_err(|e| ForwardError::Api(e.to_string()))?;
        self.sent.lock().unwrap().push(SentDocument {
            chat_id,
            file_name: file_name.to_string(),
            caption,
            content,
        });
        match self.mode {
            SendMode::Succeed => Ok(()),
            SendMode::RateLimited => Err(ForwardError::RateLimited(Duration::from_secs(30))),
        }
    }
}

pub struct FakeConnector {
    pub sender: Arc<RecordingSender>,
    pub connects: AtomicUsize,
    failing_handshakes: AtomicUsize,
}

impl FakeConnector {
    pub fn new(mode: SendMode) -> Arc<Self> {
        Arc::new(Self {
            sender: Arc::new(RecordingSender {
                mode,
                sent: Mutex::new(Vec::new()),
            }),
            connects: AtomicUsize::new(0),
            failing_handshakes: AtomicUsize::new(0),
        })
    }

    /// Makes the next `count` handshakes fail as if the token were rejected.
    pub fn fail_next_handshakes(&self, count: usize) {
        self.failing_handshakes.store(count, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentDocument> {
        self.sender.sent.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _credentials: &TelegramCredentials) -> Result<Arc<dyn DocumentSender>, ForwardError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_handshakes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        if failing.is_ok() {
            return Err(ForwardError::Api("Unauthorized: invalid token specified".to_string()));
        }
        let sender: Arc<dyn DocumentSender> = self.sender.clone();
        Ok(sender)
    }
}

/// Test server state with its own scratch directory.
pub struct TestEnvironment {
    pub scratch: TempDir,
    pub connector: Arc<FakeConnector>,
    pub state: AppState,
}

impl TestEnvironment {
    /// Fully configured environment; `overrides` replace or extend the base vars.
    pub fn new(mode: SendMode, overrides: &[(&str, &str)]) -> Self {
        Self::build(mode, overrides, &[])
    }

    /// Fully configured environment minus the `removed` vars.
    pub fn without(mode: SendMode, removed: &[&str]) -> Self {
        Self::build(mode, &[], removed)
    }

    fn build(mode: SendMode, overrides: &[(&str, &str)], removed: &[&str]) -> Self {
        let scratch = TempDir::new().unwrap();
        let mut vars: HashMap<String, String> = [
            ("USE_LOCAL_DEFAULTS", "0"),
            ("BOT_TOKEN", "123456:TEST-TOKEN"),
            ("GROUP_CHAT_ID", CHAT_ID),
            ("ALLOWED_EXTENSIONS", "pdf,jpg,png,txt,mp4,zip"),
            ("MAX_FILE_SIZE", "1024"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        vars.insert("UPLOAD_FOLDER".to_string(), scratch.path().display().to_string());
        for (k, v) in overrides {
            vars.insert(k.to_string(), v.to_string());
        }
        for k in removed {
            vars.remove(*k);
        }

        let (settings, _report) = Settings::from_lookup(|key| vars.get(key).cloned());
        let connector = FakeConnector::new(mode);
        let state = AppState::new(Arc::new(settings), connector.clone());

        Self {
            scratch,
            connector,
            state,
        }
    }

    pub fn scratch_entries(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.scratch.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

/// A multipart part: field name, optional filename, content.
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(file_name: &'a str, content: &'a [u8]) -> Self {
        Self {
            name: "file",
            file_name: Some(file_name),
            content,
        }
    }

    pub fn text(name: &'a str, content: &'a [u8]) -> Self {
        Self {
            name,
            file_name: None,
            content,
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        part.name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
                );
            }
        }
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(parts: &[Part<'_>], extra_headers: &[(&str, &str)]) -> Request<Body> {
    let body = multipart_body(parts);
    let length = body.len().to_string();
    let mut headers = vec![("content-length", length.as_str())];
    headers.extend_from_slice(extra_headers);
    build_upload(body, &headers)
}

/// Same as [`upload_request`] but without a `Content-Length` header, as a
/// chunked client would send it.
pub fn unsized_upload_request(parts: &[Part<'_>]) -> Request<Body> {
    build_upload(multipart_body(parts), &[])
}

fn build_upload(body: Vec<u8>, extra_headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/upload").header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    for (name, value) in extra_headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body)).unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
