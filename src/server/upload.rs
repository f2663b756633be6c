//! `POST /upload`: receive one file and forward it to the Telegram group.
//!
//! Pipeline, terminal at the first failing step:
//! auth → declared size → multipart `file` field → filename checks →
//! streamed write to a scratch file (size enforced per chunk) → caption →
//! forward. The scratch file is removed on every path.

use anyhow::Context;
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tokio::io::AsyncWriteExt;

use crate::core::config::Settings;
use crate::core::error::{AppError, AppResult};
use crate::core::validation::validate_filename;
use crate::server::client_ip::ClientIp;
use crate::server::{AppState, MULTIPART_OVERHEAD};
use crate::storage::TemporaryArtifact;
use crate::telegram::caption::build_caption;

pub const FILE_FIELD: &str = "file";
pub const SECRET_HEADER: &str = "x-secret";
pub const SUCCESS_STATUS: &str = "File sent to group";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: String,
}

/// A validated upload sitting in scratch storage.
struct ReceivedFile {
    artifact: TemporaryArtifact,
    file_name: String,
}

pub async fn upload_handler(
    State(state): State<AppState>,
    ClientIp(uploader_ip): ClientIp,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let received_at = Utc::now();

    authorize(&state.settings, &headers)?;
    reject_declared_oversize(&headers, state.settings.max_file_size)?;

    let mut multipart =
        multipart.map_err(|e| AppError::bad_request(format!("Invalid multipart request: {}", e.body_text())))?;
    let upload = receive_file(&state.settings, &mut multipart).await?;

    let outcome = forward(&state, &upload, &uploader_ip, received_at).await;
    upload.artifact.close();
    outcome?;

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            status: SUCCESS_STATUS.to_string(),
        }),
    ))
}

/// Compares `X-SECRET` with the configured secret in constant time.
/// Without a configured secret every request passes.
fn authorize(settings: &Settings, headers: &HeaderMap) -> AppResult<()> {
    let Some(secret) = &settings.upload_secret else {
        return Ok(());
    };

    let provided = headers
        .get(SECRET_HEADER)
        .map(|value| value.as_bytes())
        .unwrap_or_default();

    if bool::from(provided.ct_eq(secret.expose_secret().as_bytes())) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Rejects requests whose declared body is too large before reading any of it.
fn reject_declared_oversize(headers: &HeaderMap, max_file_size: u64) -> AppResult<()> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    match declared {
        Some(len) if len > max_file_size.saturating_add(MULTIPART_OVERHEAD) => Err(AppError::PayloadTooLarge),
        _ => Ok(()),
    }
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::bad_request(format!("Invalid multipart request: {}", err.body_text()))
    }
}

/// Finds the single `file` field, validates its name and streams it to disk.
async fn receive_file(settings: &Settings, multipart: &mut Multipart) -> AppResult<ReceivedFile> {
    let mut received: Option<ReceivedFile> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            while field.chunk().await.map_err(multipart_error)?.is_some() {}
            continue;
        }
        if received.is_some() {
            return Err(AppError::bad_request("Only one file per request"));
        }

        let file_name = validate_filename(field.file_name(), settings.allowed_extensions.as_ref())?;
        let artifact = TemporaryArtifact::create(&settings.upload_folder)
            .await
            .with_context(|| format!("failed to allocate scratch file in {}", settings.upload_folder.display()))?;
        stream_to_file(&mut field, &artifact, settings.max_file_size).await?;

        received = Some(ReceivedFile { artifact, file_name });
    }

    received.ok_or_else(|| AppError::bad_request("No file provided"))
}

/// Copies the field into the artifact chunk by chunk, enforcing the ceiling.
async fn stream_to_file(field: &mut Field<'_>, artifact: &TemporaryArtifact, max_file_size: u64) -> AppResult<u64> {
    let mut out = artifact.open_writer().await.context("failed to open scratch file")?;
    let mut written: u64 = 0;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        written = written.saturating_add(chunk.len() as u64);
        if written > max_file_size {
            return Err(AppError::PayloadTooLarge);
        }
        out.write_all(&chunk).await.context("failed to write upload to scratch file")?;
    }
    out.flush().await.context("failed to flush scratch file")?;

    Ok(written)
}

async fn forward(
    state: &AppState,
    upload: &ReceivedFile,
    uploader_ip: &str,
    received_at: DateTime<Utc>,
) -> AppResult<()> {
    let size = upload
        .artifact
        .size_on_disk()
        .await
        .context("failed to stat scratch file")?;
    let caption = build_caption(&upload.file_name, size, uploader_ip, received_at);

    let client = state.clients.get().await?;
    client
        .send_document(upload.artifact.path(), &upload.file_name, caption)
        .await?;

    log::info!(
        "📤 Forwarded {} ({} bytes) from {} to chat {}",
        upload.file_name,
        size,
        uploader_ip,
        client.destination().0
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|key| map.get(key).cloned()).0
    }

    fn with_header(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_authorize_without_secret_allows_everything() {
        let settings = settings(&[]);
        assert!(authorize(&settings, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_authorize_with_secret() {
        let settings = settings(&[("UPLOAD_SECRET", "hunter2")]);

        assert!(authorize(&settings, &with_header(SECRET_HEADER, "hunter2")).is_ok());
        assert!(matches!(
            authorize(&settings, &with_header(SECRET_HEADER, "hunter3")),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            authorize(&settings, &with_header(SECRET_HEADER, "hunter22")),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(authorize(&settings, &HeaderMap::new()), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_declared_oversize() {
        let limit = 1024;
        let over = (limit + MULTIPART_OVERHEAD + 1).to_string();
        let under = (limit + MULTIPART_OVERHEAD).to_string();

        assert!(matches!(
            reject_declared_oversize(&with_header("content-length", &over), limit),
            Err(AppError::PayloadTooLarge)
        ));
        assert!(reject_declared_oversize(&with_header("content-length", &under), limit).is_ok());
        assert!(reject_declared_oversize(&HeaderMap::new(), limit).is_ok());
    }
}
