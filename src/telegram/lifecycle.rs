//! Lazy, process-wide forwarding client
//!
//! [`ClientCell`] constructs the forwarding client on first use and hands the
//! same instance to every later caller. Construction is guarded so concurrent
//! first requests trigger exactly one handshake. The guard is held only for
//! the check-and-construct step; sends run concurrently on clones of the
//! cached client.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use teloxide::types::ChatId;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::core::config::Settings;
use crate::core::error::AppError;
use crate::telegram::client::{Connector, DocumentSender, ForwardError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Settings cannot produce credentials; nothing was attempted
    #[error("configuration invalid: {}", .0.join("; "))]
    ConfigInvalid(Vec<String>),

    /// Credentials were fine but the handshake failed
    #[error("client construction failed: {0}")]
    Connect(#[from] ForwardError),
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::ConfigInvalid(problems) => AppError::ConfigInvalid(problems),
            LifecycleError::Connect(e) => AppError::Upstream(e),
        }
    }
}

/// Authenticated client bound to the configured destination chat.
#[derive(Clone)]
pub struct ForwardingClient {
    sender: Arc<dyn DocumentSender>,
    destination: ChatId,
}

impl ForwardingClient {
    pub fn destination(&self) -> ChatId {
        self.destination
    }

    /// Sends `path` to the destination chat as a document named `file_name`.
    pub async fn send_document(&self, path: &Path, file_name: &str, caption: String) -> Result<(), ForwardError> {
        self.sender
            .send_document(self.destination, path, file_name, caption)
            .await
    }

    /// True when both handles share one underlying session.
    pub fn same_session(&self, other: &ForwardingClient) -> bool {
        Arc::ptr_eq(&self.sender, &other.sender)
    }
}

pub struct ClientCell {
    settings: Arc<Settings>,
    connector: Arc<dyn Connector>,
    client: OnceCell<ForwardingClient>,
    init_lock: Mutex<()>,
}

impl ClientCell {
    pub fn new(settings: Arc<Settings>, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
            client: OnceCell::new(),
            init_lock: Mutex::new(()),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.client.get().is_some()
    }

    /// Returns the shared client, constructing it on first call.
    ///
    /// Failures are not cached. With the immutable settings snapshot an
    /// invalid configuration fails every call with the same problems.
    pub async fn get(&self) -> Result<ForwardingClient, LifecycleError> {
        if let Some(client) = self.client.get() {
            return Ok(client.clone());
        }

        let _guard = self.init_lock.lock().await;
        if let Some(client) = self.client.get() {
            return Ok(client.clone());
        }

        let credentials = self
            .settings
            .telegram_credentials()
            .map_err(LifecycleError::ConfigInvalid)?;
        let sender = self.connector.connect(&credentials).await?;
        let client = self.client.get_or_init(|| ForwardingClient {
            sender,
            destination: credentials.chat_id,
        });

        log::info!("Telegram forwarding client ready (destination chat {})", client.destination.0);
        Ok(client.clone())
    }
}
