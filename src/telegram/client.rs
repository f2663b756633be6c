//! Forwarding client seam over the Telegram Bot API
//!
//! [`Connector`] builds an authenticated [`DocumentSender`]; the production
//! implementations wrap `teloxide::Bot`. Tests plug in fakes at either trait.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use teloxide::RequestError;
use thiserror::Error;

use crate::core::config::TelegramCredentials;

/// Failure talking to the Bot API
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Flood control; Telegram asks us to wait
    #[error("rate limited by Telegram, retry after {}s", .0.as_secs())]
    RateLimited(Duration),

    /// Telegram answered with an error (bad token, kicked bot, chat not found, ...)
    #[error("Telegram API error: {0}")]
    Api(String),

    /// Transport failure before an answer arrived
    #[error("network error talking to Telegram: {0}")]
    Network(String),

    /// HTTP client could not be built
    #[error("failed to build Telegram client: {0}")]
    Setup(String),
}

impl From<RequestError> for ForwardError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::RetryAfter(seconds) => ForwardError::RateLimited(seconds.duration()),
            RequestError::Network(e) => ForwardError::Network(e.to_string()),
            other => ForwardError::Api(other.to_string()),
        }
    }
}

/// Sends a file from local disk as a document message.
#[async_trait]
pub trait DocumentSender: Send + Sync {
    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        file_name: &str,
        caption: String,
    ) -> Result<(), ForwardError>;
}

/// Builds an authenticated [`DocumentSender`] from credentials.
///
/// May perform network I/O (token handshake). Called at most once per
/// successful client lifetime.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, credentials: &TelegramCredentials) -> Result<Arc<dyn DocumentSender>, ForwardError>;
}

/// Production connector backed by `teloxide`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelegramConnector;

/// Creates a Bot with custom or default API URL and the configured timeout
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(ForwardError::Setup)` - HTTP client could not be built
pub fn create_bot(credentials: &TelegramCredentials) -> Result<Bot, ForwardError> {
    let client = ClientBuilder::new()
        .timeout(credentials.timeout)
        .build()
        .map_err(|e| ForwardError::Setup(e.to_string()))?;
    let bot = Bot::with_client(credentials.token.expose_secret(), client);

    Ok(match &credentials.api_url {
        Some(url) => {
            log::info!("Using custom Bot API URL: {}", url);
            bot.set_api_url(url.clone())
        }
        None => bot,
    })
}

#[async_trait]
impl Connector for TelegramConnector {
    async fn connect(&self, credentials: &TelegramCredentials) -> Result<Arc<dyn DocumentSender>, ForwardError> {
        let bot = create_bot(credentials)?;

        if credentials.verify_token {
            let me = bot.get_me().await?;
            log::info!(
                "Telegram token verified for bot id {} (@{})",
                me.user.id.0,
                me.user.username.as_deref().unwrap_or("?")
            );
        }

        Ok(Arc::new(TelegramSender { bot }))
    }
}

/// [`DocumentSender`] that uploads through `sendDocument`.
#[derive(Clone)]
pub struct TelegramSender {
    bot: Bot,
}

#[async_trait]
impl DocumentSender for TelegramSender {
    async fn send_document(
        &self,
        chat_id: ChatId,
        path: &Path,
        file_name: &str,
        caption: String,
    ) -> Result<(), ForwardError> {
        let document = InputFile::file(path.to_path_buf()).file_name(file_name.to_string());

        self.bot
            .send_document(chat_id, document)
            .disable_content_type_detection(true)
            .caption(caption)
            .await?;

        Ok(())
    }
}
