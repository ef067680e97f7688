use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::TelegramConfig;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Telegram API rejected the message: {0}")]
    Rejected(String),
}

/// Outbound notification capability injected into the order engine.
///
/// Delivery is best-effort: callers log failures and carry on, so an
/// unreachable endpoint can never fail an order operation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotificationError>;
}

/// Sends messages to a Telegram chat through the Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            client,
            bot_token,
            chat_id,
        }
    }

    /// Builds a notifier from config when both credentials are present.
    pub fn from_config(cfg: &TelegramConfig) -> Option<Self> {
        match (&cfg.bot_token, &cfg.chat_id) {
            (Some(token), Some(chat_id)) => Some(Self::new(
                token.clone(),
                chat_id.clone(),
                Duration::from_secs(cfg.timeout_secs),
            )),
            _ => None,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotificationError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected(format!("{status}: {body}")));
        }
        debug!("telegram notification delivered");
        Ok(())
    }
}

/// Used when Telegram credentials are not configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotificationError> {
        debug!(text, "notification delivery disabled, dropping message");
        Ok(())
    }
}
