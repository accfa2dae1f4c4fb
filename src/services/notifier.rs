use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;

use crate::error::SourceError;

/// Outbound operator notifications. Best-effort: callers log failures but
/// never roll back state because a message did not go out.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), SourceError>;
}

/// Sends messages into the configured Telegram group chat.
pub struct TelegramNotifier {
    client: reqwest::Client,
    token: Secret<String>,
    chat_id: i64,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(
        client: reqwest::Client,
        token: Secret<String>,
        chat_id: i64,
        base_url: String,
    ) -> Self {
        Self {
            client,
            token,
            chat_id,
            base_url,
        }
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), SourceError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.base_url,
            self.token.expose_secret()
        );

        self.client
            .post(&url)
            .json(&SendMessage {
                chat_id: self.chat_id,
                text,
                parse_mode: "HTML",
            })
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
