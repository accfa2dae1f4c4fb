use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use crate::services::pairing::{PairError, PairingService};
use crate::views;

const POLL_TIMEOUT_SECS: u32 = 30;

/// Long-polling loop receiving operator commands from the configured group
/// chat. This is the collaborator surface delivering commands to the pairing
/// service; everything it does beyond transport lives in [`PairingService`].
pub struct TelegramPoller {
    client: reqwest::Client,
    token: Secret<String>,
    chat_id: i64,
    base_url: String,
    pairing: Arc<PairingService>,
}

impl TelegramPoller {
    pub fn new(
        client: reqwest::Client,
        token: Secret<String>,
        chat_id: i64,
        base_url: String,
        pairing: Arc<PairingService>,
    ) -> Self {
        Self {
            client,
            token,
            chat_id,
            base_url,
            pairing,
        }
    }

    /// Runs until the task is cancelled. Poll failures are logged and retried
    /// after a short pause; a broken Telegram connection must not take the
    /// watch jobs down with it.
    pub async fn run(&self) {
        tracing::info!("Starting Telegram poll loop");
        let mut offset: i64 = 0;

        loop {
            match self.get_updates(offset).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        // Edited commands are handled like fresh ones.
                        let message = update.message.or(update.edited_message);
                        if let Some(message) = message {
                            self.dispatch(message).await;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Telegram poll failed");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn dispatch(&self, message: Message) {
        if message.chat.id != self.chat_id {
            tracing::debug!(chat_id = message.chat.id, "Ignoring message from foreign chat");
            return;
        }
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let Some((command, args)) = parse_command(text) else {
            return;
        };
        let operator = message
            .from
            .and_then(|u| u.username)
            .unwrap_or_else(|| "unknown".to_string());

        let reply = match command.as_str() {
            "start" => views::start_msg(),
            "help" => views::help_msg(),
            "pair" => match self.pairing.pair(&args, &operator).await {
                Ok(_) => "Okay, paired".to_string(),
                Err(e @ PairError::Store(_)) => {
                    tracing::error!(error = ?e, "Pairing failed in the store");
                    e.to_string()
                }
                Err(e) => format!("{e}. Please see /help"),
            },
            _ => return,
        };

        if let Err(e) = self.answer(&reply).await {
            tracing::error!(error = %e, "Failed to answer command");
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, reqwest::Error> {
        let url = format!(
            "{}/bot{}/getUpdates",
            self.base_url,
            self.token.expose_secret()
        );
        let response: UpdatesResponse = self
            .client
            .get(&url)
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
                ("allowed_updates", r#"["message","edited_message"]"#.to_string()),
            ])
            .timeout(Duration::from_secs(u64::from(POLL_TIMEOUT_SECS) + 10))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.result)
    }

    async fn answer(&self, text: &str) -> Result<(), reqwest::Error> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.base_url,
            self.token.expose_secret()
        );
        self.client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Splits `/pair 98765 daily jan` into `("pair", "98765 daily jan")`,
/// stripping an optional `@botname` suffix from the command.
fn parse_command(text: &str) -> Option<(String, String)> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let (command, args) = match rest.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim().to_string()),
        None => (rest, String::new()),
    };
    let command = command.split('@').next().unwrap_or(command);
    if command.is_empty() {
        return None;
    }
    Some((command.to_ascii_lowercase(), args))
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
    edited_message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pair_command() {
        assert_eq!(
            parse_command("/pair 98765 daily jan_novak"),
            Some(("pair".to_string(), "98765 daily jan_novak".to_string()))
        );
    }

    #[test]
    fn strips_bot_mention() {
        assert_eq!(
            parse_command("/pair@cashier_bot 98765 daily jan"),
            Some(("pair".to_string(), "98765 daily jan".to_string()))
        );
    }

    #[test]
    fn bare_command_has_empty_args() {
        assert_eq!(
            parse_command("/help"),
            Some(("help".to_string(), String::new()))
        );
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("hello there"), None);
        assert_eq!(parse_command("/"), None);
    }
}
