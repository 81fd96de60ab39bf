//! Telegram channel — long-polls the Bot API for updates.
//!
//! Converts raw updates into `IncomingMessage` and downloads attachment
//! bytes on behalf of the stager (`MediaFetcher`). Replies are plain-text
//! `sendMessage` calls — note paths contain underscores, which Markdown
//! parse mode would mangle.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{ChannelError, StageError};
use crate::pipeline::stager::MediaFetcher;
use crate::pipeline::types::{IncomingMessage, MediaKind, MediaRef};

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Back-off after a failed poll before retrying.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Stream of incoming messages produced by the poll loop.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

pub struct TelegramChannel {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "https://api.telegram.org/file/bot{}/{file_path}",
            self.bot_token.expose_secret()
        )
    }

    /// Spawn the long-poll loop and return the message stream.
    pub fn start(&self) -> MessageStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let bot_token = self.bot_token.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;
            tracing::info!("Telegram channel listening for messages...");

            loop {
                let url = format!(
                    "https://api.telegram.org/bot{}/getUpdates",
                    bot_token.expose_secret()
                );
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                if let Some(results) = data.get("result").and_then(serde_json::Value::as_array) {
                    for update in results {
                        if let Some(uid) =
                            update.get("update_id").and_then(serde_json::Value::as_i64)
                        {
                            offset = uid + 1;
                        }

                        let Some(message) = update.get("message") else {
                            continue;
                        };
                        let Some(incoming) = parse_message(message) else {
                            tracing::debug!("Skipping update without sender or chat");
                            continue;
                        };

                        if tx.send(incoming).is_err() {
                            tracing::info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });
        Box::pin(stream)
    }

    /// Send a plain-text reply into a chat.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage returned {status}: {err}"),
            });
        }
        Ok(())
    }
}

// ── Update parsing ──────────────────────────────────────────────────

/// Convert one Bot API message object into an `IncomingMessage`.
/// Returns `None` when the sender or chat cannot be determined.
fn parse_message(message: &serde_json::Value) -> Option<IncomingMessage> {
    let sender = message
        .get("from")
        .and_then(|f| f.get("id"))
        .and_then(serde_json::Value::as_i64)?;
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)?;

    let mut incoming = IncomingMessage::new(sender, chat_id);

    if let Some(text) = message.get("text").and_then(serde_json::Value::as_str) {
        incoming = incoming.with_text(text);
    }
    if let Some(caption) = message.get("caption").and_then(serde_json::Value::as_str) {
        incoming = incoming.with_caption(caption);
    }

    // Photos arrive as an array of sizes; keep only the largest (last).
    if let Some(photo) = message
        .get("photo")
        .and_then(serde_json::Value::as_array)
        .and_then(|sizes| sizes.last())
        && let Some(file_id) = photo.get("file_id").and_then(serde_json::Value::as_str)
    {
        incoming = incoming.with_media(MediaRef::new(file_id, MediaKind::Photo));
    }

    for (field, kind) in [
        ("video", MediaKind::Video),
        ("document", MediaKind::Document),
        ("audio", MediaKind::Audio),
        ("voice", MediaKind::Voice),
    ] {
        if let Some(obj) = message.get(field)
            && let Some(file_id) = obj.get("file_id").and_then(serde_json::Value::as_str)
        {
            let mut media = MediaRef::new(file_id, kind);
            if let Some(name) = obj.get("file_name").and_then(serde_json::Value::as_str) {
                media = media.with_file_name(name);
            }
            if let Some(mime) = obj.get("mime_type").and_then(serde_json::Value::as_str) {
                media = media.with_mime(mime);
            }
            incoming = incoming.with_media(media);
        }
    }

    Some(incoming)
}

// ── Media download ──────────────────────────────────────────────────

#[async_trait]
impl MediaFetcher for TelegramChannel {
    /// getFile resolves the file_id to a server path, which is then
    /// downloaded from the file endpoint.
    async fn fetch(&self, media: &MediaRef) -> Result<Vec<u8>, StageError> {
        let fetch_err = |reason: String| StageError::Fetch {
            file_id: media.file_id.clone(),
            reason,
        };

        let resp = self
            .client
            .post(self.api_url("getFile"))
            .json(&serde_json::json!({ "file_id": media.file_id }))
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        let file_path = data
            .get("result")
            .and_then(|r| r.get("file_path"))
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| fetch_err("getFile response had no file_path".into()))?;

        let resp = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(fetch_err(format!("download returned {}", resp.status())));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
