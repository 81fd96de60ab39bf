//! Transcriber adapter — turns audio bytes into text, best-effort.
//!
//! Transcription is an enhancement, never a hard dependency: every failure
//! path (no API key, network error, bad response, timeout) yields `None`
//! and the note is composed without a transcript.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::TranscriptionConfig;
use crate::pipeline::types::Transcript;

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `audio`, using `mime_hint` to name the upload. Returns
    /// `None` on any failure or when transcription is disabled.
    async fn transcribe(&self, audio: &[u8], mime_hint: Option<&str>) -> Option<Transcript>;
}

/// Used when no API key is configured — always absent, never an error.
pub struct DisabledTranscriber;

#[async_trait]
impl Transcriber for DisabledTranscriber {
    async fn transcribe(&self, _audio: &[u8], _mime_hint: Option<&str>) -> Option<Transcript> {
        None
    }
}

/// Response body of `POST /audio/transcriptions`.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// OpenAI-compatible speech-to-text client.
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiTranscriber {
    pub fn new(config: TranscriptionConfig, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
            timeout,
        }
    }

    async fn call(&self, audio: &[u8], mime_hint: Option<&str>) -> anyhow::Result<String> {
        let file_name = upload_name(mime_hint);
        let mut part = reqwest::multipart::Part::bytes(audio.to_vec()).file_name(file_name);
        if let Some(mime) = mime_hint {
            part = part.mime_str(mime)?;
        }
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let resp = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("transcription API returned {status}: {body}");
        }

        let parsed: TranscriptionResponse = resp.json().await?;
        Ok(parsed.text)
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, audio: &[u8], mime_hint: Option<&str>) -> Option<Transcript> {
        let result = tokio::time::timeout(self.timeout, self.call(audio, mime_hint)).await;
        match result {
            Ok(Ok(text)) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    None
                } else {
                    Some(Transcript { text })
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Transcription failed; saving note without transcript");
                None
            }
            Err(_) => {
                tracing::warn!("Transcription timed out; saving note without transcript");
                None
            }
        }
    }
}

/// Multipart upload file name, derived from the MIME hint.
fn upload_name(mime_hint: Option<&str>) -> String {
    let ext = match mime_hint {
        Some("audio/ogg") => "ogg",
        Some("audio/mpeg") => "mp3",
        Some("audio/mp4") => "m4a",
        Some("audio/wav") | Some("audio/x-wav") => "wav",
        _ => "ogg",
    };
    format!("audio.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_transcriber_is_absent() {
        let t = DisabledTranscriber;
        assert!(t.transcribe(b"voice bytes", Some("audio/ogg")).await.is_none());
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_to_absent() {
        let t = OpenAiTranscriber::new(
            TranscriptionConfig {
                api_key: SecretString::from("sk-test"),
                // Reserved port, nothing listens here.
                base_url: "http://127.0.0.1:9/v1".into(),
                model: "gpt-4o-mini-transcribe".into(),
            },
            Duration::from_secs(2),
        );
        assert!(t.transcribe(b"voice bytes", Some("audio/ogg")).await.is_none());
    }

    #[test]
    fn upload_name_from_mime_hint() {
        assert_eq!(upload_name(Some("audio/mpeg")), "audio.mp3");
        assert_eq!(upload_name(Some("audio/ogg")), "audio.ogg");
        assert_eq!(upload_name(None), "audio.ogg");
        assert_eq!(upload_name(Some("application/weird")), "audio.ogg");
    }
}
