//! Configuration types.
//!
//! All configuration is read from the environment exactly once at startup
//! and passed into components by value. Nothing reads env vars after boot.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default remote root when `WEBDAV_ROOT` is unset.
const DEFAULT_ROOT: &str = "/notes";

/// Default OpenAI-compatible endpoint for audio transcription.
const DEFAULT_TRANSCRIBE_BASE_URL: &str = "https://api.openai.com/v1";

/// Default transcription model.
const DEFAULT_TRANSCRIBE_MODEL: &str = "gpt-4o-mini-transcribe";

/// Default bounded wait for each collaborator call (fetch, transcribe, put).
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 60;

/// Service configuration, built once from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Telegram bot token.
    pub bot_token: SecretString,
    /// WebDAV endpoint and credentials.
    pub webdav: WebDavConfig,
    /// Shared secret a new sender must supply to gain access.
    pub shared_secret: SecretString,
    /// Transcription settings; `None` disables transcription entirely.
    pub transcription: Option<TranscriptionConfig>,
    /// Path of the persisted authorized-user file.
    pub auth_file: PathBuf,
    /// Bounded wait applied to every outbound collaborator call.
    pub call_timeout: Duration,
}

/// WebDAV endpoint settings.
#[derive(Debug, Clone)]
pub struct WebDavConfig {
    pub url: String,
    pub username: String,
    pub password: SecretString,
    /// Remote root under which date folders are created.
    pub root: String,
}

/// Transcription backend settings (OpenAI-compatible API).
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
}

impl AppConfig {
    /// Build configuration from environment variables.
    ///
    /// Required: `TELEGRAM_BOT_TOKEN`, `WEBDAV_URL`, `WEBDAV_USERNAME`,
    /// `WEBDAV_PASSWORD`, `NOTES_PASSWORD`. Everything else has a default,
    /// and transcription is disabled when `OPENAI_API_KEY` is absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let webdav = WebDavConfig {
            url: required("WEBDAV_URL")?,
            username: required("WEBDAV_USERNAME")?,
            password: SecretString::from(required("WEBDAV_PASSWORD")?),
            root: normalize_root(
                &std::env::var("WEBDAV_ROOT").unwrap_or_else(|_| DEFAULT_ROOT.to_string()),
            ),
        };
        let shared_secret = required("NOTES_PASSWORD")?;

        let transcription = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|api_key| TranscriptionConfig {
                api_key: SecretString::from(api_key),
                base_url: std::env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_TRANSCRIBE_BASE_URL.to_string()),
                model: std::env::var("TRANSCRIBE_MODEL")
                    .unwrap_or_else(|_| DEFAULT_TRANSCRIBE_MODEL.to_string()),
            });

        let auth_file = std::env::var("ALLOWED_USERS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("allowed_users.json"));

        let call_timeout = match std::env::var("NOTEDROP_CALL_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 =
                    raw.parse()
                        .map_err(|_| ConfigError::InvalidValue {
                            key: "NOTEDROP_CALL_TIMEOUT_SECS".into(),
                            message: format!("expected an integer, got {raw:?}"),
                        })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        };

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            webdav,
            shared_secret: SecretString::from(shared_secret),
            transcription,
            auth_file,
            call_timeout,
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

/// Normalize the remote root: leading slash, no trailing slash.
fn normalize_root(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_ROOT.to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
