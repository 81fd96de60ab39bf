//! Shared types for the note ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::UserId;

// ── Media classification ────────────────────────────────────────────

/// Content-type classification of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Document,
    Audio,
    Voice,
}

impl MediaKind {
    /// Voice memos and audio files are transcription candidates.
    pub fn is_audio(self) -> bool {
        matches!(self, Self::Audio | Self::Voice)
    }

    /// Photos and videos are embedded in the note body; everything else is
    /// referenced as a trailing link.
    pub fn is_embeddable(self) -> bool {
        matches!(self, Self::Photo | Self::Video)
    }

    /// Extension used when neither the file name nor the MIME type gives one.
    pub fn default_extension(self) -> &'static str {
        match self {
            Self::Photo => "jpg",
            Self::Video => "mp4",
            Self::Audio => "mp3",
            Self::Voice => "ogg",
            Self::Document => "bin",
        }
    }
}

// ── Inbound message ─────────────────────────────────────────────────

/// A remote-fetchable reference to media attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    /// Provider-assigned file identifier, globally unique per message.
    pub file_id: String,
    pub kind: MediaKind,
    /// Original file name, when the provider supplies one.
    pub file_name: Option<String>,
    /// MIME type hint, when the provider supplies one.
    pub mime: Option<String>,
}

impl MediaRef {
    pub fn new(file_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            file_id: file_id.into(),
            kind,
            file_name: None,
            mime: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// One unit of user input, immutable for the lifetime of a pipeline run.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Correlation ID for logging, generated at receipt.
    pub id: Uuid,
    /// Sender identity — the sole key into the access gate.
    pub sender: UserId,
    /// Conversation to reply into.
    pub chat_id: i64,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub media: Vec<MediaRef>,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(sender: UserId, chat_id: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            chat_id,
            text: None,
            caption: None,
            media: Vec::new(),
            received_at: Utc::now(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media.push(media);
        self
    }
}

// ── Staged attachment ───────────────────────────────────────────────

/// A fetched `MediaRef` with its bytes and assigned storage name.
///
/// Transient — lives for one pipeline run and is never cached.
#[derive(Debug, Clone)]
pub struct StagedAttachment {
    /// Relative name under the date folder's `data/` directory.
    pub rel_path: String,
    pub bytes: Vec<u8>,
    pub kind: MediaKind,
    pub file_name: Option<String>,
    pub mime: Option<String>,
}

impl StagedAttachment {
    /// Human-readable name used for link text.
    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(&self.rel_path)
    }
}

/// Text recognized from an audio attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
}
