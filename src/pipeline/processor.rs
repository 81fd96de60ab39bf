//! Message processor — runs one incoming message through the full
//! pipeline and produces exactly one reply.
//!
//! Flow per message: gate → stage attachments → transcribe (optional) →
//! compose → commit → reply. Unauthorized senders are answered with the
//! access prompt and never reach staging, transcription, or storage.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::auth::AccessGate;
use crate::error::Error;
use crate::pipeline::composer::NoteDocument;
use crate::pipeline::stager::AttachmentStager;
use crate::pipeline::transcriber::Transcriber;
use crate::pipeline::types::{IncomingMessage, StagedAttachment, Transcript};
use crate::storage::Committer;

/// Prompt for senders who have not yet unlocked access.
pub const AUTH_PROMPT: &str =
    "You are not authorized yet. Send the access password to unlock note saving.";

/// Prompt after a wrong password attempt.
pub const AUTH_RETRY: &str = "That password is not correct. Try again.";

/// Confirmation once access has been granted.
pub const AUTH_GRANTED: &str =
    "Access granted. Send me a message and I will save it as a note.";

/// Reply to `/start` from a sender who already has access.
pub const ALREADY_AUTHORIZED: &str =
    "You are already authorized. Send me a message and I will save it as a note.";

/// Generic failure notice; the specific reason stays in the logs.
pub const FAILURE_NOTICE: &str =
    "Something went wrong while saving your note. Please try again later.";

pub struct MessageProcessor {
    gate: AccessGate,
    stager: AttachmentStager,
    transcriber: Arc<dyn Transcriber>,
    committer: Committer,
}

impl MessageProcessor {
    pub fn new(
        gate: AccessGate,
        stager: AttachmentStager,
        transcriber: Arc<dyn Transcriber>,
        committer: Committer,
    ) -> Self {
        Self {
            gate,
            stager,
            transcriber,
            committer,
        }
    }

    /// Process one message end to end. Always returns a reply — one of the
    /// access prompts, the saved-note confirmation, or the failure notice.
    pub async fn process(&self, message: IncomingMessage) -> String {
        let authorized = match self.gate.is_authorized(message.sender).await {
            Ok(a) => a,
            Err(e) => {
                error!(id = %message.id, sender = message.sender, error = %e, "Gate check failed");
                return FAILURE_NOTICE.to_string();
            }
        };

        if !authorized {
            return self.handle_unauthorized(&message).await;
        }

        if is_start_command(&message) {
            return ALREADY_AUTHORIZED.to_string();
        }

        match self.save_note(&message).await {
            Ok(note_path) => {
                info!(
                    id = %message.id,
                    sender = message.sender,
                    note_path = %note_path,
                    "Note saved"
                );
                format!("Saved: {note_path}")
            }
            Err(e) => {
                error!(id = %message.id, sender = message.sender, error = %e, "Failed to save note");
                FAILURE_NOTICE.to_string()
            }
        }
    }

    /// Treat the message text as a password attempt; `/start` and empty
    /// messages just get the prompt.
    async fn handle_unauthorized(&self, message: &IncomingMessage) -> String {
        let attempt = message.text.as_deref().unwrap_or("").trim();
        if attempt.is_empty() || is_start_command(message) {
            return AUTH_PROMPT.to_string();
        }

        match self.gate.try_authorize(message.sender, attempt).await {
            Ok(true) => {
                info!(sender = message.sender, "Access granted");
                AUTH_GRANTED.to_string()
            }
            Ok(false) => {
                warn!(sender = message.sender, "Wrong password attempt");
                AUTH_RETRY.to_string()
            }
            Err(e) => {
                // Correct secret but the grant did not persist — the sender
                // must not be told they are in.
                error!(sender = message.sender, error = %e, "Failed to persist authorization");
                FAILURE_NOTICE.to_string()
            }
        }
    }

    async fn save_note(&self, message: &IncomingMessage) -> Result<String, Error> {
        let staged = self.stager.stage(&message.media).await?;
        let transcript = self.transcribe_first_audio(&staged).await;
        let doc = NoteDocument::compose(
            message.text.as_deref(),
            message.caption.as_deref(),
            staged,
            transcript,
        );
        let note_path = self.committer.commit(&doc, Utc::now()).await?;
        Ok(note_path)
    }

    /// At most one transcription per message: the first voice/audio
    /// attachment, using the exact bytes that were staged.
    async fn transcribe_first_audio(&self, staged: &[StagedAttachment]) -> Option<Transcript> {
        let audio = staged.iter().find(|a| a.kind.is_audio())?;
        self.transcriber
            .transcribe(&audio.bytes, audio.mime.as_deref())
            .await
    }
}

fn is_start_command(message: &IncomingMessage) -> bool {
    message.text.as_deref().map(str::trim) == Some("/start")
}
