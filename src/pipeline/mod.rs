//! Note ingestion pipeline — per-message sequence from gate to commit.

pub mod composer;
pub mod processor;
pub mod stager;
pub mod transcriber;
pub mod types;

pub use composer::NoteDocument;
pub use processor::MessageProcessor;
pub use stager::{AttachmentStager, MediaFetcher};
pub use transcriber::{DisabledTranscriber, OpenAiTranscriber, Transcriber};
pub use types::{IncomingMessage, MediaKind, MediaRef, StagedAttachment, Transcript};
