//! notedrop — saves Telegram messages as Markdown notes on a WebDAV share.
//!
//! One incoming message flows through: access gate → attachment staging →
//! optional audio transcription → note composition → date-partitioned
//! commit → reply. Each message is processed independently; the only
//! shared mutable state is the authorized-sender set.

pub mod auth;
pub mod channels;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod storage;
