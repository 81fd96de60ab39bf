use std::sync::Arc;

use futures::StreamExt;

use notedrop::auth::{AccessGate, AuthStore, FileAuthStore};
use notedrop::channels::TelegramChannel;
use notedrop::config::AppConfig;
use notedrop::pipeline::stager::MediaFetcher;
use notedrop::pipeline::{
    AttachmentStager, DisabledTranscriber, MessageProcessor, OpenAiTranscriber, Transcriber,
};
use notedrop::storage::{Committer, RemoteStore, WebDavStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  Required: TELEGRAM_BOT_TOKEN, WEBDAV_URL, WEBDAV_USERNAME,");
        eprintln!("            WEBDAV_PASSWORD, NOTES_PASSWORD");
        std::process::exit(1);
    });

    eprintln!("📝 notedrop v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   WebDAV root: {}", config.webdav.root);
    eprintln!("   Users file:  {}", config.auth_file.display());

    // ── Access gate ─────────────────────────────────────────────────────
    let auth_store: Arc<dyn AuthStore> = Arc::new(
        FileAuthStore::load(config.auth_file.clone())
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }),
    );
    let gate = AccessGate::new(auth_store, config.shared_secret.clone());

    // ── Transport + stager ──────────────────────────────────────────────
    let channel = Arc::new(TelegramChannel::new(config.bot_token.clone()));
    let stager = AttachmentStager::new(
        Arc::clone(&channel) as Arc<dyn MediaFetcher>,
        config.call_timeout,
    );

    // ── Transcriber ─────────────────────────────────────────────────────
    let transcriber: Arc<dyn Transcriber> = match config.transcription.clone() {
        Some(tc) => {
            eprintln!("   Transcription: enabled ({})", tc.model);
            Arc::new(OpenAiTranscriber::new(tc, config.call_timeout))
        }
        None => {
            eprintln!("   Transcription: disabled (OPENAI_API_KEY not set)");
            Arc::new(DisabledTranscriber)
        }
    };

    // ── Storage ─────────────────────────────────────────────────────────
    let store: Arc<dyn RemoteStore> = Arc::new(WebDavStore::new(config.webdav.clone()));
    let committer = Committer::new(store, config.webdav.root.clone(), config.call_timeout);

    let processor = Arc::new(MessageProcessor::new(gate, stager, transcriber, committer));

    // ── Message loop ────────────────────────────────────────────────────
    // Each message is an independent unit of work; replies go back to the
    // originating chat.
    let mut messages = channel.start();
    while let Some(message) = messages.next().await {
        let processor = Arc::clone(&processor);
        let channel = Arc::clone(&channel);
        tokio::spawn(async move {
            let chat_id = message.chat_id;
            let id = message.id;
            let reply = processor.process(message).await;
            if let Err(e) = channel.send_message(chat_id, &reply).await {
                tracing::error!(id = %id, chat_id, error = %e, "Failed to send reply");
            }
        });
    }

    Ok(())
}
