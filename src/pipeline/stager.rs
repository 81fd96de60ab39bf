//! Attachment stager — fetches each media reference and assigns it a
//! stable storage name.
//!
//! Staging is all-or-nothing: a single failed fetch aborts the whole
//! message rather than saving a note with silent gaps. The stager never
//! writes anywhere — the committer owns all storage writes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StageError;
use crate::pipeline::types::{MediaRef, StagedAttachment};

/// Retrieves the raw bytes behind a `MediaRef`. Implemented by the
/// Telegram channel; tests inject fakes.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, media: &MediaRef) -> Result<Vec<u8>, StageError>;
}

pub struct AttachmentStager {
    fetcher: Arc<dyn MediaFetcher>,
    timeout: Duration,
}

impl AttachmentStager {
    pub fn new(fetcher: Arc<dyn MediaFetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Fetch every reference, order-preserving, one output per input.
    pub async fn stage(&self, refs: &[MediaRef]) -> Result<Vec<StagedAttachment>, StageError> {
        let mut staged = Vec::with_capacity(refs.len());
        for media in refs {
            let bytes = tokio::time::timeout(self.timeout, self.fetcher.fetch(media))
                .await
                .map_err(|_| StageError::Timeout {
                    file_id: media.file_id.clone(),
                })??;
            tracing::debug!(
                file_id = %media.file_id,
                size = bytes.len(),
                "Staged attachment"
            );
            staged.push(StagedAttachment {
                rel_path: storage_name(media),
                bytes,
                kind: media.kind,
                file_name: media.file_name.clone(),
                mime: media.mime.clone(),
            });
        }
        Ok(staged)
    }
}

/// Storage name for a media reference: `<file_id>.<ext>`.
///
/// The file_id is provider-assigned and collision-resistant; the extension
/// comes from the original file name, then the MIME type, then the kind's
/// default.
pub fn storage_name(media: &MediaRef) -> String {
    format!("{}.{}", media.file_id, infer_extension(media))
}

fn infer_extension(media: &MediaRef) -> String {
    if let Some(name) = &media.file_name
        && let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str())
        && !ext.is_empty()
    {
        return ext.to_ascii_lowercase();
    }
    if let Some(ext) = media.mime.as_deref().and_then(extension_from_mime) {
        return ext.to_string();
    }
    media.kind.default_extension().to_string()
}

/// Map common MIME subtypes to file extensions.
fn extension_from_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "audio/mpeg" => Some("mp3"),
        "audio/ogg" => Some("ogg"),
        "audio/mp4" => Some("m4a"),
        "audio/wav" | "audio/x-wav" => Some("wav"),
        "application/pdf" => Some("pdf"),
        "text/plain" => Some("txt"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::pipeline::types::MediaKind;

    struct MapFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaFetcher for MapFetcher {
        async fn fetch(&self, media: &MediaRef) -> Result<Vec<u8>, StageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if media.file_id == "broken" {
                return Err(StageError::Fetch {
                    file_id: media.file_id.clone(),
                    reason: "404".into(),
                });
            }
            Ok(media.file_id.as_bytes().to_vec())
        }
    }

    fn stager(fetcher: Arc<MapFetcher>) -> AttachmentStager {
        AttachmentStager::new(fetcher, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn stage_preserves_order() {
        let fetcher = Arc::new(MapFetcher {
            calls: AtomicUsize::new(0),
        });
        let refs = vec![
            MediaRef::new("a", MediaKind::Photo),
            MediaRef::new("b", MediaKind::Voice),
            MediaRef::new("c", MediaKind::Document),
        ];
        let staged = stager(Arc::clone(&fetcher)).stage(&refs).await.unwrap();
        let names: Vec<&str> = staged.iter().map(|s| s.rel_path.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.ogg", "c.bin"]);
        assert_eq!(staged[0].bytes, b"a");
    }

    #[tokio::test]
    async fn failed_fetch_aborts_whole_stage() {
        let fetcher = Arc::new(MapFetcher {
            calls: AtomicUsize::new(0),
        });
        let refs = vec![
            MediaRef::new("a", MediaKind::Photo),
            MediaRef::new("broken", MediaKind::Photo),
            MediaRef::new("c", MediaKind::Photo),
        ];
        let err = stager(Arc::clone(&fetcher))
            .stage(&refs)
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Fetch { ref file_id, .. } if file_id == "broken"));
        // The failing fetch stops the run; "c" is never attempted.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_input_stages_nothing() {
        let fetcher = Arc::new(MapFetcher {
            calls: AtomicUsize::new(0),
        });
        let staged = stager(Arc::clone(&fetcher)).stage(&[]).await.unwrap();
        assert!(staged.is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn storage_name_uses_file_name_extension_first() {
        let media = MediaRef::new("id1", MediaKind::Document)
            .with_file_name("Notes.PDF")
            .with_mime("application/pdf");
        assert_eq!(storage_name(&media), "id1.pdf");
    }

    #[test]
    fn storage_name_falls_back_to_mime() {
        let media = MediaRef::new("id2", MediaKind::Document).with_mime("image/png");
        assert_eq!(storage_name(&media), "id2.png");
    }

    #[test]
    fn storage_name_falls_back_to_kind_default() {
        assert_eq!(
            storage_name(&MediaRef::new("id3", MediaKind::Voice)),
            "id3.ogg"
        );
        assert_eq!(
            storage_name(&MediaRef::new("id4", MediaKind::Document).with_mime("application/x-unknown")),
            "id4.bin"
        );
        assert_eq!(
            storage_name(&MediaRef::new("id5", MediaKind::Photo)),
            "id5.jpg"
        );
    }

    #[test]
    fn storage_name_ignores_extensionless_file_name() {
        let media = MediaRef::new("id6", MediaKind::Document).with_file_name("README");
        assert_eq!(storage_name(&media), "id6.bin");
    }
}
