//! Storage committer — writes one note and its attachments as a single
//! logical unit under a date-partitioned root.
//!
//! Write order invariant: every attachment is written before the note, so
//! a committed note never references data that is not there yet. If any
//! attachment write fails the note is never attempted; the degraded state
//! on failure is "data written, note missing".

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::pipeline::composer::NoteDocument;
use crate::storage::RemoteStore;

pub struct Committer {
    store: Arc<dyn RemoteStore>,
    root: String,
    timeout: Duration,
}

impl Committer {
    pub fn new(store: Arc<dyn RemoteStore>, root: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            root: root.into(),
            timeout,
        }
    }

    /// Commit the document and return the note's remote path on full
    /// success. Same-second commits land on the same path (last write
    /// wins); callers wanting distinct paths must supply distinct times.
    pub async fn commit(
        &self,
        doc: &NoteDocument,
        now: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let date_folder = format!("{}/{}", self.root, now.format("%Y-%m-%d"));
        let data_folder = format!("{date_folder}/data");
        let note_path = format!("{date_folder}/note_{}.md", now.format("%H%M%S"));

        self.ensure_dir(&date_folder).await?;
        self.ensure_dir(&data_folder).await?;

        for attachment in &doc.attachments {
            let path = format!("{data_folder}/{}", attachment.rel_path);
            self.put(&path, &attachment.bytes).await?;
        }

        self.put(&note_path, doc.body.as_bytes()).await?;
        Ok(note_path)
    }

    async fn ensure_dir(&self, path: &str) -> Result<(), StorageError> {
        tokio::time::timeout(self.timeout, self.store.ensure_dir(path))
            .await
            .map_err(|_| StorageError::Timeout {
                path: path.to_string(),
            })?
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        tokio::time::timeout(self.timeout, self.store.put(path, bytes))
            .await
            .map_err(|_| StorageError::Timeout {
                path: path.to_string(),
            })?
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::pipeline::types::{MediaKind, StagedAttachment};

    /// In-memory store that records the order of operations.
    #[derive(Default)]
    struct MemoryStore {
        ops: Mutex<Vec<String>>,
        files: Mutex<HashMap<String, Vec<u8>>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl RemoteStore for MemoryStore {
        async fn ensure_dir(&self, path: &str) -> Result<(), StorageError> {
            self.ops.lock().unwrap().push(format!("mkdir {path}"));
            Ok(())
        }

        async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
            if self.fail_on.as_deref() == Some(path) {
                return Err(StorageError::Put {
                    path: path.to_string(),
                    reason: "injected failure".into(),
                });
            }
            self.ops.lock().unwrap().push(format!("put {path}"));
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), bytes.to_vec());
            Ok(())
        }
    }

    fn attachment(rel_path: &str) -> StagedAttachment {
        StagedAttachment {
            rel_path: rel_path.into(),
            bytes: vec![0xAB],
            kind: MediaKind::Photo,
            file_name: None,
            mime: None,
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 21, 15, 30, 45).unwrap()
    }

    fn committer(store: Arc<MemoryStore>) -> Committer {
        Committer::new(store, "/notes", Duration::from_secs(1))
    }

    #[tokio::test]
    async fn note_path_is_date_partitioned() {
        let store = Arc::new(MemoryStore::default());
        let doc = NoteDocument {
            body: "hello".into(),
            attachments: vec![],
        };
        let path = committer(Arc::clone(&store))
            .commit(&doc, fixed_time())
            .await
            .unwrap();
        assert_eq!(path, "/notes/2024-05-21/note_153045.md");
        assert_eq!(
            store.files.lock().unwrap().get(&path).unwrap(),
            b"hello"
        );
    }

    #[tokio::test]
    async fn attachments_are_written_before_the_note() {
        let store = Arc::new(MemoryStore::default());
        let doc = NoteDocument {
            body: "body".into(),
            attachments: vec![attachment("a.jpg"), attachment("b.jpg")],
        };
        committer(Arc::clone(&store))
            .commit(&doc, fixed_time())
            .await
            .unwrap();

        let ops = store.ops.lock().unwrap().clone();
        assert_eq!(
            ops,
            vec![
                "mkdir /notes/2024-05-21",
                "mkdir /notes/2024-05-21/data",
                "put /notes/2024-05-21/data/a.jpg",
                "put /notes/2024-05-21/data/b.jpg",
                "put /notes/2024-05-21/note_153045.md",
            ]
        );
    }

    #[tokio::test]
    async fn failed_attachment_blocks_the_note_write() {
        let store = Arc::new(MemoryStore {
            fail_on: Some("/notes/2024-05-21/data/b.jpg".into()),
            ..Default::default()
        });
        let doc = NoteDocument {
            body: "body".into(),
            attachments: vec![attachment("a.jpg"), attachment("b.jpg")],
        };
        let err = committer(Arc::clone(&store))
            .commit(&doc, fixed_time())
            .await
            .unwrap_err();

        // The error identifies the attachment, not the note.
        assert!(matches!(
            err,
            StorageError::Put { ref path, .. } if path == "/notes/2024-05-21/data/b.jpg"
        ));
        let files = store.files.lock().unwrap();
        assert!(files.contains_key("/notes/2024-05-21/data/a.jpg"));
        assert!(!files.contains_key("/notes/2024-05-21/note_153045.md"));
    }

    #[tokio::test]
    async fn midnight_rollover_uses_fixed_width_fields() {
        let store = Arc::new(MemoryStore::default());
        let doc = NoteDocument {
            body: String::new(),
            attachments: vec![],
        };
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let path = committer(store).commit(&doc, t).await.unwrap();
        assert_eq!(path, "/notes/2024-01-02/note_030405.md");
    }
}
