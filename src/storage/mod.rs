//! Remote storage — path-addressed writes and the date-partitioned commit.

pub mod committer;
pub mod webdav;

use async_trait::async_trait;

use crate::error::StorageError;

pub use committer::Committer;
pub use webdav::WebDavStore;

/// Path-addressed remote store. The pipeline only ever writes; listing and
/// reads are out of scope.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create a directory if it does not already exist.
    async fn ensure_dir(&self, path: &str) -> Result<(), StorageError>;

    /// Write `bytes` at `path`, overwriting any existing content.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;
}
