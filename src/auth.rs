//! Access gate — decides which senders may save notes.
//!
//! Authorization state is a flat set of sender IDs behind the `AuthStore`
//! trait. The production store keeps it in a JSON file that is loaded at
//! startup and rewritten on every grant; tests inject in-memory fakes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;

use crate::error::AuthError;

/// Opaque, stable sender identifier issued by the transport.
pub type UserId = i64;

/// Repository of authorized sender IDs.
///
/// `add` must be durable: it returns `Ok` only after the updated set has
/// been persisted. Adding an already-present ID is a no-op.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn contains(&self, user: UserId) -> Result<bool, AuthError>;
    async fn add(&self, user: UserId) -> Result<(), AuthError>;
}

/// On-disk JSON layout: `{"allowed": [123, 456]}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct AllowedFile {
    #[serde(default)]
    allowed: Vec<UserId>,
}

/// File-backed `AuthStore`.
///
/// The whole set lives in memory; the file is rewritten atomically enough
/// for a single process (read-modify-persist under one mutex).
pub struct FileAuthStore {
    path: PathBuf,
    users: Mutex<HashSet<UserId>>,
}

impl FileAuthStore {
    /// Load the store from `path`, creating an empty file if none exists.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let path = path.into();
        let users = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let parsed: AllowedFile = serde_json::from_str(&raw)
                    .map_err(|e| AuthError::Load(format!("{}: {e}", path.display())))?;
                parsed.allowed.into_iter().collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                write_file(&path, &HashSet::new()).await?;
                HashSet::new()
            }
            Err(e) => return Err(AuthError::Load(format!("{}: {e}", path.display()))),
        };
        Ok(Self {
            path,
            users: Mutex::new(users),
        })
    }
}

async fn write_file(path: &Path, users: &HashSet<UserId>) -> Result<(), AuthError> {
    let mut allowed: Vec<UserId> = users.iter().copied().collect();
    allowed.sort_unstable();
    let body = serde_json::to_string_pretty(&AllowedFile { allowed })
        .map_err(|e| AuthError::Persist(e.to_string()))?;
    tokio::fs::write(path, body)
        .await
        .map_err(|e| AuthError::Persist(format!("{}: {e}", path.display())))
}

#[async_trait]
impl AuthStore for FileAuthStore {
    async fn contains(&self, user: UserId) -> Result<bool, AuthError> {
        Ok(self.users.lock().await.contains(&user))
    }

    async fn add(&self, user: UserId) -> Result<(), AuthError> {
        let mut users = self.users.lock().await;
        if users.contains(&user) {
            return Ok(());
        }
        // Persist a candidate set first; memory is only updated once the
        // durable write succeeded.
        let mut candidate = users.clone();
        candidate.insert(user);
        write_file(&self.path, &candidate).await?;
        *users = candidate;
        Ok(())
    }
}

/// Decides whether a sender may proceed, and grants access on a correct
/// shared secret.
pub struct AccessGate {
    store: Arc<dyn AuthStore>,
    secret: SecretString,
}

impl AccessGate {
    pub fn new(store: Arc<dyn AuthStore>, secret: SecretString) -> Self {
        Self { store, secret }
    }

    /// Membership check; no side effects.
    pub async fn is_authorized(&self, user: UserId) -> Result<bool, AuthError> {
        self.store.contains(user).await
    }

    /// Compare `supplied` against the shared secret and grant access on a
    /// match. The comparison is constant-time; the grant is durable before
    /// `Ok(true)` is returned. A persistence failure surfaces as `Err` and
    /// the sender is not authorized.
    pub async fn try_authorize(&self, user: UserId, supplied: &str) -> Result<bool, AuthError> {
        let matches: bool = supplied
            .as_bytes()
            .ct_eq(self.secret.expose_secret().as_bytes())
            .into();
        if !matches {
            return Ok(false);
        }
        self.store.add(user).await?;
        Ok(true)
    }
}
