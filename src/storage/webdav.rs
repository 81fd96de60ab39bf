//! WebDAV remote store — MKCOL for directories, PUT for files.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};

use crate::config::WebDavConfig;
use crate::error::StorageError;
use crate::storage::RemoteStore;

pub struct WebDavStore {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: SecretString,
}

impl WebDavStore {
    pub fn new(config: WebDavConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username,
            password: config.password,
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url_for(path))
            .basic_auth(&self.username, Some(self.password.expose_secret()))
    }
}

#[async_trait]
impl RemoteStore for WebDavStore {
    async fn ensure_dir(&self, path: &str) -> Result<(), StorageError> {
        let method = Method::from_bytes(b"MKCOL").expect("MKCOL is a valid method token");
        let resp = self
            .request(method, path)
            .send()
            .await
            .map_err(|e| StorageError::Dir {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        // 405 means the collection already exists.
        if resp.status().is_success() || resp.status() == StatusCode::METHOD_NOT_ALLOWED {
            return Ok(());
        }
        Err(StorageError::Dir {
            path: path.to_string(),
            reason: format!("MKCOL returned {}", resp.status()),
        })
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let resp = self
            .request(Method::PUT, path)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::Put {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            return Ok(());
        }
        Err(StorageError::Put {
            path: path.to_string(),
            reason: format!("PUT returned {}", resp.status()),
        })
    }
}
