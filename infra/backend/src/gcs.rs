//! Google Cloud Storage engine over the JSON API.
//!
//! Objects are addressed through `storage/v1` resource URLs with the key
//! percent-encoded as a single path segment; uploads go through the
//! `uploadType=media` endpoint. Credentials are an explicit pre-issued OAuth2
//! bearer token. The bucket must already exist and is probed once at
//! construction, never created.

use crate::atomic;
use crate::backend::{Provider, StorageBackend, StoredObject, WriteMode};
use crate::error::{BackendError, BackendErrorExt};
use crate::key::{self, ObjectKey};
use crate::net;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use tokio::fs;
use tracing::{debug, info};

/// Public endpoint of the production JSON API. Overridable in configuration
/// for emulators and tests.
pub const GCS_ENDPOINT: &str = "https://storage.googleapis.com";

#[derive(Debug)]
pub struct GcsBackend {
    client: Client,
    endpoint: Url,
    bucket: String,
    tmp_counter: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectEntry>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    name: String,
}

impl GcsBackend {
    /// Connects to an existing Google Cloud Storage bucket.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Configuration`] for empty or malformed
    /// configuration values and when the bucket does not exist, and
    /// [`BackendError::Unavailable`] when the API cannot be reached or
    /// rejects the token.
    pub async fn connect(
        project_id: String,
        bucket: String,
        token: String,
        endpoint: String,
    ) -> Result<Self, BackendError> {
        if project_id.is_empty() {
            return Err(BackendError::Configuration {
                message: "Project id cannot be empty".into(),
                context: None,
            });
        }
        if bucket.is_empty() {
            return Err(BackendError::Configuration {
                message: "Bucket name cannot be empty".into(),
                context: None,
            });
        }
        if token.is_empty() {
            return Err(BackendError::Configuration {
                message: "Access token cannot be empty".into(),
                context: None,
            });
        }

        let endpoint = Url::parse(&endpoint).map_err(|err| BackendError::Configuration {
            message: format!("Invalid API endpoint {endpoint}: {err}").into(),
            context: None,
        })?;

        let client = net::bearer_client(&token)?;
        let backend = Self { client, endpoint, bucket, tmp_counter: AtomicU64::new(1) };

        backend.check_bucket().await?;
        info!(project = %project_id, bucket = %backend.bucket, "Connected to Cloud Storage bucket");
        Ok(backend)
    }

    async fn check_bucket(&self) -> Result<(), BackendError> {
        let url = self.api_url(&["storage", "v1", "b", &self.bucket])?;
        let response = net::send_with_retry(self.client.get(url)).await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(BackendError::Configuration {
                message: format!("Bucket does not exist: {}", self.bucket).into(),
                context: Some("Buckets are provisioned out of band, never created here".into()),
            }),
            _ => Err(net::fail_status(response, format!("Bucket probe failed: {}", self.bucket))),
        }
    }

    /// Joins path segments onto the endpoint. A segment containing `/` (an
    /// object key) is percent-encoded into a single segment, which is exactly
    /// what the JSON API expects for object resources.
    fn api_url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.endpoint.clone();
        {
            let mut parts = url.path_segments_mut().map_err(|()| BackendError::Configuration {
                message: format!("Endpoint cannot host API paths: {}", self.endpoint).into(),
                context: None,
            })?;
            parts.pop_if_empty();
            parts.extend(segments);
        }
        Ok(url)
    }

    fn object_url(&self, key: &ObjectKey) -> Result<Url, BackendError> {
        self.api_url(&["storage", "v1", "b", &self.bucket, "o", key.as_str()])
    }
}

#[async_trait]
impl StorageBackend for GcsBackend {
    fn provider(&self) -> Provider {
        Provider::Gcloud
    }

    fn root(&self) -> &str {
        &self.bucket
    }

    async fn put(
        &self,
        key: &ObjectKey,
        local_path: &Path,
        mode: WriteMode,
    ) -> Result<StoredObject, BackendError> {
        let data = fs::read(local_path)
            .await
            .context(format!("Failed to read local file: {}", local_path.display()))?;
        let size = data.len() as u64;

        self.write_bytes(key, &data, mode).await?;
        Ok(StoredObject { key: key.as_str().to_owned(), size })
    }

    async fn get(&self, key: &ObjectKey, dest_dir: &Path) -> Result<PathBuf, BackendError> {
        let data = self.read_bytes(key).await?;
        let dest = dest_dir.join(key.file_name());
        atomic::write_swap(&dest, &data, &self.tmp_counter).await?;

        debug!(key = %key, path = %dest.display(), "Object downloaded");
        Ok(dest)
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, BackendError> {
        let url = self.object_url(key)?;
        let response = net::send_with_retry(self.client.get(url)).await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(net::fail_status(response, format!("Existence check failed for key {key}"))),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        key::validate_prefix(prefix)?;

        let mut url = self.api_url(&["storage", "v1", "b", &self.bucket, "o"])?;
        url.query_pairs_mut().append_pair("prefix", prefix);

        let response = net::send_with_retry(self.client.get(url)).await?;
        if !response.status().is_success() {
            return Err(net::fail_status(response, "Bucket listing failed"));
        }

        let listing: ObjectList =
            response.json().await.context("Malformed bucket listing response")?;
        let mut keys: Vec<String> = listing.items.into_iter().map(|entry| entry.name).collect();
        keys.sort();
        Ok(keys)
    }

    async fn read_bytes(&self, key: &ObjectKey) -> Result<Vec<u8>, BackendError> {
        let mut url = self.object_url(key)?;
        url.query_pairs_mut().append_pair("alt", "media");

        let response = net::send_with_retry(self.client.get(url)).await?;
        match response.status() {
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .context(format!("Failed to read object body for key {key}"))?;
                Ok(bytes.to_vec())
            },
            StatusCode::NOT_FOUND => Err(BackendError::ObjectNotFound {
                message: key.as_str().to_owned().into(),
                context: None,
            }),
            _ => Err(net::fail_status(response, format!("Download failed for key {key}"))),
        }
    }

    async fn write_bytes(
        &self,
        key: &ObjectKey,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<(), BackendError> {
        if mode == WriteMode::Create && self.exists(key).await? {
            return Err(BackendError::DuplicateKey {
                message: key.as_str().to_owned().into(),
                context: None,
            });
        }

        let mut url = self.api_url(&["upload", "storage", "v1", "b", &self.bucket, "o"])?;
        url.query_pairs_mut().append_pair("uploadType", "media").append_pair("name", key.as_str());

        let response = net::send_with_retry(self.client.post(url).body(data.to_vec())).await?;
        response.error_for_status().context(format!("Upload rejected for key {key}"))?;

        debug!(key = %key, size = data.len(), "Object uploaded");
        Ok(())
    }
}
