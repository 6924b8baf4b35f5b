//! S3-compatible bucket engine speaking the path-style REST dialect.
//!
//! Authentication uses a pre-issued bearer token handed in through explicit
//! configuration; request signing is the gateway's concern. The bucket must
//! already exist and is probed once at construction, never created.

use crate::atomic;
use crate::backend::{Provider, StorageBackend, StoredObject, WriteMode};
use crate::error::{BackendError, BackendErrorExt};
use crate::key::{self, ObjectKey};
use crate::net;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use tokio::fs;
use tracing::{debug, info};

#[derive(Debug)]
pub struct S3Backend {
    client: Client,
    endpoint: Url,
    bucket: String,
    tmp_counter: AtomicU64,
}

impl S3Backend {
    /// Connects to an existing bucket behind an S3-compatible endpoint.
    ///
    /// The bucket is probed with bounded retry before the handle is returned.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Configuration`] for an empty or malformed
    /// endpoint, bucket, or token, and when the bucket does not exist.
    /// Returns [`BackendError::Unavailable`] when the endpoint cannot be
    /// reached or rejects the credentials.
    pub async fn connect(
        endpoint: String,
        bucket: String,
        token: String,
    ) -> Result<Self, BackendError> {
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
            message: format!("Invalid bucket endpoint {endpoint}: {err}").into(),
            context: None,
        })?;

        let client = net::bearer_client(&token)?;
        let backend = Self { client, endpoint, bucket, tmp_counter: AtomicU64::new(1) };

        backend.check_bucket().await?;
        info!(bucket = %backend.bucket, "Connected to S3-compatible bucket");
        Ok(backend)
    }

    async fn check_bucket(&self) -> Result<(), BackendError> {
        let url = self.bucket_url()?;
        let response = net::send_with_retry(self.client.head(url)).await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(BackendError::Configuration {
                message: format!("Bucket does not exist: {}", self.bucket).into(),
                context: Some("Buckets are provisioned out of band, never created here".into()),
            }),
            _ => Err(net::fail_status(response, format!("Bucket probe failed: {}", self.bucket))),
        }
    }

    fn bucket_url(&self) -> Result<Url, BackendError> {
        self.url_for(None)
    }

    fn object_url(&self, key: &ObjectKey) -> Result<Url, BackendError> {
        self.url_for(Some(key.as_str()))
    }

    fn url_for(&self, key: Option<&str>) -> Result<Url, BackendError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments =
                url.path_segments_mut().map_err(|()| BackendError::Configuration {
                    message: format!("Endpoint cannot host bucket paths: {}", self.endpoint).into(),
                    context: None,
                })?;
            segments.pop_if_empty();
            segments.push(&self.bucket);
            if let Some(key) = key {
                segments.extend(key.split('/'));
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn provider(&self) -> Provider {
        Provider::AwsS3
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
        let response = net::send_with_retry(self.client.head(url)).await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(net::fail_status(response, format!("Existence check failed for key {key}"))),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        key::validate_prefix(prefix)?;

        let mut url = self.bucket_url()?;
        url.query_pairs_mut().append_pair("list-type", "2").append_pair("prefix", prefix);

        let response = net::send_with_retry(self.client.get(url)).await?;
        if !response.status().is_success() {
            return Err(net::fail_status(response, "Bucket listing failed"));
        }

        let body = response.text().await.context("Failed to read bucket listing")?;
        let mut keys = extract_keys(&body);
        keys.sort();
        Ok(keys)
    }

    async fn read_bytes(&self, key: &ObjectKey) -> Result<Vec<u8>, BackendError> {
        let url = self.object_url(key)?;
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

        let url = self.object_url(key)?;
        let response = net::send_with_retry(self.client.put(url).body(data.to_vec())).await?;
        response.error_for_status().context(format!("Upload rejected for key {key}"))?;

        debug!(key = %key, size = data.len(), "Object uploaded");
        Ok(())
    }
}

/// Pulls `<Key>` values out of a ListObjectsV2 response. The response is flat
/// and validated keys cannot contain markup, so a full XML stack would be
/// dead weight here.
fn extract_keys(body: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut rest = body;

    while let Some(start) = rest.find("<Key>") {
        rest = &rest[start + "<Key>".len()..];
        let Some(end) = rest.find("</Key>") else { break };
        keys.push(rest[..end].to_owned());
        rest = &rest[end + "</Key>".len()..];
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::extract_keys;

    #[test]
    fn test_extract_keys_from_listing() {
        let body = "<?xml version=\"1.0\"?><ListBucketResult>\
            <Contents><Key>registry/demo/1.mdarc</Key><Size>10</Size></Contents>\
            <Contents><Key>registry/demo/index.json</Key><Size>2</Size></Contents>\
            </ListBucketResult>";

        let keys = extract_keys(body);
        assert_eq!(keys, vec!["registry/demo/1.mdarc", "registry/demo/index.json"]);
    }

    #[test]
    fn test_extract_keys_handles_empty_and_truncated() {
        assert!(extract_keys("<ListBucketResult></ListBucketResult>").is_empty());
        assert!(extract_keys("<Key>half-open").is_empty());
    }
}
