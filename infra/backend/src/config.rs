use crate::backend::StorageBackend;
use crate::error::BackendError;
use crate::filesystem::FileSystemBackend;
use crate::gcs::{GCS_ENDPOINT, GcsBackend};
use crate::s3::S3Backend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Declarative backend selection, resolved exactly once at startup.
///
/// The variant tag doubles as the provider name in configuration files and
/// environment overrides; credentials and endpoints are carried here
/// explicitly instead of being sniffed from the ambient environment at call
/// time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "kebab-case")]
pub enum BackendConfig {
    /// Local directory root. The directory itself must already exist.
    Filesystem { root: PathBuf },
    /// Bucket behind an S3-compatible endpoint.
    AwsS3 { endpoint: String, bucket: String, token: String },
    /// Google Cloud Storage bucket via the JSON API.
    Gcloud {
        project_id: String,
        bucket: String,
        token: String,
        #[serde(default = "default_gcs_endpoint")]
        endpoint: String,
    },
}

fn default_gcs_endpoint() -> String {
    GCS_ENDPOINT.to_owned()
}

impl BackendConfig {
    /// Validates the configuration and opens a live backend handle.
    ///
    /// Filesystem roots are checked for existence, bucket roots are probed
    /// for reachability; either way a broken deployment fails here, before
    /// any upload is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Configuration`] when validation fails and
    /// [`BackendError::Unavailable`] when a remote root cannot be reached.
    pub async fn connect(self) -> Result<Arc<dyn StorageBackend>, BackendError> {
        match self {
            Self::Filesystem { root } => Ok(Arc::new(FileSystemBackend::connect(root).await?)),
            Self::AwsS3 { endpoint, bucket, token } => {
                Ok(Arc::new(S3Backend::connect(endpoint, bucket, token).await?))
            },
            Self::Gcloud { project_id, bucket, token, endpoint } => {
                Ok(Arc::new(GcsBackend::connect(project_id, bucket, token, endpoint).await?))
            },
        }
    }
}
