//! The uniform backend surface: one trait, three engines behind it.

use crate::error::BackendError;
use crate::key::ObjectKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifies which storage engine serves a backend root.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Provider {
    Filesystem,
    AwsS3,
    Gcloud,
}

/// Overwrite discipline for [`StorageBackend::put`] and
/// [`StorageBackend::write_bytes`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum WriteMode {
    /// Fail with [`BackendError::DuplicateKey`] when the key already holds an
    /// object. Nothing is ever silently replaced.
    #[default]
    Create,
    /// Replace whatever the key currently holds.
    Overwrite,
}

/// Descriptor of an object confirmed written to a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
}

/// Uniform object-store surface over a single configured root.
///
/// Implementations are handed out as `Arc<dyn StorageBackend>` by
/// [`crate::BackendConfig::connect`], which also performs the fail-fast root
/// validation. From the caller's perspective every operation is atomic: a
/// failed `put` leaves no observable object behind.
#[async_trait]
pub trait StorageBackend: fmt::Debug + Send + Sync {
    /// Engine variant serving this root.
    fn provider(&self) -> Provider;

    /// Human-readable root identity (directory path or bucket name).
    fn root(&self) -> &str;

    /// Uploads the local file at `local_path` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::DuplicateKey`] when `mode` is
    /// [`WriteMode::Create`] and the key is already taken, [`BackendError::Io`]
    /// when the local file cannot be read, and [`BackendError::Unavailable`]
    /// when a remote root cannot be reached.
    async fn put(
        &self,
        key: &ObjectKey,
        local_path: &Path,
        mode: WriteMode,
    ) -> Result<StoredObject, BackendError>;

    /// Downloads the object under `key` into `dest_dir`, returning the local
    /// path it was written to. The file lands atomically; partially
    /// downloaded objects are never observable.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ObjectNotFound`] when the key holds no object.
    async fn get(&self, key: &ObjectKey, dest_dir: &Path) -> Result<PathBuf, BackendError>;

    /// Whether an object exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the check itself cannot be performed, never
    /// for a missing object.
    async fn exists(&self, key: &ObjectKey) -> Result<bool, BackendError>;

    /// Keys currently stored under `prefix`, sorted lexicographically.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidKey`] for a malformed prefix and
    /// [`BackendError::Unavailable`] when a remote root cannot be reached.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, BackendError>;

    /// Reads a whole object into memory.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::ObjectNotFound`] when the key holds no object.
    async fn read_bytes(&self, key: &ObjectKey) -> Result<Vec<u8>, BackendError>;

    /// Writes a whole object from memory, honoring the same overwrite
    /// discipline as [`StorageBackend::put`].
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::DuplicateKey`] when `mode` is
    /// [`WriteMode::Create`] and the key is already taken.
    async fn write_bytes(
        &self,
        key: &ObjectKey,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<(), BackendError>;
}
