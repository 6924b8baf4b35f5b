//! Pluggable object-storage backends behind one uniform async interface.
//! A backend is selected once through explicit configuration and validated at
//! construction, so a misconfigured deployment fails before the first upload
//! rather than in the middle of one.
//!
//! # Core Features
//!
//! - **One trait, three engines**: [`StorageBackend`] over a local directory,
//!   an S3-compatible bucket, or a Google Cloud Storage bucket.
//! - **Fail-fast roots**: a filesystem root must pre-exist and buckets are
//!   probed at construction; neither is ever created implicitly.
//! - **Atomic writes**: the filesystem engine and all download paths use an
//!   "atomic swap" pattern (unique temp write + `fsync` + `rename`), so
//!   partially written objects are never observable.
//! - **No silent overwrites**: [`WriteMode::Create`] refuses keys that are
//!   already taken.
//! - **Self-Healing**: stale temporary files from interrupted writes are
//!   cleaned up when a filesystem root is opened.
//!
//! # Examples
//!
//! ```rust
//! use mdock_backend::{BackendConfig, BackendError, ObjectKey, WriteMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), BackendError> {
//!     // Use a temp directory for examples/tests
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().to_path_buf();
//!     let backend = BackendConfig::Filesystem { root }.connect().await?;
//!
//!     let key = ObjectKey::new("registry/demo/index.json")?;
//!     backend.write_bytes(&key, b"{}", WriteMode::Create).await?;
//!     assert!(backend.exists(&key).await?);
//!
//!     // A second create-mode write to the same key is refused
//!     let err = backend.write_bytes(&key, b"{}", WriteMode::Create).await;
//!     assert!(matches!(err, Err(BackendError::DuplicateKey { .. })));
//!
//!     Ok(())
//! }
//! ```

mod atomic;
mod backend;
mod config;
mod error;
mod filesystem;
mod gcs;
mod key;
mod maintenance;
mod net;
mod s3;

pub use backend::{Provider, StorageBackend, StoredObject, WriteMode};
pub use config::BackendConfig;
pub use error::{BackendError, BackendErrorExt};
pub use filesystem::FileSystemBackend;
pub use gcs::{GCS_ENDPOINT, GcsBackend};
pub use key::ObjectKey;
pub use s3::S3Backend;
