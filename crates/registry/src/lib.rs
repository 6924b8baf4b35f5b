//! Versioned model registry over pluggable storage backends.
//!
//! The store packages a trained model into a self-describing archive, uploads
//! it under a domain-scoped versioned key, and keeps a per-domain metadata
//! index in sync with the stored objects.
//!
//! # Core Features
//!
//! - **Domain-scoped versioning**: uploads to a domain receive versions
//!   1, 2, 3, ... from the domain's index, never from listing stored objects.
//! - **Create-only uploads**: archives are stored with create semantics, so a
//!   version key is never silently overwritten; a failed upload consumes no
//!   version number.
//! - **Metadata index**: an append-only JSON document under
//!   `registry/<domain>/index.json`, the single source of truth for version
//!   numbering.
//! - **Layered configuration**: [`StoreConfig`] from an optional file plus
//!   `MDOCK__...` environment overrides, resolved once at construction.
//!
//! # Examples
//!
//! ```rust
//! use mdock_registry::{
//!     ArchiveError, ArchiveSettings, BackendConfig, ModelArtifact, ModelStore, ModelType,
//!     StoreConfig,
//! };
//!
//! struct Weights(Vec<f64>);
//!
//! impl ModelArtifact for Weights {
//!     fn model_type(&self) -> ModelType {
//!         ModelType::Linear
//!     }
//!     fn library(&self) -> &str {
//!         "demo"
//!     }
//!     fn library_version(&self) -> &str {
//!         "0.0.1"
//!     }
//!     fn serialize(&self) -> Result<Vec<u8>, ArchiveError> {
//!         Ok(self.0.iter().flat_map(|w| w.to_le_bytes()).collect())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let tmp = tempfile::tempdir()?;
//! # std::fs::create_dir_all(tmp.path().join("store"))?;
//! let config = StoreConfig {
//!     backend: BackendConfig::Filesystem { root: tmp.path().join("store") },
//!     archive: ArchiveSettings {
//!         output_dir: tmp.path().join("archives"),
//!         ..ArchiveSettings::default()
//!     },
//! };
//! let store = ModelStore::connect(config).await?;
//!
//! let record = store.publish("diabetes-boosting-demo", &Weights(vec![0.1, 0.2])).await?;
//! assert_eq!(record.version, 1);
//! assert_eq!(record.location.key, "registry/diabetes-boosting-demo/1.mdarc");
//!
//! let history = store.versions("diabetes-boosting-demo").await?;
//! assert_eq!(history.len(), 1);
//! # Ok(())
//! # }
//! ```

mod config;
mod domain;
mod error;
mod index;
mod record;
mod store;

/// The store's own key sub-tree; every object the store writes lives under
/// it.
pub const REGISTRY_PREFIX: &str = "registry";

pub use crate::config::{ArchiveSettings, StoreConfig, load_config};
pub use crate::domain::DomainName;
pub use crate::error::{StoreError, StoreErrorExt};
pub use crate::index::ModelIndex;
pub use crate::record::{ObjectLocation, VersionRecord};
pub use crate::store::ModelStore;

pub use mdock_archive::{
    Archive, ArchiveError, ArchiveManifest, Compression, Environment, ModelArtifact, ModelSchema,
    ModelType,
};
pub use mdock_backend::{
    BackendConfig, BackendError, ObjectKey, Provider, StorageBackend, StoredObject, WriteMode,
};
