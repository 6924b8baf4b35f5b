//! Self-describing model archive containers.
//!
//! A trained model is captured into a single `.mdarc` file carrying
//! everything needed to understand it later: a manifest describing the model
//! and the environment that produced it, followed by the serialized model
//! state, digest-checked on every read.
//!
//! # Container Format & Versioning
//!
//! Archives are stored as a versioned binary container with an explicit
//! header:
//!
//! ```text
//! [MAGIC "MDAR"][V(1)][FLAGS(1)][MANIFEST_LEN(4, LE)][MANIFEST JSON][PAYLOAD(N)]
//! ```
//!
//! The header enables forward-compatible upgrades and ensures that settings
//! such as compression are encoded in the file itself rather than remembered
//! out of band.
//!
//! # Integrity
//!
//! The manifest records the payload byte length and its SHA-256 digest.
//! [`Archive::open`] refuses containers whose payload does not match, so a
//! truncated or modified file never masquerades as a model.
//!
//! # Example
//!
//! ```rust
//! use mdock_archive::*;
//!
//! struct Weights;
//!
//! impl ModelArtifact for Weights {
//!     fn model_type(&self) -> ModelType {
//!         ModelType::Linear
//!     }
//!     fn library(&self) -> &str {
//!         "handmade"
//!     }
//!     fn library_version(&self) -> &str {
//!         "0.0.0"
//!     }
//!     fn serialize(&self) -> Result<Vec<u8>, ArchiveError> {
//!         Ok(vec![0.5f64.to_le_bytes(), 1.5f64.to_le_bytes()].concat())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ArchiveError> {
//! # let dir = tempfile::tempdir()?;
//! let archive = ArchiveBuilder::new()
//!     .output_dir(dir.path())
//!     .compression(Compression::Lz4)
//!     .model(&Weights)
//!     .write()
//!     .await?;
//!
//! let restored = Archive::open(archive.path()).await?;
//! assert_eq!(restored.manifest().archive_id, archive.manifest().archive_id);
//! assert_eq!(restored.payload(), archive.payload());
//! # Ok(())
//! # }
//! ```

mod builder;
mod engine;
mod error;
mod types;

pub use builder::{ArchiveBuilder, NoModel, WithModel};
pub use engine::Archive;
pub use error::{ArchiveError, ArchiveErrorExt};
pub use types::{
    ARCHIVE_EXTENSION, ArchiveManifest, Compression, Environment, ModelArtifact, ModelSchema,
    ModelType,
};
