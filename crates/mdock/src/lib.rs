//! Facade crate for the ModelDock platform.
//! Re-exports the archive, backend, registry, and logger crates behind a
//! single dependency. Keep this crate thin: it composes the others, never
//! implements store logic itself.
//!
//! ## Usage
//! - Add `mdock` and import from [`prelude`] for the common workflow types.
//! - Reach into the aliased crates (`mdock::archive`, `mdock::backend`, ...)
//!   for the full surface of each layer.

pub use mdock_archive as archive;
pub use mdock_backend as backend;
pub use mdock_logger as logger;
pub use mdock_registry as registry;

/// Single-import surface for applications driving the store.
pub mod prelude {
    pub use mdock_archive::{
        Archive, ArchiveBuilder, ArchiveError, ArchiveManifest, Compression, ModelArtifact,
        ModelSchema, ModelType,
    };
    pub use mdock_backend::{
        BackendConfig, BackendError, ObjectKey, Provider, StorageBackend, StoredObject, WriteMode,
    };
    pub use mdock_logger::{LevelFilter, Logger, LoggerError};
    pub use mdock_registry::{
        ArchiveSettings, DomainName, ModelIndex, ModelStore, ObjectLocation, StoreConfig,
        StoreError, VersionRecord, load_config,
    };
}
