use crate::engine::{Archive, pack, write_swap};
use crate::error::ArchiveError;
use crate::types::{ARCHIVE_EXTENSION, ArchiveManifest, Compression, ModelArtifact};
use private::Sealed;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
struct BuilderConfig {
    output_dir: PathBuf,
    compression: Compression,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("."), compression: Compression::Lz4 }
    }
}

#[derive(Debug, Default)]
pub struct NoModel;

pub struct WithModel<'a>(&'a dyn ModelArtifact);

impl fmt::Debug for WithModel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithModel").finish_non_exhaustive()
    }
}

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoModel {}
impl Sealed for WithModel<'_> {}

/// Type-safe builder producing a single archive file from a model artifact.
///
/// The builder cannot be written until a model artifact is attached; the
/// transition is enforced at compile time.
#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct ArchiveBuilder<S: Sealed = NoModel> {
    state: S,
    config: BuilderConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> ArchiveBuilder<S> {
    #[must_use = "Sets the directory the archive file is written into"]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = path.into();
        self
    }

    #[must_use = "Sets payload compression for the archive"]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.config.compression = compression;
        self
    }

    fn transition<N: Sealed>(self, state: N) -> ArchiveBuilder<N> {
        ArchiveBuilder { state, config: self.config }
    }
}

impl ArchiveBuilder<NoModel> {
    #[must_use = "Creates a new archive builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Attaches the model artifact the archive captures"]
    pub fn model(self, artifact: &dyn ModelArtifact) -> ArchiveBuilder<WithModel<'_>> {
        self.transition(WithModel(artifact))
    }
}

impl ArchiveBuilder<WithModel<'_>> {
    /// Consumes the builder and writes the archive file.
    ///
    /// The write sequence:
    /// 1. **Capture**: the artifact serializes its state in memory.
    /// 2. **Describe**: a manifest with a fresh archive id, the payload
    ///    digest, and the runtime environment is assembled.
    /// 3. **Swap**: the container goes through a unique temporary file,
    ///    `fsync`, and rename, so no partial archive is ever observable
    ///    under the final name.
    ///
    /// The file lands in the configured output directory as
    /// `<archive-id>.mdarc`, unique per invocation.
    ///
    /// # Errors
    ///
    /// * [`ArchiveError::Serialization`] if the model state cannot be
    ///   captured or the manifest cannot be encoded.
    /// * [`ArchiveError::Io`] if the local disk rejects the write.
    pub async fn write(self) -> Result<Archive, ArchiveError> {
        let artifact = self.state.0;

        let payload = artifact.serialize()?;
        let manifest = ArchiveManifest::describe(artifact, &payload);
        let blob = pack(&manifest, &payload, self.config.compression)?;

        let path = self
            .config
            .output_dir
            .join(format!("{}.{ARCHIVE_EXTENSION}", manifest.archive_id));
        write_swap(&path, &blob).await?;

        info!(
            archive = %manifest.archive_id,
            model_type = %manifest.model_type,
            path = %path.display(),
            size = blob.len(),
            "Archive written"
        );

        let compressed = matches!(self.config.compression, Compression::Lz4);
        Ok(Archive::assemble(path, manifest, payload, compressed))
    }
}
