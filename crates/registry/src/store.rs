use crate::REGISTRY_PREFIX;
use crate::config::{ArchiveSettings, StoreConfig};
use crate::domain::DomainName;
use crate::error::{StoreError, StoreErrorExt};
use crate::index::ModelIndex;
use crate::record::{ObjectLocation, VersionRecord};
use mdock_archive::{ARCHIVE_EXTENSION, Archive, ArchiveBuilder, ModelArtifact};
use mdock_backend::{BackendConfig, BackendError, ObjectKey, Provider, StorageBackend, WriteMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Key an archive is uploaded under: `registry/<domain>/<version>.mdarc`.
fn archive_key(domain: &DomainName, version: u64) -> Result<ObjectKey, StoreError> {
    ObjectKey::new(format!("{REGISTRY_PREFIX}/{domain}/{version}.{ARCHIVE_EXTENSION}"))
        .context("Archive key construction failed")
}

/// Client for a versioned model store over one configured backend.
///
/// The store packages trained models into archives, uploads them under
/// domain-scoped versioned keys, and keeps a per-domain metadata index in
/// sync with the stored objects. The backend is selected and validated once
/// at construction; a misconfigured root fails here, never mid-upload.
#[derive(Debug, Clone)]
pub struct ModelStore {
    backend: Arc<dyn StorageBackend>,
    archive: ArchiveSettings,
}

impl ModelStore {
    /// Connects the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] carrying
    /// [`BackendError::Configuration`] when the backend root is missing or
    /// rejected, and [`BackendError::Unavailable`] when a remote root cannot
    /// be reached.
    pub async fn connect(config: StoreConfig) -> Result<Self, StoreError> {
        let backend = config.backend.connect().await?;

        info!(provider = %backend.provider(), root = backend.root(), "Model store connected");
        Ok(Self { backend, archive: config.archive })
    }

    /// Connects a store over a local directory root with default archive
    /// settings.
    ///
    /// # Errors
    ///
    /// See [`ModelStore::connect`].
    pub async fn filesystem(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::connect(StoreConfig {
            backend: BackendConfig::Filesystem { root: root.into() },
            archive: ArchiveSettings::default(),
        })
        .await
    }

    /// Connects a store over an S3-compatible bucket with default archive
    /// settings.
    ///
    /// # Errors
    ///
    /// See [`ModelStore::connect`].
    pub async fn aws_s3(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, StoreError> {
        Self::connect(StoreConfig {
            backend: BackendConfig::AwsS3 {
                endpoint: endpoint.into(),
                bucket: bucket.into(),
                token: token.into(),
            },
            archive: ArchiveSettings::default(),
        })
        .await
    }

    /// Connects a store over a Google Cloud Storage bucket with default
    /// archive settings and the production API endpoint.
    ///
    /// # Errors
    ///
    /// See [`ModelStore::connect`].
    pub async fn gcloud(
        project_id: impl Into<String>,
        bucket: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, StoreError> {
        Self::connect(StoreConfig {
            backend: BackendConfig::Gcloud {
                project_id: project_id.into(),
                bucket: bucket.into(),
                token: token.into(),
                endpoint: mdock_backend::GCS_ENDPOINT.to_owned(),
            },
            archive: ArchiveSettings::default(),
        })
        .await
    }

    /// Wraps an already-connected backend with default archive settings.
    /// This is the seam for custom [`StorageBackend`] implementations.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend, archive: ArchiveSettings::default() }
    }

    /// Backend variant this store writes to.
    #[must_use]
    pub fn provider(&self) -> Provider {
        self.backend.provider()
    }

    /// Backend root identity (directory path or bucket name).
    #[must_use]
    pub fn root(&self) -> &str {
        self.backend.root()
    }

    /// Packages `artifact` into an archive file using the store's archive
    /// settings. The archive lands on local disk; uploading it is a separate
    /// step, and the caller owns the file afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Archive`] when the model state cannot be
    /// captured or the file cannot be written.
    pub async fn create_archive(
        &self,
        artifact: &dyn ModelArtifact,
    ) -> Result<Archive, StoreError> {
        let archive = ArchiveBuilder::new()
            .output_dir(&self.archive.output_dir)
            .compression(self.archive.compression)
            .model(artifact)
            .write()
            .await?;

        Ok(archive)
    }

    /// Uploads the archive at `archive_path` as the next version of `domain`
    /// and returns the new version record.
    ///
    /// The version number comes from the domain's index (highest + 1, first
    /// upload is 1) and is only consumed once the backend confirms the
    /// object: a failed put leaves the index untouched. A crash after the put
    /// but before the index sync leaves an orphaned archive that future
    /// version computation ignores.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidDomain`] for a malformed domain,
    /// [`StoreError::Archive`] when the local archive is unreadable or fails
    /// its digest check, [`StoreError::IndexInconsistency`] when the target
    /// key is already taken even though the index does not know the version,
    /// and [`StoreError::Backend`] for backend failures;
    /// [`BackendError::Unavailable`] is safe to retry as a whole.
    pub async fn upload(
        &self,
        domain: &str,
        archive_path: impl AsRef<Path>,
    ) -> Result<VersionRecord, StoreError> {
        let domain = DomainName::new(domain)?;
        let archive_path = archive_path.as_ref();
        let archive = Archive::open(archive_path).await?;

        let mut index = ModelIndex::load(self.backend.as_ref(), &domain).await?;
        let version = index.next_version();
        let key = archive_key(&domain, version)?;

        let stored = match self.backend.put(&key, archive_path, WriteMode::Create).await {
            Ok(stored) => stored,
            Err(BackendError::DuplicateKey { .. }) => {
                return Err(StoreError::IndexInconsistency {
                    message: format!(
                        "Object {key} already exists but version {version} is not in the index"
                    )
                    .into(),
                    context: Some("Stored objects and the index disagree".into()),
                });
            },
            Err(err) => return Err(StoreError::from(err)),
        };

        let location = ObjectLocation {
            provider: self.backend.provider(),
            root: self.backend.root().to_owned(),
            key: stored.key,
        };
        let record = VersionRecord::describe(&domain, version, archive.manifest(), location);

        index.append(record.clone())?;
        index.sync(self.backend.as_ref()).await?;

        info!(
            domain = %record.domain,
            version = record.version,
            archive = %record.archive_id,
            key = %record.location.key,
            size = stored.size,
            "Model version uploaded"
        );
        Ok(record)
    }

    /// Packages `artifact` and uploads it as the next version of `domain` in
    /// one call.
    ///
    /// The intermediate archive file is left in the configured output
    /// directory; the caller may delete it once this returns.
    ///
    /// # Errors
    ///
    /// Propagates [`ModelStore::create_archive`] and [`ModelStore::upload`]
    /// failures unchanged.
    pub async fn publish(
        &self,
        domain: &str,
        artifact: &dyn ModelArtifact,
    ) -> Result<VersionRecord, StoreError> {
        let checked = DomainName::new(domain)?;
        let archive = self.create_archive(artifact).await?;
        self.upload(checked.as_str(), archive.path()).await
    }

    /// The version history of `domain`, oldest first. A domain with no
    /// uploads yields an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidDomain`] for a malformed domain and
    /// [`StoreError::Backend`] when the index cannot be read.
    pub async fn versions(&self, domain: &str) -> Result<Vec<VersionRecord>, StoreError> {
        let domain = DomainName::new(domain)?;
        let index = ModelIndex::load(self.backend.as_ref(), &domain).await?;
        Ok(index.into_records())
    }

    /// Downloads the archive of (`domain`, `version`) into `dest_dir`,
    /// returning the local path it was written to.
    ///
    /// The object key is resolved through the index, never by listing the
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownVersion`] when the index has no such
    /// version and [`StoreError::Backend`] when the download fails.
    pub async fn download(
        &self,
        domain: &str,
        version: u64,
        dest_dir: impl AsRef<Path>,
    ) -> Result<PathBuf, StoreError> {
        let domain = DomainName::new(domain)?;
        let index = ModelIndex::load(self.backend.as_ref(), &domain).await?;

        let record = index.find(version).ok_or_else(|| StoreError::UnknownVersion {
            message: format!("Domain '{domain}' has no version {version}").into(),
            context: None,
        })?;

        let key = ObjectKey::new(record.location.key.as_str())
            .context("Recorded object key is invalid")?;
        let path = self.backend.get(&key, dest_dir.as_ref()).await?;

        info!(domain = %domain, version, path = %path.display(), "Model version downloaded");
        Ok(path)
    }
}
