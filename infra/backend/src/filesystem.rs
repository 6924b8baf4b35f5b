//! Local directory engine with sandboxed keys and atomic writes.

use crate::atomic::{self, TMP_MARKER};
use crate::backend::{Provider, StorageBackend, StoredObject, WriteMode};
use crate::error::{BackendError, BackendErrorExt};
use crate::key::{self, ObjectKey};
use crate::maintenance;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use tokio::fs;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Storage backend rooted at a pre-existing local directory.
///
/// The root itself is never created: pointing the store at a missing
/// directory is a deployment mistake and surfaces as
/// [`BackendError::Configuration`] at construction. Sub-directories under the
/// root are created on demand as keys require them.
#[derive(Debug)]
pub struct FileSystemBackend {
    root: PathBuf,
    root_label: String,
    tmp_counter: AtomicU64,
}

impl FileSystemBackend {
    /// Opens the backend over `root`.
    ///
    /// The boot sequence validates that the root exists and is a directory,
    /// canonicalizes it to pin the sandbox boundary, and sweeps out stale
    /// temporary files left behind by interrupted writes.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Configuration`] if the root is missing or not
    /// a directory and [`BackendError::Io`] if it cannot be resolved.
    pub async fn connect(root: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let root = root.into();

        let meta = match fs::metadata(&root).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(BackendError::Configuration {
                    message: format!("Storage root does not exist: {}", root.display()).into(),
                    context: Some("The root directory must exist before connecting".into()),
                });
            },
            Err(err) => {
                return Err(BackendError::Io {
                    source: err,
                    context: Some(
                        format!("Failed to inspect storage root: {}", root.display()).into(),
                    ),
                });
            },
        };

        if !meta.is_dir() {
            return Err(BackendError::Configuration {
                message: format!("Storage root is not a directory: {}", root.display()).into(),
                context: None,
            });
        }

        let canonical = fs::canonicalize(&root)
            .await
            .context(format!("Failed to resolve storage root: {}", root.display()))?;

        maintenance::purge_tmp(&canonical).await;
        info!(path = %canonical.display(), "Opened filesystem storage root");

        let root_label = canonical.display().to_string();
        Ok(Self { root: canonical, root_label, tmp_counter: AtomicU64::new(1) })
    }

    /// Maps a key onto a physical path and verifies the result stays inside
    /// the root, guarding against symlinked parents.
    fn resolve(&self, key: &ObjectKey) -> Result<PathBuf, BackendError> {
        let joined = self.root.join(key.as_str());
        validate_within_root(&self.root, &joined)?;
        Ok(joined)
    }
}

#[async_trait]
impl StorageBackend for FileSystemBackend {
    fn provider(&self) -> Provider {
        Provider::Filesystem
    }

    fn root(&self) -> &str {
        &self.root_label
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
        let resolved = self.resolve(key)?;
        match fs::metadata(&resolved).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(BackendError::Io {
                source: err,
                context: Some(format!("Existence check failed for key {key}").into()),
            }),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        key::validate_prefix(prefix)?;

        let root = self.root.clone();
        let prefix = prefix.to_owned();
        tokio::task::spawn_blocking(move || collect_keys(&root, &prefix)).await.map_err(|e| {
            BackendError::Io {
                source: std::io::Error::other(e),
                context: Some("Listing task panicked".into()),
            }
        })
    }

    async fn read_bytes(&self, key: &ObjectKey) -> Result<Vec<u8>, BackendError> {
        let resolved = self.resolve(key)?;
        match fs::read(&resolved).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(BackendError::ObjectNotFound {
                    message: key.as_str().to_owned().into(),
                    context: None,
                })
            },
            Err(err) => Err(BackendError::Io {
                source: err,
                context: Some(format!("Read failed: {}", resolved.display()).into()),
            }),
        }
    }

    async fn write_bytes(
        &self,
        key: &ObjectKey,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<(), BackendError> {
        let target = self.resolve(key)?;

        if mode == WriteMode::Create && self.exists(key).await? {
            return Err(BackendError::DuplicateKey {
                message: key.as_str().to_owned().into(),
                context: None,
            });
        }

        atomic::write_swap(&target, data, &self.tmp_counter).await?;
        debug!(key = %key, "Object stored");
        Ok(())
    }
}

/// Walks up from `joined` to its first existing ancestor, canonicalizes it,
/// and confirms the chain still originates inside `root`. Key validation
/// already rejects `..` and absolute paths; this catches symlink escapes.
fn validate_within_root(root: &Path, joined: &Path) -> Result<(), BackendError> {
    let mut current = Some(joined);

    while let Some(path) = current {
        if path == root {
            return Ok(());
        }

        if path.exists() {
            return match path.canonicalize() {
                Ok(canonical) if canonical.starts_with(root) => Ok(()),
                Ok(canonical) => Err(BackendError::InvalidKey {
                    message: canonical.display().to_string().into(),
                    context: Some("Parent directory points outside the storage root".into()),
                }),
                Err(e) => Err(BackendError::Io {
                    source: e,
                    context: Some("Failed to verify parent directory".into()),
                }),
            };
        }

        current = path.parent();
    }

    Err(BackendError::InvalidKey {
        message: joined.display().to_string().into(),
        context: Some("No valid parent directory found within the storage root".into()),
    })
}

fn collect_keys(root: &Path, prefix: &str) -> Vec<String> {
    let mut keys: Vec<String> = WalkDir::new(root)
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| relative_key(root, e.path()))
        .filter(|key| !key.contains(TMP_MARKER) && key.starts_with(prefix))
        .collect();
    keys.sort();
    keys
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut out = String::new();
    for component in rel.components() {
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(component.as_os_str().to_str()?);
    }
    Some(out)
}
