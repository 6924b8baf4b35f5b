//! Atomic file persistence shared by the filesystem engine and the download
//! paths of the bucket engines.

use crate::error::{BackendError, BackendErrorExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Marker embedded in temporary file names so interrupted writes can be
/// recognized and purged later.
pub(crate) const TMP_MARKER: &str = ".mdocktmp.";

/// Writes `data` to `target` using the atomic swap pattern:
/// 1. Data is written to a unique temporary file (`<name>.mdocktmp.<id>`).
/// 2. The file is synced to hardware (`fsync`).
/// 3. The temporary file is renamed onto the final destination.
///
/// Missing parent directories are created. On platforms that do not support
/// atomic replace for existing targets, the swap falls back to
/// remove-then-rename.
pub(crate) async fn write_swap(
    target: &Path,
    data: &[u8],
    counter: &AtomicU64,
) -> Result<(), BackendError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .await
            .context(format!("Failed to create directories for {}", target.display()))?;
    }

    let temp = unique_tmp_path(target, counter);

    {
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp)
            .await
            .context(format!("Temp creation failed: {}", temp.display()))?;
        file.write_all(data).await.context("Write failed")?;
        file.sync_all().await.context("Hardware sync failed")?;
    }

    if let Err(err) = fs::rename(&temp, target).await {
        if err.kind() == std::io::ErrorKind::AlreadyExists {
            fs::remove_file(target)
                .await
                .context(format!("Failed to replace existing file: {}", target.display()))?;
            fs::rename(&temp, target).await.context(format!(
                "Atomic swap failed: {} -> {}",
                temp.display(),
                target.display()
            ))?;
        } else {
            return Err(BackendError::Io {
                source: err,
                context: Some(
                    format!("Atomic swap failed: {} -> {}", temp.display(), target.display())
                        .into(),
                ),
            });
        }
    }

    if let Some(parent) = target.parent() {
        sync_dir(parent).await;
    }

    Ok(())
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                tracing::warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Directory open failed");
        },
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("object");
    let tmp_name = format!("{file_name}{TMP_MARKER}{counter}");
    target.with_file_name(tmp_name)
}
