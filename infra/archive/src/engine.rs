use crate::error::{ArchiveError, ArchiveErrorExt};
use crate::types::{
    ArchiveManifest, Compression, FLAG_COMPRESSED, FORMAT_VERSION_V1, HEADER_LEN, MAGIC,
};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Marker embedded in temporary file names so interrupted writes can be
/// recognized later.
const TMP_MARKER: &str = ".mdocktmp.";

/// Process-wide counter for unique temporary file names.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(1);

/// An opened (or freshly written) model archive.
///
/// The payload held here is the decompressed, digest-verified model state;
/// the manifest is exactly what the container carries.
#[derive(Debug, Clone)]
pub struct Archive {
    path: PathBuf,
    manifest: ArchiveManifest,
    payload: Vec<u8>,
    compressed: bool,
}

impl Archive {
    pub(crate) const fn assemble(
        path: PathBuf,
        manifest: ArchiveManifest,
        payload: Vec<u8>,
        compressed: bool,
    ) -> Self {
        Self { path, manifest, payload, compressed }
    }

    /// Opens an archive file and verifies it against its own manifest.
    ///
    /// # Errors
    ///
    /// * [`ArchiveError::Io`] if the file cannot be read.
    /// * [`ArchiveError::InvalidFormat`] if the container is malformed or the
    ///   payload does not match the recorded length/digest.
    /// * [`ArchiveError::Decompression`] if the LZ4 stream is corrupt.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let path = path.into();
        let blob = fs::read(&path)
            .await
            .context(format!("Failed to read archive: {}", path.display()))?;
        let (manifest, payload, compressed) = unpack(&blob)?;
        Ok(Self { path, manifest, payload, compressed })
    }

    /// Location of the archive file on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The manifest embedded in the container.
    #[must_use]
    pub const fn manifest(&self) -> &ArchiveManifest {
        &self.manifest
    }

    /// The captured model state, decompressed.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns `true` if the container stores the payload LZ4-compressed.
    #[must_use]
    pub const fn is_compressed(&self) -> bool {
        self.compressed
    }
}

/// Encodes a manifest/payload pair into container bytes.
pub(crate) fn pack(
    manifest: &ArchiveManifest,
    payload: &[u8],
    compression: Compression,
) -> Result<Vec<u8>, ArchiveError> {
    let manifest_bytes = serde_json::to_vec(manifest).map_err(|err| ArchiveError::Serialization {
        message: "Manifest encoding failed".into(),
        context: Some(err.to_string().into()),
    })?;
    let manifest_len =
        u32::try_from(manifest_bytes.len()).map_err(|_| ArchiveError::InvalidFormat {
            message: "Manifest exceeds the length field".into(),
            context: None,
        })?;

    let compress = matches!(compression, Compression::Lz4);
    let owned = if compress { lz4_flex::compress_prepend_size(payload) } else { Vec::new() };
    let body = if compress { owned.as_slice() } else { payload };
    let flags = if compress { FLAG_COMPRESSED } else { 0 };

    let mut buf = Vec::with_capacity(HEADER_LEN + manifest_bytes.len() + body.len());
    buf.extend_from_slice(MAGIC);
    buf.push(FORMAT_VERSION_V1);
    buf.push(flags);
    buf.extend_from_slice(&manifest_len.to_le_bytes());
    buf.extend_from_slice(&manifest_bytes);
    buf.extend_from_slice(body);
    Ok(buf)
}

/// Decodes container bytes, returning the manifest, the verified payload and
/// whether the container was compressed.
pub(crate) fn unpack(blob: &[u8]) -> Result<(ArchiveManifest, Vec<u8>, bool), ArchiveError> {
    if blob.len() < HEADER_LEN {
        return Err(ArchiveError::InvalidFormat {
            message: format!(
                "Archive too short ({} bytes). Expected at least {HEADER_LEN} bytes",
                blob.len()
            )
            .into(),
            context: None,
        });
    }

    if blob[..MAGIC.len()] != *MAGIC {
        return Err(ArchiveError::InvalidFormat {
            message: "Leading bytes are not an archive signature".into(),
            context: None,
        });
    }

    let version = blob[4];
    let flags = blob[5];

    if version != FORMAT_VERSION_V1 {
        return Err(ArchiveError::InvalidFormat {
            message: "Unsupported archive version".into(),
            context: Some(format!("version={version}").into()),
        });
    }

    let manifest_len = u32::from_le_bytes([blob[6], blob[7], blob[8], blob[9]]) as usize;
    let body = &blob[HEADER_LEN..];
    if body.len() < manifest_len {
        return Err(ArchiveError::InvalidFormat {
            message: "Manifest length exceeds archive size".into(),
            context: Some(format!("declared {manifest_len} bytes, {} present", body.len()).into()),
        });
    }
    let (manifest_bytes, payload_part) = body.split_at(manifest_len);

    let manifest: ArchiveManifest =
        serde_json::from_slice(manifest_bytes).map_err(|err| ArchiveError::InvalidFormat {
            message: "Manifest decoding failed".into(),
            context: Some(err.to_string().into()),
        })?;

    let compressed = (flags & FLAG_COMPRESSED) != 0;
    let payload = if compressed {
        lz4_flex::decompress_size_prepended(payload_part).map_err(|_| {
            ArchiveError::Decompression {
                message: "Decompression failed".into(),
                context: Some("LZ4 stream invalid".into()),
            }
        })?
    } else {
        payload_part.to_vec()
    };

    if payload.len() as u64 != manifest.payload_len {
        return Err(ArchiveError::InvalidFormat {
            message: "Payload length mismatch".into(),
            context: Some(
                format!("manifest declares {} bytes, found {}", manifest.payload_len, payload.len())
                    .into(),
            ),
        });
    }

    let digest = hex::encode(Sha256::digest(&payload));
    if digest != manifest.payload_sha256 {
        return Err(ArchiveError::InvalidFormat {
            message: "Payload digest mismatch".into(),
            context: Some("Archive content differs from what its manifest describes".into()),
        });
    }

    Ok((manifest, payload, compressed))
}

/// Writes `data` to `target` using the atomic swap pattern: a unique
/// temporary file is written and synced, then renamed into place, so a crash
/// never leaves a partial archive under the final name.
pub(crate) async fn write_swap(target: &Path, data: &[u8]) -> Result<(), ArchiveError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .await
            .context(format!("Failed to create directories for {}", target.display()))?;
    }

    let temp = unique_tmp_path(target);

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

    fs::rename(&temp, target).await.context(format!(
        "Atomic swap failed: {} -> {}",
        temp.display(),
        target.display()
    ))?;

    if let Some(parent) = target.parent() {
        sync_dir(parent).await;
    }

    Ok(())
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Directory open failed");
        },
    }
}

fn unique_tmp_path(target: &Path) -> PathBuf {
    let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("archive");
    target.with_file_name(format!("{file_name}{TMP_MARKER}{counter}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Environment, ModelType};
    use chrono::Utc;

    fn manifest_for(payload: &[u8]) -> ArchiveManifest {
        ArchiveManifest {
            archive_id: "Test2345arch".to_owned(),
            model_type: ModelType::Linear,
            library: "test-lib".to_owned(),
            library_version: "0.1.0".to_owned(),
            created_at: Utc::now(),
            schema: None,
            payload_len: payload.len() as u64,
            payload_sha256: hex::encode(Sha256::digest(payload)),
            environment: Environment::capture(),
        }
    }

    #[test]
    fn test_pack_unpack_roundtrip() {
        let payload = b"model-bytes";
        let blob = pack(&manifest_for(payload), payload, Compression::Lz4).unwrap();

        let (manifest, restored, compressed) = unpack(&blob).unwrap();
        assert!(compressed);
        assert_eq!(restored.as_slice(), payload);
        assert_eq!(manifest.payload_len, payload.len() as u64);
    }

    #[test]
    fn test_unpack_rejects_wrong_magic() {
        let payload = b"model-bytes";
        let mut blob = pack(&manifest_for(payload), payload, Compression::None).unwrap();
        blob[0] ^= 0xFF;

        let err = unpack(&blob).expect_err("expected error");
        match err {
            ArchiveError::InvalidFormat { .. } => {},
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unpack_rejects_future_version() {
        let payload = b"model-bytes";
        let mut blob = pack(&manifest_for(payload), payload, Compression::None).unwrap();
        blob[4] = 9;

        let err = unpack(&blob).expect_err("expected error");
        match err {
            ArchiveError::InvalidFormat { .. } => {},
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unpack_rejects_short_input() {
        let err = unpack(b"MDAR").expect_err("expected error");
        match err {
            ArchiveError::InvalidFormat { .. } => {},
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unpack_detects_payload_tampering() {
        let payload = b"model-bytes";
        let mut blob = pack(&manifest_for(payload), payload, Compression::None).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;

        let err = unpack(&blob).expect_err("expected error");
        match err {
            ArchiveError::InvalidFormat { .. } => {},
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
