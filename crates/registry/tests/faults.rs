use async_trait::async_trait;
use mdock_archive::ArchiveBuilder;
use mdock_registry::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// In-memory backend that can be armed to fail the next archive put or the
/// next index sync.
#[derive(Debug, Default)]
struct FaultyBackend {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_next_put: AtomicBool,
    fail_next_sync: AtomicBool,
}

impl FaultyBackend {
    fn arm_put_failure(&self) {
        self.fail_next_put.store(true, Ordering::SeqCst);
    }

    fn arm_sync_failure(&self) {
        self.fail_next_sync.store(true, Ordering::SeqCst);
    }

    fn seed(&self, key: &str, data: &[u8]) {
        self.objects.lock().unwrap().insert(key.to_owned(), data.to_vec());
    }
}

#[async_trait]
impl StorageBackend for FaultyBackend {
    fn provider(&self) -> Provider {
        Provider::Filesystem
    }

    fn root(&self) -> &str {
        "faulty"
    }

    async fn put(
        &self,
        key: &ObjectKey,
        local_path: &Path,
        mode: WriteMode,
    ) -> Result<StoredObject, BackendError> {
        if self.fail_next_put.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Io {
                source: std::io::Error::other("injected put failure"),
                context: None,
            });
        }

        let data = std::fs::read(local_path)?;
        let size = data.len() as u64;
        self.write_bytes(key, &data, mode).await?;
        Ok(StoredObject { key: key.as_str().to_owned(), size })
    }

    async fn get(&self, key: &ObjectKey, dest_dir: &Path) -> Result<PathBuf, BackendError> {
        let data = self.read_bytes(key).await?;
        std::fs::create_dir_all(dest_dir)?;
        let dest = dest_dir.join(key.file_name());
        std::fs::write(&dest, data)?;
        Ok(dest)
    }

    async fn exists(&self, key: &ObjectKey) -> Result<bool, BackendError> {
        Ok(self.objects.lock().unwrap().contains_key(key.as_str()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let objects = self.objects.lock().unwrap();
        Ok(objects.keys().filter(|key| key.starts_with(prefix)).cloned().collect())
    }

    async fn read_bytes(&self, key: &ObjectKey) -> Result<Vec<u8>, BackendError> {
        self.objects.lock().unwrap().get(key.as_str()).cloned().ok_or_else(|| {
            BackendError::ObjectNotFound { message: key.as_str().to_owned().into(), context: None }
        })
    }

    async fn write_bytes(
        &self,
        key: &ObjectKey,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<(), BackendError> {
        if mode == WriteMode::Overwrite && self.fail_next_sync.swap(false, Ordering::SeqCst) {
            return Err(BackendError::Io {
                source: std::io::Error::other("injected sync failure"),
                context: None,
            });
        }

        let mut objects = self.objects.lock().unwrap();
        if mode == WriteMode::Create && objects.contains_key(key.as_str()) {
            return Err(BackendError::DuplicateKey {
                message: key.as_str().to_owned().into(),
                context: None,
            });
        }

        objects.insert(key.as_str().to_owned(), data.to_vec());
        Ok(())
    }
}

struct BlobModel;

impl ModelArtifact for BlobModel {
    fn model_type(&self) -> ModelType {
        ModelType::TreeEnsemble
    }

    fn library(&self) -> &str {
        "stub"
    }

    fn library_version(&self) -> &str {
        "0.0.0"
    }

    fn serialize(&self) -> Result<Vec<u8>, ArchiveError> {
        Ok(b"gradient boosted stumps".to_vec())
    }
}

async fn packaged_archive(dir: &Path) -> Archive {
    ArchiveBuilder::new().output_dir(dir).model(&BlobModel).write().await.unwrap()
}

#[tokio::test]
async fn test_failed_put_consumes_no_version() {
    let tmp = tempdir().unwrap();
    let backend = Arc::new(FaultyBackend::default());
    let store = ModelStore::with_backend(backend.clone());
    let archive = packaged_archive(tmp.path()).await;

    backend.arm_put_failure();
    let err = store.upload("demo", archive.path()).await.expect_err("expected error");
    match err {
        StoreError::Backend { source: BackendError::Io { .. }, .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }

    // The failure consumed nothing: no index object, no stored archive.
    assert!(store.versions("demo").await.unwrap().is_empty());
    assert!(backend.list("").await.unwrap().is_empty());

    // The next attempt still gets version 1.
    let record = store.upload("demo", archive.path()).await.unwrap();
    assert_eq!(record.version, 1);
    assert_eq!(record.location.key, "registry/demo/1.mdarc");
}

#[tokio::test]
async fn test_preexisting_object_is_a_consistency_fault() {
    let tmp = tempdir().unwrap();
    let backend = Arc::new(FaultyBackend::default());
    let store = ModelStore::with_backend(backend.clone());
    let archive = packaged_archive(tmp.path()).await;

    // An object under the version-1 key the index knows nothing about.
    backend.seed("registry/demo/1.mdarc", b"orphan");

    let err = store.upload("demo", archive.path()).await.expect_err("expected error");
    match err {
        StoreError::IndexInconsistency { .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }

    // The first object is intact and the index still empty.
    let key = ObjectKey::new("registry/demo/1.mdarc").unwrap();
    assert_eq!(backend.read_bytes(&key).await.unwrap(), b"orphan");
    assert!(store.versions("demo").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_interrupted_index_sync_is_detected_on_retry() {
    let tmp = tempdir().unwrap();
    let backend = Arc::new(FaultyBackend::default());
    let store = ModelStore::with_backend(backend.clone());
    let archive = packaged_archive(tmp.path()).await;

    backend.arm_sync_failure();
    let err = store.upload("demo", archive.path()).await.expect_err("expected error");
    match err {
        StoreError::Backend { source: BackendError::Io { .. }, .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }

    // The archive landed but the index never advanced; the retry surfaces
    // the disagreement instead of silently renumbering.
    let err = store.upload("demo", archive.path()).await.expect_err("expected error");
    match err {
        StoreError::IndexInconsistency { .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_upload_rejects_missing_local_archive() {
    let tmp = tempdir().unwrap();
    let backend = Arc::new(FaultyBackend::default());
    let store = ModelStore::with_backend(backend);

    let err = store
        .upload("demo", tmp.path().join("nowhere.mdarc"))
        .await
        .expect_err("expected error");
    match err {
        StoreError::Archive { source: ArchiveError::Io { .. }, .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }
}
