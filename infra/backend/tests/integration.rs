use mdock_backend::*;
use std::path::Path;
use tempfile::TempDir;

async fn connect_fs(root: &Path) -> std::sync::Arc<dyn StorageBackend> {
    BackendConfig::Filesystem { root: root.to_path_buf() }.connect().await.unwrap()
}

fn key(value: &str) -> ObjectKey {
    ObjectKey::new(value).unwrap()
}

#[tokio::test]
async fn test_missing_root_fails_at_construction() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("does-not-exist");

    let err =
        BackendConfig::Filesystem { root: missing }.connect().await.expect_err("expected error");
    match err {
        BackendError::Configuration { .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_root_must_be_a_directory() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("root.txt");
    std::fs::write(&file, b"x").unwrap();

    let err = BackendConfig::Filesystem { root: file }.connect().await.expect_err("expected error");
    match err {
        BackendError::Configuration { .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_put_get_roundtrip_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let backend = connect_fs(temp.path()).await;

    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let source = temp.path().join("model.bin");
    std::fs::write(&source, &payload).unwrap();

    let stored = backend
        .put(&key("registry/demo/1.mdarc"), &source, WriteMode::Create)
        .await
        .unwrap();
    assert_eq!(stored.key, "registry/demo/1.mdarc");
    assert_eq!(stored.size, payload.len() as u64);

    let dest_dir = TempDir::new().unwrap();
    let downloaded = backend.get(&key("registry/demo/1.mdarc"), dest_dir.path()).await.unwrap();
    assert_eq!(downloaded.file_name().unwrap(), "1.mdarc");
    assert_eq!(std::fs::read(&downloaded).unwrap(), payload);
}

#[tokio::test]
async fn test_create_mode_refuses_duplicate_key() {
    let temp = TempDir::new().unwrap();
    let backend = connect_fs(temp.path()).await;
    let k = key("registry/demo/1.mdarc");

    backend.write_bytes(&k, b"first", WriteMode::Create).await.unwrap();

    let err = backend
        .write_bytes(&k, b"second", WriteMode::Create)
        .await
        .expect_err("expected error");
    match err {
        BackendError::DuplicateKey { .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }

    // The original object is untouched
    assert_eq!(backend.read_bytes(&k).await.unwrap(), b"first");
}

#[tokio::test]
async fn test_overwrite_mode_replaces() {
    let temp = TempDir::new().unwrap();
    let backend = connect_fs(temp.path()).await;
    let k = key("registry/demo/index.json");

    backend.write_bytes(&k, b"{\"v\":1}", WriteMode::Create).await.unwrap();
    backend.write_bytes(&k, b"{\"v\":2}", WriteMode::Overwrite).await.unwrap();

    assert_eq!(backend.read_bytes(&k).await.unwrap(), b"{\"v\":2}");
}

#[tokio::test]
async fn test_exists_and_missing_read() {
    let temp = TempDir::new().unwrap();
    let backend = connect_fs(temp.path()).await;
    let k = key("registry/demo/1.mdarc");

    assert!(!backend.exists(&k).await.unwrap());

    let err = backend.read_bytes(&k).await.expect_err("expected error");
    match err {
        BackendError::ObjectNotFound { .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }

    backend.write_bytes(&k, b"x", WriteMode::Create).await.unwrap();
    assert!(backend.exists(&k).await.unwrap());
}

#[tokio::test]
async fn test_list_filters_by_prefix_and_sorts() {
    let temp = TempDir::new().unwrap();
    let backend = connect_fs(temp.path()).await;

    backend.write_bytes(&key("registry/a/2.mdarc"), b"x", WriteMode::Create).await.unwrap();
    backend.write_bytes(&key("registry/a/1.mdarc"), b"x", WriteMode::Create).await.unwrap();
    backend.write_bytes(&key("registry/b/1.mdarc"), b"x", WriteMode::Create).await.unwrap();

    let keys = backend.list("registry/a/").await.unwrap();
    assert_eq!(keys, vec!["registry/a/1.mdarc", "registry/a/2.mdarc"]);

    let all = backend.list("").await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_temporary_files_are_invisible_to_listing() {
    let temp = TempDir::new().unwrap();
    let backend = connect_fs(temp.path()).await;

    backend.write_bytes(&key("registry/a/1.mdarc"), b"x", WriteMode::Create).await.unwrap();
    std::fs::write(temp.path().join("registry/a/1.mdarc.mdocktmp.99"), b"junk").unwrap();

    let keys = backend.list("registry/").await.unwrap();
    assert_eq!(keys, vec!["registry/a/1.mdarc"]);
}

#[tokio::test]
async fn test_put_missing_local_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let backend = connect_fs(temp.path()).await;

    let err = backend
        .put(
            &key("registry/demo/1.mdarc"),
            Path::new("/nonexistent/archive.mdarc"),
            WriteMode::Create,
        )
        .await
        .expect_err("expected error");
    match err {
        BackendError::Io { .. } => {},
        other => panic!("unexpected error: {other:?}"),
    }
    // Nothing observable was written
    assert!(!backend.exists(&key("registry/demo/1.mdarc")).await.unwrap());
}

#[tokio::test]
async fn test_malformed_keys_are_rejected() {
    assert!(ObjectKey::new("../escape").is_err());
    assert!(ObjectKey::new("/absolute").is_err());
    assert!(ObjectKey::new("with space").is_err());
}
