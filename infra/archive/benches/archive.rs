use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use mdock_archive::*;

struct BenchModel {
    payload: Vec<u8>,
}

impl ModelArtifact for BenchModel {
    fn model_type(&self) -> ModelType {
        ModelType::Linear
    }

    fn library(&self) -> &str {
        "bench"
    }

    fn library_version(&self) -> &str {
        "0.0.0"
    }

    fn serialize(&self) -> Result<Vec<u8>, ArchiveError> {
        Ok(self.payload.clone())
    }
}

fn bench_write_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("archive_roundtrip");

    let rt = tokio::runtime::Builder::new_current_thread().build().expect("tokio runtime");
    let dir = tempfile::tempdir().expect("temp dir");

    let sizes = [("4KB", 4 * 1024usize), ("64KB", 64 * 1024), ("1MB", 1024 * 1024)];

    for (label, size) in sizes {
        let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();

        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("write", label), &payload, |b, p| {
            b.to_async(&rt).iter(|| async {
                let model = BenchModel { payload: p.clone() };
                let archive = ArchiveBuilder::new()
                    .output_dir(dir.path())
                    .model(&model)
                    .write()
                    .await
                    .unwrap();
                tokio::fs::remove_file(archive.path()).await.unwrap();
            });
        });

        let model = BenchModel { payload: payload.clone() };
        let archive = rt
            .block_on(ArchiveBuilder::new().output_dir(dir.path()).model(&model).write())
            .expect("archive write failed");

        group.bench_with_input(BenchmarkId::new("open", label), archive.path(), |b, path| {
            b.to_async(&rt).iter(|| async {
                let _ = Archive::open(path).await.unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_write_open);
criterion_main!(benches);
