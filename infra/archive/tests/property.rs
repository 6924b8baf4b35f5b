use mdock_archive::*;
use proptest::prelude::*;

#[derive(Debug)]
struct BytesModel {
    payload: Vec<u8>,
}

impl ModelArtifact for BytesModel {
    fn model_type(&self) -> ModelType {
        ModelType::Linear
    }

    fn library(&self) -> &str {
        "property"
    }

    fn library_version(&self) -> &str {
        "0.0.0"
    }

    fn serialize(&self) -> Result<Vec<u8>, ArchiveError> {
        Ok(self.payload.clone())
    }
}

proptest! {
    #[test]
    fn roundtrip_arbitrary_payload_bytes(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();

            for compression in [Compression::None, Compression::Lz4] {
                let model = BytesModel { payload: data.clone() };
                let archive = ArchiveBuilder::new()
                    .output_dir(dir.path())
                    .compression(compression)
                    .model(&model)
                    .write()
                    .await
                    .unwrap();

                let restored = Archive::open(archive.path()).await.unwrap();
                prop_assert_eq!(restored.payload(), data.as_slice());
                prop_assert_eq!(restored.manifest().payload_len, data.len() as u64);
            }
            Ok(())
        })?;
    }
}
