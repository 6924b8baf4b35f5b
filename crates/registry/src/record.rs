use crate::domain::DomainName;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use mdock_archive::{ArchiveManifest, ModelSchema, ModelType};
use mdock_backend::Provider;
use serde::{Deserialize, Serialize};

/// Where an uploaded archive physically lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocation {
    /// Backend variant the object was stored with.
    pub provider: Provider,
    /// Backend root identity (directory path or bucket name).
    pub root: String,
    /// Object key under the root.
    pub key: String,
}

/// One immutable row of a domain's version history.
///
/// A record is written exactly once, after the archive it describes has been
/// confirmed stored; it never changes afterwards. Manifest fields are copied
/// out of the archive so the history is readable without fetching archives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub domain: String,
    pub version: u64,
    pub archive_id: String,
    pub model_type: ModelType,
    pub library: String,
    pub library_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<ModelSchema>,
    pub payload_len: u64,
    pub payload_sha256: String,
    /// When the archive was built.
    pub created_at: DateTime<Utc>,
    /// When the archive was confirmed stored.
    pub uploaded_at: DateTime<Utc>,
    pub location: ObjectLocation,
}

impl VersionRecord {
    /// Describes a confirmed upload of `manifest` as version `version` of
    /// `domain`, stamping the upload time.
    pub(crate) fn describe(
        domain: &DomainName,
        version: u64,
        manifest: &ArchiveManifest,
        location: ObjectLocation,
    ) -> Self {
        Self {
            domain: domain.as_str().to_owned(),
            version,
            archive_id: manifest.archive_id.clone(),
            model_type: manifest.model_type,
            library: manifest.library.clone(),
            library_version: manifest.library_version.clone(),
            schema: manifest.schema.clone(),
            payload_len: manifest.payload_len,
            payload_sha256: manifest.payload_sha256.clone(),
            created_at: manifest.created_at,
            uploaded_at: Utc::now(),
            location,
        }
    }

    /// Renders the record as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|err| StoreError::Serialization {
            message: "Version record encoding failed".into(),
            context: Some(err.to_string().into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdock_archive::Environment;

    fn sample_manifest() -> ArchiveManifest {
        ArchiveManifest {
            archive_id: "Akq3Tn8ZwRfM".to_owned(),
            model_type: ModelType::Linear,
            library: "linfa-linear".to_owned(),
            library_version: "0.8.0".to_owned(),
            created_at: Utc::now(),
            schema: Some(ModelSchema {
                inputs: vec!["age".to_owned(), "bmi".to_owned()],
                output: "progression".to_owned(),
            }),
            payload_len: 512,
            payload_sha256: "ab".repeat(32),
            environment: Environment::capture(),
        }
    }

    #[test]
    fn test_record_copies_manifest_fields() {
        let domain = DomainName::new("diabetes-boosting-demo").unwrap();
        let manifest = sample_manifest();
        let location = ObjectLocation {
            provider: Provider::Filesystem,
            root: "/var/lib/models".to_owned(),
            key: "registry/diabetes-boosting-demo/1.mdarc".to_owned(),
        };

        let record = VersionRecord::describe(&domain, 1, &manifest, location);

        assert_eq!(record.domain, "diabetes-boosting-demo");
        assert_eq!(record.version, 1);
        assert_eq!(record.archive_id, manifest.archive_id);
        assert_eq!(record.payload_sha256, manifest.payload_sha256);
        assert_eq!(record.created_at, manifest.created_at);
        assert!(record.uploaded_at >= record.created_at);
    }

    #[test]
    fn test_record_json_shape() {
        let domain = DomainName::new("demo").unwrap();
        let record = VersionRecord::describe(
            &domain,
            3,
            &sample_manifest(),
            ObjectLocation {
                provider: Provider::AwsS3,
                root: "models".to_owned(),
                key: "registry/demo/3.mdarc".to_owned(),
            },
        );

        let json = record.to_json().unwrap();
        assert!(json.contains("\"version\": 3"));
        assert!(json.contains("\"provider\": \"aws-s3\""));
        assert!(json.contains("\"key\": \"registry/demo/3.mdarc\""));

        let decoded: VersionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
    }
}
