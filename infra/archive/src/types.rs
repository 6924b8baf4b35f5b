use crate::error::ArchiveError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// --- Container format constants ---

/// Leading file signature of the container.
pub(crate) const MAGIC: &[u8; 4] = b"MDAR";

/// Container header version.
pub(crate) const FORMAT_VERSION_V1: u8 = 1;

/// Header layout: `[magic: 4][version: 1][flags: 1][manifest_len: 4, LE]`
pub(crate) const HEADER_LEN: usize = 10;

/// Flag bit: payload was LZ4-compressed before writing.
pub(crate) const FLAG_COMPRESSED: u8 = 1 << 0;

/// File extension of archives written by the builder.
pub const ARCHIVE_EXTENSION: &str = "mdarc";

// --- ID generation ---

// Alphabet excludes visually ambiguous characters (I, O, l, 0, 1).
const ID_ALPHABET: &[char; 55] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Generates an unambiguous archive id.
pub(crate) fn archive_id() -> String {
    nanoid::nanoid!(12, ID_ALPHABET)
}

// --- Model taxonomy ---

/// Families of model artifacts the store understands.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ModelType {
    Linear,
    TreeEnsemble,
    Neural,
}

/// Declared input/output shape of a model, carried for documentation and
/// downstream validation. The archive layer never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub inputs: Vec<String>,
    pub output: String,
}

/// A trained model that can be captured into an archive.
///
/// This is the seam between the store and whatever training stack produced
/// the model: implementations declare what they are and hand over their state
/// as bytes. The bytes are opaque to every layer above.
pub trait ModelArtifact {
    /// Declared family of the model.
    fn model_type(&self) -> ModelType;

    /// Name of the library that produced the model.
    fn library(&self) -> &str;

    /// Version of the library that produced the model.
    fn library_version(&self) -> &str;

    /// Captures the model state as bytes.
    ///
    /// # Errors
    /// [`ArchiveError::Serialization`] if the state cannot be captured.
    fn serialize(&self) -> Result<Vec<u8>, ArchiveError>;

    /// Declared input/output schema, when the model carries one.
    fn schema(&self) -> Option<ModelSchema> {
        None
    }
}

// --- Compression ---

/// Payload compression applied when writing an archive.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

// --- Environment capture ---

/// Runtime environment recorded alongside the model so a consumer can tell
/// where an archive came from without external lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub runtime: String,
    pub os: String,
    pub arch: String,
    pub packager: String,
}

impl Environment {
    /// Captures the environment of the running process.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            runtime: "rust".to_owned(),
            os: std::env::consts::OS.to_owned(),
            arch: std::env::consts::ARCH.to_owned(),
            packager: concat!("mdock-archive ", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

// --- Manifest ---

/// Self-describing metadata embedded in every archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub archive_id: String,
    pub model_type: ModelType,
    pub library: String,
    pub library_version: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<ModelSchema>,
    pub payload_len: u64,
    pub payload_sha256: String,
    pub environment: Environment,
}

impl ArchiveManifest {
    /// Describes `payload` as captured from `artifact`, assigning a fresh
    /// archive id and digesting the payload bytes.
    pub(crate) fn describe(artifact: &dyn ModelArtifact, payload: &[u8]) -> Self {
        Self {
            archive_id: archive_id(),
            model_type: artifact.model_type(),
            library: artifact.library().to_owned(),
            library_version: artifact.library_version().to_owned(),
            created_at: Utc::now(),
            schema: artifact.schema(),
            payload_len: payload.len() as u64,
            payload_sha256: hex::encode(Sha256::digest(payload)),
            environment: Environment::capture(),
        }
    }

    /// Renders the manifest as pretty JSON.
    ///
    /// # Errors
    /// [`ArchiveError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String, ArchiveError> {
        serde_json::to_string_pretty(self).map_err(|err| ArchiveError::Serialization {
            message: "Manifest encoding failed".into(),
            context: Some(err.to_string().into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_names_are_stable() {
        assert_eq!(ModelType::TreeEnsemble.to_string(), "tree-ensemble");
        assert_eq!("linear".parse::<ModelType>().unwrap(), ModelType::Linear);
        assert!("boosting".parse::<ModelType>().is_err());
    }

    #[test]
    fn test_archive_ids_are_unique_and_unambiguous() {
        let first = archive_id();
        let second = archive_id();

        assert_eq!(first.len(), 12);
        assert_ne!(first, second);
        assert!(!first.contains(['I', 'O', 'l', '0', '1']));
    }

    #[test]
    fn test_manifest_json_shape() {
        let payload = b"model bytes";
        let manifest = ArchiveManifest {
            archive_id: archive_id(),
            model_type: ModelType::Linear,
            library: "test-lib".to_owned(),
            library_version: "0.1.0".to_owned(),
            created_at: Utc::now(),
            schema: None,
            payload_len: payload.len() as u64,
            payload_sha256: hex::encode(Sha256::digest(payload)),
            environment: Environment::capture(),
        };

        let json = manifest.to_json().unwrap();
        assert!(json.contains("\"model_type\": \"linear\""));
        assert!(json.contains("\"payload_sha256\""));
        assert!(!json.contains("\"schema\""));
    }
}
