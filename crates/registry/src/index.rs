use crate::REGISTRY_PREFIX;
use crate::domain::DomainName;
use crate::error::{StoreError, StoreErrorExt};
use crate::record::VersionRecord;
use mdock_backend::{BackendError, ObjectKey, StorageBackend, WriteMode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of the per-domain index object.
const INDEX_OBJECT: &str = "index.json";

/// Key of the index object for `domain`.
pub(crate) fn index_key(domain: &str) -> Result<ObjectKey, StoreError> {
    ObjectKey::new(format!("{REGISTRY_PREFIX}/{domain}/{INDEX_OBJECT}"))
        .context("Index key construction failed")
}

/// Append-only version history of one domain.
///
/// The index is the single source of truth for version numbering: versions
/// come from here, never from listing stored objects, so an orphaned archive
/// left behind by a crash is simply ignored. The persisted form is a pretty
/// JSON document under the well-known key `registry/<domain>/index.json`,
/// rewritten whole on every sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelIndex {
    domain: String,
    records: Vec<VersionRecord>,
}

impl ModelIndex {
    /// An empty index for `domain`.
    #[must_use]
    pub fn new(domain: &DomainName) -> Self {
        Self { domain: domain.as_str().to_owned(), records: Vec::new() }
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Records in version order.
    #[must_use]
    pub fn records(&self) -> &[VersionRecord] {
        &self.records
    }

    /// Consumes the index, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<VersionRecord> {
        self.records
    }

    /// The version the next successful upload will receive: one above the
    /// highest recorded version, or 1 for an empty index.
    #[must_use]
    pub fn next_version(&self) -> u64 {
        self.records.iter().map(|record| record.version).max().map_or(1, |highest| highest + 1)
    }

    /// The record of `version`, if the domain has one.
    #[must_use]
    pub fn find(&self, version: u64) -> Option<&VersionRecord> {
        self.records.iter().find(|record| record.version == version)
    }

    /// Appends a record, enforcing the version discipline: the record must
    /// belong to this domain and carry exactly the next version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IndexInconsistency`] when the discipline is
    /// violated. The index is left unchanged in that case.
    pub fn append(&mut self, record: VersionRecord) -> Result<(), StoreError> {
        if record.domain != self.domain {
            return Err(StoreError::IndexInconsistency {
                message: format!(
                    "Record for '{}' cannot be appended to the index of '{}'",
                    record.domain, self.domain
                )
                .into(),
                context: None,
            });
        }

        let expected = self.next_version();
        if record.version != expected {
            return Err(StoreError::IndexInconsistency {
                message: format!(
                    "Appending version {} to '{}' but the next version is {expected}",
                    record.version, self.domain
                )
                .into(),
                context: None,
            });
        }

        self.records.push(record);
        Ok(())
    }

    /// Loads the index of `domain` from `backend`. A domain that has never
    /// been uploaded to yields an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] when the stored object is not
    /// valid JSON, [`StoreError::IndexInconsistency`] when it violates the
    /// version discipline or belongs to another domain, and
    /// [`StoreError::Backend`] when the backend read fails.
    pub async fn load(
        backend: &dyn StorageBackend,
        domain: &DomainName,
    ) -> Result<Self, StoreError> {
        let key = index_key(domain.as_str())?;

        match backend.read_bytes(&key).await {
            Ok(bytes) => {
                let index = Self::from_json(&bytes)?;
                if index.domain != domain.as_str() {
                    return Err(StoreError::IndexInconsistency {
                        message: format!(
                            "Index object {key} belongs to domain '{}'",
                            index.domain
                        )
                        .into(),
                        context: None,
                    });
                }
                Ok(index)
            },
            Err(BackendError::ObjectNotFound { .. }) => {
                debug!(domain = %domain, "No index object yet, starting empty");
                Ok(Self::new(domain))
            },
            Err(err) => Err(StoreError::from(err)).context("Index load failed"),
        }
    }

    /// Writes the index back to its well-known key, replacing the previous
    /// object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the backend write fails.
    pub async fn sync(&self, backend: &dyn StorageBackend) -> Result<(), StoreError> {
        let key = index_key(&self.domain)?;
        let json = self.to_json()?;

        backend
            .write_bytes(&key, json.as_bytes(), WriteMode::Overwrite)
            .await
            .context("Index sync failed")?;

        debug!(domain = %self.domain, records = self.records.len(), "Index synced");
        Ok(())
    }

    /// Renders the index as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|err| StoreError::Serialization {
            message: "Index encoding failed".into(),
            context: Some(err.to_string().into()),
        })
    }

    /// Decodes and verifies an index object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] for malformed JSON and
    /// [`StoreError::IndexInconsistency`] when the decoded records violate
    /// the version discipline.
    pub fn from_json(bytes: &[u8]) -> Result<Self, StoreError> {
        let index: Self = serde_json::from_slice(bytes).map_err(|err| StoreError::Serialization {
            message: "Index object is not valid JSON".into(),
            context: Some(err.to_string().into()),
        })?;

        index.verify()?;
        Ok(index)
    }

    fn verify(&self) -> Result<(), StoreError> {
        for record in &self.records {
            if record.domain != self.domain {
                return Err(StoreError::IndexInconsistency {
                    message: format!(
                        "Index of '{}' contains a record for '{}'",
                        self.domain, record.domain
                    )
                    .into(),
                    context: None,
                });
            }
        }

        for (prev, next) in self.records.iter().zip(self.records.iter().skip(1)) {
            if next.version <= prev.version {
                return Err(StoreError::IndexInconsistency {
                    message: format!("Versions of '{}' are not strictly increasing", self.domain)
                        .into(),
                    context: None,
                });
            }
        }

        Ok(())
    }
}
