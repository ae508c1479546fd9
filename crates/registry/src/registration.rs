//! Catalog of notarized files.

use crate::errors::{RegistryError, Result};
use crate::types::FileRecord;
use notary_time::Timestamp;
use notary_types::{Address, ContentHash, RegistrationId};
use std::collections::{BTreeMap, HashMap};

/// Maximum title length in bytes.
pub const MAX_TITLE_LEN: usize = 256;
/// Maximum description length in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 4096;
/// Maximum metadata URI length in bytes.
pub const MAX_METADATA_URI_LEN: usize = 2048;

/// Fields supplied by the caller when registering a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub owner: Address,
    pub content_hash: ContentHash,
    pub title: String,
    pub description: String,
    pub metadata_uri: String,
}

impl NewRegistration {
    pub fn new(
        owner: Address,
        content_hash: impl Into<ContentHash>,
        title: impl Into<String>,
        description: impl Into<String>,
        metadata_uri: impl Into<String>,
    ) -> Self {
        Self {
            owner,
            content_hash: content_hash.into(),
            title: title.into(),
            description: description.into(),
            metadata_uri: metadata_uri.into(),
        }
    }

    /// Validate the shape of the request.
    pub fn validate(&self) -> Result<()> {
        validate_fields(
            &self.owner,
            &self.content_hash,
            &self.title,
            &self.description,
            &self.metadata_uri,
        )
    }
}

/// Field rules shared by new registrations and records read from snapshots.
fn validate_fields(
    owner: &Address,
    content_hash: &ContentHash,
    title: &str,
    description: &str,
    metadata_uri: &str,
) -> Result<()> {
    if owner.is_null() {
        return Err(RegistryError::InvalidInput(
            "owner cannot be the null address".to_string(),
        ));
    }

    content_hash
        .validate()
        .map_err(|e| RegistryError::InvalidInput(e.to_string()))?;

    if title.trim().is_empty() {
        return Err(RegistryError::InvalidInput("title cannot be empty".to_string()));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(RegistryError::InvalidInput(format!(
            "title too long (max {MAX_TITLE_LEN} bytes)"
        )));
    }

    if description.trim().is_empty() {
        return Err(RegistryError::InvalidInput(
            "description cannot be empty".to_string(),
        ));
    }
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(RegistryError::InvalidInput(format!(
            "description too long (max {MAX_DESCRIPTION_LEN} bytes)"
        )));
    }

    if metadata_uri.len() > MAX_METADATA_URI_LEN {
        return Err(RegistryError::InvalidInput(format!(
            "metadata URI too long (max {MAX_METADATA_URI_LEN} bytes)"
        )));
    }

    Ok(())
}

/// Append-only catalog keyed by [`RegistrationId`].
///
/// Records are never removed. Ids are handed out sequentially, so iterating
/// the primary index yields registrations in registration order.
#[derive(Debug, Clone)]
pub struct RegistrationStore {
    /// Primary index: id -> record
    records: BTreeMap<RegistrationId, FileRecord>,
    /// Secondary index: content hash -> id
    by_content: HashMap<ContentHash, RegistrationId>,
    /// `None` once every id has been handed out
    next_id: Option<RegistrationId>,
}

impl RegistrationStore {
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            by_content: HashMap::new(),
            next_id: Some(RegistrationId::FIRST),
        }
    }

    /// Validate and append a new registration, returning its id.
    pub fn register(&mut self, request: NewRegistration, at: Timestamp) -> Result<RegistrationId> {
        request.validate()?;

        if let Some(existing) = self.by_content.get(&request.content_hash) {
            return Err(RegistryError::DuplicateContent {
                hash: request.content_hash,
                existing: *existing,
            });
        }

        let id = self.next_id.ok_or_else(|| {
            RegistryError::InvalidInput("registration ids are exhausted".to_string())
        })?;
        let record = FileRecord {
            id,
            registrant: request.owner,
            content_hash: request.content_hash,
            title: request.title,
            description: request.description,
            metadata_uri: request.metadata_uri,
            registered_at: at,
        };

        self.by_content.insert(record.content_hash.clone(), id);
        self.records.insert(id, record);
        self.next_id = id.next();

        Ok(id)
    }

    /// Re-insert a record read back from a snapshot.
    pub(crate) fn restore(&mut self, record: FileRecord) -> Result<()> {
        if record.id < RegistrationId::FIRST {
            return Err(RegistryError::InvalidInput(format!(
                "snapshot registration id {} is out of range",
                record.id
            )));
        }
        validate_fields(
            &record.registrant,
            &record.content_hash,
            &record.title,
            &record.description,
            &record.metadata_uri,
        )
        .map_err(|err| match err {
            RegistryError::InvalidInput(reason) => RegistryError::InvalidInput(format!(
                "snapshot registration {}: {reason}",
                record.id
            )),
            other => other,
        })?;

        if self.records.contains_key(&record.id) {
            return Err(RegistryError::Conflict(format!(
                "registration {} appears twice in snapshot",
                record.id
            )));
        }
        if let Some(existing) = self.by_content.get(&record.content_hash) {
            return Err(RegistryError::DuplicateContent {
                hash: record.content_hash,
                existing: *existing,
            });
        }

        if self.next_id.is_some_and(|next| record.id >= next) {
            self.next_id = record.id.next();
        }
        self.by_content.insert(record.content_hash.clone(), record.id);
        self.records.insert(record.id, record);
        Ok(())
    }

    pub fn get(&self, id: &RegistrationId) -> Result<&FileRecord> {
        self.records
            .get(id)
            .ok_or_else(|| RegistryError::registration_not_found(*id))
    }

    pub fn contains(&self, id: &RegistrationId) -> bool {
        self.records.contains_key(id)
    }

    pub fn find_by_content(&self, hash: &ContentHash) -> Option<RegistrationId> {
        self.by_content.get(hash).copied()
    }

    /// All records in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> + '_ {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Id the next registration will receive, `None` when ids are exhausted.
    pub fn next_id(&self) -> Option<RegistrationId> {
        self.next_id
    }
}

impl Default for RegistrationStore {
    fn default() -> Self {
        Self::new()
    }
}
