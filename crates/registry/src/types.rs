//! Records held by the registry stores

use notary_time::Timestamp;
use notary_types::{Address, ContentHash, DisputeId, RegistrationId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Immutable part of a registration, as kept by the registration store.
///
/// The current owner is not stored here; it lives in the ownership ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: RegistrationId,
    /// Address that registered the file (the first owner).
    pub registrant: Address,
    pub content_hash: ContentHash,
    pub title: String,
    pub description: String,
    /// Pointer to off-registry metadata; may be empty.
    #[serde(default)]
    pub metadata_uri: String,
    pub registered_at: Timestamp,
}

/// A registration together with its current owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub owner: Address,
    pub content_hash: ContentHash,
    pub title: String,
    pub description: String,
    pub metadata_uri: String,
    pub registered_at: Timestamp,
}

impl Registration {
    pub(crate) fn from_record(record: &FileRecord, owner: Address) -> Self {
        Self {
            id: record.id,
            owner,
            content_hash: record.content_hash.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            metadata_uri: record.metadata_uri.clone(),
            registered_at: record.registered_at,
        }
    }
}

/// Permission for a non-owner to access a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub registration_id: RegistrationId,
    pub grantee: Address,
    pub granted_at: Timestamp,
    /// `None` is a permanent grant; `Some` makes it a license.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl AccessGrant {
    /// A grant is live while it has no expiry or expires strictly after `now`.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at > now,
        }
    }

    pub fn is_license(&self) -> bool {
        self.expires_at.is_some()
    }
}

/// One ownership change. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub registration_id: RegistrationId,
    pub from: Address,
    pub to: Address,
    pub at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    Resolved,
}

/// Verdict recorded when a dispute is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeOutcome {
    /// The claim was found valid. Any ownership correction is a separate transfer.
    Upheld,
    /// The claim was rejected.
    Dismissed,
}

impl fmt::Display for DisputeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisputeOutcome::Upheld => f.write_str("upheld"),
            DisputeOutcome::Dismissed => f.write_str("dismissed"),
        }
    }
}

impl FromStr for DisputeOutcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upheld" | "uphold" => Ok(DisputeOutcome::Upheld),
            "dismissed" | "dismiss" | "rejected" => Ok(DisputeOutcome::Dismissed),
            other => Err(format!("unknown dispute outcome: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolver: Address,
    pub outcome: DisputeOutcome,
    pub resolved_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub registration_id: RegistrationId,
    pub claimant: Address,
    pub reason: String,
    pub opened_at: Timestamp,
    pub status: DisputeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl Dispute {
    pub fn is_open(&self) -> bool {
        self.status == DisputeStatus::Open
    }
}

/// Everything the registry knows about one registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub registration: Registration,
    pub registrant: Address,
    pub transfers: Vec<TransferRecord>,
    pub active_grants: Vec<AccessGrant>,
    pub disputes: Vec<Dispute>,
    pub audited_at: Timestamp,
}

impl AuditReport {
    pub fn open_dispute(&self) -> Option<&Dispute> {
        self.disputes.iter().find(|d| d.is_open())
    }
}
