//! Serializable image of the committed registry state

use crate::access::AccessControlList;
use crate::dispute::DisputeLedger;
use crate::errors::{RegistryError, Result};
use crate::ownership::OwnershipLedger;
use crate::registration::RegistrationStore;
use crate::types::{AccessGrant, Dispute, FileRecord, TransferRecord};
use notary_time::Timestamp;
use serde::{Deserialize, Serialize};

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The four stores as one consistent unit.
#[derive(Debug, Clone, Default)]
pub struct RegistryState {
    pub registrations: RegistrationStore,
    pub ownership: OwnershipLedger,
    pub access: AccessControlList,
    pub disputes: DisputeLedger,
}

/// Flat, order-preserving form of [`RegistryState`].
///
/// Owners are not stored directly: each registration starts with its
/// registrant and the transfer trail is replayed on restore, so a snapshot
/// can never describe an owner the trail does not explain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub version: u32,
    pub taken_at: Timestamp,
    pub registrations: Vec<FileRecord>,
    #[serde(default)]
    pub transfers: Vec<TransferRecord>,
    #[serde(default)]
    pub grants: Vec<AccessGrant>,
    #[serde(default)]
    pub disputes: Vec<Dispute>,
}

impl RegistrySnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RegistryError::InvalidInput(format!("snapshot encoding failed: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| RegistryError::InvalidInput(format!("snapshot decoding failed: {e}")))
    }
}

impl RegistryState {
    pub fn to_snapshot(&self, taken_at: Timestamp) -> RegistrySnapshot {
        let registrations: Vec<FileRecord> = self.registrations.iter().cloned().collect();
        let transfers = registrations
            .iter()
            .flat_map(|record| self.ownership.history(&record.id).iter().cloned())
            .collect();

        RegistrySnapshot {
            version: SNAPSHOT_VERSION,
            taken_at,
            registrations,
            transfers,
            grants: self.access.all_grants().cloned().collect(),
            disputes: self.disputes.all().cloned().collect(),
        }
    }

    /// Rebuild state from a snapshot, checking it for internal consistency.
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(RegistryError::InvalidInput(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }

        let mut state = RegistryState::default();

        for record in snapshot.registrations {
            let id = record.id;
            let registrant = record.registrant;
            state.registrations.restore(record)?;
            state.ownership.assign_initial(id, registrant)?;
        }

        for transfer in snapshot.transfers {
            state.ownership.restore_transfer(transfer)?;
        }

        for grant in snapshot.grants {
            if grant.grantee.is_null() {
                return Err(RegistryError::Conflict(format!(
                    "snapshot stores a grant to the null address on registration {}",
                    grant.registration_id
                )));
            }
            let owner = state.ownership.current_owner(&grant.registration_id)?;
            if owner == grant.grantee {
                return Err(RegistryError::Conflict(format!(
                    "snapshot stores a grant for the owner of registration {}",
                    grant.registration_id
                )));
            }
            state.access.insert(grant);
        }

        for dispute in snapshot.disputes {
            if !state.registrations.contains(&dispute.registration_id) {
                return Err(RegistryError::registration_not_found(dispute.registration_id));
            }
            state.disputes.restore(dispute)?;
        }

        Ok(state)
    }

    /// The latest time recorded anywhere in the state, `ZERO` when empty.
    pub fn latest_timestamp(&self) -> Timestamp {
        let registered = self.registrations.iter().map(|r| r.registered_at);
        let transferred = self.ownership.all_transfers().map(|t| t.at);
        let granted = self.access.all_grants().map(|g| g.granted_at);
        let disputed = self.disputes.all().flat_map(|d| {
            std::iter::once(d.opened_at).chain(d.resolution.as_ref().map(|r| r.resolved_at))
        });

        registered
            .chain(transferred)
            .chain(granted)
            .chain(disputed)
            .max()
            .unwrap_or(Timestamp::ZERO)
    }
}
