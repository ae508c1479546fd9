//! Ownership tracking: who owns which registration, and how it got there

use crate::errors::{RegistryError, Result};
use crate::types::TransferRecord;
use notary_time::Timestamp;
use notary_types::{Address, RegistrationId};
use std::collections::{BTreeSet, HashMap};

/// Current owner per registration plus the append-only transfer trail.
#[derive(Debug, Clone, Default)]
pub struct OwnershipLedger {
    /// Registration -> current owner
    owners: HashMap<RegistrationId, Address>,
    /// Owner -> registrations, kept ordered so listings follow registration order
    by_owner: HashMap<Address, BTreeSet<RegistrationId>>,
    /// Registration -> transfers, oldest first
    history: HashMap<RegistrationId, Vec<TransferRecord>>,
}

impl OwnershipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the first owner of a freshly registered file.
    pub(crate) fn assign_initial(&mut self, id: RegistrationId, owner: Address) -> Result<()> {
        if self.owners.contains_key(&id) {
            return Err(RegistryError::Conflict(format!(
                "registration {id} already has an owner"
            )));
        }
        self.owners.insert(id, owner);
        self.by_owner.entry(owner).or_default().insert(id);
        Ok(())
    }

    pub fn current_owner(&self, id: &RegistrationId) -> Result<Address> {
        self.owners
            .get(id)
            .copied()
            .ok_or_else(|| RegistryError::registration_not_found(*id))
    }

    pub fn is_owner(&self, id: &RegistrationId, address: &Address) -> bool {
        self.owners.get(id) == Some(address)
    }

    /// The authorization gate for owner-only operations.
    ///
    /// Returns the owner when `caller` is it, `NotFound` for an unknown id
    /// and `Unauthorized` otherwise.
    pub fn authorize(&self, id: &RegistrationId, caller: &Address) -> Result<Address> {
        let owner = self.current_owner(id)?;
        if &owner != caller {
            return Err(RegistryError::Unauthorized {
                id: *id,
                caller: *caller,
            });
        }
        Ok(owner)
    }

    /// Move ownership of `id` from `caller` to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        id: RegistrationId,
        caller: Address,
        new_owner: Address,
        at: Timestamp,
    ) -> Result<TransferRecord> {
        let owner = self.authorize(&id, &caller)?;

        if new_owner.is_null() {
            return Err(RegistryError::InvalidTarget(
                "cannot transfer to the null address".to_string(),
            ));
        }
        if new_owner == owner {
            return Err(RegistryError::InvalidTarget(format!(
                "{new_owner} already owns registration {id}"
            )));
        }

        let record = TransferRecord {
            registration_id: id,
            from: owner,
            to: new_owner,
            at,
        };
        self.apply_transfer(record.clone());
        Ok(record)
    }

    fn apply_transfer(&mut self, record: TransferRecord) {
        let id = record.registration_id;
        self.owners.insert(id, record.to);

        if let Some(set) = self.by_owner.get_mut(&record.from) {
            set.remove(&id);
            if set.is_empty() {
                self.by_owner.remove(&record.from);
            }
        }
        self.by_owner.entry(record.to).or_default().insert(id);

        self.history.entry(id).or_default().push(record);
    }

    /// Replay a transfer read back from a snapshot.
    pub(crate) fn restore_transfer(&mut self, record: TransferRecord) -> Result<()> {
        if record.to.is_null() || record.to == record.from {
            return Err(RegistryError::Conflict(format!(
                "snapshot transfer of registration {} to {} is not a change of owner",
                record.registration_id, record.to
            )));
        }
        let owner = self.current_owner(&record.registration_id)?;
        if owner != record.from {
            return Err(RegistryError::Conflict(format!(
                "snapshot transfer of registration {} from {} does not match owner {}",
                record.registration_id, record.from, owner
            )));
        }
        self.apply_transfer(record);
        Ok(())
    }

    /// Registrations currently owned by `owner`, in registration order.
    pub fn owned_by(&self, owner: &Address) -> Vec<RegistrationId> {
        self.by_owner
            .get(owner)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn count_owned(&self, owner: &Address) -> usize {
        self.by_owner.get(owner).map(BTreeSet::len).unwrap_or(0)
    }

    /// The `index`-th registration of `owner` in registration order.
    pub fn owned_at(&self, owner: &Address, index: usize) -> Option<RegistrationId> {
        self.by_owner
            .get(owner)
            .and_then(|set| set.iter().nth(index).copied())
    }

    pub fn history(&self, id: &RegistrationId) -> &[TransferRecord] {
        self.history.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every transfer in the ledger, grouped by registration.
    pub fn all_transfers(&self) -> impl Iterator<Item = &TransferRecord> + '_ {
        self.history.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
