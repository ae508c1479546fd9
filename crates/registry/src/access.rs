//! Access grants and licenses on registrations.
//!
//! A grant without an expiry is permanent; a grant with one is a license.
//! Expiry is evaluated when a check runs, against the time the caller
//! supplies, so an expired license simply stops counting. Nothing sweeps it.
//!
//! The owner of a registration always has access and never holds a grant.

use crate::errors::{RegistryError, Result};
use crate::ownership::OwnershipLedger;
use crate::types::AccessGrant;
use notary_time::Timestamp;
use notary_types::{Address, RegistrationId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct AccessControlList {
    /// Registration -> grantee -> grant
    grants: BTreeMap<RegistrationId, BTreeMap<Address, AccessGrant>>,
}

impl AccessControlList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite the grant for `(id, grantee)`.
    ///
    /// Overwriting is how an owner extends, shortens or makes permanent an
    /// existing grant.
    pub fn grant_access(
        &mut self,
        ledger: &OwnershipLedger,
        id: RegistrationId,
        caller: Address,
        grantee: Address,
        expires_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<AccessGrant> {
        ledger.authorize(&id, &caller)?;

        if grantee == caller {
            return Err(RegistryError::InvalidTarget(
                "the owner already has access and cannot be granted it".to_string(),
            ));
        }
        if grantee.is_null() {
            return Err(RegistryError::InvalidTarget(
                "cannot grant access to the null address".to_string(),
            ));
        }
        if let Some(expires_at) = expires_at {
            if expires_at <= now {
                return Err(RegistryError::InvalidInput(format!(
                    "expiry {expires_at} is not after current time {now}"
                )));
            }
        }

        let grant = AccessGrant {
            registration_id: id,
            grantee,
            granted_at: now,
            expires_at,
        };
        self.insert(grant.clone());
        Ok(grant)
    }

    /// Grant access for `duration_secs` seconds from `now`.
    pub fn issue_license(
        &mut self,
        ledger: &OwnershipLedger,
        id: RegistrationId,
        caller: Address,
        grantee: Address,
        duration_secs: i64,
        now: Timestamp,
    ) -> Result<AccessGrant> {
        if duration_secs <= 0 {
            return Err(RegistryError::InvalidInput(format!(
                "license duration must be positive, got {duration_secs}"
            )));
        }
        let expires_at = now.saturating_add_secs(duration_secs as u64);
        self.grant_access(ledger, id, caller, grantee, Some(expires_at), now)
    }

    /// Remove the grant for `(id, grantee)`. Returns whether one existed.
    ///
    /// Revoking a grant that does not exist succeeds.
    pub fn revoke_access(
        &mut self,
        ledger: &OwnershipLedger,
        id: RegistrationId,
        caller: Address,
        grantee: Address,
    ) -> Result<bool> {
        ledger.authorize(&id, &caller)?;
        Ok(self.remove(&id, &grantee))
    }

    /// Whether `address` may access `id` at `now`.
    pub fn check_access(
        &self,
        ledger: &OwnershipLedger,
        id: &RegistrationId,
        address: &Address,
        now: Timestamp,
    ) -> bool {
        if ledger.is_owner(id, address) {
            return true;
        }
        self.grants
            .get(id)
            .and_then(|grants| grants.get(address))
            .is_some_and(|grant| grant.is_active_at(now))
    }

    /// Live grants on `id`, ordered by grantee.
    pub fn active_grants(&self, id: &RegistrationId, now: Timestamp) -> Vec<AccessGrant> {
        self.grants
            .get(id)
            .map(|grants| {
                grants
                    .values()
                    .filter(|grant| grant.is_active_at(now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Registrations on which `grantee` holds a live grant.
    pub fn shared_with(&self, grantee: &Address, now: Timestamp) -> Vec<RegistrationId> {
        self.grants
            .iter()
            .filter(|(_, grants)| {
                grants
                    .get(grantee)
                    .is_some_and(|grant| grant.is_active_at(now))
            })
            .map(|(id, _)| *id)
            .collect()
    }

    /// Every stored grant, expired or not.
    pub fn all_grants(&self) -> impl Iterator<Item = &AccessGrant> + '_ {
        self.grants.values().flat_map(|grants| grants.values())
    }

    pub(crate) fn insert(&mut self, grant: AccessGrant) {
        self.grants
            .entry(grant.registration_id)
            .or_default()
            .insert(grant.grantee, grant);
    }

    pub(crate) fn remove(&mut self, id: &RegistrationId, grantee: &Address) -> bool {
        let Some(grants) = self.grants.get_mut(id) else {
            return false;
        };
        let removed = grants.remove(grantee).is_some();
        if grants.is_empty() {
            self.grants.remove(id);
        }
        removed
    }

    /// Drop every grant on `id`. Returns how many were removed.
    pub(crate) fn clear(&mut self, id: &RegistrationId) -> usize {
        self.grants.remove(id).map(|grants| grants.len()).unwrap_or(0)
    }
}
