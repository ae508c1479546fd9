//! Registry service: the single mutation entry point.
//!
//! Mutations are applied one at a time under a writer lock. Each one runs
//! against a private copy of the committed state and the copy replaces the
//! committed state only if every step succeeded, so a failed operation
//! commits nothing. Readers take the committed `Arc` and never see a
//! half-applied operation.

use crate::errors::{RegistryError, Result};
use crate::policy::RegistryPolicy;
use crate::registration::NewRegistration;
use crate::snapshot::{RegistrySnapshot, RegistryState};
use crate::types::{
    AccessGrant, AuditReport, Dispute, DisputeOutcome, Registration, TransferRecord,
};
use notary_time::{Clock, Timestamp};
use notary_types::{Address, ContentHash, DisputeId, RegistrationId};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RegistryService {
    committed: RwLock<Arc<RegistryState>>,
    writer: Mutex<()>,
    clock: Arc<dyn Clock>,
    /// Nothing is decided at a time before this.
    floor: Timestamp,
    policy: RegistryPolicy,
}

impl std::fmt::Debug for RegistryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("RegistryService")
            .field("registrations", &state.registrations.len())
            .field("clock", &self.clock)
            .field("floor", &self.floor)
            .field("policy", &self.policy)
            .finish()
    }
}

impl RegistryService {
    /// Create an empty registry.
    pub fn new(clock: Arc<dyn Clock>, policy: RegistryPolicy) -> Self {
        Self::with_state(RegistryState::default(), clock, Timestamp::ZERO, policy)
    }

    /// Rebuild a registry from a previously taken snapshot.
    pub fn restore(
        snapshot: RegistrySnapshot,
        clock: Arc<dyn Clock>,
        policy: RegistryPolicy,
    ) -> Result<Self> {
        let taken_at = snapshot.taken_at;
        let state = RegistryState::from_snapshot(snapshot)?;
        let floor = taken_at.max(state.latest_timestamp());

        let clock_now = clock.now();
        if clock_now < floor {
            warn!(
                clock = %clock_now,
                %floor,
                "clock is behind the restored registry, holding time at the snapshot"
            );
        }
        info!(
            registrations = state.registrations.len(),
            %floor,
            "restored registry from snapshot"
        );
        Ok(Self::with_state(state, clock, floor, policy))
    }

    fn with_state(
        state: RegistryState,
        clock: Arc<dyn Clock>,
        floor: Timestamp,
        policy: RegistryPolicy,
    ) -> Self {
        Self {
            committed: RwLock::new(Arc::new(state)),
            writer: Mutex::new(()),
            clock,
            floor,
            policy,
        }
    }

    pub fn policy(&self) -> &RegistryPolicy {
        &self.policy
    }

    /// Current logical time: the clock, held at the restored state's
    /// latest time if the clock reads earlier.
    pub fn now(&self) -> Timestamp {
        self.clock.now().max(self.floor)
    }

    /// The most recently committed state.
    fn state(&self) -> Arc<RegistryState> {
        Arc::clone(&self.committed.read())
    }

    /// Run `op` against a copy of the committed state and publish the copy
    /// if it succeeds.
    fn commit<T>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&mut RegistryState, Timestamp) -> Result<T>,
    ) -> Result<T> {
        let _serial = self.writer.lock();
        let now = self.now();
        let mut draft = RegistryState::clone(&self.state());

        match op(&mut draft, now) {
            Ok(value) => {
                *self.committed.write() = Arc::new(draft);
                Ok(value)
            }
            Err(err) => {
                debug!(operation, error = %err, "registry operation rejected");
                Err(err)
            }
        }
    }

    fn view(state: &RegistryState, id: &RegistrationId) -> Result<Registration> {
        let record = state.registrations.get(id)?;
        let owner = state.ownership.current_owner(id)?;
        Ok(Registration::from_record(record, owner))
    }

    // ==== REGISTRATION ====

    pub fn register_file(&self, request: NewRegistration) -> Result<RegistrationId> {
        let owner = request.owner;
        let id = self.commit("register_file", |state, now| {
            let id = state.registrations.register(request, now)?;
            state.ownership.assign_initial(id, owner)?;
            Ok(id)
        })?;
        info!(%id, %owner, "file registered");
        Ok(id)
    }

    pub fn get_registration(&self, id: RegistrationId) -> Result<Registration> {
        Self::view(&self.state(), &id)
    }

    /// Registrations owned by `owner`, in registration order.
    pub fn list_by_owner(&self, owner: &Address) -> Vec<Registration> {
        let state = self.state();
        state
            .ownership
            .owned_by(owner)
            .iter()
            .filter_map(|id| Self::view(&state, id).ok())
            .collect()
    }

    /// Every registration, in registration order.
    pub fn list_all(&self) -> Vec<Registration> {
        let state = self.state();
        state
            .registrations
            .iter()
            .filter_map(|record| {
                let owner = state.ownership.current_owner(&record.id).ok()?;
                Some(Registration::from_record(record, owner))
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.state().registrations.len()
    }

    pub fn count_by_owner(&self, owner: &Address) -> usize {
        self.state().ownership.count_owned(owner)
    }

    /// The `index`-th registration (zero based) currently owned by `owner`.
    pub fn registration_of_owner_at(&self, owner: &Address, index: usize) -> Result<Registration> {
        let state = self.state();
        let id = state.ownership.owned_at(owner, index).ok_or_else(|| {
            RegistryError::NotFound(format!("registration #{index} of {owner}"))
        })?;
        Self::view(&state, &id)
    }

    pub fn find_by_content_hash(&self, hash: &ContentHash) -> Option<Registration> {
        let state = self.state();
        let id = state.registrations.find_by_content(hash)?;
        Self::view(&state, &id).ok()
    }

    // ==== OWNERSHIP ====

    pub fn current_owner(&self, id: RegistrationId) -> Result<Address> {
        self.state().ownership.current_owner(&id)
    }

    pub fn is_owner(&self, id: RegistrationId, address: &Address) -> bool {
        self.state().ownership.is_owner(&id, address)
    }

    pub fn transfer_ownership(
        &self,
        id: RegistrationId,
        caller: Address,
        new_owner: Address,
    ) -> Result<TransferRecord> {
        let policy = &self.policy;
        let (record, dropped) = self.commit("transfer_ownership", |state, now| {
            // Same check order as the ledger: existence, then the caller.
            state.ownership.authorize(&id, &caller)?;
            if policy.freeze_transfers_on_dispute {
                if let Some(open) = state.disputes.open_dispute(&id) {
                    return Err(RegistryError::Conflict(format!(
                        "registration {id} is frozen by open dispute {}",
                        open.id
                    )));
                }
            }

            let record = state.ownership.transfer_ownership(id, caller, new_owner, now)?;

            let dropped = if policy.revoke_grants_on_transfer {
                state.access.clear(&id)
            } else {
                // The new owner's access is implicit from now on.
                usize::from(state.access.remove(&id, &new_owner))
            };
            Ok((record, dropped))
        })?;

        info!(
            %id,
            from = %record.from,
            to = %record.to,
            grants_dropped = dropped,
            "ownership transferred"
        );
        Ok(record)
    }

    pub fn transfer_history(&self, id: RegistrationId) -> Result<Vec<TransferRecord>> {
        let state = self.state();
        if !state.registrations.contains(&id) {
            return Err(RegistryError::registration_not_found(id));
        }
        Ok(state.ownership.history(&id).to_vec())
    }

    // ==== ACCESS ====

    pub fn grant_access(
        &self,
        id: RegistrationId,
        caller: Address,
        grantee: Address,
        expires_at: Option<Timestamp>,
    ) -> Result<AccessGrant> {
        let grant = self.commit("grant_access", |state, now| {
            let RegistryState {
                ownership, access, ..
            } = state;
            access.grant_access(ownership, id, caller, grantee, expires_at, now)
        })?;
        info!(%id, %grantee, expires_at = ?grant.expires_at, "access granted");
        Ok(grant)
    }

    pub fn issue_license(
        &self,
        id: RegistrationId,
        caller: Address,
        grantee: Address,
        duration_secs: i64,
    ) -> Result<AccessGrant> {
        let grant = self.commit("issue_license", |state, now| {
            let RegistryState {
                ownership, access, ..
            } = state;
            access.issue_license(ownership, id, caller, grantee, duration_secs, now)
        })?;
        info!(%id, %grantee, expires_at = ?grant.expires_at, "license issued");
        Ok(grant)
    }

    pub fn revoke_access(&self, id: RegistrationId, caller: Address, grantee: Address) -> Result<()> {
        let removed = self.commit("revoke_access", |state, _now| {
            let RegistryState {
                ownership, access, ..
            } = state;
            access.revoke_access(ownership, id, caller, grantee)
        })?;
        if removed {
            info!(%id, %grantee, "access revoked");
        } else {
            debug!(%id, %grantee, "revoke of absent grant ignored");
        }
        Ok(())
    }

    /// Whether `address` may access `id` right now. Unknown ids yield `false`.
    pub fn check_access(&self, id: RegistrationId, address: &Address) -> bool {
        let state = self.state();
        state
            .access
            .check_access(&state.ownership, &id, address, self.now())
    }

    /// Grants on `id` that have not expired.
    pub fn list_grants(&self, id: RegistrationId) -> Result<Vec<AccessGrant>> {
        let state = self.state();
        if !state.registrations.contains(&id) {
            return Err(RegistryError::registration_not_found(id));
        }
        Ok(state.access.active_grants(&id, self.now()))
    }

    /// Registrations shared with `address` through a live grant.
    pub fn list_shared_with(&self, address: &Address) -> Vec<Registration> {
        let state = self.state();
        state
            .access
            .shared_with(address, self.now())
            .iter()
            .filter_map(|id| Self::view(&state, id).ok())
            .collect()
    }

    // ==== DISPUTES ====

    pub fn file_dispute(
        &self,
        id: RegistrationId,
        claimant: Address,
        reason: impl Into<String>,
    ) -> Result<DisputeId> {
        let reason = reason.into();
        let dispute_id = self.commit("file_dispute", |state, now| {
            let RegistryState {
                ownership,
                disputes,
                ..
            } = state;
            disputes.file_dispute(ownership, id, claimant, reason, now)
        })?;
        info!(%id, dispute = %dispute_id, %claimant, "dispute opened");
        Ok(dispute_id)
    }

    pub fn resolve_dispute(
        &self,
        id: RegistrationId,
        resolver: Address,
        outcome: DisputeOutcome,
    ) -> Result<Dispute> {
        let policy = &self.policy;
        let dispute = self.commit("resolve_dispute", |state, now| {
            let RegistryState {
                ownership,
                disputes,
                ..
            } = state;
            disputes.resolve_dispute(ownership, policy, id, resolver, outcome, now)
        })?;
        info!(%id, dispute = %dispute.id, %resolver, %outcome, "dispute resolved");
        Ok(dispute)
    }

    pub fn open_dispute(&self, id: RegistrationId) -> Option<Dispute> {
        self.state().disputes.open_dispute(&id).cloned()
    }

    pub fn disputes_for(&self, id: RegistrationId) -> Result<Vec<Dispute>> {
        let state = self.state();
        if !state.registrations.contains(&id) {
            return Err(RegistryError::registration_not_found(id));
        }
        Ok(state.disputes.history(&id))
    }

    pub fn list_open_disputes(&self) -> Vec<Dispute> {
        self.state().disputes.open_disputes()
    }

    // ==== AUDIT & SNAPSHOT ====

    /// Registration, transfer trail, live grants and disputes of `id`,
    /// all read from one committed state.
    pub fn audit(&self, id: RegistrationId) -> Result<AuditReport> {
        let state = self.state();
        let now = self.now();
        let registration = Self::view(&state, &id)?;
        let registrant = state.registrations.get(&id)?.registrant;

        Ok(AuditReport {
            registration,
            registrant,
            transfers: state.ownership.history(&id).to_vec(),
            active_grants: state.access.active_grants(&id, now),
            disputes: state.disputes.history(&id),
            audited_at: now,
        })
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.state().to_snapshot(self.now())
    }
}
