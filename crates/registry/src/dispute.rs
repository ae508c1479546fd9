//! Dispute records and their resolution

use crate::errors::{RegistryError, Result};
use crate::ownership::OwnershipLedger;
use crate::policy::RegistryPolicy;
use crate::types::{Dispute, DisputeOutcome, DisputeStatus, Resolution};
use notary_time::Timestamp;
use notary_types::{Address, DisputeId, RegistrationId};
use std::collections::{BTreeMap, HashMap};

/// Maximum dispute reason length in bytes.
pub const MAX_REASON_LEN: usize = 4096;

/// Disputes per registration. At most one may be open per registration;
/// resolved disputes stay as history.
#[derive(Debug, Clone)]
pub struct DisputeLedger {
    disputes: BTreeMap<DisputeId, Dispute>,
    by_registration: HashMap<RegistrationId, Vec<DisputeId>>,
    open: HashMap<RegistrationId, DisputeId>,
    /// `None` once every id has been handed out
    next_id: Option<DisputeId>,
}

impl DisputeLedger {
    pub fn new() -> Self {
        Self {
            disputes: BTreeMap::new(),
            by_registration: HashMap::new(),
            open: HashMap::new(),
            next_id: Some(DisputeId::FIRST),
        }
    }

    /// Open a dispute against `id`.
    pub fn file_dispute(
        &mut self,
        ledger: &OwnershipLedger,
        id: RegistrationId,
        claimant: Address,
        reason: String,
        now: Timestamp,
    ) -> Result<DisputeId> {
        let owner = ledger.current_owner(&id)?;

        if reason.trim().is_empty() {
            return Err(RegistryError::InvalidInput(
                "dispute reason cannot be empty".to_string(),
            ));
        }
        if reason.len() > MAX_REASON_LEN {
            return Err(RegistryError::InvalidInput(format!(
                "dispute reason too long (max {MAX_REASON_LEN} bytes)"
            )));
        }
        if claimant.is_null() {
            return Err(RegistryError::InvalidTarget(
                "claimant cannot be the null address".to_string(),
            ));
        }
        if claimant == owner {
            return Err(RegistryError::InvalidTarget(format!(
                "{claimant} owns registration {id} and cannot dispute it"
            )));
        }
        if let Some(open) = self.open.get(&id) {
            return Err(RegistryError::Conflict(format!(
                "registration {id} already has open dispute {open}"
            )));
        }

        let dispute_id = self
            .next_id
            .ok_or_else(|| RegistryError::InvalidInput("dispute ids are exhausted".to_string()))?;
        self.insert(Dispute {
            id: dispute_id,
            registration_id: id,
            claimant,
            reason,
            opened_at: now,
            status: DisputeStatus::Open,
            resolution: None,
        });
        Ok(dispute_id)
    }

    /// Close the open dispute on `id` with `outcome`.
    ///
    /// Ownership and access are not touched; a correction is a separate
    /// transfer by whoever holds the registration.
    pub fn resolve_dispute(
        &mut self,
        ledger: &OwnershipLedger,
        policy: &RegistryPolicy,
        id: RegistrationId,
        resolver: Address,
        outcome: DisputeOutcome,
        now: Timestamp,
    ) -> Result<Dispute> {
        let dispute_id = *self
            .open
            .get(&id)
            .ok_or_else(|| RegistryError::NotFound(format!("open dispute on registration {id}")))?;
        let owner = ledger.current_owner(&id)?;

        let dispute = self
            .disputes
            .get_mut(&dispute_id)
            .ok_or_else(|| RegistryError::NotFound(format!("dispute {dispute_id}")))?;

        if !policy.may_resolve(dispute, &owner, &resolver) {
            return Err(RegistryError::Unauthorized {
                id,
                caller: resolver,
            });
        }

        dispute.status = DisputeStatus::Resolved;
        dispute.resolution = Some(Resolution {
            resolver,
            outcome,
            resolved_at: now,
        });
        let resolved = dispute.clone();
        self.open.remove(&id);
        Ok(resolved)
    }

    pub(crate) fn insert(&mut self, dispute: Dispute) {
        let id = dispute.id;
        let registration_id = dispute.registration_id;
        if dispute.is_open() {
            self.open.insert(registration_id, id);
        }
        if self.next_id.is_some_and(|next| id >= next) {
            self.next_id = id.next();
        }
        self.by_registration.entry(registration_id).or_default().push(id);
        self.disputes.insert(id, dispute);
    }

    /// Re-insert a dispute read back from a snapshot.
    pub(crate) fn restore(&mut self, dispute: Dispute) -> Result<()> {
        if dispute.id < DisputeId::FIRST {
            return Err(RegistryError::InvalidInput(format!(
                "snapshot dispute id {} is out of range",
                dispute.id
            )));
        }
        if dispute.claimant.is_null() || dispute.reason.trim().is_empty() {
            return Err(RegistryError::InvalidInput(format!(
                "snapshot dispute {} has no claimant or reason",
                dispute.id
            )));
        }
        if dispute.reason.len() > MAX_REASON_LEN {
            return Err(RegistryError::InvalidInput(format!(
                "snapshot dispute {} reason too long (max {MAX_REASON_LEN} bytes)",
                dispute.id
            )));
        }
        // Open disputes carry no resolution and resolved ones always do.
        if dispute.is_open() == dispute.resolution.is_some() {
            return Err(RegistryError::Conflict(format!(
                "snapshot dispute {} status does not match its resolution",
                dispute.id
            )));
        }
        if self.disputes.contains_key(&dispute.id) {
            return Err(RegistryError::Conflict(format!(
                "dispute {} appears twice in snapshot",
                dispute.id
            )));
        }
        if dispute.is_open() && self.open.contains_key(&dispute.registration_id) {
            return Err(RegistryError::Conflict(format!(
                "registration {} has more than one open dispute in snapshot",
                dispute.registration_id
            )));
        }
        self.insert(dispute);
        Ok(())
    }

    pub fn open_dispute(&self, id: &RegistrationId) -> Option<&Dispute> {
        self.open.get(id).and_then(|d| self.disputes.get(d))
    }

    pub fn has_open_dispute(&self, id: &RegistrationId) -> bool {
        self.open.contains_key(id)
    }

    /// Every dispute on `id`, oldest first.
    pub fn history(&self, id: &RegistrationId) -> Vec<Dispute> {
        self.by_registration
            .get(id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|d| self.disputes.get(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Open disputes across the registry, ordered by dispute id.
    pub fn open_disputes(&self) -> Vec<Dispute> {
        self.disputes
            .values()
            .filter(|d| d.is_open())
            .cloned()
            .collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &Dispute> + '_ {
        self.disputes.values()
    }
}

impl Default for DisputeLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Address = Address([1u8; 20]);
    const CLAIMANT: Address = Address([2u8; 20]);
    const ARBITER: Address = Address([3u8; 20]);
    const ID: RegistrationId = RegistrationId(1);

    fn setup() -> (OwnershipLedger, DisputeLedger, RegistryPolicy) {
        let mut ledger = OwnershipLedger::new();
        ledger.assign_initial(ID, OWNER).unwrap();
        let policy = RegistryPolicy::default().with_arbitrator(ARBITER);
        (ledger, DisputeLedger::new(), policy)
    }

    #[test]
    fn test_file_and_resolve() {
        let (ledger, mut disputes, policy) = setup();
        let dispute_id = disputes
            .file_dispute(&ledger, ID, CLAIMANT, "copied work".into(), Timestamp(10))
            .unwrap();
        assert_eq!(dispute_id, DisputeId(1));
        assert!(disputes.has_open_dispute(&ID));

        let resolved = disputes
            .resolve_dispute(&ledger, &policy, ID, ARBITER, DisputeOutcome::Dismissed, Timestamp(20))
            .unwrap();
        assert_eq!(resolved.status, DisputeStatus::Resolved);
        let resolution = resolved.resolution.unwrap();
        assert_eq!(resolution.outcome, DisputeOutcome::Dismissed);
        assert_eq!(resolution.resolver, ARBITER);
        assert_eq!(resolution.resolved_at, Timestamp(20));
        assert!(!disputes.has_open_dispute(&ID));
        assert_eq!(disputes.history(&ID).len(), 1);
    }

    #[test]
    fn test_second_open_dispute_conflicts() {
        let (ledger, mut disputes, policy) = setup();
        disputes
            .file_dispute(&ledger, ID, CLAIMANT, "first".into(), Timestamp(1))
            .unwrap();
        let err = disputes
            .file_dispute(&ledger, ID, ARBITER, "second".into(), Timestamp(2))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict(_)));

        disputes
            .resolve_dispute(&ledger, &policy, ID, ARBITER, DisputeOutcome::Upheld, Timestamp(3))
            .unwrap();
        let next = disputes
            .file_dispute(&ledger, ID, ARBITER, "second".into(), Timestamp(4))
            .unwrap();
        assert_eq!(next, DisputeId(2));
        assert_eq!(disputes.history(&ID).len(), 2);
        assert_eq!(disputes.open_disputes().len(), 1);
    }

    #[test]
    fn test_dispute_on_missing_registration() {
        let (ledger, mut disputes, _) = setup();
        let err = disputes
            .file_dispute(&ledger, RegistrationId(999), CLAIMANT, "reason".into(), Timestamp(1))
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn test_invalid_claims() {
        let (ledger, mut disputes, _) = setup();
        let empty = disputes
            .file_dispute(&ledger, ID, CLAIMANT, " ".into(), Timestamp(1))
            .unwrap_err();
        assert!(matches!(empty, RegistryError::InvalidInput(_)));

        let by_owner = disputes
            .file_dispute(&ledger, ID, OWNER, "mine".into(), Timestamp(1))
            .unwrap_err();
        assert!(matches!(by_owner, RegistryError::InvalidTarget(_)));
        assert!(!disputes.has_open_dispute(&ID));
    }

    #[test]
    fn test_resolve_without_open_dispute() {
        let (ledger, mut disputes, policy) = setup();
        let err = disputes
            .resolve_dispute(&ledger, &policy, ID, ARBITER, DisputeOutcome::Upheld, Timestamp(1))
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn test_unauthorized_resolver_leaves_dispute_open() {
        let (ledger, mut disputes, policy) = setup();
        disputes
            .file_dispute(&ledger, ID, CLAIMANT, "reason".into(), Timestamp(1))
            .unwrap();
        let err = disputes
            .resolve_dispute(&ledger, &policy, ID, OWNER, DisputeOutcome::Dismissed, Timestamp(2))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized { .. }));
        let open = disputes.open_dispute(&ID).unwrap();
        assert!(open.resolution.is_none());
    }

    fn stored(id: u64, status: DisputeStatus, resolution: Option<Resolution>) -> Dispute {
        Dispute {
            id: DisputeId(id),
            registration_id: ID,
            claimant: CLAIMANT,
            reason: "prior art".into(),
            opened_at: Timestamp(1),
            status,
            resolution,
        }
    }

    #[test]
    fn test_restore_rejects_mismatched_status() {
        let mut disputes = DisputeLedger::new();
        let resolution = Resolution {
            resolver: ARBITER,
            outcome: DisputeOutcome::Upheld,
            resolved_at: Timestamp(2),
        };

        let open_but_resolved = stored(1, DisputeStatus::Open, Some(resolution));
        assert!(matches!(
            disputes.restore(open_but_resolved),
            Err(RegistryError::Conflict(_))
        ));
        let resolved_without_record = stored(1, DisputeStatus::Resolved, None);
        assert!(matches!(
            disputes.restore(resolved_without_record),
            Err(RegistryError::Conflict(_))
        ));

        let mut anonymous = stored(1, DisputeStatus::Open, None);
        anonymous.claimant = Address::ZERO;
        assert!(matches!(
            disputes.restore(anonymous),
            Err(RegistryError::InvalidInput(_))
        ));
        assert!(disputes.all().next().is_none());
    }

    #[test]
    fn test_exhausted_dispute_ids() {
        let (ledger, mut disputes, _) = setup();
        let resolution = Resolution {
            resolver: ARBITER,
            outcome: DisputeOutcome::Dismissed,
            resolved_at: Timestamp(2),
        };
        disputes
            .restore(stored(u64::MAX, DisputeStatus::Resolved, Some(resolution)))
            .unwrap();

        let err = disputes
            .file_dispute(&ledger, ID, CLAIMANT, "again".into(), Timestamp(3))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidInput(_)), "{err:?}");
        assert!(!disputes.has_open_dispute(&ID));
    }
}
