//! Operator-selectable rules for the cases the registry cannot decide alone

use crate::types::Dispute;
use notary_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Who may close an open dispute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverPolicy {
    /// The current owner of the disputed registration.
    Owner,
    /// The claimant who opened the dispute (withdrawal).
    Claimant,
    /// A member of [`RegistryPolicy::arbitrators`].
    #[default]
    Arbitrator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryPolicy {
    /// Reject ownership transfers while a dispute is open.
    pub freeze_transfers_on_dispute: bool,
    /// Drop every access grant when ownership changes hands.
    pub revoke_grants_on_transfer: bool,
    pub resolver: ResolverPolicy,
    pub arbitrators: BTreeSet<Address>,
}

impl Default for RegistryPolicy {
    fn default() -> Self {
        Self {
            freeze_transfers_on_dispute: true,
            revoke_grants_on_transfer: false,
            resolver: ResolverPolicy::Arbitrator,
            arbitrators: BTreeSet::new(),
        }
    }
}

impl RegistryPolicy {
    pub fn with_arbitrator(mut self, arbitrator: Address) -> Self {
        self.arbitrators.insert(arbitrator);
        self
    }

    /// Whether `resolver` may close `dispute` given the registration's
    /// current owner.
    pub fn may_resolve(&self, dispute: &Dispute, owner: &Address, resolver: &Address) -> bool {
        match self.resolver {
            ResolverPolicy::Owner => resolver == owner,
            ResolverPolicy::Claimant => resolver == &dispute.claimant,
            ResolverPolicy::Arbitrator => self.arbitrators.contains(resolver),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DisputeStatus;
    use notary_time::Timestamp;
    use notary_types::{DisputeId, RegistrationId};

    fn dispute(claimant: Address) -> Dispute {
        Dispute {
            id: DisputeId(1),
            registration_id: RegistrationId(1),
            claimant,
            reason: "prior art".into(),
            opened_at: Timestamp(10),
            status: DisputeStatus::Open,
            resolution: None,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RegistryPolicy::default();
        assert!(policy.freeze_transfers_on_dispute);
        assert!(!policy.revoke_grants_on_transfer);
        assert_eq!(policy.resolver, ResolverPolicy::Arbitrator);
        assert!(policy.arbitrators.is_empty());
    }

    #[test]
    fn test_may_resolve_per_policy() {
        let owner = Address([1u8; 20]);
        let claimant = Address([2u8; 20]);
        let arbiter = Address([3u8; 20]);
        let d = dispute(claimant);

        let arbitrated = RegistryPolicy::default().with_arbitrator(arbiter);
        assert!(arbitrated.may_resolve(&d, &owner, &arbiter));
        assert!(!arbitrated.may_resolve(&d, &owner, &owner));
        assert!(!arbitrated.may_resolve(&d, &owner, &claimant));

        let by_owner = RegistryPolicy {
            resolver: ResolverPolicy::Owner,
            ..Default::default()
        };
        assert!(by_owner.may_resolve(&d, &owner, &owner));
        assert!(!by_owner.may_resolve(&d, &owner, &arbiter));

        let by_claimant = RegistryPolicy {
            resolver: ResolverPolicy::Claimant,
            ..Default::default()
        };
        assert!(by_claimant.may_resolve(&d, &owner, &claimant));
        assert!(!by_claimant.may_resolve(&d, &owner, &owner));
    }

    #[test]
    fn test_policy_deserializes_partially() {
        let policy: RegistryPolicy =
            serde_json::from_str(r#"{"resolver":"owner","revoke_grants_on_transfer":true}"#)
                .unwrap();
        assert_eq!(policy.resolver, ResolverPolicy::Owner);
        assert!(policy.revoke_grants_on_transfer);
        assert!(policy.freeze_transfers_on_dispute);
    }
}
