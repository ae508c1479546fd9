use notary_registry::{
    DisputeOutcome, ErrorKind, NewRegistration, RegistryPolicy, RegistryService,
    RegistrySnapshot, SNAPSHOT_VERSION,
};
use notary_time::{ManualClock, Timestamp};
use notary_types::{Address, ContentHash, RegistrationId};
use std::sync::Arc;

const ALICE: Address = Address([0x0A; 20]);
const BOB: Address = Address([0x0B; 20]);
const CAROL: Address = Address([0x0C; 20]);
const ARBITER: Address = Address([0x0D; 20]);

fn policy() -> RegistryPolicy {
    RegistryPolicy::default().with_arbitrator(ARBITER)
}

fn populated() -> (RegistryService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Timestamp(1_000)));
    let registry = RegistryService::new(clock.clone(), policy());

    let first = registry
        .register_file(NewRegistration::new(ALICE, "QmFirst", "Deed", "Signed deed", "ipfs://meta/1"))
        .unwrap();
    let second = registry
        .register_file(NewRegistration::new(BOB, "QmSecond", "Photo", "Raw photo", ""))
        .unwrap();

    registry.grant_access(first, ALICE, CAROL, None).unwrap();
    registry.issue_license(second, BOB, CAROL, 600).unwrap();
    registry.transfer_ownership(first, ALICE, BOB).unwrap();
    registry.file_dispute(first, CAROL, "not the author").unwrap();
    registry
        .resolve_dispute(first, ARBITER, DisputeOutcome::Dismissed)
        .unwrap();
    registry.file_dispute(second, ALICE, "duplicate of my photo").unwrap();
    clock.advance(30);

    (registry, clock)
}

#[test]
fn snapshot_roundtrip_preserves_state() {
    let (registry, clock) = populated();
    let snapshot = registry.snapshot();
    assert_eq!(snapshot.version, SNAPSHOT_VERSION);

    let json = snapshot.to_json().expect("encode snapshot");
    let decoded = RegistrySnapshot::from_json(&json).expect("decode snapshot");
    assert_eq!(decoded, snapshot);

    let restored = RegistryService::restore(decoded, clock.clone(), policy()).expect("restore");
    assert_eq!(restored.snapshot(), snapshot);
    assert_eq!(restored.list_all(), registry.list_all());
    assert_eq!(restored.current_owner(RegistrationId(1)).unwrap(), BOB);
    assert!(restored.check_access(RegistrationId(1), &CAROL));
    assert!(restored.check_access(RegistrationId(2), &CAROL));
    assert!(restored.open_dispute(RegistrationId(2)).is_some());
    assert_eq!(restored.disputes_for(RegistrationId(1)).unwrap().len(), 1);

    // Counters continue where the snapshotted registry left off
    let next = restored
        .register_file(NewRegistration::new(CAROL, "QmThird", "T", "D", ""))
        .unwrap();
    assert_eq!(next, RegistrationId(3));
    let dispute = restored.file_dispute(next, ALICE, "reason").unwrap();
    assert_eq!(dispute.0, 3);

    // And the restored license still expires on schedule
    clock.advance(600);
    assert!(!restored.check_access(RegistrationId(2), &CAROL));
}

#[test]
fn restore_rejects_inconsistent_transfer_trail() {
    let (registry, clock) = populated();
    let mut snapshot = registry.snapshot();
    snapshot.transfers[0].from = CAROL;

    let err = RegistryService::restore(snapshot, clock, policy()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn restore_rejects_unknown_version() {
    let (registry, clock) = populated();
    let mut snapshot = registry.snapshot();
    snapshot.version = 99;

    let err = RegistryService::restore(snapshot, clock, policy()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn restore_rejects_duplicate_content() {
    let (registry, clock) = populated();
    let mut snapshot = registry.snapshot();
    let mut copy = snapshot.registrations[0].clone();
    copy.id = RegistrationId(50);
    snapshot.registrations.push(copy);

    let err = RegistryService::restore(snapshot, clock, policy()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateContent);
}

#[test]
fn restored_registry_never_runs_behind_its_snapshot() {
    let clock = Arc::new(ManualClock::new(Timestamp(1_000)));
    let registry = RegistryService::new(clock.clone(), policy());
    let id = registry
        .register_file(NewRegistration::new(ALICE, "QmEarly", "Deed", "Signed deed", ""))
        .unwrap();
    registry.issue_license(id, ALICE, BOB, 10).unwrap();
    clock.set(Timestamp(2_000));
    let snapshot = registry.snapshot();
    assert_eq!(snapshot.taken_at, Timestamp(2_000));

    // A later process whose clock reads before the snapshot.
    let behind = Arc::new(ManualClock::new(Timestamp(1_005)));
    let restored = RegistryService::restore(snapshot, behind.clone(), policy()).unwrap();
    assert_eq!(restored.now(), Timestamp(2_000));
    assert!(!restored.check_access(id, &BOB));
    assert!(restored.list_grants(id).unwrap().is_empty());

    let next = restored
        .register_file(NewRegistration::new(CAROL, "QmLate", "Photo", "Raw photo", ""))
        .unwrap();
    assert_eq!(next, RegistrationId(2));
    let times: Vec<Timestamp> = restored.list_all().iter().map(|r| r.registered_at).collect();
    assert_eq!(times, vec![Timestamp(1_000), Timestamp(2_000)]);

    // Once the clock passes the snapshot it is used as is.
    behind.set(Timestamp(2_500));
    assert_eq!(restored.now(), Timestamp(2_500));
}

#[test]
fn restore_rejects_malformed_records() {
    let (registry, clock) = populated();

    let mut untitled = registry.snapshot();
    untitled.registrations[0].title = String::new();
    let err = RegistryService::restore(untitled, clock.clone(), policy()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let mut to_nobody = registry.snapshot();
    to_nobody.transfers[0].to = Address::ZERO;
    let err = RegistryService::restore(to_nobody, clock.clone(), policy()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let mut open_with_verdict = registry.snapshot();
    let verdict = open_with_verdict.disputes[0].resolution.clone();
    assert!(open_with_verdict.disputes[1].resolution.is_none());
    open_with_verdict.disputes[1].resolution = verdict;
    let err = RegistryService::restore(open_with_verdict, clock, policy()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn exhausted_registration_ids_are_reported() {
    let (registry, clock) = populated();
    let mut snapshot = registry.snapshot();
    let mut last = snapshot.registrations[0].clone();
    last.id = RegistrationId(u64::MAX);
    last.content_hash = ContentHash::new("QmLast");
    snapshot.registrations.push(last);

    let restored = RegistryService::restore(snapshot, clock, policy()).unwrap();
    let err = restored
        .register_file(NewRegistration::new(CAROL, "QmOneTooMany", "T", "D", ""))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(restored.count(), 3);
    assert_eq!(
        restored.get_registration(RegistrationId(u64::MAX)).unwrap().content_hash,
        ContentHash::new("QmLast")
    );
}
