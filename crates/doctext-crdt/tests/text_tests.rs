use doctext_crdt::{Operation, OperationKind, ReplicatedText};
use doctext_types::SiteId;

fn seed(site: SiteId, content: &str) -> ReplicatedText {
    let mut text = ReplicatedText::new(site);
    text.apply_local(OperationKind::Insert, 0, Some(content.to_string()), None)
        .unwrap();
    text
}

#[test]
fn new_text_is_empty() {
    let text = ReplicatedText::new(SiteId::new(1));
    assert_eq!(text.content(), "");
    assert!(text.is_empty());
}

#[test]
fn apply_local_insert_appends_content() {
    let mut text = ReplicatedText::new(SiteId::new(1));
    text.apply_local(OperationKind::Insert, 0, Some("ABC".into()), None)
        .unwrap();
    assert_eq!(text.content(), "ABC");
    assert_eq!(text.len(), 3);
}

#[test]
fn apply_local_insert_missing_content_is_malformed() {
    let mut text = ReplicatedText::new(SiteId::new(1));
    let err = text.apply_local(OperationKind::Insert, 0, None, None);
    assert!(err.is_err());
}

#[test]
fn apply_local_delete_missing_length_is_malformed() {
    let mut text = seed(SiteId::new(1), "ABC");
    let err = text.apply_local(OperationKind::Delete, 0, None, None);
    assert!(err.is_err());
}

#[test]
fn apply_local_delete_zero_length_is_malformed() {
    let mut text = seed(SiteId::new(1), "ABC");
    let err = text.apply_local(OperationKind::Delete, 0, None, Some(0));
    assert!(err.is_err());
}

#[test]
fn insert_position_past_end_is_clamped() {
    let mut text = seed(SiteId::new(1), "AB");
    text.apply_local(OperationKind::Insert, 999, Some("C".into()), None)
        .unwrap();
    assert_eq!(text.content(), "ABC");
}

#[test]
fn delete_spanning_past_end_is_truncated() {
    let mut text = seed(SiteId::new(1), "ABC");
    text.apply_local(OperationKind::Delete, 1, None, Some(999))
        .unwrap();
    assert_eq!(text.content(), "A");
}

#[test]
fn size_arithmetic_insert() {
    let mut text = seed(SiteId::new(1), "ABC");
    let before = text.len();
    text.apply_local(OperationKind::Insert, 1, Some("XY".into()), None)
        .unwrap();
    assert_eq!(text.len(), before + 2);
}

#[test]
fn size_arithmetic_delete() {
    let mut text = seed(SiteId::new(1), "ABCDE");
    let before = text.len();
    text.apply_local(OperationKind::Delete, 1, None, Some(2))
        .unwrap();
    assert_eq!(text.len(), before - 2);
}

#[test]
fn apply_remote_duplicate_op_id_is_ignored() {
    let mut text = ReplicatedText::new(SiteId::new(1));
    let op = Operation::insert(0, "A".into(), SiteId::new(2), 1);

    let first = text.apply_remote(op.clone()).unwrap();
    assert!(first.applied);
    assert_eq!(text.content(), "A");

    let second = text.apply_remote(op).unwrap();
    assert!(!second.applied);
    assert_eq!(text.content(), "A");
}

#[test]
fn apply_remote_stale_lamport_is_ignored() {
    let mut text = ReplicatedText::new(SiteId::new(1));
    let newer = Operation::insert(0, "A".into(), SiteId::new(2), 5);
    text.apply_remote(newer).unwrap();

    let older = Operation::insert(0, "B".into(), SiteId::new(2), 3);
    let outcome = text.apply_remote(older).unwrap();
    assert!(!outcome.applied);
    assert_eq!(text.content(), "A");
}

#[test]
fn snapshot_restore_round_trips_content() {
    let mut text = seed(SiteId::new(1), "ABC");
    text.apply_local(OperationKind::Delete, 1, None, Some(1))
        .unwrap();

    let snapshot = text.snapshot();
    let restored = ReplicatedText::restore(SiteId::new(1), snapshot).unwrap();

    assert_eq!(text.content(), restored.content());
    assert_eq!(text.vector_clock(), restored.vector_clock());
}

/// Scenario 1: two-peer convergence. "ABC" + concurrent inserts at position 1
/// converge to "AXYBC" on both replicas (site 1 < site 2 tie-break).
#[test]
fn scenario_two_peer_convergence() {
    let site1 = SiteId::new(1);
    let site2 = SiteId::new(2);

    let mut replica1 = ReplicatedText::new(site1);
    let seed_op = replica1
        .apply_local(OperationKind::Insert, 0, Some("ABC".into()), None)
        .unwrap();

    let mut replica2 = ReplicatedText::new(site2);
    replica2.apply_remote(seed_op).unwrap();

    // Each replica generates its insert from its own view, before seeing
    // the other's — genuinely concurrent, not a hand-picked lamport.
    let insert_x = replica1
        .apply_local(OperationKind::Insert, 1, Some("X".into()), None)
        .unwrap();
    let insert_y = replica2
        .apply_local(OperationKind::Insert, 1, Some("Y".into()), None)
        .unwrap();

    replica1.apply_remote(insert_y).unwrap();
    replica2.apply_remote(insert_x).unwrap();

    assert_eq!(replica1.content(), "AXYBC");
    assert_eq!(replica2.content(), "AXYBC");
}

/// Scenario 2: delete-then-insert. "ABCDEF"; P1 deletes index `[1,2)` ("B"),
/// then P2 (having received that delete) deletes its own `[1,2)` — now "C" —
/// against its current view. Final content converges to "ADEF" on both.
#[test]
fn scenario_delete_then_insert() {
    let site1 = SiteId::new(1);
    let site2 = SiteId::new(2);

    let mut replica1 = ReplicatedText::new(site1);
    let seed_op = replica1
        .apply_local(OperationKind::Insert, 0, Some("ABCDEF".into()), None)
        .unwrap();
    let mut replica2 = ReplicatedText::new(site2);
    replica2.apply_remote(seed_op).unwrap();

    let delete_b = replica1
        .apply_local(OperationKind::Delete, 1, None, Some(1))
        .unwrap();
    replica2.apply_remote(delete_b.clone()).unwrap();
    assert_eq!(replica2.content(), "ACDEF");

    let delete_c = replica2
        .apply_local(OperationKind::Delete, 1, None, Some(1))
        .unwrap();
    replica1.apply_remote(delete_c).unwrap();

    assert_eq!(replica1.content(), "ADEF");
    assert_eq!(replica2.content(), "ADEF");
}

/// Scenario 3: concurrent delete overlap. "HELLO WORLD" with two disjoint
/// concurrent deletes covering the whole string converges to "".
#[test]
fn scenario_concurrent_delete_overlap() {
    let site1 = SiteId::new(1);
    let site2 = SiteId::new(2);

    let mut replica1 = ReplicatedText::new(site1);
    let seed_op = replica1
        .apply_local(OperationKind::Insert, 0, Some("HELLO WORLD".into()), None)
        .unwrap();
    let mut replica2 = ReplicatedText::new(site2);
    replica2.apply_remote(seed_op).unwrap();

    let delete_left = replica1
        .apply_local(OperationKind::Delete, 0, None, Some(6))
        .unwrap();
    let delete_right = Operation::delete(6, 5, site2, 1);

    replica1.apply_remote(delete_right.clone()).unwrap();
    replica2.apply_remote(delete_left).unwrap();
    replica2.apply_remote(delete_right).unwrap();

    assert_eq!(replica1.content(), "");
    assert_eq!(replica2.content(), "");
}

/// Scenario 6: duplicate op. Submitting the same operation twice produces no
/// further content change (and `apply_remote` reports it was not applied).
#[test]
fn scenario_duplicate_op_is_idempotent() {
    let mut text = ReplicatedText::new(SiteId::new(1));
    let op = Operation::insert(0, "hi".into(), SiteId::new(2), 1);

    let first = text.apply_remote(op.clone()).unwrap();
    let content_after_first = text.content();
    let second = text.apply_remote(op).unwrap();

    assert!(first.applied);
    assert!(!second.applied);
    assert_eq!(text.content(), content_after_first);
}
