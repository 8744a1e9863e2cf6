use doctext_types::{ConnectionIdAllocator, DocumentId, OperationId, PeerId, SiteIdAllocator};
use std::collections::HashSet;
use std::str::FromStr;

// ── PeerId / DocumentId ──────────────────────────────────────────

#[test]
fn peer_id_display_roundtrips_the_wrapped_string() {
    let id = PeerId::new("alice");
    assert_eq!(id.as_str(), "alice");
    assert_eq!(id.to_string(), "alice");
}

#[test]
fn document_id_equality_is_by_value() {
    let a = DocumentId::new("doc-1");
    let b = DocumentId::new("doc-1");
    assert_eq!(a, b);
}

// ── SiteId allocation ─────────────────────────────────────────────

#[test]
fn site_id_allocator_never_repeats() {
    let alloc = SiteIdAllocator::new();
    let mut seen = HashSet::new();
    for _ in 0..100 {
        assert!(seen.insert(alloc.allocate()));
    }
}

#[test]
fn site_id_allocator_is_monotonic() {
    let alloc = SiteIdAllocator::new();
    let a = alloc.allocate();
    let b = alloc.allocate();
    assert!(a.as_u32() < b.as_u32());
}

// ── ConnectionId allocation ───────────────────────────────────────

#[test]
fn connection_id_allocator_never_repeats() {
    let alloc = ConnectionIdAllocator::new();
    let mut seen = HashSet::new();
    for _ in 0..100 {
        assert!(seen.insert(alloc.allocate()));
    }
}

// ── OperationId ───────────────────────────────────────────────────

#[test]
fn operation_id_new_is_unique() {
    let a = OperationId::new();
    let b = OperationId::new();
    assert_ne!(a, b);
}

#[test]
fn operation_id_display_and_parse() {
    let id = OperationId::new();
    let s = id.to_string();
    let parsed: OperationId = s.parse().unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn operation_id_parse_invalid() {
    assert!(OperationId::from_str("not-a-uuid").is_err());
}
