use doctext_sync::AwarenessRegistry;
use doctext_types::PeerId;
use std::time::Duration;

fn peer(id: &str) -> PeerId {
    PeerId::new(id)
}

#[test]
fn join_adds_peer_as_online() {
    let mut ar = AwarenessRegistry::new();
    let diff = ar.join(peer("u1"), "Ada".into(), "#fff".into());
    assert_eq!(diff.added.len(), 1);
    assert!(diff.added[0].online);
    assert_eq!(ar.len(), 1);
}

#[test]
fn cursor_clamps_to_text_length() {
    let mut ar = AwarenessRegistry::new();
    ar.join(peer("u1"), "Ada".into(), "#fff".into());
    let diff = ar.update_cursor(&peer("u1"), 999, 5).unwrap();
    assert_eq!(diff.updated[0].cursor, Some(5));
}

#[test]
fn selection_is_normalized_and_clamped() {
    let mut ar = AwarenessRegistry::new();
    ar.join(peer("u1"), "Ada".into(), "#fff".into());
    let diff = ar.update_selection(&peer("u1"), 10, 2, 5).unwrap();
    let sel = diff.updated[0].selection.unwrap();
    assert_eq!(sel.start, 2);
    assert_eq!(sel.end, 5);
}

#[test]
fn update_for_unknown_peer_returns_none() {
    let mut ar = AwarenessRegistry::new();
    assert!(ar.update_cursor(&peer("ghost"), 0, 10).is_none());
}

#[test]
fn mark_offline_flips_online_flag() {
    let mut ar = AwarenessRegistry::new();
    ar.join(peer("u1"), "Ada".into(), "#fff".into());
    let diff = ar.mark_offline(&peer("u1")).unwrap();
    assert!(!diff.updated[0].online);
}

#[test]
fn remove_clears_peer_entirely() {
    let mut ar = AwarenessRegistry::new();
    ar.join(peer("u1"), "Ada".into(), "#fff".into());
    let diff = ar.remove(&peer("u1"));
    assert_eq!(diff.removed, vec![peer("u1")]);
    assert!(ar.is_empty());
}

#[test]
fn stale_and_evictable_peers_respect_thresholds() {
    let mut ar = AwarenessRegistry::new();
    ar.join(peer("u1"), "Ada".into(), "#fff".into());
    // Freshly joined: not stale yet against any sane threshold.
    assert!(ar.stale_peers(Duration::from_secs(30)).is_empty());
    assert!(ar.evictable_peers(Duration::from_secs(60)).is_empty());
    // A zero threshold is immediately exceeded.
    assert_eq!(ar.stale_peers(Duration::from_secs(0)), vec![peer("u1")]);
}
