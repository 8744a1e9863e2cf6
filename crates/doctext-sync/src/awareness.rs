//! Awareness Registry (AR): per-peer soft state (presence, cursor,
//! selection) that is broadcast but not part of the convergent document
//! state. Writes are restricted to the owning session coordinator.

use doctext_types::PeerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Selection {
    pub start: u32,
    pub end: u32,
}

/// One peer's soft state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerAwareness {
    pub user_id: PeerId,
    pub display_name: String,
    pub color: String,
    pub online: bool,
    pub cursor: Option<u32>,
    pub selection: Option<Selection>,
    #[serde(skip)]
    last_activity: Option<Instant>,
}

impl PeerAwareness {
    fn new(user_id: PeerId, display_name: String, color: String) -> Self {
        Self {
            user_id,
            display_name,
            color,
            online: true,
            cursor: None,
            selection: None,
            last_activity: Some(Instant::now()),
        }
    }
}

/// The set of peers added/updated/removed by one [`AwarenessRegistry`]
/// mutation, translated by the session coordinator into broadcast events.
#[derive(Debug, Clone, Default)]
pub struct AwarenessDiff {
    pub added: Vec<PeerAwareness>,
    pub updated: Vec<PeerAwareness>,
    pub removed: Vec<PeerId>,
}

impl AwarenessDiff {
    fn added(peer: PeerAwareness) -> Self {
        Self {
            added: vec![peer],
            ..Default::default()
        }
    }

    fn updated(peer: PeerAwareness) -> Self {
        Self {
            updated: vec![peer],
            ..Default::default()
        }
    }
}

/// In-memory presence/cursor/selection state for every peer of one document.
#[derive(Debug, Default)]
pub struct AwarenessRegistry {
    peers: HashMap<PeerId, PeerAwareness>,
}

impl AwarenessRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<PeerAwareness> {
        self.peers.values().cloned().collect()
    }

    #[must_use]
    pub fn get(&self, peer_id: &PeerId) -> Option<&PeerAwareness> {
        self.peers.get(peer_id)
    }

    pub fn join(&mut self, peer_id: PeerId, display_name: String, color: String) -> AwarenessDiff {
        let peer = PeerAwareness::new(peer_id, display_name, color);
        self.peers.insert(peer_id, peer.clone());
        AwarenessDiff::added(peer)
    }

    /// Marks a peer offline (on `leave`, if it has no other connections).
    pub fn mark_offline(&mut self, peer_id: &PeerId) -> Option<AwarenessDiff> {
        let peer = self.peers.get_mut(peer_id)?;
        peer.online = false;
        Some(AwarenessDiff::updated(peer.clone()))
    }

    pub fn remove(&mut self, peer_id: &PeerId) -> AwarenessDiff {
        self.peers.remove(peer_id);
        AwarenessDiff {
            removed: vec![*peer_id],
            ..Default::default()
        }
    }

    /// Updates a peer's cursor, clamping into `[0, text_len]`. Returns
    /// `None` if the peer is unknown.
    pub fn update_cursor(
        &mut self,
        peer_id: &PeerId,
        position: u32,
        text_len: u32,
    ) -> Option<AwarenessDiff> {
        let peer = self.peers.get_mut(peer_id)?;
        peer.cursor = Some(position.min(text_len));
        peer.last_activity = Some(Instant::now());
        Some(AwarenessDiff::updated(peer.clone()))
    }

    /// Updates a peer's selection, normalizing `start <= end` and clamping
    /// both endpoints into `[0, text_len]`.
    pub fn update_selection(
        &mut self,
        peer_id: &PeerId,
        start: u32,
        end: u32,
        text_len: u32,
    ) -> Option<AwarenessDiff> {
        let peer = self.peers.get_mut(peer_id)?;
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        peer.selection = Some(Selection {
            start: start.min(text_len),
            end: end.min(text_len),
        });
        peer.last_activity = Some(Instant::now());
        Some(AwarenessDiff::updated(peer.clone()))
    }

    pub fn touch(&mut self, peer_id: &PeerId) {
        if let Some(peer) = self.peers.get_mut(peer_id) {
            peer.last_activity = Some(Instant::now());
        }
    }

    /// Peers whose last activity exceeds `stale_threshold` and are still
    /// marked online — callers transition these to `online=false`.
    #[must_use]
    pub fn stale_peers(&self, stale_threshold: Duration) -> Vec<PeerId> {
        let now = Instant::now();
        self.peers
            .values()
            .filter(|p| {
                p.online
                    && p.last_activity
                        .is_some_and(|t| now.duration_since(t) >= stale_threshold)
            })
            .map(|p| p.user_id.clone())
            .collect()
    }

    /// Peers (already offline or not) whose last activity exceeds
    /// `evict_threshold` — callers remove these entirely.
    #[must_use]
    pub fn evictable_peers(&self, evict_threshold: Duration) -> Vec<PeerId> {
        let now = Instant::now();
        self.peers
            .values()
            .filter(|p| {
                p.last_activity
                    .is_some_and(|t| now.duration_since(t) >= evict_threshold)
            })
            .map(|p| p.user_id.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
