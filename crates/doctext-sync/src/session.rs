//! Session Coordinator (SC): one logical actor per document, serializing
//! every state transition (RT merge, AR diff, peer set change) through a
//! single task consuming commands off an MPSC channel, so per-document
//! linearizability holds without a lock. Different documents run
//! independently and in parallel — this module owns exactly one.

use crate::awareness::{AwarenessDiff, AwarenessRegistry, PeerAwareness};
use crate::error::{SessionError, SessionResult};
use crate::protocol::{ServerEnvelope, WireOperation};
use crate::transport::SessionTransport;
use doctext_crdt::{CrdtError, OperationKind, ReplicatedText};
use doctext_types::{ConnectionId, ConnectionIdAllocator, DocumentId, OperationId, PeerId, SiteId, SiteIdAllocator};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Tunable deployment configuration for a document session; every field
/// has a sensible default.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub stale_threshold: Duration,
    pub evict_threshold: Duration,
    pub session_cleanup_delay: Duration,
    pub user_color_palette: Vec<String>,
    pub max_frame_bytes: usize,
    pub max_concurrent_sessions: usize,
    pub max_peers_per_session: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stale_threshold: Duration::from_millis(30_000),
            evict_threshold: Duration::from_millis(60_000),
            session_cleanup_delay: Duration::from_millis(0),
            user_color_palette: vec![
                "#e6194b".into(),
                "#3cb44b".into(),
                "#ffe119".into(),
                "#4363d8".into(),
                "#f58231".into(),
                "#911eb4".into(),
                "#46f0f0".into(),
                "#f032e6".into(),
            ],
            max_frame_bytes: 1024 * 1024,
            max_concurrent_sessions: 10_000,
            max_peers_per_session: 256,
        }
    }
}

/// Per-peer binding state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerBindingState {
    Connected,
    Joined,
    Active,
    Idle,
    Evicted,
}

struct PeerBinding {
    peer_id: PeerId,
    site: SiteId,
    state: PeerBindingState,
    transport: Arc<dyn SessionTransport>,
    last_traffic: Instant,
}

/// Result of a successful `join`.
#[derive(Debug, Clone)]
pub struct JoinResult {
    pub content: String,
    pub site: SiteId,
    pub peers: Vec<PeerAwareness>,
}

/// `metrics()` response.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocMetrics {
    pub total_ops: u64,
    pub peak_peers: u32,
    pub active_conns: u32,
    pub size: usize,
}

/// Commands accepted by a document's single-writer actor loop.
enum Command {
    Join {
        conn_id: ConnectionId,
        peer_id: PeerId,
        display_name: String,
        transport: Arc<dyn SessionTransport>,
        reply: oneshot::Sender<SessionResult<JoinResult>>,
    },
    Leave {
        conn_id: ConnectionId,
        reply: oneshot::Sender<()>,
    },
    SubmitOp {
        conn_id: ConnectionId,
        op: WireOperation,
        reply: oneshot::Sender<SessionResult<()>>,
    },
    UpdateCursor {
        conn_id: ConnectionId,
        position: u32,
        reply: oneshot::Sender<SessionResult<()>>,
    },
    UpdateSelection {
        conn_id: ConnectionId,
        start: u32,
        end: u32,
        reply: oneshot::Sender<SessionResult<()>>,
    },
    Metrics {
        reply: oneshot::Sender<DocMetrics>,
    },
    DocumentState {
        conn_id: ConnectionId,
        reply: oneshot::Sender<SessionResult<JoinResult>>,
    },
    /// Sweeps idle/stale connections; invoked periodically by the CS.
    Sweep {
        reply: oneshot::Sender<Vec<(ConnectionId, PeerId)>>,
    },
    Touch {
        conn_id: ConnectionId,
    },
}

/// A cheaply cloneable handle to a running document session. All state
/// lives in the actor task; every method round-trips a command and (when
/// applicable) a reply.
#[derive(Clone)]
pub struct SessionHandle {
    document_id: DocumentId,
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    #[must_use]
    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub async fn join(
        &self,
        conn_id: ConnectionId,
        peer_id: PeerId,
        display_name: String,
        transport: Arc<dyn SessionTransport>,
    ) -> SessionResult<JoinResult> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Join {
            conn_id,
            peer_id,
            display_name,
            transport,
            reply,
        })
        .await;
        rx.await.unwrap_or(Err(SessionError::InternalMerge(
            "session actor dropped reply".into(),
        )))
    }

    pub async fn leave(&self, conn_id: ConnectionId) {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Leave { conn_id, reply }).await;
        let _ = rx.await;
    }

    pub async fn submit_op(&self, conn_id: ConnectionId, op: WireOperation) -> SessionResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SubmitOp { conn_id, op, reply }).await;
        rx.await.unwrap_or(Err(SessionError::InternalMerge(
            "session actor dropped reply".into(),
        )))
    }

    pub async fn update_cursor(&self, conn_id: ConnectionId, position: u32) -> SessionResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::UpdateCursor {
            conn_id,
            position,
            reply,
        })
        .await;
        rx.await.unwrap_or(Err(SessionError::InternalMerge(
            "session actor dropped reply".into(),
        )))
    }

    pub async fn update_selection(
        &self,
        conn_id: ConnectionId,
        start: u32,
        end: u32,
    ) -> SessionResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::UpdateSelection {
            conn_id,
            start,
            end,
            reply,
        })
        .await;
        rx.await.unwrap_or(Err(SessionError::InternalMerge(
            "session actor dropped reply".into(),
        )))
    }

    pub async fn metrics(&self) -> DocMetrics {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Metrics { reply }).await;
        rx.await.unwrap_or_default()
    }

    pub async fn document_state(&self, conn_id: ConnectionId) -> SessionResult<JoinResult> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::DocumentState { conn_id, reply }).await;
        rx.await.unwrap_or(Err(SessionError::InternalMerge(
            "session actor dropped reply".into(),
        )))
    }

    pub async fn touch(&self, conn_id: ConnectionId) {
        self.send(Command::Touch { conn_id }).await;
    }

    /// Evaluates the idle/evict timers and returns connections that were
    /// just evicted (caller is responsible for closing their transport with
    /// code `1001`).
    pub async fn sweep(&self) -> Vec<(ConnectionId, PeerId)> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Sweep { reply }).await;
        rx.await.unwrap_or_default()
    }

    async fn send(&self, cmd: Command) {
        if self.tx.send(cmd).await.is_err() {
            warn!("session actor for {} is no longer running", self.document_id);
        }
    }
}

/// Spawns a document's single-writer actor task and returns a handle to it.
pub fn spawn(document_id: DocumentId, initial_content: String, config: SessionConfig) -> SessionHandle {
    let (tx, rx) = mpsc::channel(256);
    let actor = DocumentActor::new(document_id.clone(), initial_content, config);
    tokio::spawn(actor.run(rx));
    SessionHandle { document_id, tx }
}

struct DocumentActor {
    document_id: DocumentId,
    text: ReplicatedText,
    awareness: AwarenessRegistry,
    connections: HashMap<ConnectionId, PeerBinding>,
    site_allocator: SiteIdAllocator,
    config: SessionConfig,
    total_ops: u64,
    peak_peers: u32,
}

impl DocumentActor {
    fn new(document_id: DocumentId, initial_content: String, config: SessionConfig) -> Self {
        // Site 0 is reserved for the document's own seed content; every
        // joining peer gets a freshly allocated site from `site_allocator`.
        let mut text = ReplicatedText::new(SiteId::new(0));
        if !initial_content.is_empty() {
            text.apply_local(OperationKind::Insert, 0, Some(initial_content), None)
                .expect("seed insert is always well-formed");
        }
        Self {
            document_id,
            text,
            awareness: AwarenessRegistry::new(),
            connections: HashMap::new(),
            site_allocator: SiteIdAllocator::new(),
            config,
            total_ops: 0,
            peak_peers: 0,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd).await;
        }
        info!("session actor for {} shut down", self.document_id);
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Join {
                conn_id,
                peer_id,
                display_name,
                transport,
                reply,
            } => {
                let result = self.join(conn_id, peer_id, display_name, transport).await;
                let _ = reply.send(result);
            }
            Command::Leave { conn_id, reply } => {
                self.leave(conn_id).await;
                let _ = reply.send(());
            }
            Command::SubmitOp { conn_id, op, reply } => {
                let result = self.submit_op(conn_id, op).await;
                let _ = reply.send(result);
            }
            Command::UpdateCursor {
                conn_id,
                position,
                reply,
            } => {
                let result = self.update_cursor(conn_id, position).await;
                let _ = reply.send(result);
            }
            Command::UpdateSelection {
                conn_id,
                start,
                end,
                reply,
            } => {
                let result = self.update_selection(conn_id, start, end).await;
                let _ = reply.send(result);
            }
            Command::Metrics { reply } => {
                let _ = reply.send(self.metrics());
            }
            Command::DocumentState { conn_id, reply } => {
                let result = self.document_state(conn_id);
                let _ = reply.send(result);
            }
            Command::Sweep { reply } => {
                let evicted = self.sweep().await;
                let _ = reply.send(evicted);
            }
            Command::Touch { conn_id } => {
                if let Some(binding) = self.connections.get_mut(&conn_id) {
                    binding.last_traffic = Instant::now();
                    if binding.state == PeerBindingState::Idle {
                        binding.state = PeerBindingState::Active;
                    }
                    self.awareness.touch(&binding.peer_id.clone());
                }
            }
        }
    }

    async fn join(
        &mut self,
        conn_id: ConnectionId,
        peer_id: PeerId,
        display_name: String,
        transport: Arc<dyn SessionTransport>,
    ) -> SessionResult<JoinResult> {
        if self.connections.contains_key(&conn_id) {
            return Err(SessionError::AlreadyJoined);
        }
        if self.connections.len() >= self.config.max_peers_per_session {
            return Err(SessionError::Capacity(format!(
                "document {} is at capacity ({} peers)",
                self.document_id, self.config.max_peers_per_session
            )));
        }

        let site = self.site_allocator.allocate();
        let color = self.color_for(site);
        let diff = self.awareness.join(peer_id.clone(), display_name, color);

        self.connections.insert(
            conn_id,
            PeerBinding {
                peer_id,
                site,
                state: PeerBindingState::Joined,
                transport,
                last_traffic: Instant::now(),
            },
        );
        self.peak_peers = self.peak_peers.max(self.connections.len() as u32);

        self.broadcast_awareness_diff(Some(conn_id), &diff).await;

        Ok(JoinResult {
            content: self.text.content(),
            site,
            peers: self.awareness.snapshot(),
        })
    }

    async fn leave(&mut self, conn_id: ConnectionId) {
        let Some(binding) = self.connections.remove(&conn_id) else {
            return;
        };
        let still_present = self
            .connections
            .values()
            .any(|b| b.peer_id == binding.peer_id);
        if !still_present {
            if let Some(diff) = self.awareness.mark_offline(&binding.peer_id) {
                self.broadcast_awareness_diff(None, &diff).await;
            }
        }
    }

    async fn submit_op(&mut self, conn_id: ConnectionId, op: WireOperation) -> SessionResult<()> {
        let site = self.require_active(conn_id)?;

        let op_id = OperationId::from_str(&op.operation_id)
            .map_err(|e| SessionError::InvalidOperation(format!("bad operationId: {e}")))?;

        let before_len = self.text.len();
        let applied = self
            .text
            .apply_for_site(site, Some(op_id), op.kind, op.position, op.content.clone(), op.length)
            .map_err(|e| match e {
                CrdtError::MalformedOperation(msg) => SessionError::InvalidOperation(msg),
            })?;

        self.total_ops += 1;
        self.touch_connection(conn_id);

        if !applied.1 {
            // Duplicate operationId: idempotent no-op, no broadcast.
            return Ok(());
        }

        debug_assert!(
            self.size_delta_matches(before_len, &applied.0),
            "size bound invariant violated"
        );

        let submitter_peer = self.connections.get(&conn_id).map(|b| b.peer_id.clone());
        self.broadcast_operation(conn_id, submitter_peer, &applied.0).await;
        Ok(())
    }

    fn size_delta_matches(&self, before_len: usize, op: &doctext_crdt::Operation) -> bool {
        let after_len = self.text.len();
        match op.kind {
            OperationKind::Insert => {
                let content_len = op.content.as_deref().map_or(0, |s| s.chars().count());
                after_len == before_len + content_len
            }
            OperationKind::Delete => {
                let requested = op.length.unwrap_or(0) as usize;
                let bounded = requested.min(before_len.saturating_sub(op.position as usize));
                after_len == before_len - bounded
            }
            OperationKind::Retain => after_len == before_len,
        }
    }

    async fn update_cursor(&mut self, conn_id: ConnectionId, position: u32) -> SessionResult<()> {
        let _site = self.require_active(conn_id)?;
        let peer_id = self.connections[&conn_id].peer_id.clone();
        self.touch_connection(conn_id);
        let text_len = self.text.len() as u32;
        if let Some(diff) = self.awareness.update_cursor(&peer_id, position, text_len) {
            self.broadcast_awareness_diff(Some(conn_id), &diff).await;
        }
        Ok(())
    }

    async fn update_selection(
        &mut self,
        conn_id: ConnectionId,
        start: u32,
        end: u32,
    ) -> SessionResult<()> {
        let _site = self.require_active(conn_id)?;
        let peer_id = self.connections[&conn_id].peer_id.clone();
        self.touch_connection(conn_id);
        let text_len = self.text.len() as u32;
        if let Some(diff) = self
            .awareness
            .update_selection(&peer_id, start, end, text_len)
        {
            self.broadcast_awareness_diff(Some(conn_id), &diff).await;
        }
        Ok(())
    }

    fn metrics(&self) -> DocMetrics {
        DocMetrics {
            total_ops: self.total_ops,
            peak_peers: self.peak_peers,
            active_conns: self.connections.len() as u32,
            size: self.text.len(),
        }
    }

    fn document_state(&self, conn_id: ConnectionId) -> SessionResult<JoinResult> {
        let binding = self
            .connections
            .get(&conn_id)
            .ok_or(SessionError::NotJoined)?;
        Ok(JoinResult {
            content: self.text.content(),
            site: binding.site,
            peers: self.awareness.snapshot(),
        })
    }

    async fn sweep(&mut self) -> Vec<(ConnectionId, PeerId)> {
        let now = Instant::now();
        let mut evicted = Vec::new();

        let stale: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, b)| {
                b.state == PeerBindingState::Active
                    && now.duration_since(b.last_traffic) >= self.config.stale_threshold
            })
            .map(|(id, _)| *id)
            .collect();
        for conn_id in stale {
            if let Some(binding) = self.connections.get_mut(&conn_id) {
                binding.state = PeerBindingState::Idle;
            }
        }

        let dead: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, b)| now.duration_since(b.last_traffic) >= self.config.evict_threshold)
            .map(|(id, _)| *id)
            .collect();

        for conn_id in dead {
            if let Some(mut binding) = self.connections.remove(&conn_id) {
                binding.state = PeerBindingState::Evicted;
                evicted.push((conn_id, binding.peer_id.clone()));
                let still_present = self
                    .connections
                    .values()
                    .any(|b| b.peer_id == binding.peer_id);
                if !still_present {
                    if let Some(diff) = self.awareness.mark_offline(&binding.peer_id) {
                        self.broadcast_awareness_diff(None, &diff).await;
                    }
                }
            }
        }

        evicted
    }

    fn require_active(&mut self, conn_id: ConnectionId) -> SessionResult<SiteId> {
        let binding = self
            .connections
            .get_mut(&conn_id)
            .ok_or(SessionError::NotJoined)?;
        if binding.state == PeerBindingState::Joined {
            binding.state = PeerBindingState::Active;
        }
        Ok(binding.site)
    }

    fn touch_connection(&mut self, conn_id: ConnectionId) {
        if let Some(binding) = self.connections.get_mut(&conn_id) {
            binding.last_traffic = Instant::now();
        }
    }

    fn color_for(&self, site: SiteId) -> String {
        let palette = &self.config.user_color_palette;
        if palette.is_empty() {
            return "#808080".into();
        }
        palette[(site.as_u32() as usize) % palette.len()].clone()
    }

    /// Broadcasts to every connection except `exclude` (the submitter
    /// already applied the change locally before it was accepted, so it
    /// must not receive its own echo).
    async fn broadcast_awareness_diff(&self, exclude: Option<ConnectionId>, diff: &AwarenessDiff) {
        for peer in &diff.added {
            self.broadcast_event(exclude, "user_joined", serde_json::json!(peer)).await;
        }
        for peer in &diff.updated {
            let kind = if peer.online {
                if peer.cursor.is_some() {
                    "cursor_changed"
                } else {
                    "selection_changed"
                }
            } else {
                "user_left"
            };
            self.broadcast_event(exclude, kind, serde_json::json!(peer)).await;
        }
        for peer_id in &diff.removed {
            self.broadcast_event(exclude, "user_left", serde_json::json!({ "userId": peer_id })).await;
        }
    }

    async fn broadcast_operation(
        &self,
        submitter: ConnectionId,
        submitter_peer: Option<PeerId>,
        op: &doctext_crdt::Operation,
    ) {
        let data = serde_json::json!({
            "operation": {
                "type": op.kind,
                "position": op.position,
                "content": op.content,
                "length": op.length,
                "operationId": op.op_id.to_string(),
                "site": op.site.as_u32(),
                "lamport": op.lamport,
            }
        });
        for (conn_id, binding) in &self.connections {
            if *conn_id == submitter {
                continue;
            }
            let mut envelope = ServerEnvelope::new("operation_received", data.clone(), now_rfc3339());
            if let Some(peer) = submitter_peer.clone() {
                envelope = envelope.with_user(peer);
            }
            if let Err(err) = binding.transport.send(envelope).await {
                warn!("failed to broadcast operation to {}: {}", conn_id, err);
            }
        }
    }

    async fn broadcast_event(&self, exclude: Option<ConnectionId>, kind: &'static str, data: serde_json::Value) {
        for (conn_id, binding) in &self.connections {
            if Some(*conn_id) == exclude {
                continue;
            }
            let envelope = ServerEnvelope::new(kind, data.clone(), now_rfc3339());
            if let Err(err) = binding.transport.send(envelope).await {
                warn!("failed to broadcast {} to {}: {}", kind, conn_id, err);
            }
        }
    }
}

/// RFC 3339 / ISO 8601 timestamp for outbound envelopes.
#[must_use]
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Allocates fresh connection ids for a Connection Supervisor.
#[must_use]
pub fn connection_allocator() -> ConnectionIdAllocator {
    ConnectionIdAllocator::new()
}
