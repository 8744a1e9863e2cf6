//! Session coordination, presence, and wire protocol for the collaborative
//! document service.
//!
//! # Architecture
//!
//! - **Protocol**: the JSON frame shapes exchanged between a client and the
//!   server ([`protocol`]).
//! - **Awareness**: soft per-peer presence (cursor, selection, online state),
//!   broadcast but not part of the convergent document itself ([`awareness`]).
//! - **Transport**: a thin abstraction for pushing frames to one connection,
//!   so this crate never depends on a concrete WebSocket library ([`transport`]).
//! - **Session**: the single-writer-per-document actor (the Session
//!   Coordinator) that owns a [`doctext_crdt::ReplicatedText`] and an
//!   [`awareness::AwarenessRegistry`], serializing every join/leave/operation
//!   through one command loop ([`session`]).
//!
//! Every state-changing method is driven through [`session::SessionHandle`]:
//! a document's actual state never leaves the task that owns it.

mod awareness;
mod error;
mod protocol;
mod session;
mod transport;

pub use awareness::{AwarenessDiff, AwarenessRegistry, PeerAwareness, Selection};
pub use error::{SessionError, SessionResult};
pub use protocol::{
    decode_client_message, document_id, encode_server_message, peer_id, ClientMessage,
    CursorPayload, DecodeError, SelectionPayload, ServerEnvelope, WireOperation,
};
pub use session::{
    connection_allocator, now_rfc3339, spawn, DocMetrics, JoinResult, PeerBindingState,
    SessionConfig, SessionHandle,
};
pub use transport::SessionTransport;

/// An in-memory [`SessionTransport`] for tests.
pub mod mock {
    pub use crate::transport::mock::MockTransport;
}
