//! Core identifier and timestamp types for the collaborative document service.
//!
//! This crate defines the fundamental, protocol-agnostic types shared by the
//! CRDT, session, and transport layers:
//! - `PeerId` / `SiteId` / `ConnectionId` / `DocumentId` / `OperationId`
//! - `HybridTimestamp`, a monotonic wall-clock/logical-counter pair used for
//!   session bookkeeping (last-activity, metrics) — not for CRDT tie-breaking,
//!   which uses the cheaper `(SiteId, lamport)` pair directly.

mod ids;
mod timestamp;

pub use ids::{
    ConnectionId, ConnectionIdAllocator, DocumentId, OperationId, PeerId, SiteId, SiteIdAllocator,
};
pub use timestamp::HybridTimestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
