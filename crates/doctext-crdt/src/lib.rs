//! CRDT and operational-transform primitives for the collaborative document
//! service.
//!
//! - [`ReplicatedText`] — the authoritative convergent text CRDT (RT)
//! - [`VectorClock`] — causality tracking across sites
//! - [`ot::transform`] — advisory OT rebasing for position-based ops (OT)
//!
//! `ReplicatedText`'s merge is commutative, associative, and idempotent:
//! replicas converge to the same content regardless of the order remote
//! operations are applied in.

mod operation;
mod ot;
mod text;
mod vector_clock;

pub use operation::{CrdtError, CrdtResult, Operation, OperationKind};
pub use ot::transform;
pub use text::{ApplyOutcome, CharId, ReplicatedText, Snapshot};
pub use vector_clock::{CausalOrder, VectorClock};
