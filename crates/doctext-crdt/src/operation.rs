//! The `Operation` wire/log record and its error taxonomy.

use doctext_types::{OperationId, SiteId};
use serde::{Deserialize, Serialize};

/// The kind of edit an `Operation` performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Delete,
    /// No observable effect on content; preserved for protocol compatibility.
    /// Still consumes a lamport tick when applied.
    Retain,
}

/// A single edit against a `ReplicatedText`, stamped with the site and
/// lamport value that produced it. `op_id` is globally unique; the pair
/// `(site, lamport)` gives a total order for tie-breaking concurrent
/// insertions at the same visible position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub position: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    pub site: SiteId,
    pub lamport: u64,
    pub op_id: OperationId,
}

impl Operation {
    #[must_use]
    pub fn insert(position: u32, content: String, site: SiteId, lamport: u64) -> Self {
        Self {
            kind: OperationKind::Insert,
            position,
            content: Some(content),
            length: None,
            site,
            lamport,
            op_id: OperationId::new(),
        }
    }

    #[must_use]
    pub fn delete(position: u32, length: u32, site: SiteId, lamport: u64) -> Self {
        Self {
            kind: OperationKind::Delete,
            position,
            content: None,
            length: Some(length),
            site,
            lamport,
            op_id: OperationId::new(),
        }
    }

    #[must_use]
    pub fn retain(position: u32, site: SiteId, lamport: u64) -> Self {
        Self {
            kind: OperationKind::Retain,
            position,
            content: None,
            length: None,
            site,
            lamport,
            op_id: OperationId::new(),
        }
    }
}

/// Errors raised while validating or applying an `Operation`.
#[derive(Debug, thiserror::Error)]
pub enum CrdtError {
    /// `kind=Insert` with missing `content`, or `kind=Delete` with a missing
    /// or zero `length`. The session is NOT torn down by this error; callers
    /// reject the individual operation.
    #[error("malformed operation: {0}")]
    MalformedOperation(String),
}

pub type CrdtResult<T> = Result<T, CrdtError>;
