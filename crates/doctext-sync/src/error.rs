//! Error taxonomy for the session layer.
//!
//! Validation and structural errors are recovered locally (an `error` frame
//! is sent back, the connection stays open, no state mutates). `InternalMerge`
//! is fatal to the owning session: its connections are closed with code
//! `1011` and the error is logged with full op context; other sessions are
//! unaffected. See `SessionError::is_fatal`.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised while decoding frames or operating a document session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A frame did not decode to a JSON object.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A frame decoded but its `type` was not recognized.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// `operation`/`cursor_update`/`selection_update` before `join_document`.
    #[error("connection has not joined a document")]
    NotJoined,

    /// `join_document` sent twice on the same connection.
    #[error("connection has already joined a document")]
    AlreadyJoined,

    /// A required field was absent from an otherwise well-formed message.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A field was present but semantically invalid (e.g. unknown op kind).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// `get_document_state`/`join_document` referenced a document that does
    /// not exist for this deployment's routing.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// `maxConcurrentSessions`/`maxPeersPerSession` exceeded.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// A bug in the RT/OT invariants: merge failed for a structurally valid
    /// operation. Fatal to the owning session.
    #[error("internal merge error: {0}")]
    InternalMerge(String),
}

impl SessionError {
    /// Whether this error is fatal to the owning session (vs. recoverable
    /// locally with an `error` reply).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::InternalMerge(_))
    }

    /// The human-readable message carried in an `error` frame's `data.error`.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<crate::protocol::DecodeError> for SessionError {
    fn from(err: crate::protocol::DecodeError) -> Self {
        match err {
            crate::protocol::DecodeError::NotJson(msg)
            | crate::protocol::DecodeError::MissingType(msg) => SessionError::MalformedFrame(msg),
            crate::protocol::DecodeError::UnknownType(t) => SessionError::UnknownMessageType(t),
            crate::protocol::DecodeError::MissingField(f) => SessionError::MissingField(f),
            crate::protocol::DecodeError::OversizeFrame(len, max) => {
                SessionError::MalformedFrame(format!("frame of {len} bytes exceeds max {max}"))
            }
        }
    }
}
