//! Wire protocol: one JSON object per frame, bidirectional.
//!
//! Client-to-server messages are internally tagged on `type`, with each
//! variant's own fields at the top level (matching the informal shape
//! `{"type":"join_document", "userId":"...", ...}`). Server-to-client
//! messages are carried in a uniform [`ServerEnvelope`]: `{type, data,
//! userId?, timestamp}`.

use doctext_crdt::OperationKind;
use doctext_types::{DocumentId, PeerId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound message from a client connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinDocument {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "documentId")]
        document_id: String,
        #[serde(rename = "userName")]
        user_name: String,
    },
    Operation {
        operation: WireOperation,
    },
    CursorUpdate {
        cursor: CursorPayload,
    },
    SelectionUpdate {
        selection: SelectionPayload,
    },
    Ping,
    GetMetrics,
    GetDocumentState,
}

/// The `operation` field of a client `operation` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireOperation {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub position: u32,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CursorPayload {
    pub position: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelectionPayload {
    pub start: u32,
    pub end: u32,
}

/// Outbound envelope wrapping every server-to-client message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEnvelope {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: Value,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<PeerId>,
    pub timestamp: String,
}

impl ServerEnvelope {
    #[must_use]
    pub fn new(kind: &'static str, data: Value, timestamp: impl Into<String>) -> Self {
        Self {
            kind,
            data,
            user_id: None,
            timestamp: timestamp.into(),
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_id: PeerId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Builds the `{type:"error", data:{error:<msg>}, timestamp}` envelope
    /// emitted for every recoverable validation/structural failure.
    #[must_use]
    pub fn error(message: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self::new("error", serde_json::json!({ "error": message.into() }), timestamp)
    }
}

/// Errors produced while decoding a raw inbound frame, before a
/// `SessionError` is raised.
#[derive(Debug, Clone)]
pub enum DecodeError {
    NotJson(String),
    MissingType(String),
    UnknownType(String),
    MissingField(String),
    OversizeFrame(usize, usize),
}

/// Decodes a raw inbound frame into a [`ClientMessage`], enforcing
/// `max_frame_bytes` and validating the required fields for the type.
pub fn decode_client_message(
    raw: &str,
    max_frame_bytes: usize,
) -> Result<ClientMessage, DecodeError> {
    if raw.len() > max_frame_bytes {
        return Err(DecodeError::OversizeFrame(raw.len(), max_frame_bytes));
    }

    let value: Value = serde_json::from_str(raw)
        .map_err(|e| DecodeError::NotJson(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(DecodeError::NotJson("frame is not a JSON object".into()));
    }
    if value.get("type").and_then(Value::as_str).is_none() {
        return Err(DecodeError::MissingType(
            "frame is missing a string `type` field".into(),
        ));
    }

    serde_json::from_value(value.clone()).map_err(|e| classify_deserialize_error(&value, e))
}

fn classify_deserialize_error(value: &Value, err: serde_json::Error) -> DecodeError {
    let type_name = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let known = matches!(
        type_name.as_str(),
        "join_document"
            | "operation"
            | "cursor_update"
            | "selection_update"
            | "ping"
            | "get_metrics"
            | "get_document_state"
    );
    if known {
        DecodeError::MissingField(err.to_string())
    } else {
        DecodeError::UnknownType(type_name)
    }
}

/// Serializes a [`ServerEnvelope`] to a wire frame.
pub fn encode_server_message(envelope: &ServerEnvelope) -> String {
    serde_json::to_string(envelope).expect("ServerEnvelope always serializes")
}

/// Parses a `documentId`/`userId` pair into strong-typed ids; left as plain
/// strings on the wire (spec gives no UUID/format requirement).
#[must_use]
pub fn document_id(raw: &str) -> DocumentId {
    DocumentId::from(raw.to_string())
}

#[must_use]
pub fn peer_id(raw: &str) -> PeerId {
    PeerId::from(raw.to_string())
}
