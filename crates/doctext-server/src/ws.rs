//! The WebSocket binding: decodes inbound frames with
//! `doctext_sync::decode_client_message`, dispatches them to the owning
//! document's session actor, and adapts the session's outbound push
//! interface ([`doctext_sync::SessionTransport`]) onto the socket's write
//! half.

use crate::AppState;
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use doctext_sync::{
    decode_client_message, document_id as parse_document_id, encode_server_message,
    now_rfc3339, peer_id as parse_peer_id, ClientMessage, SessionError, SessionResult,
    SessionTransport, ServerEnvelope,
};
use doctext_types::ConnectionId;
use futures::stream::StreamExt;
use futures::SinkExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Pushes outbound envelopes onto an mpsc queue drained by the socket's
/// writer half; the session actor never touches the socket directly.
struct WsTransport {
    tx: mpsc::UnboundedSender<ServerEnvelope>,
}

#[async_trait]
impl SessionTransport for WsTransport {
    async fn send(&self, envelope: ServerEnvelope) -> SessionResult<()> {
        self.tx
            .send(envelope)
            .map_err(|_| SessionError::InternalMerge("connection writer task is gone".into()))
    }
}

pub async fn handle_socket(socket: WebSocket, state: AppState, conn_id: ConnectionId) {
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerEnvelope>();

    let writer = tokio::spawn(async move {
        while let Some(envelope) = out_rx.recv().await {
            let frame = encode_server_message(&envelope);
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let transport = Arc::new(WsTransport { tx: out_tx.clone() });
    let mut joined: Option<(doctext_types::DocumentId, doctext_sync::SessionHandle)> = None;

    while let Some(Ok(msg)) = stream.next().await {
        let Message::Text(text) = msg else {
            continue;
        };

        let decoded = decode_client_message(&text, state.config.max_frame_bytes);
        let client_msg = match decoded {
            Ok(m) => m,
            Err(err) => {
                let session_err: SessionError = err.into();
                send_error(&out_tx, &session_err);
                continue;
            }
        };

        if let Err(err) = dispatch(
            client_msg,
            &state,
            conn_id,
            &transport,
            &mut joined,
        )
        .await
        {
            let fatal = err.is_fatal();
            send_error(&out_tx, &err);
            if fatal {
                warn!("fatal session error on {}: {}", conn_id, err);
                break;
            }
        }
    }

    if let Some((_, handle)) = joined {
        handle.leave(conn_id).await;
    }
    drop(out_tx);
    let _ = writer.await;
}

async fn dispatch(
    msg: ClientMessage,
    state: &AppState,
    conn_id: ConnectionId,
    transport: &Arc<WsTransport>,
    joined: &mut Option<(doctext_types::DocumentId, doctext_sync::SessionHandle)>,
) -> SessionResult<()> {
    match msg {
        ClientMessage::JoinDocument {
            user_id,
            document_id,
            user_name,
        } => {
            let document_id = parse_document_id(&document_id);
            let peer_id = parse_peer_id(&user_id);
            let handle = state
                .registry
                .get_or_create(&document_id)
                .await?;
            let result = handle
                .join(conn_id, peer_id, user_name, transport.clone())
                .await?;
            info!("{} joined document {}", conn_id, document_id);
            let envelope = ServerEnvelope::new(
                "joined",
                serde_json::json!({
                    "content": result.content,
                    "site": result.site.as_u32(),
                    "peers": result.peers,
                }),
                now_rfc3339(),
            );
            transport.send(envelope).await?;
            *joined = Some((document_id, handle));
            Ok(())
        }
        ClientMessage::Operation { operation } => {
            let (_, handle) = joined.as_ref().ok_or(SessionError::NotJoined)?;
            handle.submit_op(conn_id, operation).await
        }
        ClientMessage::CursorUpdate { cursor } => {
            let (_, handle) = joined.as_ref().ok_or(SessionError::NotJoined)?;
            handle.update_cursor(conn_id, cursor.position).await
        }
        ClientMessage::SelectionUpdate { selection } => {
            let (_, handle) = joined.as_ref().ok_or(SessionError::NotJoined)?;
            handle
                .update_selection(conn_id, selection.start, selection.end)
                .await
        }
        ClientMessage::Ping => {
            transport
                .send(ServerEnvelope::new("pong", serde_json::json!({}), now_rfc3339()))
                .await
        }
        ClientMessage::GetMetrics => {
            let (_, handle) = joined.as_ref().ok_or(SessionError::NotJoined)?;
            let metrics = handle.metrics().await;
            transport
                .send(ServerEnvelope::new(
                    "metrics",
                    serde_json::json!({
                        "totalOps": metrics.total_ops,
                        "peakPeers": metrics.peak_peers,
                        "activeConns": metrics.active_conns,
                        "size": metrics.size,
                    }),
                    now_rfc3339(),
                ))
                .await
        }
        ClientMessage::GetDocumentState => {
            let (_, handle) = joined.as_ref().ok_or(SessionError::NotJoined)?;
            let state = handle.document_state(conn_id).await?;
            transport
                .send(ServerEnvelope::new(
                    "document_state",
                    serde_json::json!({
                        "content": state.content,
                        "peers": state.peers,
                    }),
                    now_rfc3339(),
                ))
                .await
        }
    }
}

fn send_error(tx: &mpsc::UnboundedSender<ServerEnvelope>, err: &SessionError) {
    let _ = tx.send(ServerEnvelope::error(err.user_message(), now_rfc3339()));
}
