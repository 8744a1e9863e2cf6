//! Transport abstraction separating the session coordinator from any
//! specific wire binding (axum WebSocket in the server crate, or an
//! in-memory mock for tests).

use crate::error::SessionResult;
use crate::protocol::ServerEnvelope;
use async_trait::async_trait;

/// A single connection's outbound half: push a frame to the peer.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    async fn send(&self, envelope: ServerEnvelope) -> SessionResult<()>;
}

/// An in-memory transport for tests: records every envelope sent.
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct MockTransport {
        sent: Mutex<Vec<ServerEnvelope>>,
    }

    impl MockTransport {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        #[must_use]
        pub fn sent(&self) -> Vec<ServerEnvelope> {
            self.sent.lock().unwrap().clone()
        }

        #[must_use]
        pub fn kinds(&self) -> Vec<&'static str> {
            self.sent.lock().unwrap().iter().map(|e| e.kind).collect()
        }
    }

    #[async_trait]
    impl SessionTransport for MockTransport {
        async fn send(&self, envelope: ServerEnvelope) -> SessionResult<()> {
            self.sent.lock().unwrap().push(envelope);
            Ok(())
        }
    }
}
