//! Maps `DocumentId` to a running session actor, creating one lazily on
//! first join and enforcing the deployment-wide concurrent-session cap.

use doctext_sync::{spawn, SessionConfig, SessionError, SessionHandle};
use doctext_types::DocumentId;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub struct DocumentRegistry {
    sessions: RwLock<HashMap<DocumentId, SessionHandle>>,
    config: SessionConfig,
}

impl DocumentRegistry {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Returns the session for `document_id`, spawning a fresh (empty)
    /// document if none exists yet. New document content is always empty;
    /// loading existing content from storage is out of scope here.
    pub async fn get_or_create(&self, document_id: &DocumentId) -> Result<SessionHandle, SessionError> {
        if let Some(handle) = self.sessions.read().await.get(document_id) {
            return Ok(handle.clone());
        }

        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(document_id) {
            return Ok(handle.clone());
        }
        if sessions.len() >= self.config.max_concurrent_sessions {
            return Err(SessionError::Capacity(format!(
                "server is at capacity ({} document sessions)",
                self.config.max_concurrent_sessions
            )));
        }

        let handle = spawn(document_id.clone(), String::new(), self.config.clone());
        sessions.insert(document_id.clone(), handle.clone());
        Ok(handle)
    }

    pub async fn get(&self, document_id: &DocumentId) -> Option<SessionHandle> {
        self.sessions.read().await.get(document_id).cloned()
    }

    /// Periodically sweeps every open document for idle/stale connections,
    /// closing the ones past the evict threshold.
    pub async fn sweep_all(&self) -> Vec<(DocumentId, Vec<(doctext_types::ConnectionId, doctext_types::PeerId)>)> {
        let sessions: Vec<(DocumentId, SessionHandle)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, h)| (id.clone(), h.clone()))
            .collect();

        let mut results = Vec::new();
        for (document_id, handle) in sessions {
            let evicted = handle.sweep().await;
            if !evicted.is_empty() {
                results.push((document_id, evicted));
            }
        }
        results
    }

    pub async fn document_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
