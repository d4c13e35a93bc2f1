//! Per-conversation session storage behind a get/set/clear trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::Session;
use crate::error::StoreError;
use crate::store::KvStore;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, conversation_id: &str) -> Result<Option<Session>, StoreError>;
    async fn set(&self, session: Session) -> Result<(), StoreError>;
    async fn clear(&self, conversation_id: &str) -> Result<(), StoreError>;
}

/// Sessions held in process memory. Lost on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, conversation_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().await.get(conversation_id).cloned())
    }

    async fn set(&self, session: Session) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.conversation_id.clone(), session);
        Ok(())
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), StoreError> {
        self.sessions.write().await.remove(conversation_id);
        Ok(())
    }
}

/// Sessions serialized as JSON into the key-value store.
pub struct KvSessionStore {
    store: Arc<dyn KvStore>,
}

impl KvSessionStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn key(conversation_id: &str) -> String {
        format!("session:{conversation_id}")
    }
}

#[async_trait]
impl SessionStore for KvSessionStore {
    #[instrument(skip(self))]
    async fn get(&self, conversation_id: &str) -> Result<Option<Session>, StoreError> {
        let key = Self::key(conversation_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::CorruptRecord {
                key,
                reason: e.to_string(),
            })
    }

    #[instrument(skip(self, session), fields(conversation = %session.conversation_id, op = session.operation.name()))]
    async fn set(&self, session: Session) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&session)
            .map_err(|e| StoreError::Backend(format!("session encode: {e}")))?;
        self.store.set(&Self::key(&session.conversation_id), &raw).await?;
        debug!("Session stored");
        Ok(())
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), StoreError> {
        self.store.delete(&Self::key(conversation_id)).await?;
        Ok(())
    }
}
