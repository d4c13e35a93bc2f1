use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::messages::{ServiceResponse, StoreRequest};
use crate::store::{KvStore, Record, WriteOp};

/// Cloneable handle to the store actor.
#[derive(Clone, Debug)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    async fn call<T>(
        &self,
        build: impl FnOnce(ServiceResponse<T, StoreError>) -> StoreRequest,
    ) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| StoreError::ActorCommunicationError("Actor closed".to_string()))?;
        response
            .await
            .map_err(|_| StoreError::ActorCommunicationError("Actor dropped".to_string()))?
    }

    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.sender
            .send(StoreRequest::Shutdown)
            .await
            .map_err(|_| StoreError::ActorCommunicationError("Actor closed".to_string()))
    }

    #[cfg(test)]
    pub async fn key_count(&self) -> Result<usize, StoreError> {
        self.call(|respond_to| StoreRequest::KeyCount { respond_to }).await
    }
}

#[async_trait]
impl KvStore for StoreClient {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        debug!("Sending request");
        let key = key.to_string();
        self.call(|respond_to| StoreRequest::Get { key, respond_to }).await
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        debug!("Sending request");
        let (key, value) = (key.to_string(), value.to_string());
        self.call(|respond_to| StoreRequest::Set { key, value, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        debug!("Sending request");
        let key = key.to_string();
        self.call(|respond_to| StoreRequest::Delete { key, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn get_record(&self, key: &str) -> Result<Option<Record>, StoreError> {
        debug!("Sending request");
        let key = key.to_string();
        self.call(|respond_to| StoreRequest::GetRecord { key, respond_to }).await
    }

    #[instrument(skip(self, record))]
    async fn set_record(&self, key: &str, record: Record) -> Result<(), StoreError> {
        debug!("Sending request");
        let key = key.to_string();
        self.call(|respond_to| StoreRequest::SetRecord { key, record, respond_to }).await
    }

    #[instrument(skip(self, fields))]
    async fn update_record(&self, key: &str, fields: Record) -> Result<bool, StoreError> {
        debug!("Sending request");
        let key = key.to_string();
        self.call(|respond_to| StoreRequest::UpdateRecord { key, fields, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        debug!("Sending request");
        let (key, member) = (key.to_string(), member.to_string());
        self.call(|respond_to| StoreRequest::SetAdd { key, member, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        debug!("Sending request");
        let (key, member) = (key.to_string(), member.to_string());
        self.call(|respond_to| StoreRequest::SetRemove { key, member, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        debug!("Sending request");
        let (key, member) = (key.to_string(), member.to_string());
        self.call(|respond_to| StoreRequest::SetContains { key, member, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        debug!("Sending request");
        let key = key.to_string();
        self.call(|respond_to| StoreRequest::SetMembers { key, respond_to }).await
    }

    #[instrument(skip(self))]
    async fn set_random(&self, key: &str) -> Result<Option<String>, StoreError> {
        debug!("Sending request");
        let key = key.to_string();
        self.call(|respond_to| StoreRequest::SetRandom { key, respond_to }).await
    }

    #[instrument(skip(self, ops), fields(ops = ops.len()))]
    async fn write_batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        debug!("Sending request");
        self.call(|respond_to| StoreRequest::WriteBatch { ops, respond_to }).await
    }
}
