//! # Mock Framework
//!
//! Test doubles for the two external seams: the store actor and the messaging
//! transport.
//!
//! Use [`create_mock_store_client`] to get a [`StoreClient`] whose requests land
//! on a receiver you control, then helpers like [`expect_write_batch`] to
//! assert on them and answer. [`RecordingTransport`] captures outbound
//! messages; [`FaultyStore`] and [`PanicOnceTransport`] inject failures.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::clients::StoreClient;
use crate::domain::OutboundMessage;
use crate::error::{StoreError, TransportError};
use crate::messages::StoreRequest;
use crate::notify::Transport;
use crate::store::{KvStore, Record, WriteOp};

// =============================================================================
// Store channel mocks
// =============================================================================

/// Creates a store client and the receiver its requests arrive on.
///
/// Use this when a test cares about *which* store requests a component
/// issues, rather than about the resulting data.
pub fn create_mock_store_client(buffer_size: usize) -> (StoreClient, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (StoreClient::new(sender), receiver)
}

/// Helper to verify that the next message is a WriteBatch request
pub async fn expect_write_batch(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(Vec<WriteOp>, oneshot::Sender<Result<(), StoreError>>)> {
    match receiver.recv().await {
        Some(StoreRequest::WriteBatch { ops, respond_to }) => Some((ops, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a GetRecord request
pub async fn expect_get_record(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, oneshot::Sender<Result<Option<Record>, StoreError>>)> {
    match receiver.recv().await {
        Some(StoreRequest::GetRecord { key, respond_to }) => Some((key, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a scalar Get request
pub async fn expect_get(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, oneshot::Sender<Result<Option<String>, StoreError>>)> {
    match receiver.recv().await {
        Some(StoreRequest::Get { key, respond_to }) => Some((key, respond_to)),
        _ => None,
    }
}

// =============================================================================
// Transports
// =============================================================================

/// Captures every delivered message. Conversations marked with
/// [`RecordingTransport::fail_for`] reject deliveries until recovered.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, OutboundMessage)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn fail_for(&self, conversation_id: &str) {
        self.failing.lock().unwrap().insert(conversation_id.to_string());
    }

    pub fn recover(&self, conversation_id: &str) {
        self.failing.lock().unwrap().remove(conversation_id);
    }

    pub fn sent_to(&self, conversation_id: &str) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == conversation_id)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    pub fn last_text(&self, conversation_id: &str) -> Option<String> {
        self.sent_to(conversation_id).last().map(|m| m.text.clone())
    }

    /// Messages per recipient.
    pub fn counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for (to, _) in self.sent.lock().unwrap().iter() {
            *counts.entry(to.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        conversation_id: &str,
        message: OutboundMessage,
    ) -> Result<(), TransportError> {
        if self.failing.lock().unwrap().contains(conversation_id) {
            return Err(TransportError::Undeliverable {
                conversation: conversation_id.to_string(),
                reason: "blocked by test".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), message));
        Ok(())
    }
}

/// Panics on the first send, then behaves like the wrapped transport.
pub struct PanicOnceTransport {
    panicked: AtomicBool,
    inner: Arc<RecordingTransport>,
}

impl PanicOnceTransport {
    pub fn new(inner: Arc<RecordingTransport>) -> Self {
        Self {
            panicked: AtomicBool::new(false),
            inner,
        }
    }
}

#[async_trait]
impl Transport for PanicOnceTransport {
    async fn send(
        &self,
        conversation_id: &str,
        message: OutboundMessage,
    ) -> Result<(), TransportError> {
        if !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("transport exploded");
        }
        self.inner.send(conversation_id, message).await
    }
}

// =============================================================================
// Fault-injecting store
// =============================================================================

/// Delegates to a real store; reads always work, writes fail while
/// `fail_writes` is set.
pub struct FaultyStore {
    inner: Arc<dyn KvStore>,
    pub fail_writes: AtomicBool,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn KvStore>) -> Self {
        Self {
            inner,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Backend("injected write failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KvStore for FaultyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set(key, value).await
    }
    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.delete(key).await
    }
    async fn get_record(&self, key: &str) -> Result<Option<Record>, StoreError> {
        self.inner.get_record(key).await
    }
    async fn set_record(&self, key: &str, record: Record) -> Result<(), StoreError> {
        self.check()?;
        self.inner.set_record(key, record).await
    }
    async fn update_record(&self, key: &str, fields: Record) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.update_record(key, fields).await
    }
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.set_add(key, member).await
    }
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.set_remove(key, member).await
    }
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.inner.set_contains(key, member).await
    }
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.inner.set_members(key).await
    }
    async fn set_random(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.set_random(key).await
    }
    async fn write_batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        self.check()?;
        self.inner.write_batch(ops).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_store_client() {
        let (client, mut receiver) = create_mock_store_client(4);

        let get_task = tokio::spawn(async move { client.get("setting:greeting").await });

        let (key, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
        assert_eq!(key, "setting:greeting");
        responder.send(Ok(Some("Halo".into()))).unwrap();

        assert_eq!(get_task.await.unwrap(), Ok(Some("Halo".to_string())));
    }

    #[tokio::test]
    async fn dropped_responder_surfaces_as_actor_error() {
        let (client, mut receiver) = create_mock_store_client(4);
        let task = tokio::spawn(async move { client.get_record("product:X").await });

        let (_, responder) = expect_get_record(&mut receiver).await.expect("Expected GetRecord");
        drop(responder);

        assert!(matches!(
            task.await.unwrap(),
            Err(StoreError::ActorCommunicationError(_))
        ));
    }
}
