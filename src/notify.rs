//! Outbound messages to buyers and admins.
//!
//! Plain replies are fire-and-forget. Notifications that must not repeat
//! (new-order broadcast, payment confirmation, shipping notice) are claimed in
//! the store before they are sent, so a retry or a concurrent duplicate finds
//! the claim and stays quiet.
//!
//! Claims are grouped per order under `notifications:sent:<order id>`. Orders
//! are never archived, so these sets grow with the order history, a handful
//! of members per order. With the in-memory store they are lost on restart
//! together with the orders they guard.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::config::AdminList;
use crate::domain::OutboundMessage;
use crate::error::{StoreError, TransportError};
use crate::store::KvStore;

pub const SENT_NOTIFICATIONS_PREFIX: &str = "notifications:sent:";

/// Set holding the delivered-notification claims of one order.
pub fn sent_notifications_key(order_id: &str) -> String {
    format!("{SENT_NOTIFICATIONS_PREFIX}{order_id}")
}

/// Messaging transport. Private chats use the sender id as conversation id.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        conversation_id: &str,
        message: OutboundMessage,
    ) -> Result<(), TransportError>;
}

/// Stable identity of a notification that must be delivered at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupKey {
    NewOrder { order_id: String, admin_id: String },
    PaymentConfirmed { order_id: String, buyer_id: String },
    Shipped { order_id: String, buyer_id: String, tracking: String },
}

impl DedupKey {
    fn order_id(&self) -> &str {
        match self {
            DedupKey::NewOrder { order_id, .. }
            | DedupKey::PaymentConfirmed { order_id, .. }
            | DedupKey::Shipped { order_id, .. } => order_id,
        }
    }

    fn member(&self) -> String {
        match self {
            DedupKey::NewOrder { admin_id, .. } => format!("new_order:{admin_id}"),
            DedupKey::PaymentConfirmed { buyer_id, .. } => format!("paid:{buyer_id}"),
            DedupKey::Shipped { buyer_id, tracking, .. } => {
                format!("shipped:{buyer_id}:{tracking}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Already claimed by an earlier send.
    Duplicate,
    /// The transport failed; the claim was released so a later attempt may retry.
    Failed,
}

#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn Transport>,
    store: Arc<dyn KvStore>,
    admins: AdminList,
}

impl Notifier {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn KvStore>, admins: AdminList) -> Self {
        Self {
            transport,
            store,
            admins,
        }
    }

    pub fn admins(&self) -> &AdminList {
        &self.admins
    }

    /// Replies in the current conversation. Failures are logged, never returned:
    /// by the time a reply goes out the step's mutation has already happened.
    #[instrument(skip(self, message))]
    pub async fn reply(&self, conversation_id: &str, message: OutboundMessage) {
        if let Err(e) = self.transport.send(conversation_id, message).await {
            warn!(error = %e, "Reply not delivered");
        }
    }

    #[instrument(skip(self, message), fields(order_id = %key.order_id(), dedup = %key.member()))]
    pub async fn send_once(
        &self,
        key: DedupKey,
        recipient: &str,
        message: OutboundMessage,
    ) -> Result<Delivery, StoreError> {
        let claims = sent_notifications_key(key.order_id());
        let member = key.member();
        if !self.store.set_add(&claims, &member).await? {
            debug!("Notification already sent");
            return Ok(Delivery::Duplicate);
        }

        match self.transport.send(recipient, message).await {
            Ok(()) => {
                info!(recipient = %recipient, "Notification sent");
                Ok(Delivery::Sent)
            }
            Err(e) => {
                warn!(error = %e, recipient = %recipient, "Notification failed, releasing claim");
                if let Err(release) = self.store.set_remove(&claims, &member).await {
                    warn!(error = %release, "Could not release notification claim");
                }
                Ok(Delivery::Failed)
            }
        }
    }

    /// Sends the message to every admin, once per (order, admin).
    #[instrument(skip(self, message))]
    pub async fn notify_admins_once(
        &self,
        order_id: &str,
        message: OutboundMessage,
    ) -> Result<Vec<(String, Delivery)>, StoreError> {
        let mut results = Vec::new();
        for admin_id in self.admins.iter() {
            let key = DedupKey::NewOrder {
                order_id: order_id.to_string(),
                admin_id: admin_id.to_string(),
            };
            let delivery = self.send_once(key, admin_id, message.clone()).await?;
            results.push((admin_id.to_string(), delivery));
        }
        Ok(results)
    }
}
