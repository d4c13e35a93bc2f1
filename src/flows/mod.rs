//! Flow handlers. Each one consumes a single event for its family of
//! operations and says where the session goes next.

pub mod browse;
pub mod catalog_admin;
pub mod order_admin;
pub mod ordering;
pub mod text_override;

use std::sync::Arc;

use tracing::{error, warn};

use crate::catalog::CatalogStore;
use crate::config::AdminList;
use crate::domain::{Operation, OutboundMessage};
use crate::error::{Disposition, FlowError};
use crate::notify::{Notifier, Transport};
use crate::orders::OrderStore;
use crate::settings::SettingsStore;
use crate::store::KvStore;

/// Everything a flow may touch.
#[derive(Clone)]
pub struct FlowContext {
    pub catalog: CatalogStore,
    pub orders: OrderStore,
    pub settings: SettingsStore,
    pub notifier: Notifier,
}

impl FlowContext {
    pub fn new(store: Arc<dyn KvStore>, transport: Arc<dyn Transport>, admins: AdminList) -> Self {
        Self {
            catalog: CatalogStore::new(store.clone()),
            orders: OrderStore::new(store.clone()),
            settings: SettingsStore::new(store.clone()),
            notifier: Notifier::new(transport, store, admins),
        }
    }

    pub fn is_admin(&self, sender_id: &str) -> bool {
        self.notifier.admins().contains(sender_id)
    }

    pub async fn reply(&self, turn: &Turn, message: OutboundMessage) {
        self.notifier.reply(&turn.conversation_id, message).await;
    }

    pub async fn say(&self, turn: &Turn, text: impl Into<String>) {
        self.reply(turn, OutboundMessage::text(text)).await;
    }
}

/// Who sent the event being handled, and where replies go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub sender_id: String,
    pub conversation_id: String,
}

/// Where the session goes after a successful step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Keep the current operation.
    Stay,
    Advance(Operation),
    /// Back to Idle.
    Finish,
}

pub type FlowResult = Result<Transition, FlowError>;

/// Turns a step's outcome into the next operation, replying to the user on failure.
pub async fn conclude(
    ctx: &FlowContext,
    turn: &Turn,
    current: &Operation,
    result: FlowResult,
) -> Operation {
    match result {
        Ok(Transition::Stay) => current.clone(),
        Ok(Transition::Advance(next)) => next,
        Ok(Transition::Finish) => Operation::Idle,
        Err(e) => {
            match &e {
                FlowError::Validation(_) | FlowError::NotFound { .. } | FlowError::Duplicate { .. } => {
                    warn!(error = %e, op = current.name(), "Step rejected")
                }
                _ => error!(error = %e, op = current.name(), "Step failed"),
            }
            ctx.say(turn, e.user_message()).await;
            match e.disposition() {
                Disposition::Retry => current.clone(),
                Disposition::Abort => Operation::Idle,
            }
        }
    }
}

/// Trimmed text, or a validation error naming what was expected.
pub(crate) fn require_text<'a>(text: &'a str, what: &str) -> Result<&'a str, FlowError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(FlowError::validation(format!("{what} must not be empty. Please send it again.")))
    } else {
        Ok(trimmed)
    }
}
