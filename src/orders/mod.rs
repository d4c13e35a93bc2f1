//! Order records and the admin lifecycle actions on them.

pub mod actions;
pub mod entity;

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::actor_framework::Repository;
use crate::domain::{Order, OrderCreate, OrderStatus, StatusChange};
use crate::error::{OrderError, RepoError};
use crate::store::KvStore;

pub use actions::OrderAction;
pub use entity::{buyer_orders_key, order_key, ORDER_INDEX};

/// Retries after an id collision. Each retry re-reads the clock and adds a
/// random suffix, so exhausting them needs dozens of same-millisecond clashes.
const MAX_ID_ATTEMPTS: u32 = 32;

fn order_id(attempt: u32) -> String {
    let millis = Utc::now().timestamp_millis();
    match attempt {
        0 => format!("ORD-{millis}"),
        _ => format!("ORD-{millis}-{}", rand::thread_rng().gen_range(1000..10000)),
    }
}

#[derive(Clone)]
pub struct OrderStore {
    repo: Repository<Order>,
}

impl OrderStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    /// Persists a new order under a fresh `ORD-<unix millis>` id.
    #[instrument(skip(self, params), fields(product_id = %params.product.id, buyer = %params.buyer_id))]
    pub async fn create_order(&self, params: OrderCreate) -> Result<Order, OrderError> {
        let mut attempt = 0;
        loop {
            let id = order_id(attempt);
            match self.repo.create(id, params.clone()).await {
                Ok(order) => {
                    info!(order_id = %order.id, "Order created");
                    return Ok(order);
                }
                Err(RepoError::AlreadyExists { id, .. }) if attempt + 1 < MAX_ID_ATTEMPTS => {
                    warn!(order_id = %id, "Order id taken, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn confirm_payment(&self, id: &str) -> Result<(Order, StatusChange), OrderError> {
        self.act(id, OrderAction::ConfirmPayment).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn set_tracking(
        &self,
        id: &str,
        tracking: &str,
    ) -> Result<(Order, StatusChange), OrderError> {
        self.act(id, OrderAction::SetTracking(tracking.to_string())).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn set_status(
        &self,
        id: &str,
        status: OrderStatus,
    ) -> Result<(Order, StatusChange), OrderError> {
        self.act(id, OrderAction::SetStatus(status)).await
    }

    async fn act(
        &self,
        id: &str,
        action: OrderAction,
    ) -> Result<(Order, StatusChange), OrderError> {
        let (order, change) = self.repo.perform_action(id, action).await?;
        info!(from = %change.previous, to = %change.current, "Order status applied");
        Ok((order, change))
    }

    /// A buyer's orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders_by_buyer(&self, buyer_id: &str) -> Result<Vec<Order>, OrderError> {
        let ids = self
            .repo
            .store()
            .set_members(&buyer_orders_key(buyer_id))
            .await?;
        let mut orders = self.repo.get_many(&ids).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}

crate::impl_client_methods!(OrderStore, Order, OrderError, order);
