use chrono::{DateTime, Utc};

use super::actions::OrderAction;
use crate::actor_framework::Entity;
use crate::domain::{Order, OrderCreate, OrderStatus, ProductSnapshot, ShippingDetails, StatusChange};
use crate::store::{Record, WriteOp};

pub const ORDER_INDEX: &str = "orders";

pub fn order_key(id: &str) -> String {
    format!("order:{id}")
}

pub fn buyer_orders_key(buyer_id: &str) -> String {
    format!("orders:buyer:{buyer_id}")
}

fn field(record: &Record, name: &str) -> Result<String, String> {
    record
        .get(name)
        .cloned()
        .ok_or_else(|| format!("missing field {name}"))
}

impl Entity for Order {
    type CreateParams = OrderCreate;
    type Patch = (); // Orders change only through actions
    type Action = OrderAction;
    type ActionResult = StatusChange;

    const KIND: &'static str = "order";
    const INDEX_KEY: &'static str = ORDER_INDEX;

    fn id(&self) -> &str {
        &self.id
    }

    fn record_key(id: &str) -> String {
        order_key(id)
    }

    /// New orders start out waiting for payment.
    fn from_create_params(id: String, params: OrderCreate) -> Result<Self, String> {
        let shipping = &params.shipping;
        if [&shipping.name, &shipping.address, &shipping.phone]
            .iter()
            .any(|v| v.trim().is_empty())
        {
            return Err("shipping name, address and phone are required".into());
        }
        Ok(Self {
            id,
            product: params.product,
            buyer_id: params.buyer_id,
            shipping: params.shipping,
            status: OrderStatus::WaitingPayment,
            tracking_number: None,
            created_at: Utc::now(),
        })
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("product_id".into(), self.product.id.clone());
        record.insert("product_name".into(), self.product.name.clone());
        record.insert("price".into(), self.product.price.to_string());
        record.insert("buyer_id".into(), self.buyer_id.clone());
        record.insert("shipping_name".into(), self.shipping.name.clone());
        record.insert("shipping_address".into(), self.shipping.address.clone());
        record.insert("shipping_phone".into(), self.shipping.phone.clone());
        record.insert("status".into(), self.status.to_string());
        if let Some(tracking) = &self.tracking_number {
            record.insert("tracking_number".into(), tracking.clone());
        }
        record.insert("created_at".into(), self.created_at.to_rfc3339());
        record
    }

    fn from_record(id: &str, record: &Record) -> Result<Self, String> {
        let price = field(record, "price")?
            .parse()
            .map_err(|e| format!("bad price: {e}"))?;
        let created_at = DateTime::parse_from_rfc3339(&field(record, "created_at")?)
            .map_err(|e| format!("bad created_at: {e}"))?
            .with_timezone(&Utc);
        Ok(Self {
            id: id.to_string(),
            product: ProductSnapshot {
                id: field(record, "product_id")?,
                name: field(record, "product_name")?,
                price,
            },
            buyer_id: field(record, "buyer_id")?,
            shipping: ShippingDetails {
                name: field(record, "shipping_name")?,
                address: field(record, "shipping_address")?,
                phone: field(record, "shipping_phone")?,
            },
            status: OrderStatus::from(field(record, "status")?),
            tracking_number: record.get("tracking_number").cloned(),
            created_at,
        })
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), String> {
        Ok(())
    }

    fn handle_action(&mut self, action: OrderAction) -> Result<StatusChange, String> {
        let previous = self.status.clone();
        match action {
            OrderAction::ConfirmPayment => self.status = OrderStatus::Paid,
            OrderAction::SetTracking(tracking) => {
                let tracking = tracking.trim();
                if tracking.is_empty() {
                    return Err("tracking number must not be empty".into());
                }
                self.tracking_number = Some(tracking.to_string());
                self.status = OrderStatus::Shipped;
            }
            OrderAction::SetStatus(status) => {
                if status.as_str().trim().is_empty() {
                    return Err("status must not be empty".into());
                }
                self.status = status;
            }
        }
        Ok(StatusChange {
            previous,
            current: self.status.clone(),
        })
    }

    fn companion_writes(&self) -> Vec<WriteOp> {
        vec![WriteOp::SetAdd {
            key: buyer_orders_key(&self.buyer_id),
            members: vec![self.id.clone()],
        }]
    }

    fn companion_deletes(&self) -> Vec<WriteOp> {
        vec![WriteOp::SetRemove {
            key: buyer_orders_key(&self.buyer_id),
            member: self.id.clone(),
        }]
    }
}
