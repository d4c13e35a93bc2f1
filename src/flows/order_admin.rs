//! Admin order lifecycle: confirm payment, set tracking number, set free-text status.

use tracing::{info, instrument, warn};

use super::{require_text, FlowContext, FlowResult, Transition, Turn};
use crate::domain::{format_price, Operation, OrderStatus, OutboundMessage};
use crate::error::FlowError;
use crate::notify::{DedupKey, Delivery};

/// Most recent orders shown in the admin list.
const ORDER_LIST_LIMIT: usize = 20;

pub async fn start_confirm_payment(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    ctx.say(turn, "💳 Send the order id whose payment you received:").await;
    Ok(Transition::Advance(Operation::OrderConfirmPayment))
}

pub async fn start_set_tracking(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    ctx.say(turn, "🚚 Send ORDER_ID|TRACKING_NUMBER").await;
    Ok(Transition::Advance(Operation::OrderSetTracking))
}

pub async fn start_set_status(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    ctx.say(turn, "🔄 Send ORDER_ID|STATUS").await;
    Ok(Transition::Advance(Operation::OrderSetStatus))
}

#[instrument(skip(ctx))]
pub async fn list_orders(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    let mut orders = ctx.orders.list_orders().await?;
    if orders.is_empty() {
        ctx.say(turn, "📭 No orders yet.").await;
        return Ok(Transition::Stay);
    }
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let lines: Vec<String> = orders
        .iter()
        .take(ORDER_LIST_LIMIT)
        .map(|order| {
            format!(
                "🆔 {} | {} | {} | {} | {}",
                order.id,
                order.product.name,
                format_price(order.product.price),
                order.shipping.name,
                order.status
            )
        })
        .collect();
    let mut text = format!("📦 Orders ({} total):\n\n{}", orders.len(), lines.join("\n"));
    if orders.len() > ORDER_LIST_LIMIT {
        text.push_str(&format!("\n\n…showing the latest {ORDER_LIST_LIMIT}."));
    }
    ctx.say(turn, text).await;
    Ok(Transition::Stay)
}

/// Splits `a|b` into two non-empty, trimmed parts.
fn split_pair<'a>(text: &'a str, second: &str) -> Result<(&'a str, &'a str), FlowError> {
    let malformed = || FlowError::validation(format!("Format: ORDER_ID|{second}"));
    let (id, value) = text.split_once('|').ok_or_else(malformed)?;
    let (id, value) = (id.trim(), value.trim());
    if id.is_empty() || value.is_empty() {
        return Err(malformed());
    }
    Ok((id, value))
}

#[instrument(skip(ctx, text), fields(op = op.name()))]
pub async fn handle_text(ctx: &FlowContext, turn: &Turn, op: &Operation, text: &str) -> FlowResult {
    match op {
        Operation::OrderConfirmPayment => {
            let order_id = require_text(text, "Order id")?;
            let (order, change) = ctx.orders.confirm_payment(order_id).await?;
            if !change.transitioned() {
                ctx.say(turn, format!("ℹ️ Order {} was already marked as paid.", order.id)).await;
                return Ok(Transition::Finish);
            }

            let key = DedupKey::PaymentConfirmed {
                order_id: order.id.clone(),
                buyer_id: order.buyer_id.clone(),
            };
            let notice = OutboundMessage::text(format!(
                "✅ Your payment for order {} ({}) has been confirmed. We'll ship it soon!",
                order.id, order.product.name
            ));
            report_delivery(ctx, key, &order.buyer_id, notice).await;
            ctx.say(turn, format!("✅ Payment for {} confirmed.", order.id)).await;
            Ok(Transition::Finish)
        }
        Operation::OrderSetTracking => {
            let (order_id, tracking) = split_pair(text, "TRACKING_NUMBER")?;
            let (order, _) = ctx.orders.set_tracking(order_id, tracking).await?;
            let key = DedupKey::Shipped {
                order_id: order.id.clone(),
                buyer_id: order.buyer_id.clone(),
                tracking: tracking.to_string(),
            };
            let notice = OutboundMessage::text(format!(
                "🚚 Your order {} has shipped!\nTracking number: {}",
                order.id, tracking
            ));
            report_delivery(ctx, key, &order.buyer_id, notice).await;
            ctx.say(turn, format!("✅ Tracking number for {} saved.", order.id)).await;
            Ok(Transition::Finish)
        }
        Operation::OrderSetStatus => {
            let (order_id, status) = split_pair(text, "STATUS")?;
            let (order, change) = ctx.orders.set_status(order_id, OrderStatus::from(status)).await?;
            info!(order_id = %order.id, status = %change.current, "Status overwritten");
            ctx.say(turn, format!("✅ Order {} status is now: {}", order.id, change.current)).await;
            Ok(Transition::Finish)
        }
        other => Err(FlowError::Internal(format!(
            "order admin handler got {}",
            other.name()
        ))),
    }
}

/// Buyer notices follow an applied mutation, so failures are logged only.
async fn report_delivery(ctx: &FlowContext, key: DedupKey, buyer_id: &str, notice: OutboundMessage) {
    match ctx.notifier.send_once(key, buyer_id, notice).await {
        Ok(Delivery::Sent) | Ok(Delivery::Duplicate) => {}
        Ok(Delivery::Failed) => warn!(buyer = %buyer_id, "Buyer notice not delivered"),
        Err(e) => warn!(error = %e, buyer = %buyer_id, "Buyer notice skipped"),
    }
}
