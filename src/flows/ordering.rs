//! Buyer ordering dialogue: name, then address, then phone, then the order is placed.

use tracing::{info, instrument, warn};

use super::{require_text, FlowContext, FlowResult, Transition, Turn};
use crate::domain::{
    format_price, Action, ButtonKey, Operation, Order, OrderCreate, OutboundMessage, ProductSnapshot,
    SettingKey, ShippingDetails,
};
use crate::error::FlowError;

const MIN_PHONE_DIGITS: usize = 6;

/// Enters the dialogue for a product. The snapshot taken here is what the
/// order will record, whatever happens to the product afterwards.
#[instrument(skip(ctx))]
pub async fn start(ctx: &FlowContext, turn: &Turn, product_id: &str) -> FlowResult {
    let product = ctx
        .catalog
        .get_product(product_id)
        .await?
        .ok_or_else(|| FlowError::NotFound {
            kind: "product",
            id: product_id.to_string(),
        })?;
    if product.stock == 0 {
        return Err(FlowError::validation(format!("{} is out of stock.", product.name)));
    }

    ctx.say(
        turn,
        format!(
            "🛒 Ordering {} ({}).\n\n👤 Please enter the recipient's name:",
            product.name,
            format_price(product.price)
        ),
    )
    .await;
    Ok(Transition::Advance(Operation::OrderingName {
        product: product.snapshot(),
    }))
}

#[instrument(skip(ctx, text), fields(op = op.name()))]
pub async fn handle_text(ctx: &FlowContext, turn: &Turn, op: &Operation, text: &str) -> FlowResult {
    match op {
        Operation::OrderingName { product } => {
            let name = require_text(text, "Name")?;
            ctx.say(turn, "🏠 Please enter the shipping address:").await;
            Ok(Transition::Advance(Operation::OrderingAddress {
                product: product.clone(),
                name: name.to_string(),
            }))
        }
        Operation::OrderingAddress { product, name } => {
            let address = require_text(text, "Address")?;
            ctx.say(turn, "📞 Please enter the phone number:").await;
            Ok(Transition::Advance(Operation::OrderingPhone {
                product: product.clone(),
                name: name.clone(),
                address: address.to_string(),
            }))
        }
        Operation::OrderingPhone { product, name, address } => {
            let phone = validate_phone(text)?;
            let shipping = ShippingDetails {
                name: name.clone(),
                address: address.clone(),
                phone: phone.to_string(),
            };
            place_order(ctx, turn, product.clone(), shipping).await
        }
        other => Err(FlowError::Internal(format!(
            "ordering handler got {}",
            other.name()
        ))),
    }
}

fn validate_phone(text: &str) -> Result<&str, FlowError> {
    let phone = require_text(text, "Phone number")?;
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' '));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !allowed || digits < MIN_PHONE_DIGITS {
        return Err(FlowError::validation(
            "That does not look like a phone number. Please send digits only, e.g. 08123456789.",
        ));
    }
    Ok(phone)
}

async fn place_order(
    ctx: &FlowContext,
    turn: &Turn,
    product: ProductSnapshot,
    shipping: ShippingDetails,
) -> FlowResult {
    let order = ctx
        .orders
        .create_order(OrderCreate {
            product,
            buyer_id: turn.sender_id.clone(),
            shipping,
        })
        .await?;
    info!(order_id = %order.id, "Order placed");

    // The order exists from here on; nothing below may undo or fail the step.
    let payment_info = match ctx.settings.setting(SettingKey::PaymentInfo).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Payment info unavailable, using default");
            SettingKey::PaymentInfo.default_value().to_string()
        }
    };
    ctx.say(turn, buyer_summary(&order, &payment_info)).await;

    let confirm_label = ctx
        .settings
        .label(ButtonKey::AdminConfirmPayment)
        .await
        .unwrap_or_else(|_| ButtonKey::AdminConfirmPayment.default_label().to_string());
    let admin_message =
        OutboundMessage::text(admin_summary(&order)).with_button(confirm_label, Action::AdminConfirmPayment);
    if let Err(e) = ctx.notifier.notify_admins_once(&order.id, admin_message).await {
        warn!(error = %e, order_id = %order.id, "Admin notification skipped");
    }

    Ok(Transition::Finish)
}

fn buyer_summary(order: &Order, payment_info: &str) -> String {
    format!(
        "✅ Order created!\n\n🆔 Order ID: {}\n📦 Product: {}\n💰 Price: {}\n👤 Name: {}\n🏠 Address: {}\n📞 Phone: {}\n\n💳 Payment instructions:\n{}",
        order.id,
        order.product.name,
        format_price(order.product.price),
        order.shipping.name,
        order.shipping.address,
        order.shipping.phone,
        payment_info
    )
}

fn admin_summary(order: &Order) -> String {
    format!(
        "🆕 New order {}\n📦 {} ({})\n🙍 Buyer: {}\n👤 {}\n🏠 {}\n📞 {}",
        order.id,
        order.product.name,
        format_price(order.product.price),
        order.buyer_id,
        order.shipping.name,
        order.shipping.address,
        order.shipping.phone
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_numbers_need_enough_digits() {
        assert_eq!(validate_phone(" 08123456789 ").unwrap(), "08123456789");
        assert!(validate_phone("+62 812-3456-789").is_ok());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("123").is_err());
        assert!(validate_phone("").is_err());
    }
}
