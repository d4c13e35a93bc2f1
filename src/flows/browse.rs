//! Idle handler: menus, catalog browsing, help and the buyer's order list.
//! None of these change the session.

use tracing::{debug, instrument};

use super::{FlowContext, FlowResult, Transition, Turn};
use crate::domain::{format_price, Action, ButtonKey, OutboundMessage, SettingKey};
use crate::error::{CatalogError, FlowError};

async fn label(ctx: &FlowContext, key: ButtonKey) -> Result<String, FlowError> {
    Ok(ctx.settings.label(key).await?)
}

pub async fn main_menu(ctx: &FlowContext, turn: &Turn, text: String) -> Result<OutboundMessage, FlowError> {
    let mut menu = OutboundMessage::text(text)
        .with_button(label(ctx, ButtonKey::ViewProducts).await?, Action::ViewCatalog)
        .with_button(label(ctx, ButtonKey::TrackOrder).await?, Action::TrackOrders)
        .with_button(label(ctx, ButtonKey::Help).await?, Action::Help);
    if ctx.is_admin(&turn.sender_id) {
        menu = menu.with_button(label(ctx, ButtonKey::AdminPanel).await?, Action::AdminPanel);
    }
    Ok(menu)
}

#[instrument(skip(ctx))]
pub async fn start(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    let greeting = ctx.settings.setting(SettingKey::Greeting).await?;
    ctx.reply(turn, main_menu(ctx, turn, greeting).await?).await;
    Ok(Transition::Stay)
}

#[instrument(skip(ctx))]
pub async fn view_catalog(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    let products = ctx.catalog.list_products().await?;
    if products.is_empty() {
        ctx.say(turn, "📭 No products available yet.").await;
        return Ok(Transition::Stay);
    }

    let mut message = OutboundMessage::text("🛍️ Our products:");
    for product in &products {
        message = message.with_button(
            format!("{} - {}", product.name, format_price(product.price)),
            Action::ViewProduct(product.id.clone()),
        );
    }
    message = message.with_button(label(ctx, ButtonKey::Back).await?, Action::Start);
    ctx.reply(turn, message).await;
    Ok(Transition::Stay)
}

#[instrument(skip(ctx))]
pub async fn view_product(ctx: &FlowContext, turn: &Turn, product_id: &str) -> FlowResult {
    let Some(product) = ctx.catalog.get_product(product_id).await? else {
        // A stale button must not throw away whatever the user is in the middle of.
        ctx.say(turn, FlowError::NotFound { kind: "product", id: product_id.into() }.user_message())
            .await;
        return Ok(Transition::Stay);
    };

    let description = if product.description.is_empty() {
        "-"
    } else {
        product.description.as_str()
    };
    let mut message = OutboundMessage::text(format!(
        "🛍️ {}\n💰 Price: {}\n📦 Stock: {}\n📝 {}",
        product.name,
        format_price(product.price),
        product.stock,
        description
    ));
    if product.stock > 0 {
        message = message.with_button(label(ctx, ButtonKey::Buy).await?, Action::BuyProduct(product.id.clone()));
    }
    if !product.links.is_empty() {
        message = message.with_button(label(ctx, ButtonKey::OpenLink).await?, Action::OpenLink(product.id.clone()));
    }
    message = message.with_button(label(ctx, ButtonKey::Back).await?, Action::ViewCatalog);
    ctx.reply(turn, message).await;
    Ok(Transition::Stay)
}

#[instrument(skip(ctx))]
pub async fn open_link(ctx: &FlowContext, turn: &Turn, product_id: &str) -> FlowResult {
    match ctx.catalog.random_link(product_id).await {
        Ok(Some(url)) => {
            debug!(url = %url, "Picked link");
            let message = OutboundMessage::text("🌐 Here is your link:")
                .with_link(label(ctx, ButtonKey::OpenLink).await?, url);
            ctx.reply(turn, message).await;
        }
        Ok(None) => ctx.say(turn, "ℹ️ This product has no links.").await,
        Err(CatalogError::NotFound(id)) => {
            ctx.say(turn, FlowError::NotFound { kind: "product", id }.user_message()).await
        }
        Err(e) => return Err(e.into()),
    }
    Ok(Transition::Stay)
}

#[instrument(skip(ctx))]
pub async fn track_orders(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    let orders = ctx.orders.list_orders_by_buyer(&turn.sender_id).await?;
    if orders.is_empty() {
        ctx.say(turn, "📭 You have no orders yet.").await;
        return Ok(Transition::Stay);
    }

    let lines: Vec<String> = orders
        .iter()
        .map(|order| {
            format!(
                "🆔 {}\n📦 {} ({})\n📌 Status: {}\n🚚 Tracking: {}",
                order.id,
                order.product.name,
                format_price(order.product.price),
                order.status,
                order.tracking_number.as_deref().unwrap_or("-")
            )
        })
        .collect();
    ctx.say(turn, format!("📦 Your orders:\n\n{}", lines.join("\n\n"))).await;
    Ok(Transition::Stay)
}

pub async fn help(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    let help = ctx.settings.setting(SettingKey::Help).await?;
    ctx.say(turn, help).await;
    Ok(Transition::Stay)
}

#[instrument(skip(ctx))]
pub async fn admin_panel(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    let entries = [
        (ButtonKey::AdminAddProduct, Action::AdminAddProduct),
        (ButtonKey::AdminEditProduct, Action::AdminEditProduct),
        (ButtonKey::AdminDeleteProduct, Action::AdminDeleteProduct),
        (ButtonKey::AdminListOrders, Action::AdminListOrders),
        (ButtonKey::AdminConfirmPayment, Action::AdminConfirmPayment),
        (ButtonKey::AdminSetTracking, Action::AdminSetTracking),
        (ButtonKey::AdminSetStatus, Action::AdminSetStatus),
        (ButtonKey::AdminSetGreeting, Action::AdminSetGreeting),
        (ButtonKey::AdminSetPayment, Action::AdminSetPayment),
        (ButtonKey::AdminSetHelp, Action::AdminSetHelp),
        (ButtonKey::AdminSetButtons, Action::AdminButtonsMenu),
        (ButtonKey::Back, Action::Start),
    ];
    let mut message = OutboundMessage::text("⚙️ Admin panel");
    for (key, action) in entries {
        message = message.with_button(label(ctx, key).await?, action);
    }
    ctx.reply(turn, message).await;
    Ok(Transition::Stay)
}

/// Free text while no flow is active.
pub async fn idle_text(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    let menu = main_menu(ctx, turn, "ℹ️ Please choose an option from the menu.".to_string()).await?;
    ctx.reply(turn, menu).await;
    Ok(Transition::Stay)
}
