//! Admin catalog management: add, edit and delete products.

use tracing::{info, instrument};

use super::{require_text, FlowContext, FlowResult, Transition, Turn};
use crate::catalog::parse::{parse_new_product, parse_product_patch, ADD_TEMPLATE};
use crate::domain::{format_price, Action, Operation, OutboundMessage, Product};
use crate::error::FlowError;

const CONFIRM_WORDS: &[&str] = &["yes", "y", "ya"];
const CANCEL_WORDS: &[&str] = &["no", "n", "batal", "tidak"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purpose {
    Edit,
    Delete,
}

pub async fn start_add(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    ctx.say(
        turn,
        format!("➕ Send the new product in this format:\n\n{ADD_TEMPLATE}\n\nid, name, price and stock are required."),
    )
    .await;
    Ok(Transition::Advance(Operation::CatalogAdd))
}

pub async fn start_edit(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    offer_products(ctx, turn, Purpose::Edit).await
}

pub async fn start_delete(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    offer_products(ctx, turn, Purpose::Delete).await
}

async fn offer_products(ctx: &FlowContext, turn: &Turn, purpose: Purpose) -> FlowResult {
    let products = ctx.catalog.list_products().await?;
    if products.is_empty() {
        ctx.say(turn, "📭 The catalog is empty.").await;
        return Ok(Transition::Finish);
    }

    let (prompt, next) = match purpose {
        Purpose::Edit => ("✏️ Pick a product to edit, or type its id:", Operation::CatalogEditSelect),
        Purpose::Delete => ("❌ Pick a product to delete, or type its id:", Operation::CatalogDeleteSelect),
    };
    let mut message = OutboundMessage::text(prompt);
    for product in products {
        let action = match purpose {
            Purpose::Edit => Action::AdminSelectEdit(product.id.clone()),
            Purpose::Delete => Action::AdminSelectDelete(product.id.clone()),
        };
        message = message.with_button(format!("{} ({})", product.name, product.id), action);
    }
    ctx.reply(turn, message).await;
    Ok(Transition::Advance(next))
}

async fn load(ctx: &FlowContext, product_id: &str) -> Result<Product, FlowError> {
    ctx.catalog
        .get_product(product_id)
        .await?
        .ok_or_else(|| FlowError::NotFound {
            kind: "product",
            id: product_id.to_string(),
        })
}

#[instrument(skip(ctx))]
pub async fn select_edit(ctx: &FlowContext, turn: &Turn, product_id: &str) -> FlowResult {
    let product = load(ctx, product_id).await?;
    let mut current = format!(
        "name: {}\nprice: {}\nstock: {}\ndescription: {}",
        product.name, product.price, product.stock, product.description
    );
    for (i, link) in product.links.iter().enumerate() {
        current.push_str(&format!("\nlink{}: {link}", i + 1));
    }
    ctx.say(
        turn,
        format!(
            "✏️ Editing {}. Current values:\n\n{current}\n\nSend only the keys you want to change.",
            product.id
        ),
    )
    .await;
    Ok(Transition::Advance(Operation::CatalogEditApply {
        product_id: product.id,
    }))
}

#[instrument(skip(ctx))]
pub async fn select_delete(ctx: &FlowContext, turn: &Turn, product_id: &str) -> FlowResult {
    let product = load(ctx, product_id).await?;
    let message = OutboundMessage::text(format!(
        "⚠️ Delete {} ({}, {})? Reply yes or no.",
        product.name,
        product.id,
        format_price(product.price)
    ))
    .with_button("✅ Yes, delete", Action::AdminConfirmDelete)
    .with_button("↩️ Cancel", Action::AdminCancelDelete);
    ctx.reply(turn, message).await;
    Ok(Transition::Advance(Operation::CatalogDeleteConfirm {
        product_id: product.id,
    }))
}

#[instrument(skip(ctx))]
pub async fn confirm_delete(ctx: &FlowContext, turn: &Turn, product_id: &str) -> FlowResult {
    ctx.catalog.delete_product(product_id).await?;
    info!(product_id = %product_id, "Product deleted");
    ctx.say(turn, format!("🗑️ Product {product_id} deleted.")).await;
    Ok(Transition::Finish)
}

pub async fn cancel_delete(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    ctx.say(turn, "↩️ Deletion cancelled. Nothing was changed.").await;
    Ok(Transition::Finish)
}

#[instrument(skip(ctx, text), fields(op = op.name()))]
pub async fn handle_text(ctx: &FlowContext, turn: &Turn, op: &Operation, text: &str) -> FlowResult {
    match op {
        Operation::CatalogAdd => {
            let (id, draft) = parse_new_product(text)?;
            let product = ctx.catalog.create_product(&id, draft).await?;
            ctx.say(
                turn,
                format!(
                    "✅ Product {} added: {} at {}, stock {}.",
                    product.id,
                    product.name,
                    format_price(product.price),
                    product.stock
                ),
            )
            .await;
            Ok(Transition::Finish)
        }
        Operation::CatalogEditSelect => {
            let id = require_text(text, "Product id")?;
            select_edit(ctx, turn, id).await
        }
        Operation::CatalogEditApply { product_id } => {
            let patch = parse_product_patch(product_id, text)?;
            let product = ctx.catalog.update_product(product_id, patch).await?;
            ctx.say(turn, format!("✅ Product {} updated.", product.id)).await;
            Ok(Transition::Finish)
        }
        Operation::CatalogDeleteSelect => {
            let id = require_text(text, "Product id")?;
            select_delete(ctx, turn, id).await
        }
        Operation::CatalogDeleteConfirm { product_id } => {
            let answer = text.trim().to_lowercase();
            if CONFIRM_WORDS.contains(&answer.as_str()) {
                confirm_delete(ctx, turn, product_id).await
            } else if CANCEL_WORDS.contains(&answer.as_str()) {
                cancel_delete(ctx, turn).await
            } else {
                Err(FlowError::validation("Please reply yes or no."))
            }
        }
        other => Err(FlowError::Internal(format!(
            "catalog handler got {}",
            other.name()
        ))),
    }
}
