//! One handler for every admin-editable text: shop settings and button labels.

use tracing::instrument;

use super::{require_text, FlowContext, FlowResult, Transition, Turn};
use crate::domain::{Action, ButtonKey, NamedText, Operation, OutboundMessage};
use crate::error::FlowError;

#[instrument(skip(ctx))]
pub async fn start(ctx: &FlowContext, turn: &Turn, target: NamedText) -> FlowResult {
    let current = ctx.settings.get_text(target).await?;
    ctx.say(
        turn,
        format!(
            "✏️ Send the new {}.\n\nCurrent value:\n{current}",
            target.describe()
        ),
    )
    .await;
    Ok(Transition::Advance(Operation::from(target)))
}

/// Lists every button with its current label.
#[instrument(skip(ctx))]
pub async fn buttons_menu(ctx: &FlowContext, turn: &Turn) -> FlowResult {
    let mut message = OutboundMessage::text("🔧 Pick a button to rename:");
    for (key, label) in ctx.settings.button_labels().await? {
        message = message.with_button(format!("{} → {label}", key.as_ref()), Action::AdminEditButton(key));
    }
    let back = ctx.settings.label(ButtonKey::Back).await?;
    ctx.reply(turn, message.with_button(back, Action::AdminPanel)).await;
    Ok(Transition::Stay)
}

#[instrument(skip(ctx, text), fields(op = op.name()))]
pub async fn handle_text(ctx: &FlowContext, turn: &Turn, op: &Operation, text: &str) -> FlowResult {
    let target = op
        .named_text()
        .ok_or_else(|| FlowError::Internal(format!("text override handler got {}", op.name())))?;
    let value = require_text(text, "The new text")?;
    ctx.settings.set_text(target, value).await?;

    ctx.say(turn, format!("✅ Saved the new {}.", target.describe())).await;
    Ok(Transition::Finish)
}
