//! Conversation controller: picks exactly one handler per inbound event.
//!
//! Dispatch precedence, first match wins:
//!
//! 1. Cancel (button or `/cancel`) clears whatever is active.
//! 2. Free text goes to the active operation's flow. Families are checked in
//!    the order Ordering, Catalog Admin, Order Admin, Text Override; a session
//!    holds one operation, so exactly one of them can match.
//! 3. Otherwise the Idle handler answers.
//!
//! Actions are navigation. An action that starts a flow abandons the active
//! operation first; read-only views (catalog, help, order lists) leave it in
//! place so the user can continue typing afterwards. Delete confirm/cancel are
//! the only actions that continue an operation instead of starting one.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, instrument, warn};

use crate::domain::{Action, EventPayload, FlowFamily, InboundEvent, NamedText, Operation, Session, SettingKey};
use crate::error::FlowError;
use crate::flows::{
    browse, catalog_admin, conclude, order_admin, ordering, text_override, FlowContext, FlowResult,
    Transition, Turn,
};
use crate::session_store::SessionStore;

const GENERIC_FAILURE: &str = "⚠️ Something went wrong. Please start again from the menu.";

pub struct Controller {
    sessions: Arc<dyn SessionStore>,
    ctx: FlowContext,
}

/// Typed slash commands behave like their buttons.
fn command_action(text: &str) -> Option<Action> {
    let command = text.trim().split_whitespace().next()?;
    let action = match command {
        "/start" | "/menu" => Action::Start,
        "/cancel" | "/batal" => Action::Cancel,
        "/help" => Action::Help,
        "/admin" => Action::AdminPanel,
        _ => return None,
    };
    Some(action)
}

/// Whether the action begins a new flow (and so replaces the active one).
fn starts_flow(action: &Action) -> bool {
    matches!(
        action,
        Action::Start
            | Action::BuyProduct(_)
            | Action::AdminAddProduct
            | Action::AdminEditProduct
            | Action::AdminSelectEdit(_)
            | Action::AdminDeleteProduct
            | Action::AdminSelectDelete(_)
            | Action::AdminConfirmPayment
            | Action::AdminSetTracking
            | Action::AdminSetStatus
            | Action::AdminSetGreeting
            | Action::AdminSetPayment
            | Action::AdminSetHelp
            | Action::AdminEditButton(_)
    )
}

impl Controller {
    pub fn new(sessions: Arc<dyn SessionStore>, ctx: FlowContext) -> Self {
        Self { sessions, ctx }
    }

    pub fn context(&self) -> &FlowContext {
        &self.ctx
    }

    /// Handles one event and persists the resulting session. Returns the
    /// operation the conversation is now in.
    #[instrument(name = "controller", skip(self, event), fields(conversation = %event.conversation_id, sender = %event.sender_id))]
    pub async fn handle(&self, event: InboundEvent) -> Result<Operation, FlowError> {
        let turn = Turn {
            sender_id: event.sender_id,
            conversation_id: event.conversation_id,
        };

        let current = match self.sessions.get(&turn.conversation_id).await {
            Ok(session) => session.map(|s| s.operation).unwrap_or_default(),
            Err(e) => {
                error!(error = %e, "Session unreadable");
                self.ctx.say(&turn, FlowError::from(e.clone()).user_message()).await;
                return Err(e.into());
            }
        };

        let dispatched = AssertUnwindSafe(self.dispatch(&turn, &current, event.payload))
            .catch_unwind()
            .await;
        let next = match dispatched {
            Ok(next) => next,
            Err(_) => {
                error!(op = current.name(), "Flow panicked, resetting conversation");
                self.ctx.say(&turn, GENERIC_FAILURE).await;
                Operation::Idle
            }
        };

        self.persist(&turn, &current, &next).await?;
        Ok(next)
    }

    async fn persist(&self, turn: &Turn, current: &Operation, next: &Operation) -> Result<(), FlowError> {
        let saved = if next.is_idle() {
            if current.is_idle() {
                return Ok(());
            }
            self.sessions.clear(&turn.conversation_id).await
        } else {
            self.sessions
                .set(Session::new(turn.conversation_id.clone(), next.clone()))
                .await
        };
        saved.map_err(|e| {
            error!(error = %e, op = next.name(), "Session not saved");
            FlowError::from(e)
        })
    }

    async fn dispatch(&self, turn: &Turn, current: &Operation, payload: EventPayload) -> Operation {
        let payload = match payload {
            EventPayload::Text(text) => match command_action(&text) {
                Some(action) => EventPayload::Action(action),
                None => EventPayload::Text(text),
            },
            action => action,
        };

        match payload {
            EventPayload::Action(Action::Cancel) => self.cancel(turn, current).await,
            EventPayload::Text(text) => {
                let result = self.route_text(turn, current, &text).await;
                conclude(&self.ctx, turn, current, result).await
            }
            EventPayload::Action(action) => {
                let base = if starts_flow(&action) && !current.is_idle() {
                    info!(abandoned = current.name(), action = %action, "Abandoning active operation");
                    Operation::Idle
                } else {
                    current.clone()
                };
                let result = self.route_action(turn, &base, action).await;
                conclude(&self.ctx, turn, &base, result).await
            }
        }
    }

    async fn cancel(&self, turn: &Turn, current: &Operation) -> Operation {
        if current.is_idle() {
            self.ctx.say(turn, "ℹ️ Nothing to cancel.").await;
        } else {
            info!(op = current.name(), "Operation cancelled");
            self.ctx.say(turn, "❌ Cancelled.").await;
        }
        Operation::Idle
    }

    fn check_admin(&self, turn: &Turn, what: &str) -> Result<(), FlowError> {
        if self.ctx.is_admin(&turn.sender_id) {
            Ok(())
        } else {
            warn!(sender = %turn.sender_id, what, "Non-admin tried an admin operation");
            Err(FlowError::Forbidden(what.to_string()))
        }
    }

    async fn route_text(&self, turn: &Turn, current: &Operation, text: &str) -> FlowResult {
        if current.requires_admin() {
            self.check_admin(turn, current.name())?;
        }
        let ctx = &self.ctx;
        match current.family() {
            FlowFamily::Ordering => ordering::handle_text(ctx, turn, current, text).await,
            FlowFamily::CatalogAdmin => catalog_admin::handle_text(ctx, turn, current, text).await,
            FlowFamily::OrderAdmin => order_admin::handle_text(ctx, turn, current, text).await,
            FlowFamily::TextOverride => text_override::handle_text(ctx, turn, current, text).await,
            FlowFamily::Idle => browse::idle_text(ctx, turn).await,
        }
    }

    async fn route_action(&self, turn: &Turn, base: &Operation, action: Action) -> FlowResult {
        if action.is_admin() {
            self.check_admin(turn, &action.to_string())?;
        }
        let ctx = &self.ctx;
        match action {
            Action::Start => browse::start(ctx, turn).await,
            Action::ViewCatalog => browse::view_catalog(ctx, turn).await,
            Action::ViewProduct(id) => browse::view_product(ctx, turn, &id).await,
            Action::OpenLink(id) => browse::open_link(ctx, turn, &id).await,
            Action::BuyProduct(id) => ordering::start(ctx, turn, &id).await,
            Action::TrackOrders => browse::track_orders(ctx, turn).await,
            Action::Help => browse::help(ctx, turn).await,
            // Handled before routing; kept total for the compiler.
            Action::Cancel => Ok(Transition::Finish),
            Action::AdminPanel => browse::admin_panel(ctx, turn).await,
            Action::AdminAddProduct => catalog_admin::start_add(ctx, turn).await,
            Action::AdminEditProduct => catalog_admin::start_edit(ctx, turn).await,
            Action::AdminSelectEdit(id) => catalog_admin::select_edit(ctx, turn, &id).await,
            Action::AdminDeleteProduct => catalog_admin::start_delete(ctx, turn).await,
            Action::AdminSelectDelete(id) => catalog_admin::select_delete(ctx, turn, &id).await,
            Action::AdminConfirmDelete => match base {
                Operation::CatalogDeleteConfirm { product_id } => {
                    catalog_admin::confirm_delete(ctx, turn, product_id).await
                }
                _ => Err(FlowError::validation("There is no deletion waiting for confirmation.")),
            },
            Action::AdminCancelDelete => match base {
                Operation::CatalogDeleteConfirm { .. } => catalog_admin::cancel_delete(ctx, turn).await,
                _ => Err(FlowError::validation("There is no deletion waiting for confirmation.")),
            },
            Action::AdminListOrders => order_admin::list_orders(ctx, turn).await,
            Action::AdminConfirmPayment => order_admin::start_confirm_payment(ctx, turn).await,
            Action::AdminSetTracking => order_admin::start_set_tracking(ctx, turn).await,
            Action::AdminSetStatus => order_admin::start_set_status(ctx, turn).await,
            Action::AdminSetGreeting => {
                text_override::start(ctx, turn, NamedText::Setting(SettingKey::Greeting)).await
            }
            Action::AdminSetPayment => {
                text_override::start(ctx, turn, NamedText::Setting(SettingKey::PaymentInfo)).await
            }
            Action::AdminSetHelp => {
                text_override::start(ctx, turn, NamedText::Setting(SettingKey::Help)).await
            }
            Action::AdminButtonsMenu => text_override::buttons_menu(ctx, turn).await,
            Action::AdminEditButton(key) => {
                text_override::start(ctx, turn, NamedText::Button(key)).await
            }
        }
    }
}
