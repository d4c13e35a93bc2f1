use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::settings::ButtonKey;

/// One inbound message or button press, already stripped of transport details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub sender_id: String,
    pub conversation_id: String,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    Text(String),
    Action(Action),
}

impl InboundEvent {
    pub fn text(
        sender_id: impl Into<String>,
        conversation_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            conversation_id: conversation_id.into(),
            payload: EventPayload::Text(text.into()),
        }
    }

    pub fn action(
        sender_id: impl Into<String>,
        conversation_id: impl Into<String>,
        action: Action,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            conversation_id: conversation_id.into(),
            payload: EventPayload::Action(action),
        }
    }
}

/// Closed vocabulary of button presses and commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    ViewCatalog,
    ViewProduct(String),
    OpenLink(String),
    BuyProduct(String),
    TrackOrders,
    Help,
    Cancel,
    AdminPanel,
    AdminAddProduct,
    AdminEditProduct,
    AdminSelectEdit(String),
    AdminDeleteProduct,
    AdminSelectDelete(String),
    AdminConfirmDelete,
    AdminCancelDelete,
    AdminListOrders,
    AdminConfirmPayment,
    AdminSetTracking,
    AdminSetStatus,
    AdminSetGreeting,
    AdminSetPayment,
    AdminSetHelp,
    AdminButtonsMenu,
    AdminEditButton(ButtonKey),
}

impl Action {
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Action::AdminPanel
                | Action::AdminAddProduct
                | Action::AdminEditProduct
                | Action::AdminSelectEdit(_)
                | Action::AdminDeleteProduct
                | Action::AdminSelectDelete(_)
                | Action::AdminConfirmDelete
                | Action::AdminCancelDelete
                | Action::AdminListOrders
                | Action::AdminConfirmPayment
                | Action::AdminSetTracking
                | Action::AdminSetStatus
                | Action::AdminSetGreeting
                | Action::AdminSetPayment
                | Action::AdminSetHelp
                | Action::AdminButtonsMenu
                | Action::AdminEditButton(_)
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown action: {0}")]
pub struct ParseActionError(pub String);

const PARAMETERISED: &[(&str, fn(String) -> Action)] = &[
    ("VIEW_DETAIL_", Action::ViewProduct),
    ("OPEN_LINK_", Action::OpenLink),
    ("BUY_PRODUCT_", Action::BuyProduct),
    ("EDIT_PROD_", Action::AdminSelectEdit),
    ("DEL_PROD_", Action::AdminSelectDelete),
];

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let action = match raw {
            "START" => Action::Start,
            "VIEW_PRODUCTS" => Action::ViewCatalog,
            "TRACK_ORDER" => Action::TrackOrders,
            "HELP_MENU" => Action::Help,
            "CANCEL" => Action::Cancel,
            "ADMIN_PANEL" => Action::AdminPanel,
            "ADMIN_ADD_PRODUCT" => Action::AdminAddProduct,
            "ADMIN_EDIT_PRODUCT" => Action::AdminEditProduct,
            "ADMIN_DELETE_PRODUCT" => Action::AdminDeleteProduct,
            "CONFIRM_DEL" => Action::AdminConfirmDelete,
            "CANCEL_DEL" => Action::AdminCancelDelete,
            "ADMIN_LIST_ORDERS" => Action::AdminListOrders,
            "ADMIN_CONFIRM_PAYMENT" => Action::AdminConfirmPayment,
            "ADMIN_SET_TRACKING" | "ADMIN_SET_RESI" => Action::AdminSetTracking,
            "ADMIN_SET_STATUS" => Action::AdminSetStatus,
            "ADMIN_SET_GREETING" => Action::AdminSetGreeting,
            "ADMIN_SET_PAYMENT" => Action::AdminSetPayment,
            "ADMIN_SET_HELP" => Action::AdminSetHelp,
            "ADMIN_SET_BUTTONS" => Action::AdminButtonsMenu,
            _ => return parse_parameterised(raw),
        };
        Ok(action)
    }
}

fn parse_parameterised(raw: &str) -> Result<Action, ParseActionError> {
    let unknown = || ParseActionError(raw.to_string());

    if let Some(key) = raw.strip_prefix("ADMIN_SET_BTN_") {
        return ButtonKey::from_str(key).map(Action::AdminEditButton).map_err(|_| unknown());
    }
    // The product id suffix on confirm/cancel is informational; the target
    // lives in the session.
    if raw.starts_with("CONFIRM_DEL_") {
        return Ok(Action::AdminConfirmDelete);
    }
    if raw.starts_with("CANCEL_DEL_") {
        return Ok(Action::AdminCancelDelete);
    }
    for (prefix, build) in PARAMETERISED {
        if let Some(id) = raw.strip_prefix(prefix) {
            if id.is_empty() {
                return Err(unknown());
            }
            return Ok(build(id.to_string()));
        }
    }
    Err(unknown())
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => f.write_str("START"),
            Action::ViewCatalog => f.write_str("VIEW_PRODUCTS"),
            Action::ViewProduct(id) => write!(f, "VIEW_DETAIL_{id}"),
            Action::OpenLink(id) => write!(f, "OPEN_LINK_{id}"),
            Action::BuyProduct(id) => write!(f, "BUY_PRODUCT_{id}"),
            Action::TrackOrders => f.write_str("TRACK_ORDER"),
            Action::Help => f.write_str("HELP_MENU"),
            Action::Cancel => f.write_str("CANCEL"),
            Action::AdminPanel => f.write_str("ADMIN_PANEL"),
            Action::AdminAddProduct => f.write_str("ADMIN_ADD_PRODUCT"),
            Action::AdminEditProduct => f.write_str("ADMIN_EDIT_PRODUCT"),
            Action::AdminSelectEdit(id) => write!(f, "EDIT_PROD_{id}"),
            Action::AdminDeleteProduct => f.write_str("ADMIN_DELETE_PRODUCT"),
            Action::AdminSelectDelete(id) => write!(f, "DEL_PROD_{id}"),
            Action::AdminConfirmDelete => f.write_str("CONFIRM_DEL"),
            Action::AdminCancelDelete => f.write_str("CANCEL_DEL"),
            Action::AdminListOrders => f.write_str("ADMIN_LIST_ORDERS"),
            Action::AdminConfirmPayment => f.write_str("ADMIN_CONFIRM_PAYMENT"),
            Action::AdminSetTracking => f.write_str("ADMIN_SET_TRACKING"),
            Action::AdminSetStatus => f.write_str("ADMIN_SET_STATUS"),
            Action::AdminSetGreeting => f.write_str("ADMIN_SET_GREETING"),
            Action::AdminSetPayment => f.write_str("ADMIN_SET_PAYMENT"),
            Action::AdminSetHelp => f.write_str("ADMIN_SET_HELP"),
            Action::AdminButtonsMenu => f.write_str("ADMIN_SET_BUTTONS"),
            Action::AdminEditButton(key) => write!(f, "ADMIN_SET_BTN_{}", key.as_ref()),
        }
    }
}

/// What a button does when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonTarget {
    Action(Action),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub target: ButtonTarget,
}

/// A message to deliver to a conversation, with optional inline buttons.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutboundMessage {
    pub text: String,
    pub buttons: Vec<Button>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_button(mut self, label: impl Into<String>, action: Action) -> Self {
        self.buttons.push(Button {
            label: label.into(),
            target: ButtonTarget::Action(action),
        });
        self
    }

    pub fn with_link(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.buttons.push(Button {
            label: label.into(),
            target: ButtonTarget::Url(url.into()),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parameterised_callbacks() {
        assert_eq!(
            "BUY_PRODUCT_PRD001".parse::<Action>(),
            Ok(Action::BuyProduct("PRD001".into()))
        );
        assert_eq!(
            "ADMIN_SET_BTN_VIEW_PRODUCTS".parse::<Action>(),
            Ok(Action::AdminEditButton(ButtonKey::ViewProducts))
        );
        assert_eq!("CONFIRM_DEL_PRD001".parse::<Action>(), Ok(Action::AdminConfirmDelete));
        assert_eq!("ADMIN_SET_RESI".parse::<Action>(), Ok(Action::AdminSetTracking));
    }

    #[test]
    fn rejects_unknown_or_empty_callbacks() {
        assert!("VIEW_DETAIL_".parse::<Action>().is_err());
        assert!("ADMIN_SET_BTN_NOPE".parse::<Action>().is_err());
        assert!("DANCE".parse::<Action>().is_err());
    }

    #[test]
    fn display_is_parseable() {
        let actions = [
            Action::ViewProduct("A-1".into()),
            Action::AdminSelectDelete("X".into()),
            Action::AdminButtonsMenu,
            Action::AdminEditButton(ButtonKey::AdminSetHelp),
        ];
        for action in actions {
            assert_eq!(action.to_string().parse::<Action>(), Ok(action.clone()));
        }
    }

    #[test]
    fn admin_actions_are_flagged() {
        assert!(Action::AdminListOrders.is_admin());
        assert!(!Action::BuyProduct("PRD001".into()).is_admin());
        assert!(!Action::Cancel.is_admin());
    }
}
