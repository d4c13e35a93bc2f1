use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::product::ProductSnapshot;
use super::settings::{ButtonKey, NamedText, SettingKey};

/// The single multi-step procedure a conversation is in.
///
/// Each variant carries only the data its own step needs, so a conversation
/// can never be "adding a product" and "ordering" at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    #[default]
    Idle,
    OrderingName {
        product: ProductSnapshot,
    },
    OrderingAddress {
        product: ProductSnapshot,
        name: String,
    },
    OrderingPhone {
        product: ProductSnapshot,
        name: String,
        address: String,
    },
    CatalogAdd,
    CatalogEditSelect,
    CatalogEditApply {
        product_id: String,
    },
    CatalogDeleteSelect,
    CatalogDeleteConfirm {
        product_id: String,
    },
    OrderConfirmPayment,
    OrderSetTracking,
    OrderSetStatus,
    SettingsGreeting,
    SettingsPayment,
    SettingsHelp,
    ButtonLabelEdit {
        key: ButtonKey,
    },
}

/// Flow families in dispatch precedence order; lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FlowFamily {
    Ordering,
    CatalogAdmin,
    OrderAdmin,
    TextOverride,
    Idle,
}

impl Operation {
    pub fn family(&self) -> FlowFamily {
        match self {
            Operation::Idle => FlowFamily::Idle,
            Operation::OrderingName { .. }
            | Operation::OrderingAddress { .. }
            | Operation::OrderingPhone { .. } => FlowFamily::Ordering,
            Operation::CatalogAdd
            | Operation::CatalogEditSelect
            | Operation::CatalogEditApply { .. }
            | Operation::CatalogDeleteSelect
            | Operation::CatalogDeleteConfirm { .. } => FlowFamily::CatalogAdmin,
            Operation::OrderConfirmPayment
            | Operation::OrderSetTracking
            | Operation::OrderSetStatus => FlowFamily::OrderAdmin,
            Operation::SettingsGreeting
            | Operation::SettingsPayment
            | Operation::SettingsHelp
            | Operation::ButtonLabelEdit { .. } => FlowFamily::TextOverride,
        }
    }

    /// Stable name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Idle => "idle",
            Operation::OrderingName { .. } => "ordering_name",
            Operation::OrderingAddress { .. } => "ordering_address",
            Operation::OrderingPhone { .. } => "ordering_phone",
            Operation::CatalogAdd => "catalog_add",
            Operation::CatalogEditSelect => "catalog_edit_select",
            Operation::CatalogEditApply { .. } => "catalog_edit_apply",
            Operation::CatalogDeleteSelect => "catalog_delete_select",
            Operation::CatalogDeleteConfirm { .. } => "catalog_delete_confirm",
            Operation::OrderConfirmPayment => "order_confirm_payment",
            Operation::OrderSetTracking => "order_set_tracking",
            Operation::OrderSetStatus => "order_set_status",
            Operation::SettingsGreeting => "settings_greeting",
            Operation::SettingsPayment => "settings_payment",
            Operation::SettingsHelp => "settings_help",
            Operation::ButtonLabelEdit { .. } => "button_label_edit",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Operation::Idle)
    }

    pub fn requires_admin(&self) -> bool {
        !matches!(self.family(), FlowFamily::Ordering | FlowFamily::Idle)
    }

    /// The text this operation overwrites, if it is a text override step.
    pub fn named_text(&self) -> Option<NamedText> {
        match self {
            Operation::SettingsGreeting => Some(NamedText::Setting(SettingKey::Greeting)),
            Operation::SettingsPayment => Some(NamedText::Setting(SettingKey::PaymentInfo)),
            Operation::SettingsHelp => Some(NamedText::Setting(SettingKey::Help)),
            Operation::ButtonLabelEdit { key } => Some(NamedText::Button(*key)),
            _ => None,
        }
    }
}

impl From<NamedText> for Operation {
    fn from(target: NamedText) -> Self {
        match target {
            NamedText::Setting(SettingKey::Greeting) => Operation::SettingsGreeting,
            NamedText::Setting(SettingKey::PaymentInfo) => Operation::SettingsPayment,
            NamedText::Setting(SettingKey::Help) => Operation::SettingsHelp,
            NamedText::Button(key) => Operation::ButtonLabelEdit { key },
        }
    }
}

/// Per-conversation state bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub conversation_id: String,
    pub operation: Operation,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(conversation_id: impl Into<String>, operation: Operation) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            operation,
            updated_at: Utc::now(),
        }
    }
}
