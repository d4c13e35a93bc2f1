//! Named text overrides: shop settings and button labels.
//!
//! Both kinds share the same semantics (last write wins, compiled-in default
//! when nothing was stored) and differ only in their key namespace.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

pub const SETTING_KEY_PREFIX: &str = "setting:";
pub const BUTTON_KEY_PREFIX: &str = "button_label:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingKey {
    Greeting,
    PaymentInfo,
    Help,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Greeting => "greeting",
            SettingKey::PaymentInfo => "payment_info",
            SettingKey::Help => "help",
        }
    }

    pub fn default_value(&self) -> &'static str {
        match self {
            SettingKey::Greeting => "👋 Welcome to our shop!",
            SettingKey::PaymentInfo => "🏦 BANK BCA\nAccount: 1234567890\nHolder: PT Contoh Digital",
            SettingKey::Help => {
                "Use the menu to browse products, place an order, or track your orders."
            }
        }
    }
}

/// Every button whose label an admin can override.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ButtonKey {
    ViewProducts,
    TrackOrder,
    Help,
    AdminPanel,
    OpenLink,
    Back,
    Buy,
    AdminAddProduct,
    AdminEditProduct,
    AdminDeleteProduct,
    AdminListOrders,
    AdminConfirmPayment,
    AdminSetTracking,
    AdminSetStatus,
    AdminSetGreeting,
    AdminSetPayment,
    AdminSetHelp,
    AdminSetButtons,
}

impl ButtonKey {
    pub fn default_label(&self) -> &'static str {
        match self {
            ButtonKey::ViewProducts => "🛍️ View Products",
            ButtonKey::TrackOrder => "📦 Track Order",
            ButtonKey::Help => "❓ Help",
            ButtonKey::AdminPanel => "⚙️ Admin Panel",
            ButtonKey::OpenLink => "🌐 Open Random Link",
            ButtonKey::Back => "⬅️ Back",
            ButtonKey::Buy => "🛒 Buy This Product",
            ButtonKey::AdminAddProduct => "➕ Add Product",
            ButtonKey::AdminEditProduct => "✏️ Edit Product",
            ButtonKey::AdminDeleteProduct => "❌ Delete Product",
            ButtonKey::AdminListOrders => "📦 Order List",
            ButtonKey::AdminConfirmPayment => "💳 Confirm Payment",
            ButtonKey::AdminSetTracking => "🚚 Set Tracking Number",
            ButtonKey::AdminSetStatus => "🔄 Set Order Status",
            ButtonKey::AdminSetGreeting => "💬 Edit Greeting",
            ButtonKey::AdminSetPayment => "💳 Edit Payment Info",
            ButtonKey::AdminSetHelp => "❓ Edit Help Text",
            ButtonKey::AdminSetButtons => "🔧 Rename Buttons",
        }
    }
}

/// A single overridable text, whichever namespace it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedText {
    Setting(SettingKey),
    Button(ButtonKey),
}

impl NamedText {
    pub fn storage_key(&self) -> String {
        match self {
            NamedText::Setting(key) => format!("{SETTING_KEY_PREFIX}{}", key.as_str()),
            NamedText::Button(key) => format!("{BUTTON_KEY_PREFIX}{}", key.as_ref()),
        }
    }

    pub fn default_value(&self) -> &'static str {
        match self {
            NamedText::Setting(key) => key.default_value(),
            NamedText::Button(key) => key.default_label(),
        }
    }

    /// Human readable name used in prompts.
    pub fn describe(&self) -> String {
        match self {
            NamedText::Setting(SettingKey::Greeting) => "greeting".to_string(),
            NamedText::Setting(SettingKey::PaymentInfo) => "payment info".to_string(),
            NamedText::Setting(SettingKey::Help) => "help text".to_string(),
            NamedText::Button(key) => format!("button {}", key.as_ref()),
        }
    }
}
