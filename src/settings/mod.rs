//! Named text overrides: greeting, payment instructions, help text and button labels.
//!
//! Reads go straight to the store so a write is visible to the very next message.

use std::sync::Arc;

use strum::IntoEnumIterator;
use tracing::{info, instrument};

use crate::domain::{ButtonKey, NamedText, SettingKey};
use crate::error::StoreError;
use crate::store::KvStore;

#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KvStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// The stored override, if any.
    pub async fn get_override(&self, target: NamedText) -> Result<Option<String>, StoreError> {
        self.store.get(&target.storage_key()).await
    }

    /// The stored override, or the compiled-in default.
    #[instrument(skip(self))]
    pub async fn get_text(&self, target: NamedText) -> Result<String, StoreError> {
        Ok(self
            .get_override(target)
            .await?
            .unwrap_or_else(|| target.default_value().to_string()))
    }

    #[instrument(skip(self, value))]
    pub async fn set_text(&self, target: NamedText, value: &str) -> Result<(), StoreError> {
        self.store.set(&target.storage_key(), value).await?;
        info!(key = %target.storage_key(), "Text override stored");
        Ok(())
    }

    pub async fn setting(&self, key: SettingKey) -> Result<String, StoreError> {
        self.get_text(NamedText::Setting(key)).await
    }

    pub async fn label(&self, key: ButtonKey) -> Result<String, StoreError> {
        self.get_text(NamedText::Button(key)).await
    }

    /// Every button key with its current label, in declaration order.
    pub async fn button_labels(&self) -> Result<Vec<(ButtonKey, String)>, StoreError> {
        let mut labels = Vec::new();
        for key in ButtonKey::iter() {
            labels.push((key, self.label(key).await?));
        }
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn settings() -> SettingsStore {
        let (store, client) = MemoryStore::new(16);
        tokio::spawn(store.run());
        SettingsStore::new(Arc::new(client))
    }

    #[tokio::test]
    async fn defaults_apply_until_overridden() {
        let settings = settings();
        assert_eq!(
            settings.setting(SettingKey::PaymentInfo).await.unwrap(),
            SettingKey::PaymentInfo.default_value()
        );

        settings
            .set_text(NamedText::Setting(SettingKey::PaymentInfo), "Transfer to BNI 42")
            .await
            .unwrap();
        assert_eq!(
            settings.setting(SettingKey::PaymentInfo).await.unwrap(),
            "Transfer to BNI 42"
        );
    }

    #[tokio::test]
    async fn button_labels_list_every_key() {
        let settings = settings();
        settings
            .set_text(NamedText::Button(ButtonKey::Buy), "🛒 Beli")
            .await
            .unwrap();
        let labels = settings.button_labels().await.unwrap();
        assert_eq!(labels.len(), ButtonKey::iter().count());
        assert!(labels.contains(&(ButtonKey::Buy, "🛒 Beli".to_string())));
        assert!(labels.contains(&(ButtonKey::Help, ButtonKey::Help.default_label().to_string())));
    }
}
