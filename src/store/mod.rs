//! Persistent store adapter: scalar text, field-map records and unordered sets.
//!
//! Everything above this layer talks to [`KvStore`]; the in-process backend is
//! the [`MemoryStore`] actor reached through a [`StoreClient`](crate::clients::StoreClient).

pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::StoreError;

pub use memory::MemoryStore;

/// A field map stored under one key.
pub type Record = BTreeMap<String, String>;

/// One write inside an atomic batch.
///
/// `Require*` entries are preconditions: if any fails, no write in the batch
/// is applied and the batch returns [`StoreError::Conflict`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set { key: String, value: String },
    Delete { key: String },
    SetRecord { key: String, record: Record },
    SetAdd { key: String, members: Vec<String> },
    SetRemove { key: String, member: String },
    RequireAbsent { set: String, member: String },
    RequirePresent { set: String, member: String },
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    async fn get_record(&self, key: &str) -> Result<Option<Record>, StoreError>;
    async fn set_record(&self, key: &str, record: Record) -> Result<(), StoreError>;
    /// Merges `fields` into an existing record. Returns `false` when the record is missing.
    async fn update_record(&self, key: &str, fields: Record) -> Result<bool, StoreError>;

    /// Returns `true` when the member was newly added.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError>;
    /// Members in ascending order.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;
    async fn set_random(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn write_batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;
}
