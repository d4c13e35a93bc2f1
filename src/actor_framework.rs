use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::{RepoError, StoreError};
use crate::store::{KvStore, Record, WriteOp};

// =============================================================================
// 1. THE ABSTRACTION (Traits with Hooks, Params, and Actions)
// =============================================================================

/// Trait that any domain entity must implement to be managed by [`Repository`].
///
/// An entity lives as one record at [`Entity::record_key`] and is listed in the
/// set at [`Entity::INDEX_KEY`]. Secondary indexes ride along in the same batch
/// through [`Entity::companion_writes`] / [`Entity::companion_deletes`].
pub trait Entity: Clone + Send + Sync + 'static {
    type CreateParams: Send + Debug;
    type Patch: Send + Debug;
    type Action: Send + Debug;
    type ActionResult: Send + Debug;

    /// Lowercase name used in errors and logs.
    const KIND: &'static str;
    const INDEX_KEY: &'static str;

    fn id(&self) -> &str;
    fn record_key(id: &str) -> String;

    fn from_create_params(id: String, params: Self::CreateParams) -> Result<Self, String>;
    fn to_record(&self) -> Record;
    fn from_record(id: &str, record: &Record) -> Result<Self, String>;

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), String> {
        Ok(())
    }
    fn on_update(&mut self, patch: Self::Patch) -> Result<(), String>;

    // --- Action Handler ---

    /// Handle a custom domain-specific action
    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, String>;

    fn companion_writes(&self) -> Vec<WriteOp> {
        Vec::new()
    }
    fn companion_deletes(&self) -> Vec<WriteOp> {
        Vec::new()
    }
}

// =============================================================================
// 2. THE GENERIC REPOSITORY
// =============================================================================

pub struct Repository<T: Entity> {
    store: Arc<dyn KvStore>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Inserts a new entity. Fails with `AlreadyExists` without touching the
    /// stored one when the id is taken.
    #[instrument(skip(self, params), fields(kind = T::KIND))]
    pub async fn create(&self, id: String, params: T::CreateParams) -> Result<T, RepoError> {
        let mut item = T::from_create_params(id, params).map_err(RepoError::Rejected)?;
        item.on_create().map_err(RepoError::Rejected)?;

        let id = item.id().to_string();
        let mut ops = vec![
            WriteOp::RequireAbsent {
                set: T::INDEX_KEY.to_string(),
                member: id.clone(),
            },
            WriteOp::SetRecord {
                key: T::record_key(&id),
                record: item.to_record(),
            },
            WriteOp::SetAdd {
                key: T::INDEX_KEY.to_string(),
                members: vec![id.clone()],
            },
        ];
        ops.extend(item.companion_writes());

        match self.store.write_batch(ops).await {
            Ok(()) => {
                debug!(id = %id, "Entity created");
                Ok(item)
            }
            Err(StoreError::Conflict(_)) => Err(RepoError::AlreadyExists { kind: T::KIND, id }),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn get(&self, id: &str) -> Result<Option<T>, RepoError> {
        let key = T::record_key(id);
        match self.store.get_record(&key).await? {
            Some(record) => T::from_record(id, &record)
                .map(Some)
                .map_err(|reason| StoreError::CorruptRecord { key, reason }.into()),
            None => Ok(None),
        }
    }

    pub async fn exists(&self, id: &str) -> Result<bool, RepoError> {
        Ok(self.store.set_contains(T::INDEX_KEY, id).await?)
    }

    async fn load(&self, id: &str) -> Result<T, RepoError> {
        self.get(id).await?.ok_or_else(|| RepoError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        })
    }

    /// Writes an already loaded entity back, provided it was not deleted meanwhile.
    async fn save(&self, item: &T) -> Result<(), RepoError> {
        let id = item.id().to_string();
        let mut ops = vec![
            WriteOp::RequirePresent {
                set: T::INDEX_KEY.to_string(),
                member: id.clone(),
            },
            WriteOp::SetRecord {
                key: T::record_key(&id),
                record: item.to_record(),
            },
        ];
        ops.extend(item.companion_writes());

        match self.store.write_batch(ops).await {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict(_)) => Err(RepoError::NotFound { kind: T::KIND, id }),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, patch), fields(kind = T::KIND))]
    pub async fn update(&self, id: &str, patch: T::Patch) -> Result<T, RepoError> {
        let mut item = self.load(id).await?;
        item.on_update(patch).map_err(RepoError::Rejected)?;
        self.save(&item).await?;
        debug!("Entity updated");
        Ok(item)
    }

    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn delete(&self, id: &str) -> Result<(), RepoError> {
        let item = self.load(id).await?;
        let mut ops = vec![
            WriteOp::RequirePresent {
                set: T::INDEX_KEY.to_string(),
                member: id.to_string(),
            },
            WriteOp::Delete {
                key: T::record_key(id),
            },
            WriteOp::SetRemove {
                key: T::INDEX_KEY.to_string(),
                member: id.to_string(),
            },
        ];
        ops.extend(item.companion_deletes());

        match self.store.write_batch(ops).await {
            Ok(()) => {
                debug!("Entity deleted");
                Ok(())
            }
            Err(StoreError::Conflict(_)) => Err(RepoError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Runs a domain action against the stored entity and persists the result.
    #[instrument(skip(self, action), fields(kind = T::KIND, action = ?action))]
    pub async fn perform_action(
        &self,
        id: &str,
        action: T::Action,
    ) -> Result<(T, T::ActionResult), RepoError> {
        let mut item = self.load(id).await?;
        let result = item.handle_action(action).map_err(RepoError::Rejected)?;
        self.save(&item).await?;
        Ok((item, result))
    }

    /// All entities in index order.
    pub async fn list(&self) -> Result<Vec<T>, RepoError> {
        let ids = self.store.set_members(T::INDEX_KEY).await?;
        self.get_many(&ids).await
    }

    /// Loads the given ids, skipping any that vanished since they were listed.
    pub async fn get_many(&self, ids: &[String]) -> Result<Vec<T>, RepoError> {
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(id).await? {
                Some(item) => items.push(item),
                None => warn!(kind = T::KIND, id = %id, "Indexed entity has no record"),
            }
        }
        Ok(items)
    }
}

// =============================================================================
// 3. EXAMPLE USAGE (Test)
// =============================================================================
