//! Product catalog on top of the store adapter.

pub mod entity;
pub mod parse;

use std::sync::Arc;

use tracing::{info, instrument};

use crate::actor_framework::Repository;
use crate::domain::{Product, ProductDraft, ProductPatch};
use crate::error::CatalogError;
use crate::store::KvStore;

pub use entity::{product_key, product_links_key, PRODUCT_INDEX};

#[derive(Clone)]
pub struct CatalogStore {
    repo: Repository<Product>,
}

impl CatalogStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            repo: Repository::new(store),
        }
    }

    /// Creates a product under an admin-chosen id. Existing ids are never overwritten.
    #[instrument(skip(self, draft), fields(product_id = %id))]
    pub async fn create_product(
        &self,
        id: &str,
        draft: ProductDraft,
    ) -> Result<Product, CatalogError> {
        parse::validate_product_id(id)?;
        let product = self.repo.create(id.to_string(), draft).await?;
        info!("Product created");
        Ok(product)
    }

    #[instrument(skip(self, patch), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: &str,
        patch: ProductPatch,
    ) -> Result<Product, CatalogError> {
        if patch.is_empty() {
            return Err(CatalogError::ValidationError("Nothing to update".into()));
        }
        let product = self.repo.update(id, patch).await?;
        info!("Product updated");
        Ok(product)
    }

    /// Picks one of the product's redirect links at random.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn random_link(&self, id: &str) -> Result<Option<String>, CatalogError> {
        if !self.repo.exists(id).await? {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        Ok(self.repo.store().set_random(&product_links_key(id)).await?)
    }
}

crate::impl_client_methods!(CatalogStore, Product, CatalogError, product, deletable);
