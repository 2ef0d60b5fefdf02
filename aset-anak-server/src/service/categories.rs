use std::sync::Arc;

use aset_anak_shared::domain::{Category, CategoryId, UserId};
use aset_anak_shared::validate;
use tracing::info;

use super::ServiceError;
use crate::storage::Store;

#[derive(Clone)]
pub struct CategoryRegistry {
    store: Arc<dyn Store>,
}

impl CategoryRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Oldest first.
    pub async fn list(&self, owner: &UserId) -> Result<Vec<Category>, ServiceError> {
        Ok(self.store.list_categories(owner).await?)
    }

    pub async fn get(&self, owner: &UserId, id: &CategoryId) -> Result<Category, ServiceError> {
        self.store
            .get_category(owner, id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("category {}", id)))
    }

    /// Names are trimmed; duplicates are allowed.
    pub async fn create(&self, owner: &UserId, name: &str) -> Result<Category, ServiceError> {
        let name = validate::category_name(name)?;
        let category = self.store.insert_category(owner, &name).await?;
        info!(user_id = %owner, category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    /// Assets that reference the category are kept and show up uncategorized.
    pub async fn delete(&self, owner: &UserId, id: &CategoryId) -> Result<(), ServiceError> {
        if !self.store.delete_category(owner, id).await? {
            return Err(ServiceError::NotFound(format!("category {}", id)));
        }
        info!(user_id = %owner, category_id = %id, "category deleted");
        Ok(())
    }
}
