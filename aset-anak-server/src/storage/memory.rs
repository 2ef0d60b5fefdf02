use std::sync::atomic::{AtomicUsize, Ordering};

use aset_anak_shared::domain::{
    Asset, AssetId, AssetRecord, Category, CategoryId, Child, ChildId, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{AssetPatch, NewAsset, NewChild, StorageError, Store, UserCredentials, new_id};

struct SessionEntry {
    jti: String,
    user: UserId,
    last_used_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: Vec<UserCredentials>,
    sessions: Vec<SessionEntry>,
    // Insertion order; reads sort by `created_at` and keep this order on ties.
    children: Vec<Child>,
    categories: Vec<Category>,
    assets: Vec<Asset>,
}

impl Tables {
    fn owns_child(&self, owner: &UserId, child: &ChildId) -> bool {
        self.children
            .iter()
            .any(|c| &c.id == child && &c.owner == owner)
    }

    fn record(&self, asset: &Asset) -> AssetRecord {
        AssetRecord {
            asset: asset.clone(),
            category: self
                .categories
                .iter()
                .find(|c| c.id == asset.category_id)
                .cloned(),
        }
    }

    /// Newest first; among equal timestamps the later insert comes first.
    fn records_where(&self, keep: impl Fn(&Asset) -> bool) -> Vec<AssetRecord> {
        let mut out: Vec<&Asset> = self.assets.iter().rev().filter(|a| keep(a)).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.into_iter().map(|a| self.record(a)).collect()
    }
}

/// In-process [`Store`] used by tests and local experiments.
///
/// Counts every call so callers can assert that validation failures never
/// reach the store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    requests: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls made so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    async fn tables(&self) -> tokio::sync::MutexGuard<'_, Tables> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.tables.lock().await
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StorageError> {
        let mut t = self.tables().await;
        if t.users.iter().any(|u| u.user.email == email) {
            return Err(StorageError::Conflict(format!(
                "email already registered: {}",
                email
            )));
        }
        let user = User {
            id: new_id().into(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        t.users.push(UserCredentials {
            user: user.clone(),
            password_hash: password_hash.to_string(),
        });
        Ok(user)
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, StorageError> {
        let t = self.tables().await;
        Ok(t.users.iter().find(|u| u.user.email == email).cloned())
    }

    async fn create_session(&self, jti: &str, user: &UserId) -> Result<(), StorageError> {
        let mut t = self.tables().await;
        if !t.sessions.iter().any(|s| s.jti == jti) {
            t.sessions.push(SessionEntry {
                jti: jti.to_string(),
                user: user.clone(),
                last_used_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn touch_session_with_cutoff(
        &self,
        jti: &str,
        user: &UserId,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut t = self.tables().await;
        match t
            .sessions
            .iter_mut()
            .find(|s| s.jti == jti && &s.user == user && s.last_used_at >= cutoff)
        {
            Some(s) => {
                s.last_used_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_session(&self, jti: &str) -> Result<bool, StorageError> {
        let mut t = self.tables().await;
        let before = t.sessions.len();
        t.sessions.retain(|s| s.jti != jti);
        Ok(t.sessions.len() < before)
    }

    async fn list_children(&self, owner: &UserId) -> Result<Vec<Child>, StorageError> {
        let t = self.tables().await;
        let mut out: Vec<Child> = t
            .children
            .iter()
            .rev()
            .filter(|c| &c.owner == owner)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn get_child(&self, owner: &UserId, id: &ChildId) -> Result<Option<Child>, StorageError> {
        let t = self.tables().await;
        Ok(t
            .children
            .iter()
            .find(|c| &c.id == id && &c.owner == owner)
            .cloned())
    }

    async fn insert_child(&self, owner: &UserId, child: NewChild) -> Result<Child, StorageError> {
        let mut t = self.tables().await;
        let child = Child {
            id: new_id().into(),
            owner: owner.clone(),
            name: child.name,
            birthdate: child.birthdate,
            created_at: Utc::now(),
        };
        t.children.push(child.clone());
        Ok(child)
    }

    async fn delete_child_cascade(
        &self,
        owner: &UserId,
        id: &ChildId,
    ) -> Result<Option<usize>, StorageError> {
        let mut t = self.tables().await;
        if !t.owns_child(owner, id) {
            return Ok(None);
        }
        let before = t.assets.len();
        t.assets.retain(|a| &a.child_id != id);
        let removed = before - t.assets.len();
        t.children.retain(|c| &c.id != id);
        Ok(Some(removed))
    }

    async fn list_categories(&self, owner: &UserId) -> Result<Vec<Category>, StorageError> {
        let t = self.tables().await;
        let mut out: Vec<Category> = t
            .categories
            .iter()
            .filter(|c| &c.owner == owner)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn get_category(
        &self,
        owner: &UserId,
        id: &CategoryId,
    ) -> Result<Option<Category>, StorageError> {
        let t = self.tables().await;
        Ok(t
            .categories
            .iter()
            .find(|c| &c.id == id && &c.owner == owner)
            .cloned())
    }

    async fn insert_category(&self, owner: &UserId, name: &str) -> Result<Category, StorageError> {
        let mut t = self.tables().await;
        let category = Category {
            id: new_id().into(),
            owner: owner.clone(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        t.categories.push(category.clone());
        Ok(category)
    }

    async fn delete_category(&self, owner: &UserId, id: &CategoryId) -> Result<bool, StorageError> {
        let mut t = self.tables().await;
        let before = t.categories.len();
        t.categories.retain(|c| !(&c.id == id && &c.owner == owner));
        Ok(t.categories.len() < before)
    }

    async fn list_assets_for_child(
        &self,
        owner: &UserId,
        child: &ChildId,
    ) -> Result<Vec<AssetRecord>, StorageError> {
        let t = self.tables().await;
        if !t.owns_child(owner, child) {
            return Ok(Vec::new());
        }
        Ok(t.records_where(|a| &a.child_id == child))
    }

    async fn list_assets_for_owner(&self, owner: &UserId) -> Result<Vec<AssetRecord>, StorageError> {
        let t = self.tables().await;
        Ok(t.records_where(|a| t.owns_child(owner, &a.child_id)))
    }

    async fn get_asset(
        &self,
        owner: &UserId,
        id: &AssetId,
    ) -> Result<Option<AssetRecord>, StorageError> {
        let t = self.tables().await;
        Ok(t
            .assets
            .iter()
            .find(|a| &a.id == id && t.owns_child(owner, &a.child_id))
            .map(|a| t.record(a)))
    }

    async fn insert_asset(
        &self,
        owner: &UserId,
        asset: NewAsset,
    ) -> Result<Option<Asset>, StorageError> {
        let mut t = self.tables().await;
        if !t.owns_child(owner, &asset.child_id) {
            return Ok(None);
        }
        let asset = Asset {
            id: new_id().into(),
            child_id: asset.child_id,
            category_id: asset.category_id,
            amount: asset.amount,
            note: asset.note,
            metadata: asset.metadata,
            created_at: Utc::now(),
            updated_at: None,
        };
        t.assets.push(asset.clone());
        Ok(Some(asset))
    }

    async fn update_asset(
        &self,
        owner: &UserId,
        id: &AssetId,
        patch: AssetPatch,
    ) -> Result<Option<Asset>, StorageError> {
        let mut guard = self.tables().await;
        let t = &mut *guard;
        let owned: Vec<ChildId> = t
            .children
            .iter()
            .filter(|c| &c.owner == owner)
            .map(|c| c.id.clone())
            .collect();
        let Some(asset) = t
            .assets
            .iter_mut()
            .find(|a| &a.id == id && owned.contains(&a.child_id))
        else {
            return Ok(None);
        };
        asset.amount = patch.amount;
        if let Some(note) = patch.note {
            asset.note = note;
        }
        if let Some(metadata) = patch.metadata {
            asset.metadata = Some(metadata);
        }
        asset.updated_at = Some(Utc::now());
        Ok(Some(asset.clone()))
    }

    async fn delete_asset(&self, owner: &UserId, id: &AssetId) -> Result<bool, StorageError> {
        let mut t = self.tables().await;
        let Some(pos) = t
            .assets
            .iter()
            .position(|a| &a.id == id && t.owns_child(owner, &a.child_id))
        else {
            return Ok(false);
        };
        t.assets.remove(pos);
        Ok(true)
    }
}
