pub mod memory;
pub mod models;
pub mod schema;
pub mod sqlite;

use aset_anak_shared::domain::{
    Asset, AssetId, AssetRecord, Category, CategoryId, Child, ChildId, GoldMetadata, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),

    /// The caller supplied invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A unique constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// A user together with the bcrypt hash used to check sign-ins.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewChild {
    pub name: String,
    pub birthdate: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub child_id: ChildId,
    pub category_id: CategoryId,
    pub amount: Decimal,
    pub note: Option<String>,
    pub metadata: Option<GoldMetadata>,
}

/// Fields written by an asset update. `amount` is always written; `None`
/// elsewhere means "leave as is".
#[derive(Debug, Clone)]
pub struct AssetPatch {
    pub amount: Decimal,
    pub note: Option<Option<String>>,
    pub metadata: Option<GoldMetadata>,
}

/// Persistence for users, sessions, children, categories and assets.
///
/// Every read and write of user data takes the caller's [`UserId`]; rows that
/// belong to someone else behave exactly like rows that do not exist.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with [`StorageError::Conflict`] when the email is registered.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StorageError>;
    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<UserCredentials>, StorageError>;

    async fn create_session(&self, jti: &str, user: &UserId) -> Result<(), StorageError>;
    /// Bumps `last_used_at` if the session belongs to `user` and was used at or
    /// after `cutoff`. Returns whether the session is still alive.
    async fn touch_session_with_cutoff(
        &self,
        jti: &str,
        user: &UserId,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, StorageError>;
    async fn delete_session(&self, jti: &str) -> Result<bool, StorageError>;

    /// Newest first.
    async fn list_children(&self, owner: &UserId) -> Result<Vec<Child>, StorageError>;
    async fn get_child(&self, owner: &UserId, id: &ChildId) -> Result<Option<Child>, StorageError>;
    async fn insert_child(&self, owner: &UserId, child: NewChild) -> Result<Child, StorageError>;
    /// Removes the child and all of its assets atomically. `None` when the
    /// child is not found, otherwise the number of assets removed.
    async fn delete_child_cascade(
        &self,
        owner: &UserId,
        id: &ChildId,
    ) -> Result<Option<usize>, StorageError>;

    /// Oldest first.
    async fn list_categories(&self, owner: &UserId) -> Result<Vec<Category>, StorageError>;
    async fn get_category(
        &self,
        owner: &UserId,
        id: &CategoryId,
    ) -> Result<Option<Category>, StorageError>;
    async fn insert_category(&self, owner: &UserId, name: &str) -> Result<Category, StorageError>;
    /// Leaves referencing assets untouched.
    async fn delete_category(&self, owner: &UserId, id: &CategoryId)
    -> Result<bool, StorageError>;

    /// Newest first, each left-joined with its category.
    async fn list_assets_for_child(
        &self,
        owner: &UserId,
        child: &ChildId,
    ) -> Result<Vec<AssetRecord>, StorageError>;
    /// Every asset of every child of `owner`, newest first.
    async fn list_assets_for_owner(&self, owner: &UserId)
    -> Result<Vec<AssetRecord>, StorageError>;
    async fn get_asset(
        &self,
        owner: &UserId,
        id: &AssetId,
    ) -> Result<Option<AssetRecord>, StorageError>;
    /// `None` when the child is not found.
    async fn insert_asset(
        &self,
        owner: &UserId,
        asset: NewAsset,
    ) -> Result<Option<Asset>, StorageError>;
    async fn update_asset(
        &self,
        owner: &UserId,
        id: &AssetId,
        patch: AssetPatch,
    ) -> Result<Option<Asset>, StorageError>;
    async fn delete_asset(&self, owner: &UserId, id: &AssetId) -> Result<bool, StorageError>;
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
