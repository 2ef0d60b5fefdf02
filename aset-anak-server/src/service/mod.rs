//! Business operations over an injected [`Store`](crate::storage::Store).
//!
//! Each service validates its input first and only then talks to the store;
//! the HTTP layer maps [`ServiceError`] to responses or page banners.

mod assets;
mod categories;
mod children;
mod session;

use aset_anak_shared::validate::ValidationError;

use crate::storage::StorageError;

pub use assets::{AssetAggregator, AssetInput, AssetUpdate, GoldFields};
pub use categories::CategoryRegistry;
pub use children::ChildDirectory;
pub use session::{Identity, SessionGate, SessionPolicy, SignedIn};

/// Failures that come from outside the validated input.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email is already registered")]
    EmailTaken,
    #[error("registration is closed")]
    RegistrationClosed,
    #[error("token error: {0}")]
    Token(String),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(value: StorageError) -> Self {
        ServiceError::Remote(RemoteError::Storage(value))
    }
}
