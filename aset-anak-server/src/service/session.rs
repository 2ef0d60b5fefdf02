use std::sync::Arc;

use aset_anak_shared::domain::{User, UserId};
use aset_anak_shared::jwt::{self, JwtClaims};
use aset_anak_shared::validate;
use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use super::{RemoteError, ServiceError};
use crate::storage::{StorageError, Store};

/// Token lifetime and sign-up rules.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// Mandatory re-login after this long.
    pub token_ttl: Duration,
    /// A session unused for this long is dead.
    pub idle: Duration,
    pub bcrypt_cost: u32,
    pub allow_registration: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            token_ttl: Duration::days(30),
            idle: Duration::days(14),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            allow_registration: true,
        }
    }
}

/// Who is behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct SessionGate {
    store: Arc<dyn Store>,
    secret: String,
    policy: SessionPolicy,
}

impl SessionGate {
    pub fn new(store: Arc<dyn Store>, secret: impl Into<String>, policy: SessionPolicy) -> Self {
        Self {
            store,
            secret: secret.into(),
            policy,
        }
    }

    /// Registers and signs in. Email and password are checked before any
    /// store call.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignedIn, ServiceError> {
        if !self.policy.allow_registration {
            warn!("sign_up: registration disabled");
            return Err(RemoteError::RegistrationClosed.into());
        }
        let email = validate::email(email)?;
        validate::password(password)?;
        let hash = bcrypt::hash(password, self.policy.bcrypt_cost).map_err(RemoteError::from)?;
        let user = match self.store.create_user(&email, &hash).await {
            Ok(u) => u,
            Err(StorageError::Conflict(_)) => {
                warn!(email = %email, "sign_up: email already registered");
                return Err(RemoteError::EmailTaken.into());
            }
            Err(e) => {
                error!(email = %email, error = %e, "sign_up: create_user failed");
                return Err(e.into());
            }
        };
        info!(user_id = %user.id, email = %user.email, "user registered");
        self.issue(user).await
    }

    /// Wrong email and wrong password fail the same way.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, ServiceError> {
        let Ok(email) = validate::email(email) else {
            warn!("sign_in: malformed email");
            return Err(RemoteError::InvalidCredentials.into());
        };
        let Some(creds) = self.store.find_user_by_email(&email).await? else {
            warn!(email = %email, "sign_in: unknown email");
            return Err(RemoteError::InvalidCredentials.into());
        };
        let ok = bcrypt::verify(password, &creds.password_hash).map_err(|e| {
            error!(email = %email, error = %e, "sign_in: bcrypt verify failed");
            RemoteError::from(e)
        })?;
        if !ok {
            warn!(email = %email, "sign_in: invalid password");
            return Err(RemoteError::InvalidCredentials.into());
        }
        self.issue(creds.user).await
    }

    async fn issue(&self, user: User) -> Result<SignedIn, ServiceError> {
        let jti = uuid::Uuid::new_v4().to_string();
        let claims = JwtClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            jti: jti.clone(),
            exp: (Utc::now() + self.policy.token_ttl).timestamp(),
        };
        self.store.create_session(&jti, &user.id).await.map_err(|e| {
            error!(user_id = %user.id, error = %e, "sign_in: create_session failed");
            e
        })?;
        let token = jwt::encode(&claims, self.secret.as_bytes()).map_err(|e| {
            error!(user_id = %user.id, error = %e, "sign_in: jwt encode failed");
            RemoteError::Token(e.to_string())
        })?;
        info!(user_id = %user.id, jti = %jti, "session started");
        Ok(SignedIn { token, user })
    }

    /// Ends the session behind `token`. Never fails for the caller; problems
    /// are only logged.
    pub async fn sign_out(&self, token: Option<&str>) {
        let Some(token) = token else {
            return;
        };
        match jwt::decode_and_verify(token, self.secret.as_bytes()) {
            Ok(claims) => self.delete_session(&claims.jti, &claims.sub).await,
            Err(e) => warn!(error = %e, "sign_out: token rejected"),
        }
    }

    pub async fn end_session(&self, identity: &Identity) {
        self.delete_session(&identity.jti, identity.user_id.as_str())
            .await
    }

    async fn delete_session(&self, jti: &str, user_id: &str) {
        match self.store.delete_session(jti).await {
            Ok(true) => info!(user_id, jti, "session ended"),
            Ok(false) => warn!(jti, "sign_out: session already gone"),
            Err(e) => error!(jti, error = %e, "sign_out: delete_session failed"),
        }
    }

    /// Resolves a token to an identity. Any failure, including a store
    /// error, yields `None`.
    pub async fn current_identity(&self, token: Option<&str>) -> Option<Identity> {
        let token = token?;
        let claims = match jwt::decode_and_verify(token, self.secret.as_bytes()) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "auth: jwt decode failed");
                return None;
            }
        };
        let user_id = UserId::from(claims.sub.as_str());
        let cutoff = Utc::now() - self.policy.idle;
        match self
            .store
            .touch_session_with_cutoff(&claims.jti, &user_id, cutoff)
            .await
        {
            Ok(true) => Some(Identity {
                user_id,
                email: claims.email,
                jti: claims.jti,
            }),
            Ok(false) => {
                warn!(
                    jti = %claims.jti,
                    user_id = %user_id,
                    cutoff = %cutoff,
                    "auth: session missing or expired (last_used_at < cutoff)"
                );
                None
            }
            Err(e) => {
                error!(jti = %claims.jti, error = %e, "auth: touch_session_with_cutoff failed");
                None
            }
        }
    }
}
