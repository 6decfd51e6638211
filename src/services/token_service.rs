//! Token service - session token lifecycle.
//!
//! This service handles:
//! - Minting opaque bearer tokens and their SHA-256 digests
//! - Persisting a token while revoking every older token of the same user
//! - Resolving presented tokens (by digest, never by plaintext)
//! - Authenticating `Authorization: Bearer <token>` headers
//! - Revocation (logout, deactivation) and expired-row purging
//!
//! # One Session Per User
//!
//! `insert` deletes all existing rows for the user and inserts the new one in
//! a single transaction, holding a per-user advisory lock so two concurrent
//! logins cannot both leave a row behind.

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use data_encoding::BASE32_NOPAD;
use sha2::{Digest, Sha256};
use sqlx::PgExecutor;
use tokio::task::JoinHandle;

use crate::{
    db::Store,
    error::AppError,
    models::{
        token::{NewToken, Token},
        user::User,
    },
};

/// Length of a base32 (unpadded) encoding of 16 random bytes.
pub const TOKEN_LENGTH: usize = 26;

/// Advisory lock namespace for token issuance; the second key is the user id.
const TOKEN_LOCK_NAMESPACE: i32 = 0x746f6b;

/// Mint a new token for `user_id` valid for `ttl`.
///
/// Does not touch storage. The 16 random bytes come from `rand`'s thread-local
/// CSPRNG.
pub fn generate_token(user_id: i32, ttl: Duration) -> NewToken {
    let random_bytes: [u8; 16] = rand::random();
    let plaintext = BASE32_NOPAD.encode(&random_bytes);
    let hash = hash_token(&plaintext);

    NewToken {
        user_id,
        plaintext,
        hash,
        expiry: Utc::now() + ttl,
    }
}

/// SHA-256 digest of a plaintext token.
pub fn hash_token(plaintext: &str) -> [u8; 32] {
    let digest = Sha256::digest(plaintext.as_bytes());
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash
}

/// Extract the token from an `Authorization` header value.
///
/// # Errors
///
/// - `MalformedHeader`: header absent, empty, or not exactly `Bearer <token>`
/// - `MalformedToken`: token is not [`TOKEN_LENGTH`] characters long
pub fn parse_bearer(header: Option<&str>) -> Result<&str, AppError> {
    let header = header.filter(|h| !h.is_empty()).ok_or(AppError::MalformedHeader)?;

    let mut parts = header.split(' ');
    let (Some("Bearer"), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AppError::MalformedHeader);
    };

    if token.len() != TOKEN_LENGTH {
        return Err(AppError::MalformedToken);
    }

    Ok(token)
}

/// Delete every token row owned by `user_id`.
///
/// Shared by revocation paths that already run inside a transaction
/// (token issuance, user deactivation, user deletion).
pub(crate) async fn delete_tokens_for_user<'e, E>(executor: E, user_id: i32) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Token authority bound to one store.
#[derive(Debug, Clone)]
pub struct TokenService {
    store: Store,
}

impl TokenService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Persist `token` for `user`, revoking every previous token of that user.
    ///
    /// # Process
    ///
    /// 1. Start database transaction
    /// 2. Take the per-user advisory lock
    /// 3. Delete existing rows for the user
    /// 4. Insert the new row with the user's email
    /// 5. Commit
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: `token` was minted for a different user
    pub async fn insert(&self, token: &NewToken, user: &User) -> Result<Token, AppError> {
        if token.user_id != user.id {
            return Err(AppError::InvalidRequest(format!(
                "token minted for user {} cannot be stored for user {}",
                token.user_id, user.id
            )));
        }

        self.store
            .run(async {
                let mut tx = self.store.pool().begin().await?;

                sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
                    .bind(TOKEN_LOCK_NAMESPACE)
                    .bind(token.user_id)
                    .execute(&mut *tx)
                    .await?;

                delete_tokens_for_user(&mut *tx, token.user_id).await?;

                let row = sqlx::query_as::<_, Token>(
                    r#"
                    INSERT INTO tokens (user_id, email, token_hash, expiry, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, NOW(), NOW())
                    RETURNING id, user_id, email, created_at, updated_at, expiry
                    "#,
                )
                .bind(token.user_id)
                .bind(&user.email)
                .bind(&token.hash[..])
                .bind(token.expiry)
                .fetch_one(&mut *tx)
                .await?;

                tx.commit().await?;

                Ok::<_, AppError>(row)
            })
            .await
    }

    /// Resolve a plaintext token to its row.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no row has this digest
    /// - `Expired`: the row exists but its expiry has passed
    pub async fn resolve(&self, plaintext: &str) -> Result<Token, AppError> {
        let hash = hash_token(plaintext);

        let token = self
            .store
            .run(async {
                let token = sqlx::query_as::<_, Token>(
                    r#"
                    SELECT id, user_id, email, created_at, updated_at, expiry
                    FROM tokens
                    WHERE token_hash = $1
                    "#,
                )
                .bind(&hash[..])
                .fetch_optional(self.store.pool())
                .await?;

                Ok::<_, AppError>(token)
            })
            .await?
            .ok_or(AppError::NotFound("token"))?;

        if token.is_expired_at(Utc::now()) {
            return Err(AppError::Expired);
        }

        Ok(token)
    }

    /// Authenticate a raw `Authorization` header value and return its user.
    ///
    /// # Flow
    ///
    /// 1. Parse `Bearer <token>` and check the token length
    /// 2. Resolve the token by digest, rejecting expired rows
    /// 3. Load the owning user by id
    /// 4. Reject deactivated users
    pub async fn authenticate_request(&self, header: Option<&str>) -> Result<User, AppError> {
        let plaintext = parse_bearer(header)?;
        let token = self.resolve(plaintext).await?;

        let user = self
            .store
            .run(async {
                let user = sqlx::query_as::<_, User>(
                    r#"
                    SELECT id, email, first_name, last_name, password, active, created_at, updated_at
                    FROM users
                    WHERE id = $1
                    "#,
                )
                .bind(token.user_id)
                .fetch_optional(self.store.pool())
                .await?;

                Ok::<_, AppError>(user)
            })
            .await?
            .ok_or(AppError::NotFound("user"))?;

        if !user.is_active() {
            return Err(AppError::Inactive);
        }

        Ok(user)
    }

    /// Whether `plaintext` names a live token.
    ///
    /// Unknown and expired tokens are `Ok(false)`; store failures propagate.
    pub async fn is_valid(&self, plaintext: &str) -> Result<bool, AppError> {
        match self.resolve(plaintext).await {
            Ok(_) => Ok(true),
            Err(AppError::NotFound(_) | AppError::Expired) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Revoke every token of `user_id`. Returns how many rows were removed.
    pub async fn invalidate(&self, user_id: i32) -> Result<u64, AppError> {
        self.store
            .run(async { Ok::<_, AppError>(delete_tokens_for_user(self.store.pool(), user_id).await?) })
            .await
    }

    /// Revoke the token matching `plaintext` (logout).
    ///
    /// Unknown tokens are not an error: the session is gone either way.
    pub async fn delete_by_token(&self, plaintext: &str) -> Result<(), AppError> {
        let hash = hash_token(plaintext);

        self.store
            .run(async {
                sqlx::query("DELETE FROM tokens WHERE token_hash = $1")
                    .bind(&hash[..])
                    .execute(self.store.pool())
                    .await?;
                Ok::<_, AppError>(())
            })
            .await
    }

    /// Delete rows whose expiry has passed. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        self.store
            .run(async {
                let result = sqlx::query("DELETE FROM tokens WHERE expiry < NOW()")
                    .execute(self.store.pool())
                    .await?;
                Ok::<_, AppError>(result.rows_affected())
            })
            .await
    }
}

/// Periodically purge expired tokens.
///
/// Expiry is enforced at resolution time; this only keeps the table small.
pub fn spawn_reaper(tokens: TokenService, every: StdDuration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        tracing::info!("Expired token reaper started");

        loop {
            interval.tick().await;
            match tokens.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!("Purged {} expired tokens", removed),
                Err(e) => tracing::warn!("Expired token purge failed: {}", e),
            }
        }
    })
}
