//! User service - account persistence and password checks.
//!
//! Passwords are hashed with argon2 on a blocking thread so the hash work
//! never stalls the async runtime.

use argon2::{
    Argon2,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use tokio::task;

use crate::{
    db::Store,
    error::AppError,
    models::user::{User, UserRequest},
    services::token_service::delete_tokens_for_user,
};

/// Well-formed argon2id hash (default parameters) that no password matches.
/// Verified in place of the stored hash when a login names an unknown email.
const DUMMY_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$YmxvZy1kdW1teS1zYWx0IQ$AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8";

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, password, active, created_at, updated_at";

/// Hash a password into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::PasswordHash(e.to_string()))
}

/// Check `plaintext` against a stored PHC string.
///
/// A mismatch is `Ok(false)`; a malformed stored hash is an error.
pub fn verify_password(stored_hash: &str, plaintext: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AppError::PasswordHash(e.to_string()))?;

    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::PasswordHash(e.to_string())),
    }
}

async fn verify_password_blocking(stored_hash: String, plaintext: &str) -> Result<bool, AppError> {
    let plaintext = plaintext.to_string();
    task::spawn_blocking(move || verify_password(&stored_hash, &plaintext))
        .await
        .map_err(|e| AppError::PasswordHash(format!("verification task failed: {e}")))?
}

async fn hash_password_blocking(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::PasswordHash(format!("hashing task failed: {e}")))?
}

#[derive(Debug, Clone)]
pub struct UserService {
    store: Store,
}

impl UserService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// All users, sorted by last name.
    pub async fn get_all(&self) -> Result<Vec<User>, AppError> {
        self.store
            .run(async {
                let users = sqlx::query_as::<_, User>(&format!(
                    "SELECT {USER_COLUMNS} FROM users ORDER BY last_name, first_name, id"
                ))
                .fetch_all(self.store.pool())
                .await?;
                Ok::<_, AppError>(users)
            })
            .await
    }

    pub async fn get_by_id(&self, id: i32) -> Result<User, AppError> {
        self.store
            .run(async {
                sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                    .bind(id)
                    .fetch_optional(self.store.pool())
                    .await?
                    .ok_or(AppError::NotFound("user"))
            })
            .await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<User, AppError> {
        self.store
            .run(async {
                sqlx::query_as::<_, User>(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
                ))
                .bind(email)
                .fetch_optional(self.store.pool())
                .await?
                .ok_or(AppError::NotFound("user"))
            })
            .await
    }

    /// Create a user from an admin request and return the new id.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: no password supplied
    /// - `Conflict`: email already taken
    pub async fn insert(&self, request: &UserRequest) -> Result<i32, AppError> {
        let password = request
            .new_password()
            .ok_or_else(|| AppError::InvalidRequest("password is required for new users".into()))?;
        let hashed = hash_password_blocking(password).await?;

        self.store
            .run(async {
                let id: i32 = sqlx::query_scalar(
                    r#"
                    INSERT INTO users (email, first_name, last_name, password, active, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
                    RETURNING id
                    "#,
                )
                .bind(&request.email)
                .bind(&request.first_name)
                .bind(&request.last_name)
                .bind(&hashed)
                .bind(active_flag(request.active))
                .fetch_one(self.store.pool())
                .await?;
                Ok::<_, AppError>(id)
            })
            .await
    }

    /// Save the editable fields of `user`, optionally replacing the password.
    ///
    /// # Process
    ///
    /// 1. Hash `new_password` (if any) on a blocking thread
    /// 2. Start database transaction
    /// 3. Update email, names and active flag (and password)
    /// 4. When the user ends up inactive, delete all of their tokens
    /// 5. Commit
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such user
    /// - `Conflict`: email already taken
    pub async fn update(&self, user: &User, new_password: Option<&str>) -> Result<(), AppError> {
        let hashed = match new_password {
            Some(password) => Some(hash_password_blocking(password).await?),
            None => None,
        };
        let active = active_flag(user.active);

        self.store
            .run(async {
                let mut tx = self.store.pool().begin().await?;

                let result = sqlx::query(
                    r#"
                    UPDATE users
                    SET email = $1,
                        first_name = $2,
                        last_name = $3,
                        active = $4,
                        password = COALESCE($5, password),
                        updated_at = NOW()
                    WHERE id = $6
                    "#,
                )
                .bind(&user.email)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(active)
                .bind(hashed.as_deref())
                .bind(user.id)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Err(AppError::NotFound("user"));
                }

                if active == 0 {
                    delete_tokens_for_user(&mut *tx, user.id).await?;
                }

                tx.commit().await?;
                Ok::<_, AppError>(())
            })
            .await
    }

    pub async fn reset_password(&self, id: i32, password: &str) -> Result<(), AppError> {
        let hashed = hash_password_blocking(password).await?;

        self.store
            .run(async {
                let result =
                    sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
                        .bind(&hashed)
                        .bind(id)
                        .execute(self.store.pool())
                        .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::NotFound("user"));
                }
                Ok::<_, AppError>(())
            })
            .await
    }

    /// Verify a login password against the user's stored hash.
    pub async fn password_matches(&self, user: &User, plaintext: &str) -> Result<bool, AppError> {
        verify_password_blocking(user.password.clone(), plaintext).await
    }

    /// Run a full password verification that always fails.
    ///
    /// Login calls this for unknown emails so they cost the same as a wrong
    /// password for a known one.
    pub async fn reject_unknown_login(&self, plaintext: &str) -> Result<(), AppError> {
        verify_password_blocking(DUMMY_PASSWORD_HASH.to_string(), plaintext).await?;
        Ok(())
    }

    /// Mark the user inactive and revoke all of their tokens atomically.
    pub async fn deactivate(&self, id: i32) -> Result<(), AppError> {
        self.store
            .run(async {
                let mut tx = self.store.pool().begin().await?;

                let result =
                    sqlx::query("UPDATE users SET active = 0, updated_at = NOW() WHERE id = $1")
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;

                if result.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Err(AppError::NotFound("user"));
                }

                delete_tokens_for_user(&mut *tx, id).await?;

                tx.commit().await?;
                Ok::<_, AppError>(())
            })
            .await
    }

    /// Delete a user together with their tokens.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such user
    /// - `Conflict`: the user still authors blogs
    pub async fn delete_by_id(&self, id: i32) -> Result<(), AppError> {
        self.store
            .run(async {
                let mut tx = self.store.pool().begin().await?;

                delete_tokens_for_user(&mut *tx, id).await?;

                let result = sqlx::query("DELETE FROM users WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;

                if result.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Err(AppError::NotFound("user"));
                }

                tx.commit().await?;
                Ok::<_, AppError>(())
            })
            .await
    }
}

/// Clamp the integer flag to 0/1.
fn active_flag(active: i32) -> i32 {
    i32::from(active != 0)
}
