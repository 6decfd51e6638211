//! Session token models.
//!
//! Tokens authenticate users making requests to the admin API. The plaintext
//! is handed to the client once at login; the database only ever sees its
//! SHA-256 digest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::user::UserResponse;

/// Represents a token record from the database.
///
/// # Database Table
///
/// Maps to the `tokens` table. At most one row exists per `user_id`. The
/// `token_hash` column is only ever used as a lookup key and is not loaded.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Token {
    pub id: i32,
    pub user_id: i32,

    /// Copied from the owning user when the row is inserted
    pub email: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expiry: DateTime<Utc>,
}

impl Token {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry < now
    }
}

/// A freshly minted token that has not been persisted yet.
///
/// This is the only value that ever holds the plaintext.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub user_id: i32,
    pub plaintext: String,
    pub hash: [u8; 32],
    pub expiry: DateTime<Utc>,
}

/// Credentials posted to `POST /users/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for endpoints that act on a presented token (logout, validate).
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub token: String,
}

/// Returned by a successful login.
///
/// # JSON Example
///
/// ```json
/// {
///   "token": "MFRGGZDFMZTWQ2LKNNWG23TPOA",
///   "expiry": "2025-12-21T16:00:00Z",
///   "user": { "id": 1, "email": "admin@example.com", "...": "..." }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expiry: DateTime<Utc>,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct ValidTokenResponse {
    pub valid: bool,
}
