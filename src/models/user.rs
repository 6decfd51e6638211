//! User data models and API request/response types.
//!
//! This module defines:
//! - `User`: Database entity representing a user account
//! - `UserRequest`: Admin payload for creating or editing a user
//! - `UserResponse`: Response body returned to clients (no password hash)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. `email` is unique, `password` holds an argon2
/// PHC string and `active` is a 0/1 flag.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    /// argon2 hash of the user's password, never serialized
    pub password: String,

    /// 1 when the user may sign in, 0 once deactivated
    pub active: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.active != 0
    }
}

/// Request body for the admin "save user" endpoint.
///
/// `id` absent or 0 creates a user, otherwise the existing user is edited.
/// `password` is only applied when non-empty.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": 0,
///   "email": "admin@example.com",
///   "first_name": "Admin",
///   "last_name": "User",
///   "password": "verysecret",
///   "active": 1
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub active: i32,
}

impl UserRequest {
    /// Password to apply, ignoring an empty string.
    pub fn new_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

/// Response body for user endpoints.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub active: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Convert database User to API UserResponse.
///
/// This transformation removes the password hash.
impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_never_contains_password() {
        let user = User {
            id: 1,
            email: "jack@example.com".into(),
            first_name: "Jack".into(),
            last_name: "Smith".into(),
            password: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            active: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["first_name"], "Jack");
    }

    #[test]
    fn empty_password_is_ignored() {
        let request: UserRequest = serde_json::from_str(
            r#"{"id": 3, "email": "a@b.c", "first_name": "A", "last_name": "B", "password": ""}"#,
        )
        .unwrap();

        assert_eq!(request.new_password(), None);
        assert_eq!(request.active, 0);
    }
}
