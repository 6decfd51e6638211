//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, query string)
//! 2. Delegates to a service from [`AppState`](crate::state::AppState)
//! 3. Returns a JSON response or an [`AppError`](crate::error::AppError)

/// Login, logout and token validation
pub mod auth;
/// Public blog reads and admin blog writes
pub mod blogs;
/// Category listing and creation
pub mod categories;
pub mod health;
/// Admin user management
pub mod users;
