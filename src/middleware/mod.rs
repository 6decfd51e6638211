//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers. The only one here
//! is the bearer-token gate in front of the `/admin` routes.

/// Bearer token authentication middleware
pub mod auth;
