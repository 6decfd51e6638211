//! Business logic services.
//!
//! Services contain the data access and validation logic separated from HTTP
//! handlers. Every database call goes through [`Store::run`](crate::db::Store::run)
//! so it is bounded by the configured deadline.

pub mod blog_service;
pub mod category_service;
pub mod token_service;
pub mod user_service;
