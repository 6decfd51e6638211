//! Data models representing database entities and API payloads.
//!
//! Entities map to database tables; request types are what clients send and
//! are mapped onto entities by the services.

/// Blog entity, flat row and save request
pub mod blog;
/// Category entity and join-row projection
pub mod category;
/// Session token model
pub mod token;
/// User account model
pub mod user;
