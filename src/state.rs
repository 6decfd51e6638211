//! Shared application state handed to every handler and the auth gate.

use chrono::Duration;

use crate::{
    db::Store,
    services::{
        blog_service::BlogService, category_service::CategoryService,
        token_service::TokenService, user_service::UserService,
    },
};

/// Cloned into each request by Axum; every field is cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Store,

    /// Lifetime of tokens minted at login
    pub token_ttl: Duration,
}

impl AppState {
    pub fn new(store: Store, token_ttl: Duration) -> Self {
        Self { store, token_ttl }
    }

    pub fn tokens(&self) -> TokenService {
        TokenService::new(self.store.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.store.clone())
    }

    pub fn blogs(&self) -> BlogService {
        BlogService::new(self.store.clone())
    }

    pub fn categories(&self) -> CategoryService {
        CategoryService::new(self.store.clone())
    }
}
