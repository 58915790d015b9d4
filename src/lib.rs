//! passgate: user registration and bearer-token authentication service.
//!
//! The binary in `main.rs` is a thin CLI over this library; integration tests
//! in `tests/` drive [`api::router`] directly.

use std::sync::Arc;

pub mod accounts;
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod models;
pub mod store;

use auth::{PasswordHasher, TokenIssuer};
use store::UserStore;

/// Shared application state passed to handlers and extractors.
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub tokens: TokenIssuer,
    pub hasher: PasswordHasher,
    pub config: config::Config,
}

impl AppState {
    pub fn new(config: config::Config, store: Arc<dyn UserStore>) -> Self {
        let tokens = TokenIssuer::new(
            &config.secret_key,
            chrono::Duration::minutes(config.access_token_expire_minutes),
        );
        let hasher = PasswordHasher::new(config.bcrypt_cost);
        Self {
            store,
            tokens,
            hasher,
            config,
        }
    }
}
