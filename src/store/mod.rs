pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::user::User;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A UNIQUE column would be duplicated. Carries the offending field when known.
    #[error("uniqueness violation on {0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row to insert on registration. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub client_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub hashed_password: String,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub client_id: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub hashed_password: Option<String>,
    pub disabled: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.client_id.is_none()
            && self.email.is_none()
            && self.full_name.is_none()
            && self.hashed_password.is_none()
            && self.disabled.is_none()
    }
}

/// The credential store. Implementations: PgStore (PostgreSQL), MemoryStore (in-process).
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &NewUser) -> StoreResult<User>;

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;

    async fn get_user_by_client_id(&self, client_id: &str) -> StoreResult<Option<User>>;

    /// Users ordered by id.
    async fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>>;

    /// Apply `changes` to the user with `id`. `Ok(None)` if no such user.
    async fn update_user(&self, id: i64, changes: &UserChanges) -> StoreResult<Option<User>>;

    /// Delete and return the user with `id`. `Ok(None)` if no such user.
    async fn delete_user(&self, id: i64) -> StoreResult<Option<User>>;
}

/// Open the store named by `database_url`: `memory://` or a PostgreSQL URL.
/// PostgreSQL stores are migrated when `migrate` is set.
pub async fn connect(database_url: &str, migrate: bool) -> anyhow::Result<Arc<dyn UserStore>> {
    if database_url.starts_with("memory:") {
        tracing::warn!("Using in-memory user store; data is lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let db = PgStore::connect(database_url).await?;
    if migrate {
        tracing::info!("Running migrations...");
        db.migrate().await?;
    }
    Ok(Arc::new(db))
}
