use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored user record. The password hash never leaves the service;
/// handlers respond with [`UserResponse`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub client_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub hashed_password: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub client_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub disabled: bool,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            client_id: u.client_id,
            email: u.email,
            full_name: u.full_name,
            disabled: u.disabled,
        }
    }
}
