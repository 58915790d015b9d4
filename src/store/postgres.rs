use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{NewUser, StoreError, StoreResult, UserChanges, UserStore};
use crate::models::user::User;

const USER_COLUMNS: &str =
    "id, client_id, email, full_name, hashed_password, disabled, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Translate UNIQUE violations into `StoreError::Conflict`; everything else stays a database error.
fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("email") => "email",
                Some(c) if c.contains("client_id") => "client_id",
                _ => "unknown",
            };
            return StoreError::Conflict(field.to_string());
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"INSERT INTO users (client_id, email, full_name, hashed_password)
               VALUES ($1, $2, $3, $4)
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(&user.client_id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row)
    }

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_user_by_client_id(&self, client_id: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE client_id = $1"
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id ASC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn update_user(&self, id: i64, changes: &UserChanges) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"UPDATE users SET
                   client_id = COALESCE($2, client_id),
                   email = COALESCE($3, email),
                   full_name = COALESCE($4, full_name),
                   hashed_password = COALESCE($5, hashed_password),
                   disabled = COALESCE($6, disabled),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(id)
        .bind(&changes.client_id)
        .bind(&changes.email)
        .bind(&changes.full_name)
        .bind(&changes.hashed_password)
        .bind(changes.disabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row)
    }

    async fn delete_user(&self, id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
