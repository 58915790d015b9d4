//! Credential check and the bearer-token gate for protected routes.

pub mod password;
pub mod token;

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use thiserror::Error;

use crate::errors::AppError;
use crate::models::user::User;
use crate::store::{StoreError, UserStore};
use crate::AppState;

pub use password::PasswordHasher;
pub use token::{TokenError, TokenIssuer};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("client not found")]
    NotFound,

    #[error("access key mismatch")]
    BadCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<LoginError> for AppError {
    fn from(e: LoginError) -> Self {
        match e {
            // Same response for both so callers cannot tell which client ids exist.
            LoginError::NotFound | LoginError::BadCredentials => AppError::BadCredentials,
            LoginError::Store(e) => e.into(),
            LoginError::Internal(e) => AppError::Internal(e),
        }
    }
}

/// Look up `client_id` and check `access_key` against its stored hash.
pub async fn authenticate(
    store: &dyn UserStore,
    hasher: &PasswordHasher,
    client_id: &str,
    access_key: &str,
) -> Result<User, LoginError> {
    let user = store
        .get_user_by_client_id(client_id)
        .await?
        .ok_or(LoginError::NotFound)?;

    if !hasher
        .verify_blocking(access_key.to_string(), user.hashed_password.clone())
        .await?
    {
        return Err(LoginError::BadCredentials);
    }
    Ok(user)
}

/// Token from `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The user named by a valid bearer token.
///
/// Every failure (no header, bad signature, expired, unknown subject) is the
/// same 401; the cause is only logged.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            tracing::debug!("auth: missing bearer token");
            return Err(AppError::Unauthorized);
        };

        let client_id = state.tokens.verify(token).map_err(|e| {
            tracing::debug!(reason = %e, "auth: token rejected");
            AppError::Unauthorized
        })?;

        match state.store.get_user_by_client_id(&client_id).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => {
                tracing::debug!(client_id = %client_id, "auth: token subject no longer exists");
                Err(AppError::Unauthorized)
            }
        }
    }
}

/// A [`CurrentUser`] whose account is not disabled.
#[derive(Debug, Clone)]
pub struct ActiveUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ActiveUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.disabled {
            tracing::debug!(client_id = %user.client_id, "auth: account disabled");
            return Err(AppError::InactiveUser);
        }
        Ok(ActiveUser(user))
    }
}
