use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::accounts::{
    self, validate_access_key, validate_client_id, validate_email, validate_full_name,
    RegisterRequest,
};
use crate::auth::{self, ActiveUser};
use crate::errors::AppError;
use crate::models::user::UserResponse;
use crate::store::UserChanges;
use crate::AppState;

use super::extract::{AppForm, AppJson, AppPath, AppQuery};

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct LoginForm {
    pub client_id: String,
    pub access_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Partial update: absent fields are left unchanged.
#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub client_id: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub access_key: Option<String>,
    pub disabled: Option<bool>,
}

#[derive(Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 1000;

// ── Handlers ─────────────────────────────────────────────────

/// POST /token: exchange client_id/access_key for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppForm(form): AppForm<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = auth::authenticate(
        state.store.as_ref(),
        &state.hasher,
        &form.client_id,
        &form.access_key,
    )
    .await
    .map_err(|e| {
        tracing::warn!(client_id = %form.client_id, reason = %e, "login failed");
        AppError::from(e)
    })?;

    let access_token = state
        .tokens
        .issue(&user.client_id)
        .map_err(|e| AppError::Internal(e.into()))?;
    tracing::info!(client_id = %user.client_id, "access token issued");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// POST /register/: create a user
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = accounts::register_user(&state, payload).await?;
    Ok(Json(user.into()))
}

/// GET /users/me: the authenticated user
pub async fn read_me(ActiveUser(user): ActiveUser) -> Json<UserResponse> {
    Json(user.into())
}

/// GET /users/: list users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _caller: ActiveUser,
    AppQuery(params): AppQuery<PaginationParams>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let users = state.store.list_users(limit, offset).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /users/:client_id: public lookup
pub async fn read_user(
    State(state): State<Arc<AppState>>,
    AppPath(client_id): AppPath<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .store
        .get_user_by_client_id(&client_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(user.into()))
}

/// Ownership gate for mutations on /users/:id.
fn check_owner(state: &AppState, caller: &ActiveUser, id: i64) -> Result<(), AppError> {
    if state.config.enforce_ownership && caller.0.id != id {
        tracing::warn!(caller = caller.0.id, target = id, "mutation of another user's record denied");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// PUT /users/:id: partial update
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    caller: ActiveUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    check_owner(&state, &caller, id)?;

    if let Some(client_id) = &payload.client_id {
        validate_client_id(client_id)?;
    }
    if let Some(email) = &payload.email {
        validate_email(email)?;
    }
    if let Some(full_name) = &payload.full_name {
        validate_full_name(full_name)?;
    }
    let hashed_password = match payload.access_key {
        Some(key) => {
            validate_access_key(&key)?;
            Some(state.hasher.hash_blocking(key).await?)
        }
        None => None,
    };

    let changes = UserChanges {
        client_id: payload.client_id,
        email: payload.email,
        full_name: payload.full_name,
        hashed_password,
        disabled: payload.disabled,
    };

    let user = if changes.is_empty() {
        state.store.get_user(id).await?
    } else {
        state.store.update_user(id, &changes).await?
    }
    .ok_or(AppError::NotFound)?;
    tracing::info!(id = user.id, by = caller.0.id, "user updated");

    Ok(Json(user.into()))
}

/// DELETE /users/:id: delete and return the user
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    caller: ActiveUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<UserResponse>, AppError> {
    check_owner(&state, &caller, id)?;

    let user = state.store.delete_user(id).await?.ok_or(AppError::NotFound)?;
    tracing::info!(id = user.id, client_id = %user.client_id, by = caller.0.id, "user deleted");

    Ok(Json(user.into()))
}
