//! Account field rules and registration, shared by the HTTP API and the
//! `user add` command so both accept exactly the same input.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::user::User;
use crate::store::NewUser;
use crate::AppState;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("email regex is valid")
});

const MAX_CLIENT_ID_LEN: usize = 50;
const MAX_EMAIL_LEN: usize = 100;
const MAX_FULL_NAME_LEN: usize = 100;
// bcrypt only looks at the first 72 bytes
const MAX_ACCESS_KEY_BYTES: usize = 72;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub client_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub access_key: String,
}

pub fn validate_client_id(client_id: &str) -> Result<(), AppError> {
    if client_id.trim().is_empty() || client_id.chars().count() > MAX_CLIENT_ID_LEN {
        return Err(AppError::Validation("client_id must be 1-50 characters".into()));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if email.chars().count() > MAX_EMAIL_LEN || !EMAIL_REGEX.is_match(email) {
        return Err(AppError::Validation("email is not a valid address".into()));
    }
    Ok(())
}

pub fn validate_full_name(full_name: &str) -> Result<(), AppError> {
    if full_name.chars().count() > MAX_FULL_NAME_LEN {
        return Err(AppError::Validation("full_name must be at most 100 characters".into()));
    }
    Ok(())
}

pub fn validate_access_key(access_key: &str) -> Result<(), AppError> {
    if access_key.is_empty() || access_key.len() > MAX_ACCESS_KEY_BYTES {
        return Err(AppError::Validation("access_key must be 1-72 bytes".into()));
    }
    Ok(())
}

/// Validate, hash the access key and insert the user.
pub async fn register_user(state: &AppState, req: RegisterRequest) -> Result<User, AppError> {
    validate_client_id(&req.client_id)?;
    validate_email(&req.email)?;
    if let Some(full_name) = &req.full_name {
        validate_full_name(full_name)?;
    }
    validate_access_key(&req.access_key)?;

    let hashed_password = state.hasher.hash_blocking(req.access_key).await?;
    let new_user = NewUser {
        client_id: req.client_id,
        email: req.email,
        full_name: req.full_name,
        hashed_password,
    };

    let user = state.store.insert_user(&new_user).await.map_err(|e| {
        tracing::warn!(client_id = %new_user.client_id, "register failed: {}", e);
        AppError::from(e)
    })?;
    tracing::info!(id = user.id, client_id = %user.client_id, "user registered");
    Ok(user)
}
