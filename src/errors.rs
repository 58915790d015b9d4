use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("incorrect client_id or access_key")]
    BadCredentials,

    #[error("could not validate credentials")]
    Unauthorized,

    #[error("inactive client")]
    InactiveUser,

    #[error("not enough permissions")]
    Forbidden,

    #[error("client not found")]
    NotFound,

    #[error("client id or email already registered")]
    Conflict,

    #[error("validation error: {0}")]
    Validation(String),

    /// Body, path or query could not be extracted. Keeps the extractor's status.
    #[error("malformed request: {message}")]
    Malformed { status: StatusCode, message: String },

    #[error("no such route")]
    RouteNotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(_) => AppError::Conflict,
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

macro_rules! impl_from_rejection {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for AppError {
                fn from(r: $rejection) -> Self {
                    AppError::Malformed {
                        status: r.status(),
                        message: r.body_text(),
                    }
                }
            }
        )*
    };
}

impl_from_rejection!(JsonRejection, FormRejection, PathRejection, QueryRejection);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::BadCredentials => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "bad_credentials",
                "Incorrect client_id or access_key".to_string(),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "invalid_token",
                "Could not validate credentials".to_string(),
            ),
            AppError::InactiveUser => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "inactive_user",
                "Inactive client".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "permission_error",
                "not_owner",
                "Not enough permissions".to_string(),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                "not_found",
                "Client not found".to_string(),
            ),
            AppError::Conflict => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "already_registered",
                "Client id or email already registered".to_string(),
            ),
            AppError::Validation(reason) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_request_error",
                "validation_error",
                reason.clone(),
            ),
            AppError::Malformed { status, message } => (
                *status,
                "invalid_request_error",
                if *status == StatusCode::UNPROCESSABLE_ENTITY {
                    "validation_error"
                } else {
                    "malformed_request"
                },
                message.clone(),
            ),
            AppError::RouteNotFound => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                "route_not_found",
                "Not found".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        let mut response = (status, body).into_response();

        // Bearer challenge on every 401
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer"),
            );
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_carries_bearer_challenge() {
        let resp = AppError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::InactiveUser.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Forbidden.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Validation("bad email".into()).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_malformed_keeps_extractor_status() {
        let unprocessable = AppError::Malformed {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "missing field `email`".into(),
        };
        assert_eq!(unprocessable.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let unsupported = AppError::Malformed {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            message: "expected application/json".into(),
        };
        assert_eq!(unsupported.into_response().status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(AppError::RouteNotFound.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_from_store_error() {
        let err: AppError = StoreError::Conflict("email".into()).into();
        assert!(matches!(err, AppError::Conflict));
    }

    #[test]
    fn test_bad_credentials_is_unauthorized_with_challenge() {
        // Unknown client and wrong password share this variant, so the body is identical.
        let resp = AppError::BadCredentials.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
    }
}
