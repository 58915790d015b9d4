use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::Request,
    handler::HandlerWithoutStateExt,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::CorsOrigins;
use crate::errors::AppError;
use crate::AppState;

pub mod extract;
pub mod handlers;

/// Build the full application router: auth and user routes, the static
/// shell, and the HTTP layers (tracing, CORS, request id, security headers).
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = PathBuf::from(&state.config.static_dir);
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/token", post(handlers::login))
        .route("/register", post(handlers::register))
        .route("/register/", post(handlers::register))
        .route("/users", get(handlers::list_users))
        .route("/users/", get(handlers::list_users))
        .route("/users/me", get(handlers::read_me))
        .route(
            "/users/:key",
            get(handlers::read_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service(
            "/static",
            ServeDir::new(&static_dir).not_found_service(fallback_404.into_service()),
        )
        .fallback(fallback_404)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
}

async fn fallback_404() -> AppError {
    AppError::RouteNotFound
}

/// Credentialed CORS cannot use `*`, so "any" mirrors the request instead.
fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::mirror_request(),
        CorsOrigins::List(list) => AllowOrigin::list(list.iter().filter_map(|o| {
            HeaderValue::from_str(o)
                .map_err(|_| tracing::warn!("ignoring invalid CORS origin '{}'", o))
                .ok()
        })),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Middleware: injects a unique X-Request-Id into every response.
async fn request_id_middleware(req: Request, next: Next) -> Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Middleware: injects security headers into every response.
async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    // Tokens travel in JSON bodies; keep them out of shared caches
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));
    headers.remove("Server");

    resp
}
