//! Shared helpers for HTTP-level tests: an app over `MemoryStore` and a
//! request helper that returns status, headers and the decoded JSON body.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use passgate::store::MemoryStore;
use passgate::{api, config, AppState};

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub fn app() -> TestApp {
    app_with(&[])
}

/// App with extra configuration on top of the test defaults.
pub fn app_with(overrides: &[(&str, &str)]) -> TestApp {
    let static_dir = format!("{}/static", env!("CARGO_MANIFEST_DIR"));
    let mut vars: HashMap<String, String> = [
        ("SECRET_KEY", "integration-test-secret-0123456789abcdef"),
        ("DATABASE_URL", "memory://"),
        ("BCRYPT_COST", "4"),
        ("STATIC_DIR", static_dir.as_str()),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in overrides {
        vars.insert(k.to_string(), v.to_string());
    }

    let cfg = config::from_lookup(|key| vars.get(key).cloned()).expect("test config");
    let state = Arc::new(AppState::new(cfg, Arc::new(MemoryStore::new())));
    let router = api::router(state.clone());
    TestApp { state, router }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse { status, headers, body }
    }

    pub async fn register(&self, client_id: &str, email: &str, access_key: &str) -> TestResponse {
        let payload = serde_json::json!({
            "client_id": client_id,
            "email": email,
            "access_key": access_key,
        });
        self.send(json_request(Method::POST, "/register/", None, &payload)).await
    }

    pub async fn login(&self, client_id: &str, access_key: &str) -> TestResponse {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("client_id={client_id}&access_key={access_key}")))
            .unwrap();
        self.send(req).await
    }

    /// Register then log in, returning (user id, access token).
    pub async fn signup(&self, client_id: &str, access_key: &str) -> (i64, String) {
        let reg = self
            .register(client_id, &format!("{client_id}@example.com"), access_key)
            .await;
        assert_eq!(reg.status, StatusCode::OK, "register {client_id}: {:?}", reg.body);
        let login = self.login(client_id, access_key).await;
        assert_eq!(login.status, StatusCode::OK, "login {client_id}: {:?}", login.body);
        (
            reg.body["id"].as_i64().unwrap(),
            login.body["access_token"].as_str().unwrap().to_string(),
        )
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn delete(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::DELETE).uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, payload: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}
