//! Common test utilities for integration tests
//!
//! - `TestApp`: the session middleware around a small router, backed by the
//!   mock auth provider
//! - request builders and response assertions shared by the test binaries

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use supaguard_auth::{
    mock::MockAuthProvider, supabase_middleware, AuthConfig, AuthContext, CurrentUser,
    Interrupt, PathOverrides, SupabaseMiddleware,
};
use tower::ServiceExt;

pub const HOST: &str = "app.test";

pub fn test_config() -> AuthConfig {
    AuthConfig::new("https://proj.supabase.co", "anon-key")
}

pub fn admin_user() -> Value {
    json!({
        "id": "admin-1",
        "email": "admin@example.com",
        "app_metadata": { "role": "admin", "provider": "email" },
        "user_metadata": { "name": "Ada" }
    })
}

pub fn regular_user() -> Value {
    json!({
        "id": "user-1",
        "email": "user@example.com",
        "app_metadata": { "role": "user", "provider": "github" },
        "user_metadata": { "tags": ["beta", "early"] }
    })
}

/// Session middleware around a router that echoes what handlers see
pub struct TestApp {
    pub router: Router,
    pub provider: MockAuthProvider,
}

impl TestApp {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&AuthContext, &Request) -> Result<Option<Response>, Interrupt>
            + Send
            + Sync
            + 'static,
    {
        Self::build(test_config(), MockAuthProvider::new(), Some(callback))
    }

    pub fn without_callback() -> Self {
        Self::build::<fn(&AuthContext, &Request) -> Result<Option<Response>, Interrupt>>(
            test_config(),
            MockAuthProvider::new(),
            None,
        )
    }

    pub fn with_paths<F>(overrides: PathOverrides, callback: F) -> Self
    where
        F: Fn(&AuthContext, &Request) -> Result<Option<Response>, Interrupt>
            + Send
            + Sync
            + 'static,
    {
        Self::build(
            test_config().with_paths(overrides),
            MockAuthProvider::new(),
            Some(callback),
        )
    }

    pub fn with_config<F>(config: AuthConfig, callback: F) -> Self
    where
        F: Fn(&AuthContext, &Request) -> Result<Option<Response>, Interrupt>
            + Send
            + Sync
            + 'static,
    {
        Self::build(config, MockAuthProvider::new(), Some(callback))
    }

    fn build<F>(config: AuthConfig, provider: MockAuthProvider, callback: Option<F>) -> Self
    where
        F: Fn(&AuthContext, &Request) -> Result<Option<Response>, Interrupt>
            + Send
            + Sync
            + 'static,
    {
        let mut middleware = SupabaseMiddleware::new(config, Arc::new(provider.clone()))
            .expect("default auth paths compile");
        if let Some(callback) = callback {
            middleware = middleware.with_callback(callback);
        }

        let pages = Router::new()
            .route("/", get(echo))
            .route("/sign-in", get(echo))
            .route("/dashboard", get(echo))
            .route("/admin", get(echo))
            .fallback(|| async { (StatusCode::NOT_FOUND, "custom not found page") });

        let router = Router::new()
            .fallback_service(pages)
            .layer(axum::middleware::from_fn_with_state(
                middleware,
                supabase_middleware,
            ));

        Self { router, provider }
    }

    pub fn sign_in_as(&self, user: Value) -> &Self {
        self.provider.behavior().set_user(user);
        self
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(get_request(uri)).await
    }

    pub async fn send(&self, request: Request) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

/// Reports the path, the user and the cookies the handler received
async fn echo(CurrentUser(user): CurrentUser, request: Request) -> Json<Value> {
    let cookie = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Json(json!({
        "path": request.uri().path(),
        "user": user.map(|u| u.into_value()),
        "cookie": cookie,
    }))
}

pub fn get_request(uri: &str) -> Request {
    Request::builder()
        .uri(uri)
        .header(header::HOST, HOST)
        .body(Body::empty())
        .expect("valid request")
}

pub fn get_request_with_cookie(uri: &str, cookie: &str) -> Request {
    Request::builder()
        .uri(uri)
        .header(header::HOST, HOST)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .expect("valid request")
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect has a Location header")
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

pub fn assert_redirect(response: &Response, expected: &str) {
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(response), expected);
}
