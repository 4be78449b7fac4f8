//! End-to-end tests: demo app + GoTrue client against a mocked auth server
//!
//! The auth server is a wiremock instance speaking the `/auth/v1` endpoints,
//! so these cover cookie decoding, refresh and the sign-in flows with the
//! real provider implementation.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    response::Response,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{json, Value};
use supaguard_auth::{AuthConfig, GoTrueClient, AUTH_REASON_HEADER};
use tower::ServiceExt;
use wiremock::matchers::{header as header_eq, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{assert_redirect, body_json, set_cookies};

/// `sb-<first host label>-auth-token` for a wiremock `http://127.0.0.1:<port>` URL
const STORAGE_KEY: &str = "sb-127-auth-token";

struct TestServer {
    auth: MockServer,
    config: AuthConfig,
}

impl TestServer {
    async fn start() -> Self {
        let auth = MockServer::start().await;
        let config = AuthConfig::new(auth.uri(), "anon-key");
        Self { auth, config }
    }

    async fn send(&self, request: Request) -> Response {
        let provider = GoTrueClient::new(&self.config).unwrap();
        let app = supaguard_app::create_app(self.config.clone(), Arc::new(provider)).unwrap();
        app.oneshot(request).await.unwrap()
    }

    async fn mount_user(&self, token: &str, user: Value) {
        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header_eq("authorization", format!("Bearer {}", token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(user))
            .mount(&self.auth)
            .await;
    }
}

fn session_cookie(access_token: &str, expires_at: i64) -> String {
    let session = json!({
        "access_token": access_token,
        "refresh_token": "refresh-1",
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": expires_at,
        "user": { "id": "user-1" }
    });
    format!(
        "{}=base64-{}",
        STORAGE_KEY,
        URL_SAFE_NO_PAD.encode(session.to_string())
    )
}

fn request(uri: &str, cookie: Option<&str>) -> Request {
    let mut builder = Request::builder().uri(uri).header(header::HOST, "app.test");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[test_log::test(tokio::test)]
async fn test_valid_session_opens_dashboard() {
    let server = TestServer::start().await;
    server
        .mount_user(
            "access-1",
            json!({ "id": "user-1", "email": "user@example.com" }),
        )
        .await;

    let cookie = session_cookie("access-1", now() + 3600);
    let response = server.send(request("/dashboard", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(body_json(response).await["email"], "user@example.com");
}

#[tokio::test]
async fn test_no_session_redirects_without_calling_provider() {
    let server = TestServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server.auth)
        .await;

    let response = server.send(request("/dashboard", None)).await;
    assert_redirect(&response, "http://app.test/sign-in");
}

#[test_log::test(tokio::test)]
async fn test_expired_session_is_refreshed_in_the_same_request() {
    let server = TestServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": { "id": "admin-1" }
        })))
        .expect(1)
        .mount(&server.auth)
        .await;
    server
        .mount_user(
            "access-2",
            json!({ "id": "admin-1", "app_metadata": { "role": "admin" } }),
        )
        .await;

    let cookie = session_cookie("access-1", now() - 60);
    let response = server.send(request("/admin", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with(&format!("{}=base64-", STORAGE_KEY)));
    assert_eq!(body_json(response).await["user"], "admin-1");
}

#[tokio::test]
async fn test_revoked_session_is_treated_as_signed_out() {
    let server = TestServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "invalid JWT" })))
        .mount(&server.auth)
        .await;

    let cookie = session_cookie("access-1", now() + 3600);
    let response = server.send(request("/dashboard", Some(&cookie))).await;

    assert_redirect(&response, "http://app.test/sign-in");
}

#[tokio::test]
async fn test_auth_outage_is_an_error_not_a_redirect() {
    let server = TestServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server.auth)
        .await;

    let cookie = session_cookie("access-1", now() + 3600);
    let response = server.send(request("/dashboard", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(response.headers().get(header::LOCATION).is_none());
}

#[tokio::test]
async fn test_non_admin_gets_not_found() {
    let server = TestServer::start().await;
    server
        .mount_user("access-1", json!({ "id": "user-1", "app_metadata": {} }))
        .await;

    let cookie = session_cookie("access-1", now() + 3600);
    let response = server.send(request("/admin", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(AUTH_REASON_HEADER).is_some());
}

#[tokio::test]
async fn test_social_login_stores_session() {
    let server = TestServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "pkce"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server.auth)
        .await;

    let verifier = format!(
        "{}-code-verifier=base64-{}",
        STORAGE_KEY,
        URL_SAFE_NO_PAD.encode("\"verifier-1\"")
    );
    let response = server
        .send(request("/auth/callback?code=abc&next=/dashboard", Some(&verifier)))
        .await;

    assert_redirect(&response, "http://app.test/dashboard");
    let cookies = set_cookies(&response);
    assert!(cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=base64-", STORAGE_KEY))));
    assert!(cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}-code-verifier=", STORAGE_KEY))));
}

#[tokio::test]
async fn test_social_login_without_verifier_fails_to_sign_in() {
    let server = TestServer::start().await;

    let response = server
        .send(request("/auth/callback?code=abc", None))
        .await;
    assert_redirect(&response, "http://app.test/sign-in");
}

#[tokio::test]
async fn test_email_confirmation_stores_session() {
    let server = TestServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server.auth)
        .await;

    let response = server
        .send(request("/auth/confirm?token_hash=hash-1&type=signup", None))
        .await;

    assert_redirect(&response, "http://app.test/");
    assert_eq!(set_cookies(&response).len(), 1);
}

mod common;
