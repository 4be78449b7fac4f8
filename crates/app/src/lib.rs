//! Supaguard demo application composition root
//!
//! Wires the session middleware around a small page router:
//! `/` and `/sign-in` are public, `/dashboard` needs a session and `/admin`
//! is only visible to users whose `app_metadata.role` is `admin`.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use supaguard_auth::{
    supabase_middleware, AuthConfig, AuthContext, AuthProvider, CurrentUser, Interrupt,
    ProtectOptions, RequiredUser, RouteMatcher, SupabaseMiddleware,
};

/// Create the application router with the session middleware installed
pub fn create_app(
    config: AuthConfig,
    provider: Arc<dyn AuthProvider>,
) -> Result<Router, anyhow::Error> {
    let guard = route_guard()?;
    let middleware = SupabaseMiddleware::new(config, provider)?.with_callback(guard);

    let pages = Router::new()
        .route("/health", get(health_check))
        .route("/", get(home))
        .route("/sign-in", get(sign_in))
        .route("/dashboard", get(dashboard))
        .route("/admin", get(admin))
        .fallback(not_found);

    // Wrapped around the whole router so not-found rewrites are routed again
    let app = Router::new()
        .fallback_service(pages)
        .layer(axum::middleware::from_fn_with_state(
            middleware,
            supabase_middleware,
        ));

    Ok(app)
}

/// Access rules for the page routes
fn route_guard(
) -> Result<impl Fn(&AuthContext, &Request) -> Result<Option<Response>, Interrupt>, anyhow::Error>
{
    let is_admin_route = RouteMatcher::new(["/admin(.*)"])?;
    let is_protected_route = RouteMatcher::new(["/dashboard(.*)"])?;
    let admin_role = json!({ "app_metadata": { "role": "admin" } });

    let guard = move |auth: &AuthContext, request: &Request| -> Result<Option<Response>, Interrupt> {
        if is_admin_route.matches_request(request) {
            auth.protect_with(|has| has.matches(&admin_role), &ProtectOptions::default())?;
        }

        if is_protected_route.matches_request(request) {
            auth.protect(&ProtectOptions::default())?;
        }

        Ok(None)
    };

    Ok(guard)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

async fn home(CurrentUser(user): CurrentUser) -> Json<serde_json::Value> {
    Json(json!({
        "page": "home",
        "email": user.as_ref().and_then(|u| u.email()),
    }))
}

async fn sign_in() -> Json<serde_json::Value> {
    Json(json!({ "page": "sign-in" }))
}

async fn dashboard(RequiredUser(user): RequiredUser) -> Json<serde_json::Value> {
    Json(json!({
        "page": "dashboard",
        "user": user.id(),
        "email": user.email(),
    }))
}

async fn admin(RequiredUser(user): RequiredUser) -> Json<serde_json::Value> {
    Json(json!({
        "page": "admin",
        "user": user.id(),
    }))
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "code": "NOT_FOUND",
                "message": "Page not found",
            }
        })),
    )
        .into_response()
}
