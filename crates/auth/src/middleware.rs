//! Supabase session middleware
//!
//! Per request, in order:
//! 1. wire the request's cookies into a [`SessionCookies`] adapter
//! 2. answer the social-login callback and email confirm routes directly
//! 3. fetch the user through the [`AuthProvider`]
//! 4. run the application callback, resolving any [`Signal`] it raises
//! 5. otherwise pass the request on, carrying refreshed session cookies
//!    both ways
//!
//! [`Signal`]: crate::signal::Signal

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{request::Parts, Uri},
    middleware::Next,
    response::Response,
};
use supaguard_common::Error;
use url::Url;

use crate::config::AuthConfig;
use crate::context::AuthContext;
use crate::cookies::SessionCookies;
use crate::error::AuthError;
use crate::matcher::{PatternError, RouteMatcher};
use crate::provider::{AuthProvider, OtpType};
use crate::resolver::{self, mark_rewrite, redirect_response, Resolution};
use crate::signal::Interrupt;

/// Application hook run after the user fetch.
///
/// `Ok(Some(response))` answers the request, `Ok(None)` lets it through and
/// `Err` stops it: signals become redirects or not-found pages, failures
/// reach the host's error handling unchanged.
pub type Callback =
    Arc<dyn Fn(&AuthContext, &Request) -> Result<Option<Response>, Interrupt> + Send + Sync>;

/// Middleware state, shared by every request
#[derive(Clone)]
pub struct SupabaseMiddleware {
    config: Arc<AuthConfig>,
    provider: Arc<dyn AuthProvider>,
    callback: Option<Callback>,
    is_auth_confirm_route: Arc<RouteMatcher>,
    is_social_login_callback_route: Arc<RouteMatcher>,
}

impl std::fmt::Debug for SupabaseMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseMiddleware")
            .field("config", &self.config)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl SupabaseMiddleware {
    pub fn new(config: AuthConfig, provider: Arc<dyn AuthProvider>) -> Result<Self, PatternError> {
        let is_auth_confirm_route =
            RouteMatcher::new([format!("{}(.*)", config.paths.auth_confirm)])?;
        let is_social_login_callback_route =
            RouteMatcher::new([format!("{}(.*)", config.paths.social_login_callback)])?;

        Ok(Self {
            config: Arc::new(config),
            provider,
            callback: None,
            is_auth_confirm_route: Arc::new(is_auth_confirm_route),
            is_social_login_callback_route: Arc::new(is_social_login_callback_route),
        })
    }

    /// Install the application callback
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&AuthContext, &Request) -> Result<Option<Response>, Interrupt> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

/// Session middleware entry point, for `axum::middleware::from_fn_with_state`
pub async fn supabase_middleware(
    State(state): State<SupabaseMiddleware>,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    let (mut parts, body) = request.into_parts();
    let request_url = resolver::request_url(&parts)?;

    // The user fetch must follow cookie wiring with nothing in between
    let mut cookies = SessionCookies::from_headers(&parts.headers);

    if state.is_social_login_callback_route.matches(parts.uri.path()) {
        return social_login_callback(&state, &parts, &request_url, cookies).await;
    }

    if state.is_auth_confirm_route.matches(parts.uri.path()) {
        return auth_confirm(&state, &request_url, cookies).await;
    }

    let user = state.provider.get_user(&mut cookies).await?;

    tracing::debug!(
        path = %parts.uri.path(),
        authenticated = user.is_some(),
        "Resolved session"
    );

    let auth = AuthContext::new(user);
    cookies.apply_to_request(&mut parts.headers);
    parts.extensions.insert(auth.clone());
    let mut request = Request::from_parts(parts, body);

    if let Some(callback) = &state.callback {
        match callback(&auth, &request) {
            Ok(Some(response)) => return Ok(with_cookies(response, &cookies)),
            Ok(None) => {}
            Err(interrupt) => {
                let resolution =
                    resolver::resolve(interrupt, &request_url, &state.config.paths.sign_in)?;

                let response = match resolution {
                    Resolution::Redirect(url) => redirect_response(&url),
                    Resolution::Rewrite(url) => {
                        *request.uri_mut() = rewrite_uri(&url)?;
                        let mut response = next.run(request).await;
                        mark_rewrite(&mut response);
                        response
                    }
                };

                return Ok(with_cookies(response, &cookies));
            }
        }
    }

    let response = next.run(request).await;
    Ok(with_cookies(response, &cookies))
}

async fn social_login_callback(
    state: &SupabaseMiddleware,
    parts: &Parts,
    request_url: &Url,
    mut cookies: SessionCookies,
) -> Result<Response, Error> {
    let paths = &state.config.paths;
    let error_url = resolver::join(request_url, paths.error_or_sign_in())?;

    let Some(code) = query_param(request_url, "code") else {
        tracing::warn!("Social login callback without code");
        return Ok(redirect_response(&error_url));
    };
    let next_path = query_param(request_url, "next")
        .filter(|next| next.starts_with('/') && !next.starts_with("//"))
        .unwrap_or_else(|| paths.home.clone());

    if let Err(e) = state
        .provider
        .exchange_code_for_session(&code, &mut cookies)
        .await
    {
        tracing::warn!(error = %e, "Code exchange failed");
        return Ok(redirect_response(&error_url));
    }

    let website = website_origin(state, parts, request_url);
    let target = Url::parse(&format!("{}{}", website.trim_end_matches('/'), next_path))
        .map_err(|e| Error::BadRequest(format!("Invalid post-login redirect: {}", e)))?;

    tracing::info!(target = %target, "Social login completed");
    Ok(with_cookies(redirect_response(&target), &cookies))
}

async fn auth_confirm(
    state: &SupabaseMiddleware,
    request_url: &Url,
    mut cookies: SessionCookies,
) -> Result<Response, Error> {
    let paths = &state.config.paths;
    let error_url = resolver::join(request_url, paths.error_or_sign_in())?;

    let verified = match (
        query_param(request_url, "token_hash"),
        query_param(request_url, "type"),
    ) {
        (Some(token_hash), Some(otp_type)) => match otp_type.parse::<OtpType>() {
            Ok(otp_type) => state
                .provider
                .verify_otp(otp_type, &token_hash, &mut cookies)
                .await,
            Err(e) => Err(e),
        },
        (None, _) => Err(AuthError::MissingParameter("token_hash")),
        (_, None) => Err(AuthError::MissingParameter("type")),
    };

    if let Err(e) = verified {
        tracing::warn!(error = %e, "OTP confirmation failed");
        return Ok(redirect_response(&error_url));
    }

    let mut home_url = resolver::join(request_url, &paths.home)?;
    strip_query_params(&mut home_url, &["token_hash", "type"]);

    Ok(with_cookies(redirect_response(&home_url), &cookies))
}

/// Configured site URL, else the forwarded host, else the request origin
fn website_origin(state: &SupabaseMiddleware, parts: &Parts, request_url: &Url) -> String {
    if let Some(site_url) = &state.config.site_url {
        return site_url.clone();
    }

    let forwarded_host = parts
        .headers
        .get("x-forwarded-host")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    match forwarded_host {
        Some(host) => format!("{}://{}", request_url.scheme(), host),
        None => request_url.origin().ascii_serialization(),
    }
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn strip_query_params(url: &mut Url, names: &[&str]) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !names.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

fn rewrite_uri(url: &Url) -> Result<Uri, Error> {
    url.path()
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid rewrite path `{}`: {}", url.path(), e)))
}

fn with_cookies(mut response: Response, cookies: &SessionCookies) -> Response {
    cookies.apply_to_response(response.headers_mut());
    response
}
