//! Conversion of control-flow signals into responses
//!
//! [`resolve`] is the only place an [`Interrupt`] is inspected. Signals become
//! a redirect or a rewrite; anything else is handed back unchanged so the
//! host's error handling sees it.

use axum::{
    http::{header, request::Parts, HeaderMap, HeaderValue, Uri},
    response::{IntoResponse, Redirect, Response},
};
use supaguard_common::Error;
use url::Url;

use crate::signal::{Interrupt, Signal};

/// Header stamped on responses produced by a forced not-found rewrite
pub const AUTH_REASON_HEADER: &str = "x-supabase-auth-reason";

/// Value of [`AUTH_REASON_HEADER`] for forced not-found rewrites
pub const PROTECT_REWRITE: &str = "protect-rewrite";

/// Response the middleware should produce for a signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Temporary redirect to the URL
    Redirect(Url),
    /// Serve the URL's path in place of the requested one
    Rewrite(Url),
}

impl Resolution {
    pub fn url(&self) -> &Url {
        match self {
            Resolution::Redirect(url) | Resolution::Rewrite(url) => url,
        }
    }
}

/// Resolve a callback interrupt against the current request.
///
/// Non-signal failures are returned as `Err` untouched.
pub fn resolve(
    interrupt: Interrupt,
    request_url: &Url,
    sign_in_path: &str,
) -> Result<Resolution, Error> {
    match interrupt {
        Interrupt::Signal(signal) => resolve_signal(&signal, request_url, sign_in_path),
        Interrupt::Failure(error) => Err(error),
    }
}

pub fn resolve_signal(
    signal: &Signal,
    request_url: &Url,
    sign_in_path: &str,
) -> Result<Resolution, Error> {
    let resolution = match signal {
        Signal::ForceNotFound => {
            let target = format!("/supabase_{}", chrono::Utc::now().timestamp_millis());
            Resolution::Rewrite(join(request_url, &target)?)
        }
        Signal::RedirectToUrl(url) => {
            let target = match Url::parse(url) {
                Ok(absolute) => absolute,
                Err(_) => join(request_url, url)?,
            };
            Resolution::Redirect(target)
        }
        Signal::RedirectToSignIn => Resolution::Redirect(join(request_url, sign_in_path)?),
    };

    tracing::debug!(
        signal = signal.code(),
        target = %resolution.url(),
        "Resolved control flow signal"
    );

    Ok(resolution)
}

/// Resolve `target` relative to `base`
pub fn join(base: &Url, target: &str) -> Result<Url, Error> {
    base.join(target)
        .map_err(|e| Error::BadRequest(format!("Cannot resolve `{}` against {}: {}", target, base, e)))
}

/// Build a temporary (307) redirect
pub fn redirect_response(url: &Url) -> Response {
    Redirect::temporary(url.as_str()).into_response()
}

/// Mark a response as the product of a forced not-found rewrite
pub fn mark_rewrite(response: &mut Response) {
    response.headers_mut().insert(
        AUTH_REASON_HEADER,
        HeaderValue::from_static(PROTECT_REWRITE),
    );
}

/// Reconstruct the absolute URL of an incoming request.
///
/// Server requests usually carry only a path, so the origin comes from the
/// URI when present, else from `x-forwarded-proto` and `Host`.
pub fn request_url(parts: &Parts) -> Result<Url, Error> {
    url_from(&parts.uri, &parts.headers)
}

pub fn url_from(uri: &Uri, headers: &HeaderMap) -> Result<Url, Error> {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Url::parse(&uri.to_string())
            .map_err(|e| Error::BadRequest(format!("Invalid request URI: {}", e)));
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("localhost");

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    Url::parse(&format!("{}://{}{}", scheme, host, path_and_query))
        .map_err(|e| Error::BadRequest(format!("Invalid request URL: {}", e)))
}
