//! Cookie adapter between the HTTP exchange and the provider session
//!
//! The provider reads the session from the request's cookies and may write
//! refreshed ones. Writes land in two places: the request view, so handlers
//! later in the same request see the new session, and the pending list that
//! becomes `Set-Cookie` headers for the browser.

use axum::http::{header, HeaderMap, HeaderValue};
use axum_extra::extract::cookie::{Cookie, SameSite};

#[derive(Debug, Clone, Default)]
pub struct SessionCookies {
    current: Vec<(String, String)>,
    pending: Vec<Cookie<'static>>,
}

impl SessionCookies {
    /// Snapshot the cookies sent with a request
    pub fn from_headers(headers: &HeaderMap) -> Self {
        // Parsed by hand rather than through `CookieJar` to keep header order
        let current = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();

        Self {
            current,
            pending: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.current
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Current view of the request cookies, including writes made so far
    pub fn get_all(&self) -> &[(String, String)] {
        &self.current
    }

    /// Record cookies written by the provider.
    ///
    /// An empty value removes the cookie from the request view.
    pub fn set_all<I>(&mut self, cookies: I)
    where
        I: IntoIterator<Item = Cookie<'static>>,
    {
        for cookie in cookies {
            let name = cookie.name().to_string();
            let value = cookie.value().to_string();

            self.current.retain(|(n, _)| *n != name);
            if !value.is_empty() {
                self.current.push((name.clone(), value));
            }

            self.pending.retain(|c| c.name() != name);
            self.pending.push(cookie);
        }
    }

    /// Cookies to send back to the browser
    pub fn pending(&self) -> &[Cookie<'static>] {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Rewrite the request's `Cookie` header from the current view
    pub fn apply_to_request(&self, headers: &mut HeaderMap) {
        headers.remove(header::COOKIE);
        if self.current.is_empty() {
            return;
        }

        let joined = self
            .current
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");

        match HeaderValue::from_str(&joined) {
            Ok(value) => {
                headers.insert(header::COOKIE, value);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unrepresentable cookie header");
            }
        }
    }

    /// Append a `Set-Cookie` header for each pending cookie
    pub fn apply_to_response(&self, headers: &mut HeaderMap) {
        for cookie in &self.pending {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    headers.append(header::SET_COOKIE, value);
                }
                Err(e) => {
                    tracing::warn!(error = %e, cookie = cookie.name(), "Dropping unrepresentable cookie");
                }
            }
        }
    }
}

/// Session cookie with the attributes the browser client expects
pub fn session_cookie(name: impl Into<String>, value: impl Into<String>) -> Cookie<'static> {
    Cookie::build((name.into(), value.into()))
        .path("/")
        .same_site(SameSite::Lax)
        .permanent()
        .build()
}

/// Cookie that clears `name` in the browser
pub fn removal_cookie(name: impl Into<String>) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.into(), String::new())).path("/").build();
    cookie.make_removal();
    cookie
}
