//! Per-request auth accessor handed to middleware callbacks

use serde_json::Value;

use crate::has::Has;
use crate::protect::{self, ProtectOptions};
use crate::signal::Signal;
use crate::user::UserRecord;

/// Represents the session of the current request.
///
/// Built after the user fetch; never mutated afterwards. Every method that
/// refuses access returns a [`Signal`] as its error so callers can use `?`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    user: Option<UserRecord>,
}

impl AuthContext {
    /// Create a new auth context for the user of this request, if any
    pub fn new(user: Option<UserRecord>) -> Self {
        Self { user }
    }

    /// The user object if the request is authenticated
    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Check if the user has the given properties
    pub fn has(&self, query: &Value) -> bool {
        Has::new(self.user.as_ref()).matches(query)
    }

    /// Protect the route from unauthenticated access
    pub fn protect(&self, options: &ProtectOptions) -> Result<&UserRecord, Signal> {
        protect::protect(self.user.as_ref(), options)
    }

    /// Protect the route from unauthenticated or unauthorized access
    pub fn protect_with<'a, F>(
        &'a self,
        predicate: F,
        options: &ProtectOptions,
    ) -> Result<&'a UserRecord, Signal>
    where
        F: FnOnce(Has<'a>) -> bool,
    {
        protect::protect_with(self.user.as_ref(), predicate, options)
    }

    /// Redirect to a given url.
    ///
    /// Always fails; the signal carries the destination.
    pub fn redirect<T>(&self, url: impl Into<String>) -> Result<T, Signal> {
        Err(Signal::RedirectToUrl(url.into()))
    }

    /// Redirect to the sign-in page
    pub fn redirect_to_sign_in<T>(&self) -> Result<T, Signal> {
        Err(Signal::RedirectToSignIn)
    }
}
