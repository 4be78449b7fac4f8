//! Access guard: authentication and capability checks
//!
//! The decision is computed first as an [`AccessDecision`] and only then
//! turned into a [`Signal`], so the ordering of checks lives in one place:
//!
//! 1. no user: redirect to `unauthenticated_url`, else to sign-in
//! 2. predicate rejects the user: redirect to `unauthorized_url`, else not found
//! 3. otherwise the user is returned

use serde::{Deserialize, Serialize};

use crate::has::Has;
use crate::signal::Signal;
use crate::user::UserRecord;

/// Where to send users that fail a check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectOptions {
    pub unauthenticated_url: Option<String>,
    pub unauthorized_url: Option<String>,
}

impl ProtectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unauthenticated_url(mut self, url: impl Into<String>) -> Self {
        self.unauthenticated_url = Some(url.into());
        self
    }

    pub fn unauthorized_url(mut self, url: impl Into<String>) -> Self {
        self.unauthorized_url = Some(url.into());
        self
    }
}

/// Why access was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    Unauthorized,
}

/// Outcome of an access check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccessDecision<'a> {
    Allow(&'a UserRecord),
    Deny(DenyReason),
}

impl<'a> AccessDecision<'a> {
    /// Evaluate authentication, then the optional capability predicate
    pub fn evaluate<F>(user: Option<&'a UserRecord>, predicate: Option<F>) -> Self
    where
        F: FnOnce(Has<'a>) -> bool,
    {
        let Some(user) = user else {
            return AccessDecision::Deny(DenyReason::Unauthenticated);
        };

        if let Some(predicate) = predicate {
            if !predicate(Has::new(Some(user))) {
                return AccessDecision::Deny(DenyReason::Unauthorized);
            }
        }

        AccessDecision::Allow(user)
    }

    /// Turn the decision into the user or the signal that replaces the response
    pub fn into_result(self, options: &ProtectOptions) -> Result<&'a UserRecord, Signal> {
        match self {
            AccessDecision::Allow(user) => Ok(user),
            AccessDecision::Deny(reason) => Err(signal_for(reason, options)),
        }
    }
}

fn signal_for(reason: DenyReason, options: &ProtectOptions) -> Signal {
    let redirect = match reason {
        DenyReason::Unauthenticated => options.unauthenticated_url.as_deref(),
        DenyReason::Unauthorized => options.unauthorized_url.as_deref(),
    };

    match (reason, redirect.filter(|url| !url.is_empty())) {
        (_, Some(url)) => Signal::RedirectToUrl(url.to_string()),
        (DenyReason::Unauthenticated, None) => Signal::RedirectToSignIn,
        (DenyReason::Unauthorized, None) => Signal::ForceNotFound,
    }
}

/// Require an authenticated user
pub fn protect<'a>(
    user: Option<&'a UserRecord>,
    options: &ProtectOptions,
) -> Result<&'a UserRecord, Signal> {
    AccessDecision::evaluate(user, None::<fn(Has<'a>) -> bool>).into_result(options)
}

/// Require an authenticated user for whom `predicate` holds
pub fn protect_with<'a, F>(
    user: Option<&'a UserRecord>,
    predicate: F,
    options: &ProtectOptions,
) -> Result<&'a UserRecord, Signal>
where
    F: FnOnce(Has<'a>) -> bool,
{
    AccessDecision::evaluate(user, Some(predicate)).into_result(options)
}
