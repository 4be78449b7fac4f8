//! Axum extractors for the session resolved by the middleware
//!
//! The middleware stores an [`AuthContext`] in the request extensions before
//! any handler runs. Handlers read it back through these extractors instead
//! of talking to the provider again.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::context::AuthContext;
use crate::error::AuthError;
use crate::user::UserRecord;

fn context_from(parts: &Parts) -> Result<AuthContext, AuthError> {
    parts.extensions.get::<AuthContext>().cloned().ok_or_else(|| {
        AuthError::Configuration("Supabase middleware is not installed on this route".to_string())
    })
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        context_from(parts)
    }
}

/// The signed-in user, if any
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<UserRecord>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let context = context_from(parts)?;
        Ok(CurrentUser(context.user().cloned()))
    }
}

/// Signed-in user extractor.
///
/// Rejects anonymous requests with 401 rather than redirecting; use
/// [`AuthContext::protect`] in the middleware callback for page routes.
#[derive(Debug, Clone)]
pub struct RequiredUser(pub UserRecord);

impl<S> FromRequestParts<S> for RequiredUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let context = context_from(parts)?;
        context
            .user()
            .cloned()
            .map(RequiredUser)
            .ok_or(AuthError::Unauthenticated)
    }
}
