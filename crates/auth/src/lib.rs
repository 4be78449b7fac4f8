//! Route matching, access control and Supabase session middleware for axum
//!
//! - [`RouteMatcher`] compiles path patterns once and classifies requests
//! - [`AuthContext`] exposes `has`/`protect`/`redirect` to request callbacks,
//!   which stop early by returning a [`Signal`]
//! - [`supabase_middleware`] fetches the session user, runs the callback and
//!   turns signals into redirects or not-found rewrites

mod config;
mod context;
mod cookies;
mod error;
mod extractors;
mod gotrue;
mod has;
mod matcher;
mod middleware;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;
mod protect;
mod provider;
pub mod resolver;
mod signal;
mod user;

pub use config::{AuthConfig, AuthPaths, PathOverrides};
pub use context::AuthContext;
pub use cookies::{removal_cookie, session_cookie, SessionCookies};
pub use error::AuthError;
pub use extractors::{CurrentUser, RequiredUser};
pub use gotrue::{GoTrueClient, Session};
pub use has::{partially_match, Has};
pub use matcher::{PathPattern, PatternError, RouteMatcher};
pub use middleware::{supabase_middleware, Callback, SupabaseMiddleware};
pub use protect::{protect, protect_with, AccessDecision, DenyReason, ProtectOptions};
pub use provider::{AuthProvider, OtpType};
pub use resolver::{Resolution, AUTH_REASON_HEADER, PROTECT_REWRITE};
pub use signal::{Interrupt, Signal};
pub use user::UserRecord;
