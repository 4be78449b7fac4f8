//! Authentication middleware configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};
use supaguard_common::Config;

/// Routes the middleware knows about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPaths {
    /// Landing page after a completed sign-in
    pub home: String,
    pub sign_in: String,
    /// Confirm path for the email/OTP flow
    pub auth_confirm: String,
    /// Callback path for the social login flow
    pub social_login_callback: String,
    /// Error page; failures fall back to `sign_in` when unset
    pub error: Option<String>,
}

impl Default for AuthPaths {
    fn default() -> Self {
        Self {
            home: "/".to_string(),
            sign_in: "/sign-in".to_string(),
            auth_confirm: "/auth/confirm".to_string(),
            social_login_callback: "/auth/callback".to_string(),
            error: None,
        }
    }
}

/// Partial path settings; `Some` replaces the default, `None` keeps it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathOverrides {
    pub home: Option<String>,
    pub sign_in: Option<String>,
    pub auth_confirm: Option<String>,
    pub social_login_callback: Option<String>,
    pub error: Option<String>,
}

impl AuthPaths {
    /// Merge overrides field by field
    pub fn with_overrides(self, overrides: PathOverrides) -> Self {
        Self {
            home: overrides.home.unwrap_or(self.home),
            sign_in: overrides.sign_in.unwrap_or(self.sign_in),
            auth_confirm: overrides.auth_confirm.unwrap_or(self.auth_confirm),
            social_login_callback: overrides
                .social_login_callback
                .unwrap_or(self.social_login_callback),
            error: overrides.error.or(self.error),
        }
    }

    /// Where failed sign-in flows land
    pub fn error_or_sign_in(&self) -> &str {
        self.error.as_deref().unwrap_or(&self.sign_in)
    }
}

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub supabase_url: String,
    pub supabase_key: String,
    /// Public origin used for post-login redirects
    pub site_url: Option<String>,
    pub paths: AuthPaths,
    pub provider_timeout: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &"<redacted>")
            .field("site_url", &self.site_url)
            .field("paths", &self.paths)
            .field("provider_timeout", &self.provider_timeout)
            .finish()
    }
}

impl AuthConfig {
    pub fn new(supabase_url: impl Into<String>, supabase_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into(),
            supabase_key: supabase_key.into(),
            site_url: None,
            paths: AuthPaths::default(),
            provider_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_paths(mut self, overrides: PathOverrides) -> Self {
        self.paths = self.paths.with_overrides(overrides);
        self
    }

    pub fn with_site_url(mut self, site_url: impl Into<String>) -> Self {
        self.site_url = Some(site_url.into());
        self
    }
}

impl From<&Config> for AuthConfig {
    fn from(config: &Config) -> Self {
        let overrides = PathOverrides {
            home: config.path_home.clone(),
            sign_in: config.path_sign_in.clone(),
            auth_confirm: config.path_auth_confirm.clone(),
            social_login_callback: config.path_social_login_callback.clone(),
            error: config.path_error.clone(),
        };

        Self {
            supabase_url: config.supabase_url.clone(),
            supabase_key: config.supabase_anon_key.clone(),
            site_url: config.site_url.clone(),
            paths: AuthPaths::default().with_overrides(overrides),
            provider_timeout: Duration::from_secs(config.provider_timeout_secs),
        }
    }
}
