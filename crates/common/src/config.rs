//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Supabase configuration
    pub supabase_url: String,
    pub supabase_anon_key: String,

    /// Public origin of the site, used for post-login redirects
    pub site_url: Option<String>,

    /// Auth route overrides (unset fields keep the middleware defaults)
    pub path_home: Option<String>,
    pub path_sign_in: Option<String>,
    pub path_auth_confirm: Option<String>,
    pub path_social_login_callback: Option<String>,
    pub path_error: Option<String>,

    /// Per-request timeout for calls to the auth provider
    pub provider_timeout_secs: u64,

    /// Runtime configuration
    pub rust_log: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            supabase_url: get("SUPABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("SUPABASE_URL is required"))?,
            supabase_anon_key: get("SUPABASE_ANON_KEY")
                .ok_or_else(|| anyhow::anyhow!("SUPABASE_ANON_KEY is required"))?,

            site_url: get("SITE_URL"),

            path_home: get("AUTH_PATH_HOME"),
            path_sign_in: get("AUTH_PATH_SIGN_IN"),
            path_auth_confirm: get("AUTH_PATH_CONFIRM"),
            path_social_login_callback: get("AUTH_PATH_CALLBACK"),
            path_error: get("AUTH_PATH_ERROR"),

            provider_timeout_secs: match get("AUTH_PROVIDER_TIMEOUT_SECS") {
                Some(raw) => raw.parse().map_err(|_| {
                    anyhow::anyhow!("AUTH_PROVIDER_TIMEOUT_SECS must be a whole number of seconds")
                })?,
                None => 10,
            },

            rust_log: get("RUST_LOG").unwrap_or_else(|| "supaguard=debug".to_string()),
            port: get("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .unwrap_or(3000),
        };

        Ok(config)
    }
}
