//! Supabase Auth (GoTrue) client
//!
//! Talks to `{supabase_url}/auth/v1` and keeps the session in the same
//! cookies the Supabase browser client uses, so a session created on either
//! side is readable on the other:
//!
//! - the session lives under `sb-<project-ref>-auth-token`, split into
//!   `.0`, `.1`, ... chunks once it outgrows a single cookie
//! - values are either raw JSON or `base64-` followed by base64url JSON
//! - the PKCE verifier lives under `sb-<project-ref>-auth-token-code-verifier`

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::config::AuthConfig;
use crate::cookies::{removal_cookie, session_cookie, SessionCookies};
use crate::error::AuthError;
use crate::provider::{AuthProvider, OtpType};
use crate::user::UserRecord;

const BASE64_PREFIX: &str = "base64-";

/// Longest cookie value written before the session is chunked
const MAX_CHUNK_SIZE: usize = 3180;

/// Sessions this close to expiry are refreshed before use
const EXPIRY_MARGIN_SECS: i64 = 10;

/// Session as stored in the auth cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<Value>,
}

impl Session {
    /// Fill `expires_at` from `expires_in` when the server omits it
    fn stamped(mut self, now: i64) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| now + secs);
        }
        self
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at
            .map(|at| at - EXPIRY_MARGIN_SECS <= now)
            .unwrap_or(false)
    }
}

/// GoTrue-backed [`AuthProvider`]
#[derive(Clone)]
pub struct GoTrueClient {
    http: Client,
    auth_url: String,
    api_key: String,
    storage_key: String,
}

impl std::fmt::Debug for GoTrueClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoTrueClient")
            .field("auth_url", &self.auth_url)
            .field("storage_key", &self.storage_key)
            .finish()
    }
}

impl GoTrueClient {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(config.provider_timeout)
            .build()
            .map_err(|e| AuthError::Configuration(format!("HTTP client: {}", e)))?;

        Self::with_client(config, http)
    }

    /// Build on an existing HTTP client
    pub fn with_client(config: &AuthConfig, http: Client) -> Result<Self, AuthError> {
        let storage_key = storage_key(&config.supabase_url)?;
        let auth_url = format!("{}/auth/v1", config.supabase_url.trim_end_matches('/'));

        tracing::debug!(auth_url = %auth_url, storage_key = %storage_key, "GoTrue client configured");

        Ok(Self {
            http,
            auth_url,
            api_key: config.supabase_key.clone(),
            storage_key,
        })
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn code_verifier_key(&self) -> String {
        format!("{}-code-verifier", self.storage_key)
    }

    /// Read the stored session, if any
    pub fn load_session(&self, cookies: &SessionCookies) -> Result<Option<Session>, AuthError> {
        let Some(raw) = read_chunked(cookies, &self.storage_key) else {
            return Ok(None);
        };

        let json = decode_cookie_value(&raw)?;
        let session = serde_json::from_str(&json)
            .map_err(|e| AuthError::CorruptSession(format!("session JSON: {}", e)))?;

        Ok(Some(session))
    }

    /// Write `session` to the cookies, clearing stale chunks
    pub fn store_session(
        &self,
        session: &Session,
        cookies: &mut SessionCookies,
    ) -> Result<(), AuthError> {
        let json = serde_json::to_string(session)
            .map_err(|e| AuthError::Response(format!("session encode: {}", e)))?;
        let encoded = format!("{}{}", BASE64_PREFIX, URL_SAFE_NO_PAD.encode(json));

        let chunks = chunk(&encoded);
        let mut writes = Vec::new();

        if chunks.len() == 1 {
            writes.push(session_cookie(self.storage_key.clone(), encoded.clone()));
        } else {
            for (i, part) in chunks.iter().enumerate() {
                writes.push(session_cookie(
                    format!("{}.{}", self.storage_key, i),
                    part.to_string(),
                ));
            }
        }

        writes.extend(self.stale_names(cookies, chunks.len()).map(removal_cookie));
        cookies.set_all(writes);
        Ok(())
    }

    /// Remove every stored session cookie
    pub fn clear_session(&self, cookies: &mut SessionCookies) {
        let names: Vec<String> = self.stale_names(cookies, 0).collect();
        cookies.set_all(names.into_iter().map(removal_cookie));
    }

    /// Session cookie names present on the request that a write of
    /// `chunk_count` chunks does not overwrite
    fn stale_names<'a>(
        &'a self,
        cookies: &'a SessionCookies,
        chunk_count: usize,
    ) -> impl Iterator<Item = String> + 'a {
        cookies.get_all().iter().filter_map(move |(name, _)| {
            if chunk_count != 1 && *name == self.storage_key {
                return Some(name.clone());
            }
            let index = name
                .strip_prefix(self.storage_key.as_str())?
                .strip_prefix('.')?
                .parse::<usize>()
                .ok()?;
            (chunk_count <= 1 || index >= chunk_count).then(|| name.clone())
        })
    }

    async fn fetch_user(&self, access_token: &str) -> Result<Option<UserRecord>, AuthError> {
        let response = self
            .http
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Request(format!("HTTP request failed: {}", e)))?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            tracing::debug!(status = %response.status(), "Access token rejected");
            return Ok(None);
        }

        let user: Value = parse(response).await?;
        Ok(Some(UserRecord::new(user)))
    }

    async fn post_for_session(&self, path: &str, body: Value) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(format!("{}{}", self.auth_url, path))
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Request(format!("HTTP request failed: {}", e)))?;

        let session: Session = parse(response).await?;
        Ok(session.stamped(chrono::Utc::now().timestamp()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.post_for_session(
            "/token?grant_type=refresh_token",
            json!({ "refresh_token": refresh_token }),
        )
        .await
    }
}

#[async_trait::async_trait]
impl AuthProvider for GoTrueClient {
    async fn get_user(
        &self,
        cookies: &mut SessionCookies,
    ) -> Result<Option<UserRecord>, AuthError> {
        let session = match self.load_session(cookies) {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable session cookie");
                return Ok(None);
            }
        };

        let session = if session.is_expired(chrono::Utc::now().timestamp()) {
            match self.refresh(&session.refresh_token).await {
                Ok(refreshed) => {
                    tracing::debug!("Refreshed expired session");
                    self.store_session(&refreshed, cookies)?;
                    refreshed
                }
                Err(AuthError::Provider { status, message }) if status < 500 => {
                    tracing::info!(status, message = %message, "Refresh token rejected, clearing session");
                    self.clear_session(cookies);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        } else {
            session
        };

        self.fetch_user(&session.access_token).await
    }

    async fn exchange_code_for_session(
        &self,
        code: &str,
        cookies: &mut SessionCookies,
    ) -> Result<(), AuthError> {
        let verifier_key = self.code_verifier_key();
        let raw = cookies
            .get(&verifier_key)
            .ok_or(AuthError::MissingCodeVerifier)?;
        let verifier = parse_code_verifier(&decode_cookie_value(raw)?)
            .ok_or(AuthError::MissingCodeVerifier)?;

        let session = self
            .post_for_session(
                "/token?grant_type=pkce",
                json!({ "auth_code": code, "code_verifier": verifier }),
            )
            .await?;

        self.store_session(&session, cookies)?;
        cookies.set_all([removal_cookie(verifier_key)]);

        tracing::info!("Exchanged auth code for session");
        Ok(())
    }

    async fn verify_otp(
        &self,
        otp_type: OtpType,
        token_hash: &str,
        cookies: &mut SessionCookies,
    ) -> Result<(), AuthError> {
        let session = self
            .post_for_session(
                "/verify",
                json!({ "type": otp_type, "token_hash": token_hash }),
            )
            .await?;

        self.store_session(&session, cookies)?;

        tracing::info!(otp_type = %otp_type, "Verified OTP");
        Ok(())
    }
}

/// `sb-<first host label>-auth-token`
pub fn storage_key(supabase_url: &str) -> Result<String, AuthError> {
    let url = Url::parse(supabase_url)
        .map_err(|e| AuthError::Configuration(format!("SUPABASE_URL `{}`: {}", supabase_url, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| AuthError::Configuration(format!("SUPABASE_URL `{}` has no host", supabase_url)))?;
    let project_ref = host.split('.').next().unwrap_or(host);

    Ok(format!("sb-{}-auth-token", project_ref))
}

/// Whole cookie if present, else the concatenated `.0`, `.1`, ... chunks
fn read_chunked(cookies: &SessionCookies, key: &str) -> Option<String> {
    if let Some(value) = cookies.get(key) {
        return Some(value.to_string());
    }

    let mut joined = String::new();
    for i in 0.. {
        match cookies.get(&format!("{}.{}", key, i)) {
            Some(part) => joined.push_str(part),
            None => break,
        }
    }

    (!joined.is_empty()).then_some(joined)
}

fn chunk(value: &str) -> Vec<&str> {
    // Encoded values are ASCII so byte slicing lands on char boundaries
    value
        .as_bytes()
        .chunks(MAX_CHUNK_SIZE)
        .filter_map(|c| std::str::from_utf8(c).ok())
        .collect()
}

fn decode_cookie_value(raw: &str) -> Result<String, AuthError> {
    let Some(encoded) = raw.strip_prefix(BASE64_PREFIX) else {
        return Ok(raw.to_string());
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|e| AuthError::CorruptSession(format!("base64: {}", e)))?;

    String::from_utf8(bytes).map_err(|e| AuthError::CorruptSession(format!("utf-8: {}", e)))
}

/// Verifier values are a JSON string of `<verifier>` or `<verifier>/<redirect type>`
fn parse_code_verifier(value: &str) -> Option<String> {
    let unquoted = serde_json::from_str::<String>(value).unwrap_or_else(|_| value.to_string());
    let verifier = unquoted.split('/').next().unwrap_or_default();
    (!verifier.is_empty()).then(|| verifier.to_string())
}

async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response body".to_string());
        return Err(AuthError::Provider {
            status: status.as_u16(),
            message: provider_message(&body),
        });
    }

    response
        .json()
        .await
        .map_err(|e| AuthError::Response(format!("Failed to parse response: {}", e)))
}

/// Pull the human readable part out of a GoTrue error body
fn provider_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}
