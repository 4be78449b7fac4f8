//! Identity provider seam
//!
//! The middleware never talks HTTP to the provider directly. It hands the
//! request's [`SessionCookies`] to an [`AuthProvider`], which reads the
//! session from them and writes back anything it refreshes.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cookies::SessionCookies;
use crate::error::AuthError;
use crate::user::UserRecord;

/// Email OTP flavours accepted by the confirm route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    Signup,
    Invite,
    Magiclink,
    Recovery,
    EmailChange,
    Email,
}

impl OtpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpType::Signup => "signup",
            OtpType::Invite => "invite",
            OtpType::Magiclink => "magiclink",
            OtpType::Recovery => "recovery",
            OtpType::EmailChange => "email_change",
            OtpType::Email => "email",
        }
    }
}

impl FromStr for OtpType {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signup" => Ok(OtpType::Signup),
            "invite" => Ok(OtpType::Invite),
            "magiclink" => Ok(OtpType::Magiclink),
            "recovery" => Ok(OtpType::Recovery),
            "email_change" => Ok(OtpType::EmailChange),
            "email" => Ok(OtpType::Email),
            other => Err(AuthError::InvalidOtpType(other.to_string())),
        }
    }
}

impl std::fmt::Display for OtpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session operations the middleware needs from the identity provider
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve the user behind the request's session cookies.
    ///
    /// `Ok(None)` means there is no usable session. Refreshed session
    /// cookies are written through `cookies`.
    async fn get_user(&self, cookies: &mut SessionCookies)
        -> Result<Option<UserRecord>, AuthError>;

    /// Complete an OAuth (PKCE) sign-in and store the new session
    async fn exchange_code_for_session(
        &self,
        code: &str,
        cookies: &mut SessionCookies,
    ) -> Result<(), AuthError>;

    /// Confirm an email OTP link and store the new session
    async fn verify_otp(
        &self,
        otp_type: OtpType,
        token_hash: &str,
        cookies: &mut SessionCookies,
    ) -> Result<(), AuthError>;
}
