//! Mock Auth Provider
//!
//! Programmable stand-in for the identity provider:
//! - `MockAuthProvider`: configurable provider with call recording
//! - `MockAuthBehavior`: the signed-in user, failures, cookies to write

use std::sync::{Arc, Mutex, RwLock};

use axum_extra::extract::cookie::Cookie;
use serde_json::Value;

use crate::cookies::{session_cookie, SessionCookies};
use crate::error::AuthError;
use crate::provider::{AuthProvider, OtpType};
use crate::user::UserRecord;

/// Programmable behavior for the mock provider
#[derive(Debug, Clone, Default)]
pub struct MockAuthBehavior {
    pub user: Arc<RwLock<Option<Value>>>,
    /// `get_user` fails with this message when set
    pub get_user_error: Arc<RwLock<Option<String>>>,
    /// Code exchange and OTP verification fail when set
    pub flow_error: Arc<RwLock<Option<String>>>,
    /// Cookies written by every provider call
    pub cookies_to_set: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockAuthBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_user(&self, user: Value) {
        *self.user.write().unwrap() = Some(user);
    }

    pub fn clear_user(&self) {
        *self.user.write().unwrap() = None;
    }

    pub fn fail_get_user(&self, message: impl Into<String>) {
        *self.get_user_error.write().unwrap() = Some(message.into());
    }

    pub fn fail_flows(&self, message: impl Into<String>) {
        *self.flow_error.write().unwrap() = Some(message.into());
    }

    /// Write `name=value` through the session cookies on each call
    pub fn set_cookie(&self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies_to_set
            .write()
            .unwrap()
            .push((name.into(), value.into()));
    }

    pub fn reset(&self) {
        *self.user.write().unwrap() = None;
        *self.get_user_error.write().unwrap() = None;
        *self.flow_error.write().unwrap() = None;
        self.cookies_to_set.write().unwrap().clear();
    }

    fn write_cookies(&self, cookies: &mut SessionCookies) {
        let writes: Vec<Cookie<'static>> = self
            .cookies_to_set
            .read()
            .unwrap()
            .iter()
            .map(|(name, value)| session_cookie(name.clone(), value.clone()))
            .collect();
        if !writes.is_empty() {
            cookies.set_all(writes);
        }
    }

    fn flow_result(&self) -> Result<(), AuthError> {
        match self.flow_error.read().unwrap().clone() {
            Some(message) => Err(AuthError::Provider {
                status: 400,
                message,
            }),
            None => Ok(()),
        }
    }
}

/// A recorded provider call for test assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    GetUser {
        cookies: Vec<(String, String)>,
    },
    ExchangeCode {
        code: String,
    },
    VerifyOtp {
        otp_type: OtpType,
        token_hash: String,
    },
}

/// Mock auth provider with programmable behavior
#[derive(Debug, Clone, Default)]
pub struct MockAuthProvider {
    behavior: Arc<MockAuthBehavior>,
    history: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that reports `user` as signed in
    pub fn signed_in(user: Value) -> Self {
        let provider = Self::new();
        provider.behavior.set_user(user);
        provider
    }

    pub fn behavior(&self) -> &Arc<MockAuthBehavior> {
        &self.behavior
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.history.lock().unwrap().clone()
    }

    pub fn reset_history(&self) {
        self.history.lock().unwrap().clear();
    }

    fn record(&self, call: RecordedCall) {
        self.history.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl AuthProvider for MockAuthProvider {
    async fn get_user(
        &self,
        cookies: &mut SessionCookies,
    ) -> Result<Option<UserRecord>, AuthError> {
        self.record(RecordedCall::GetUser {
            cookies: cookies.get_all().to_vec(),
        });

        if let Some(message) = self.behavior.get_user_error.read().unwrap().clone() {
            return Err(AuthError::Request(message));
        }

        self.behavior.write_cookies(cookies);
        Ok(self
            .behavior
            .user
            .read()
            .unwrap()
            .clone()
            .map(UserRecord::new))
    }

    async fn exchange_code_for_session(
        &self,
        code: &str,
        cookies: &mut SessionCookies,
    ) -> Result<(), AuthError> {
        tracing::info!(code, "Mock auth: exchanging code");
        self.record(RecordedCall::ExchangeCode {
            code: code.to_string(),
        });

        self.behavior.flow_result()?;
        self.behavior.write_cookies(cookies);
        Ok(())
    }

    async fn verify_otp(
        &self,
        otp_type: OtpType,
        token_hash: &str,
        cookies: &mut SessionCookies,
    ) -> Result<(), AuthError> {
        tracing::info!(otp_type = %otp_type, "Mock auth: verifying OTP");
        self.record(RecordedCall::VerifyOtp {
            otp_type,
            token_hash: token_hash.to_string(),
        });

        self.behavior.flow_result()?;
        self.behavior.write_cookies(cookies);
        Ok(())
    }
}
