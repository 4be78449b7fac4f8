//! User record handed out by the identity provider

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Authenticated user as returned by the provider.
///
/// The record is kept as an untyped JSON tree so that capability queries
/// can address any field, including app-specific metadata. Typed accessors
/// cover the fields every provider user carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRecord(Value);

impl UserRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Provider user ID (`id`)
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    /// `app_metadata`, writable only with the service role
    pub fn app_metadata(&self) -> Option<&Value> {
        self.0.get("app_metadata")
    }

    /// `user_metadata`, writable by the user
    pub fn user_metadata(&self) -> Option<&Value> {
        self.0.get("user_metadata")
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for UserRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
