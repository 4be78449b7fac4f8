//! Capability queries against a user record
//!
//! A query is a partial JSON shape. It matches when every field it names
//! exists in the record with a matching value; the record may carry any
//! number of extra fields. Arrays match existentially: each element of the
//! query array must match at least one element of the record array, in any
//! position.

use serde_json::Value;

use crate::user::UserRecord;

/// Capability predicate closed over the current request's user
#[derive(Debug, Clone, Copy)]
pub struct Has<'a> {
    user: Option<&'a UserRecord>,
}

impl<'a> Has<'a> {
    pub fn new(user: Option<&'a UserRecord>) -> Self {
        Self { user }
    }

    /// Check whether the user satisfies `query`.
    ///
    /// Without a user, only a `null` query matches.
    pub fn matches(&self, query: &Value) -> bool {
        let record = self.user.map(UserRecord::as_value).unwrap_or(&Value::Null);
        partially_match(query, record)
    }
}

/// Recursive containment test of `partial` within `full`
pub fn partially_match(partial: &Value, full: &Value) -> bool {
    match (partial, full) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (_, Value::Null) => false,
        (Value::Array(items), full) => match full {
            Value::Array(elements) => items
                .iter()
                .all(|item| elements.iter().any(|elem| partially_match(item, elem))),
            _ => false,
        },
        (Value::Object(fields), full) => {
            // An empty shape constrains nothing
            if fields.is_empty() {
                return true;
            }
            match full {
                Value::Object(record) => fields.iter().all(|(key, value)| {
                    record
                        .get(key)
                        .is_some_and(|field| partially_match(value, field))
                }),
                _ => false,
            }
        }
        _ => false,
    }
}

/// `1` and `1.0` are the same number in JSON
fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if a == b {
        return true;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
