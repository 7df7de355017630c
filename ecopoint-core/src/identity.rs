//! Identity types for EcoPoint users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// How an anonymous session renders in logs.
const ANONYMOUS_LABEL: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Identity {
    Anonymous,
    Known(String),
}

/// Canonical user identifier.
///
/// The backend returns user ids as JSON numbers in some payloads and as strings
/// in others. Every id is reduced to one canonical string on construction, so
/// `7`, `"7"`, `" 7 "` and `"007"` all compare equal.
///
/// The unauthenticated session is its own variant. No backend id, not even the
/// string `"anonymous"`, compares equal to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(Identity);

impl UserId {
    /// Create a user id from any textual representation.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(Identity::Known(canonicalize(raw.as_ref())))
    }

    /// The id used for an unauthenticated session.
    pub fn anonymous() -> Self {
        Self(Identity::Anonymous)
    }

    /// Map an optional session identity to a user id.
    pub fn from_session(session: Option<UserId>) -> Self {
        session.unwrap_or_else(Self::anonymous)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self.0, Identity::Anonymous)
    }

    pub fn as_str(&self) -> &str {
        match &self.0 {
            Identity::Anonymous => ANONYMOUS_LABEL,
            Identity::Known(id) => id,
        }
    }

    fn known(id: impl Into<String>) -> Self {
        Self(Identity::Known(id.into()))
    }

    /// Extract a user id from an arbitrary JSON value.
    ///
    /// Returns `None` for null, booleans, containers, non-integral numbers and
    /// blank strings.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::known(i.to_string()))
                } else if let Some(u) = n.as_u64() {
                    Some(Self::known(u.to_string()))
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.is_finite())
                        .map(|f| Self::known((f as i64).to_string()))
                }
            }
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self::new(s)),
            _ => None,
        }
    }
}

fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<i64>() {
        Ok(n) => n.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self::known(id.to_string())
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self::known(id.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Known ids serialize as their canonical string, the anonymous session as null.
impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            Identity::Anonymous => serializer.serialize_none(),
            Identity::Known(id) => serializer.serialize_str(id),
        }
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid user id: {}", value)))
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A number and its decimal string always produce the same id.
        #[test]
        fn prop_number_and_string_coerce_equal(n in any::<i64>()) {
            let from_number = UserId::from_json(&serde_json::json!(n));
            let from_string = UserId::from_json(&serde_json::json!(n.to_string()));
            prop_assert_eq!(from_number, from_string);
        }

        /// Canonicalization is idempotent.
        #[test]
        fn prop_canonicalization_idempotent(raw in "[ 0-9a-z-]{1,12}") {
            let once = UserId::new(&raw);
            let twice = UserId::new(once.as_str());
            prop_assert_eq!(once, twice);
        }
    }
}
