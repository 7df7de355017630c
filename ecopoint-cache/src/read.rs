//! Cache hits with age metadata.

use ecopoint_core::Timestamp;
use std::time::Duration;

/// A value read from the cache together with when it was stored and when it
/// expires.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRead<T> {
    value: T,
    cached_at: Timestamp,
    expires_at: Timestamp,
}

impl<T> CacheRead<T> {
    pub fn new(value: T, cached_at: Timestamp, expires_at: Timestamp) -> Self {
        Self {
            value,
            cached_at,
            expires_at,
        }
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn cached_at(&self) -> Timestamp {
        self.cached_at
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Age of the value as of `now`. Zero if `now` is before `cached_at`.
    pub fn staleness(&self, now: Timestamp) -> Duration {
        (now - self.cached_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Time left before expiry as of `now`. Zero once expired.
    pub fn remaining_ttl(&self, now: Timestamp) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            expires_at: self.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_735_689_600 + secs, 0).unwrap()
    }

    #[test]
    fn test_staleness_and_remaining_ttl() {
        let read = CacheRead::new("v", at(0), at(120));
        assert_eq!(read.staleness(at(30)), Duration::from_secs(30));
        assert_eq!(read.remaining_ttl(at(30)), Duration::from_secs(90));
        assert_eq!(read.remaining_ttl(at(500)), Duration::ZERO);
        assert_eq!(read.staleness(at(-5)), Duration::ZERO);
    }

    #[test]
    fn test_map_keeps_metadata() {
        let read = CacheRead::new(42i32, at(0), at(10));
        let mapped = read.map(|v| v.to_string());
        assert_eq!(mapped.cached_at(), at(0));
        assert_eq!(mapped.expires_at(), at(10));
        assert_eq!(mapped.into_value(), "42");
    }
}
