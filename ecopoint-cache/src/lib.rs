//! Session-lifetime cache with explicit expiry and user isolation.
//!
//! # Expiry
//!
//! Every entry carries its own `expires_at`. Expiry is checked lazily: a read
//! after `expires_at` removes the entry and reports a miss. Nothing sweeps the
//! map in the background, which is fine for the small, session-bounded key set
//! this cache holds.
//!
//! # User Isolation
//!
//! [`TtlCache::clear_user_scoped`] remembers the last active user and drops
//! the whole cache when a different user shows up, so a response cached for
//! one account is never served to another. Entry points that fetch
//! user-specific data call it before touching the cache.
//!
//! # Example
//!
//! ```ignore
//! let cache = TtlCache::new(Arc::new(SystemClock));
//! cache.clear_user_scoped(&UserId::from(7i64));
//! cache.set("stats-7", json!({"poin": 100}), Duration::from_secs(120));
//! assert_eq!(cache.get("stats-7"), Some(json!({"poin": 100})));
//! ```

pub mod read;
pub mod scope;
pub mod stats;
pub mod ttl;

pub use read::CacheRead;
pub use scope::UserScope;
pub use stats::CacheStats;
pub use ttl::TtlCache;
