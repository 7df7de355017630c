//! Tracking of the user a cache's contents belong to.

use ecopoint_core::UserId;
use std::sync::Mutex;

/// Remembers the last active user of a cache.
///
/// Lives exactly as long as the cache that owns it and is only mutated through
/// [`UserScope::switch_to`].
#[derive(Debug, Default)]
pub struct UserScope {
    last_user_id: Mutex<Option<UserId>>,
}

impl UserScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `user_id` as the active user.
    ///
    /// If a different user was recorded before, `purge` runs while the scope
    /// is still locked, so no concurrent caller can observe the new identity
    /// before the old contents are gone. Returns whether `purge` ran.
    pub fn switch_to<F: FnOnce()>(&self, user_id: &UserId, purge: F) -> bool {
        let mut last = self.last_user_id.lock().unwrap_or_else(|e| e.into_inner());
        let drifted = matches!(last.as_ref(), Some(previous) if previous != user_id);
        if drifted {
            purge();
        }
        *last = Some(user_id.clone());
        drifted
    }

    pub fn last_user_id(&self) -> Option<UserId> {
        self.last_user_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
