//! Session observer used by the binary.

use ecopoint_core::SessionObserver;
use std::sync::atomic::{AtomicU64, Ordering};

/// Logs authentication failures and counts them.
///
/// Deciding on logout belongs to the host application; this observer only
/// makes the rejection visible.
#[derive(Debug, Default)]
pub struct LoggingSessionObserver {
    rejections: AtomicU64,
}

impl LoggingSessionObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejections(&self) -> u64 {
        self.rejections.load(Ordering::Relaxed)
    }
}

impl SessionObserver for LoggingSessionObserver {
    fn on_unauthorized(&self, endpoint: &str) {
        let count = self.rejections.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::warn!(endpoint, rejections = count, "Session rejected by backend");
    }
}
