//! Shared wiring for the sync integration tests.

#![allow(dead_code)]

use ecopoint_cache::TtlCache;
use ecopoint_core::{ManualClock, SessionObserver, Transport};
use ecopoint_sync::{SyncConfig, SyncService};
use ecopoint_test_utils::fixtures;
use ecopoint_test_utils::{RecordingSession, ScriptedTransport};
use std::sync::Arc;

pub const TEST_CONFIG: &str = r#"
api_base_url = "https://api.ecopoint.test/api"
activity_limit = 5

[auth]
api_key = "test-key"

[resources.stats]
timeout_ms = 5000
ttl_ms = 120000

[resources.leaderboard]
timeout_ms = 5000
ttl_ms = 60000

[resources.badges]
timeout_ms = 5000
ttl_ms = 600000

[resources.activity]
timeout_ms = 10000
ttl_ms = 120000

[season]
utc_offset_minutes = 420
refresh_interval_secs = 3600

[log]
filter = "debug"
json = false
"#;

pub fn test_config() -> SyncConfig {
    SyncConfig::from_toml(TEST_CONFIG).expect("test config is valid")
}

pub struct Harness {
    pub service: SyncService,
    pub transport: Arc<ScriptedTransport>,
    pub session: Arc<RecordingSession>,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new(transport: ScriptedTransport) -> Self {
        let transport = Arc::new(transport);
        let session = Arc::new(RecordingSession::default());
        let clock = fixtures::manual_clock();
        let cache = Arc::new(TtlCache::new(Arc::new(clock.clone())));
        let service = SyncService::new(
            test_config(),
            transport.clone() as Arc<dyn Transport>,
            cache,
            session.clone() as Arc<dyn SessionObserver>,
            Arc::new(clock.clone()),
        );
        Self {
            service,
            transport,
            session,
            clock,
        }
    }

    pub fn cache(&self) -> &Arc<TtlCache> {
        self.service.cache()
    }
}
