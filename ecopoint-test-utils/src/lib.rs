//! EcoPoint Test Utilities
//!
//! Shared test infrastructure for the EcoPoint workspace:
//! - A scripted in-memory transport and a recording session observer
//! - Proptest generators for ids, timestamps and raw backend records
//! - Raw JSON fixtures shaped like real backend responses

pub use ecopoint_core::{
    ActivityKind, Clock, FetchError, ManualClock, SessionObserver, Timestamp, Transport,
    TransportResponse, UserId,
};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// SCRIPTED TRANSPORT
// ============================================================================

/// Canned behaviour for one call to an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    /// Answer with `status` and `body` after `delay`.
    Respond {
        status: u16,
        body: String,
        delay: Duration,
    },
    /// Fail at the transport level after `delay`.
    Fail { reason: String, delay: Duration },
    /// Never answer. Only a timeout ends the call.
    Hang,
}

impl Script {
    pub fn json(status: u16, body: Value) -> Self {
        Self::Respond {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn body(status: u16, body: impl Into<String>) -> Self {
        Self::Respond {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self::body(status, "")
    }

    pub fn connection_error(reason: impl Into<String>) -> Self {
        Self::Fail {
            reason: reason.into(),
            delay: Duration::ZERO,
        }
    }

    /// Delay the answer. No effect on [`Script::Hang`].
    pub fn after(self, by: Duration) -> Self {
        match self {
            Self::Respond { status, body, .. } => Self::Respond {
                status,
                body,
                delay: by,
            },
            Self::Fail { reason, .. } => Self::Fail { reason, delay: by },
            Self::Hang => Self::Hang,
        }
    }
}

/// In-memory transport answering from per-endpoint scripts.
///
/// Each endpoint holds a queue of scripts. Calls consume the queue front to
/// back; the last script is replayed for every call after that. Endpoints
/// without a script answer `404`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Script>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `endpoint` with `200` and `body`.
    pub fn with_json(self, endpoint: impl Into<String>, body: Value) -> Self {
        self.with_script(endpoint, Script::json(200, body))
    }

    pub fn with_script(self, endpoint: impl Into<String>, script: Script) -> Self {
        self.with_scripts(endpoint, vec![script])
    }

    pub fn with_scripts(self, endpoint: impl Into<String>, scripts: Vec<Script>) -> Self {
        self.set_scripts(endpoint, scripts);
        self
    }

    /// Replace the scripts of `endpoint` on a shared transport.
    pub fn set_scripts(&self, endpoint: impl Into<String>, scripts: Vec<Script>) {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes.insert(endpoint.into(), scripts.into());
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == endpoint).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls().len()
    }

    /// Endpoints in the order they were called.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn next_script(&self, endpoint: &str) -> Option<Script> {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let queue = routes.get_mut(endpoint)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, endpoint: &str) -> Result<TransportResponse, FetchError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(endpoint.to_string());

        match self.next_script(endpoint) {
            None => Ok(TransportResponse::new(404, "")),
            Some(Script::Respond {
                status,
                body,
                delay,
            }) => {
                tokio::time::sleep(delay).await;
                Ok(TransportResponse::new(status, body))
            }
            Some(Script::Fail { reason, delay }) => {
                tokio::time::sleep(delay).await;
                Err(FetchError::Connection {
                    endpoint: endpoint.to_string(),
                    reason,
                })
            }
            Some(Script::Hang) => std::future::pending().await,
        }
    }
}

// ============================================================================
// SESSION OBSERVER
// ============================================================================

/// Session observer that remembers every unauthorized endpoint.
#[derive(Debug, Default)]
pub struct RecordingSession {
    endpoints: Mutex<Vec<String>>,
}

impl RecordingSession {
    pub fn unauthorized_endpoints(&self) -> Vec<String> {
        self.endpoints.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SessionObserver for RecordingSession {
    fn on_unauthorized(&self, endpoint: &str) {
        self.endpoints
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(endpoint.to_string());
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;
    use serde_json::json;

    /// User ids as the backend sends them: numbers or numeric strings.
    pub fn arb_raw_user_id() -> impl Strategy<Value = Value> {
        prop_oneof![
            (1i64..100_000).prop_map(|n| json!(n)),
            (1i64..100_000).prop_map(|n| json!(n.to_string())),
        ]
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        prop_oneof![
            (1i64..100_000).prop_map(UserId::from),
            "[a-z]{3,12}".prop_map(UserId::from),
        ]
    }

    /// Timestamps between 2020 and 2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1_577_836_800i64..1_893_456_000i64)
            .prop_map(|secs| DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default())
    }

    pub fn arb_activity_kind() -> impl Strategy<Value = ActivityKind> {
        prop_oneof![
            Just(ActivityKind::Deposit),
            Just(ActivityKind::Redemption),
            Just(ActivityKind::Withdrawal),
        ]
    }

    /// A raw record in the shape one source sends, with `id` drawn from a
    /// small range so that ids collide across sources.
    pub fn arb_raw_activity(kind: ActivityKind) -> impl Strategy<Value = Value> {
        (
            1i64..20,
            proptest::option::of(arb_timestamp()),
            0i64..500,
        )
            .prop_map(move |(id, ts, points)| {
                let ts = ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string());
                match kind {
                    ActivityKind::Deposit => json!({
                        "id": id,
                        "created_at": ts,
                        "poin": points,
                        "jenis_sampah": "Plastik",
                    }),
                    ActivityKind::Redemption => json!({
                        "id": id,
                        "tanggal_redeem": ts,
                        "poin_digunakan": points,
                        "nama_produk": "Tumbler",
                    }),
                    ActivityKind::Withdrawal => json!({
                        "id": id,
                        "created_at": ts,
                        "jumlah_poin": points,
                        "metode": "e-wallet",
                    }),
                }
            })
    }

    pub fn arb_raw_activity_list(kind: ActivityKind) -> impl Strategy<Value = Vec<Value>> {
        proptest::collection::vec(arb_raw_activity(kind), 0..12)
    }

    /// A raw leaderboard row.
    pub fn arb_raw_leaderboard_row() -> impl Strategy<Value = Value> {
        (
            arb_raw_user_id(),
            "[A-Z][a-z]{2,8}",
            0i64..50,
            proptest::option::of(arb_timestamp()),
        )
            .prop_map(|(user_id, name, points, last)| {
                json!({
                    "user_id": user_id,
                    "nama": name,
                    // Few distinct values so ties are common.
                    "total_poin": points * 10,
                    "last_activity": last.map(|t| t.to_rfc3339()),
                })
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    /// 2025-05-15 09:00 UTC, inside Q2 2025.
    pub fn reference_instant() -> Timestamp {
        chrono::Utc
            .with_ymd_and_hms(2025, 5, 15, 9, 0, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn manual_clock() -> ManualClock {
        ManualClock::new(reference_instant())
    }

    pub fn stats_payload() -> Value {
        json!({
            "status": "success",
            "data": {"poin": 100, "total_setor": 12, "total_berat": 8.5}
        })
    }

    pub fn leaderboard_payload() -> Value {
        json!({
            "status": "success",
            "data": [
                {"user_id": 3, "nama": "Sari", "total_poin": 300, "last_activity": "2025-05-10 09:00:00"},
                {"user_id": "7", "nama": "Budi", "total_poin": 250, "last_activity": "2025-04-02"},
                {"user_id": 9, "nama": "Dewi", "total_poin": 250, "last_activity": "2025-03-20"},
                {"user_id": 11, "nama": "Eko", "total_poin": 120, "last_activity": "2025-05-14T18:00:00Z"}
            ]
        })
    }

    pub fn badges_payload() -> Value {
        json!({
            "data": [
                {"id": "first-deposit", "nama": "Setoran Pertama", "unlocked": true, "earned_at": "2025-01-02"},
                {"id": "eco-hero", "nama": "Eco Hero", "unlocked": false}
            ]
        })
    }

    pub fn deposits_payload() -> Value {
        json!({
            "status": "success",
            "data": [
                {"id": 1, "created_at": "2025-01-02 08:00:00", "poin": "40", "jenis_sampah": "Plastik PET"},
                {"id": 2, "created_at": "2025-01-05T10:30:00Z", "actual_poin": 25.7, "jenis_sampah": "Kardus"}
            ]
        })
    }

    pub fn redemptions_payload() -> Value {
        json!({
            "data": [
                {"id": 1, "tanggal_redeem": "2025-01-03", "poin_digunakan": 30, "nama_produk": "Tumbler"}
            ]
        })
    }

    pub fn withdrawals_payload() -> Value {
        json!([
            {"id": 1, "created_at": "2025-01-04 12:00:00", "jumlah_poin": 10, "metode": "e-wallet"}
        ])
    }

    /// Every dashboard endpoint of `user` answered with `200`.
    pub fn dashboard_transport(user: &UserId) -> ScriptedTransport {
        ScriptedTransport::new()
            .with_json(format!("/users/{}/stats", user), stats_payload())
            .with_json("/leaderboard", leaderboard_payload())
            .with_json(format!("/users/{}/badges", user), badges_payload())
            .with_json(format!("/users/{}/deposits", user), deposits_payload())
            .with_json(format!("/users/{}/redemptions", user), redemptions_payload())
            .with_json(format!("/users/{}/withdrawals", user), withdrawals_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_scripts_replay_last_entry() {
        let transport = ScriptedTransport::new().with_scripts(
            "/x",
            vec![Script::status(500), Script::body(200, "ok")],
        );

        assert_eq!(transport.get("/x").await.unwrap().status, 500);
        assert_eq!(transport.get("/x").await.unwrap().status, 200);
        assert_eq!(transport.get("/x").await.unwrap().status, 200);
        assert_eq!(transport.call_count("/x"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_endpoint_is_not_found() {
        let transport = ScriptedTransport::new();
        assert_eq!(transport.get("/missing").await.unwrap().status, 404);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_error_script() {
        let transport =
            ScriptedTransport::new().with_script("/x", Script::connection_error("refused"));
        assert!(matches!(
            transport.get("/x").await,
            Err(FetchError::Connection { .. })
        ));
    }

    #[test]
    fn test_recording_session() {
        let session = RecordingSession::default();
        session.on_unauthorized("/users/1/stats");
        assert_eq!(session.unauthorized_endpoints(), vec!["/users/1/stats"]);
    }
}
