//! Conversion of raw backend payloads into canonical records.
//!
//! The backend is inconsistent about field names and value types. Every
//! payload passes through exactly one function here; nothing downstream
//! inspects raw JSON. A field that is missing or malformed is replaced by its
//! default and reported as a [`DataShapeError`] at debug level.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use ecopoint_core::{
    ActivityKind, ActivityRecord, Badge, DataShapeError, LeaderboardRow, Timestamp, UserId,
    UserStats,
};
use serde_json::{Map, Value};

/// Accepted field names for one activity source, in priority order.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub id: &'static [&'static str],
    pub timestamp: &'static [&'static str],
    pub points: &'static [&'static str],
    pub description: &'static [&'static str],
}

pub const DEPOSIT_FIELDS: FieldDescriptor = FieldDescriptor {
    id: &["id", "setor_id", "deposit_id"],
    timestamp: &["created_at", "tanggal_setor", "tanggal", "ts", "timestamp"],
    points: &["poin", "actual_poin", "poin_didapat", "points"],
    description: &["jenis_sampah", "keterangan", "description"],
};

pub const REDEMPTION_FIELDS: FieldDescriptor = FieldDescriptor {
    id: &["id", "redeem_id"],
    timestamp: &["created_at", "tanggal_redeem", "tanggal", "ts", "timestamp"],
    points: &["poin_digunakan", "poin", "points"],
    description: &["nama_produk", "product_name", "keterangan", "description"],
};

pub const WITHDRAWAL_FIELDS: FieldDescriptor = FieldDescriptor {
    id: &["id", "tarik_id", "withdrawal_id"],
    timestamp: &["created_at", "tanggal_tarik", "tanggal", "ts", "timestamp"],
    points: &["jumlah_poin", "poin", "points"],
    description: &["metode", "keterangan", "description"],
};

const STATS_POINTS: &[&str] = &["poin", "actual_poin", "display_poin", "points"];
const STATS_DEPOSITS: &[&str] = &["total_setor", "jumlah_setor", "deposit_count"];
const STATS_WEIGHT: &[&str] = &["total_berat", "total_weight_kg", "berat_total"];

const ROW_USER: &[&str] = &["user_id", "userId", "id"];
const ROW_NAME: &[&str] = &["nama", "name", "username"];
const ROW_POINTS: &[&str] = &["total_poin", "poin", "points"];
const ROW_ACTIVITY: &[&str] = &["last_activity", "updated_at", "tanggal_terakhir"];

const BADGE_ID: &[&str] = &["id", "badge_id", "kode"];
const BADGE_NAME: &[&str] = &["nama", "name", "title"];
const BADGE_UNLOCKED: &[&str] = &["unlocked", "is_unlocked", "earned"];
const BADGE_EARNED_AT: &[&str] = &["earned_at", "unlocked_at", "tanggal"];

/// Keys under which some endpoints nest their list.
const LIST_KEYS: &[&str] = &["items", "rows", "records"];

pub fn descriptor(kind: ActivityKind) -> &'static FieldDescriptor {
    match kind {
        ActivityKind::Deposit => &DEPOSIT_FIELDS,
        ActivityKind::Redemption => &REDEMPTION_FIELDS,
        ActivityKind::Withdrawal => &WITHDRAWAL_FIELDS,
    }
}

// ============================================================================
// ACTIVITY
// ============================================================================

/// Normalize every record of one activity source.
pub fn normalize_activities(kind: ActivityKind, payload: &Value) -> Vec<ActivityRecord> {
    list_items(kind.source_tag(), payload)
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_activity(kind, index, raw))
        .collect()
}

/// Normalize one raw record. Never fails; see the module docs.
///
/// A record without a usable id gets the synthetic id `{tag}#{index}`. Backend
/// ids always render as `{tag}-{id}`, so the two forms never collide.
pub fn normalize_activity(kind: ActivityKind, index: usize, raw: &Value) -> ActivityRecord {
    let fields = descriptor(kind);
    let shape = Shape::new(kind.source_tag(), index);
    let empty = Map::new();
    let record = match raw.as_object() {
        Some(record) => record,
        None => {
            shape.degrade("record", "not an object");
            &empty
        }
    };

    let id = match first_present(record, fields.id).and_then(id_text) {
        Some(original) => format!("{}-{}", kind.source_tag(), original),
        None => {
            shape.degrade("id", "missing");
            format!("{}#{}", kind.source_tag(), index)
        }
    };

    let description = match first_present(record, fields.description) {
        None => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            shape.degrade("description", format!("unexpected value {}", other));
            String::new()
        }
    };

    let timestamp = match first_present(record, fields.timestamp) {
        None => {
            shape.degrade("timestamp", "missing");
            None
        }
        Some(value) => match parse_timestamp_value(value) {
            Some(ts) => Some(ts),
            None => {
                shape.degrade("timestamp", format!("unparseable value {}", value));
                None
            }
        },
    };

    let magnitude = match first_present(record, fields.points) {
        None => {
            shape.degrade("points", "missing");
            0
        }
        Some(value) => parse_points(value).unwrap_or_else(|reason| {
            shape.degrade("points", reason);
            0
        }),
    };

    ActivityRecord {
        id,
        kind,
        description,
        timestamp,
        point_delta: magnitude.saturating_abs().saturating_mul(kind.point_sign()),
    }
}

// ============================================================================
// DASHBOARD PAYLOADS
// ============================================================================

pub fn normalize_stats(payload: &Value) -> UserStats {
    let shape = Shape::new("stats", 0);
    let empty = Map::new();
    let record = match payload.as_object() {
        Some(record) => record,
        None => {
            if !payload.is_null() {
                shape.degrade("record", "not an object");
            }
            &empty
        }
    };

    let points = match first_present(record, STATS_POINTS) {
        None => 0,
        Some(value) => parse_points(value).unwrap_or_else(|reason| {
            shape.degrade("points", reason);
            0
        }),
    };
    let deposit_count = match first_present(record, STATS_DEPOSITS) {
        None => 0,
        Some(value) => match parse_points(value) {
            Ok(n) => u64::try_from(n).unwrap_or(0),
            Err(reason) => {
                shape.degrade("deposit_count", reason);
                0
            }
        },
    };
    let total_weight_kg = match first_present(record, STATS_WEIGHT) {
        None => 0.0,
        Some(value) => parse_float(value).unwrap_or_else(|| {
            shape.degrade("total_weight_kg", format!("not a number: {}", value));
            0.0
        }),
    };

    UserStats {
        points,
        deposit_count,
        total_weight_kg,
    }
}

/// Leaderboard rows. A row without a user id cannot be ranked or
/// highlighted and is dropped.
pub fn normalize_leaderboard(payload: &Value) -> Vec<LeaderboardRow> {
    list_items("leaderboard", payload)
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let shape = Shape::new("leaderboard", index);
            let Some(record) = raw.as_object() else {
                shape.degrade("record", "not an object");
                return None;
            };
            let Some(user_id) = first_present(record, ROW_USER).and_then(UserId::from_json)
            else {
                shape.degrade("user_id", "missing");
                return None;
            };

            let name = first_present(record, ROW_NAME)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            let points = match first_present(record, ROW_POINTS) {
                None => 0,
                Some(value) => parse_points(value).unwrap_or_else(|reason| {
                    shape.degrade("points", reason);
                    0
                }),
            };
            let last_activity = first_present(record, ROW_ACTIVITY).and_then(|value| {
                let parsed = parse_timestamp_value(value);
                if parsed.is_none() {
                    shape.degrade("last_activity", format!("unparseable value {}", value));
                }
                parsed
            });

            Some(LeaderboardRow {
                user_id,
                name,
                points,
                last_activity,
            })
        })
        .collect()
}

pub fn normalize_badges(payload: &Value) -> Vec<Badge> {
    list_items("badges", payload)
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let shape = Shape::new("badges", index);
            let empty = Map::new();
            let record = raw.as_object().unwrap_or(&empty);

            let id = first_present(record, BADGE_ID)
                .and_then(id_text)
                .unwrap_or_else(|| {
                    shape.degrade("id", "missing");
                    format!("badge#{}", index)
                });
            let name = first_present(record, BADGE_NAME)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            let unlocked = match first_present(record, BADGE_UNLOCKED) {
                None => false,
                Some(Value::Bool(b)) => *b,
                Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
                Some(other) => {
                    shape.degrade("unlocked", format!("unexpected value {}", other));
                    false
                }
            };
            let earned_at = first_present(record, BADGE_EARNED_AT).and_then(parse_timestamp_value);

            Badge {
                id,
                name,
                unlocked,
                earned_at,
            }
        })
        .collect()
}

// ============================================================================
// SCALARS
// ============================================================================

/// Parse a timestamp string.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (both with
/// optional fractional seconds) and `YYYY-MM-DD`. Forms without an offset are
/// read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a point value: integer, float (truncated toward zero) or numeric
/// string.
pub fn parse_points(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(i),
            None => n
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
                .ok_or_else(|| format!("out of range: {}", n)),
        },
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(i);
            }
            s.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
                .ok_or_else(|| format!("not a number: {:?}", s))
        }
        other => Err(format!("not a number: {}", other)),
    }
}

fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

fn parse_timestamp_value(value: &Value) -> Option<Timestamp> {
    match value {
        Value::String(s) => parse_timestamp(s),
        // Epoch seconds.
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// First of `names` present with a non-null value.
fn first_present<'a>(record: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| record.get(*name))
        .find(|value| !value.is_null())
}

fn list_items<'a>(source_tag: &str, payload: &'a Value) -> &'a [Value] {
    match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => {
            let nested = LIST_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array));
            match nested {
                Some(items) => items.as_slice(),
                None => {
                    tracing::debug!(source = source_tag, "Payload is not a list, treating as empty");
                    &[]
                }
            }
        }
        Value::Null => &[],
        _ => {
            tracing::debug!(source = source_tag, "Payload is not a list, treating as empty");
            &[]
        }
    }
}

/// Reports degraded fields of one record.
struct Shape<'a> {
    source_tag: &'a str,
    index: usize,
}

impl<'a> Shape<'a> {
    fn new(source_tag: &'a str, index: usize) -> Self {
        Self { source_tag, index }
    }

    fn degrade(&self, field: &'static str, reason: impl Into<String>) {
        let error = DataShapeError {
            source_tag: self.source_tag.to_string(),
            index: self.index,
            field,
            reason: reason.into(),
        };
        tracing::debug!(source = self.source_tag, index = self.index, field, "{}", error);
    }
}
