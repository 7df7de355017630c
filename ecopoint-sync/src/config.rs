//! Configuration loading for the EcoPoint sync client.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    pub api_base_url: String,
    pub auth: AuthConfig,
    /// Maximum number of entries in the merged activity feed.
    pub activity_limit: usize,
    pub resources: ResourcesConfig,
    pub season: SeasonConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
}

/// Timeout and cache lifetime for one kind of resource.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourcePolicy {
    pub timeout_ms: u64,
    pub ttl_ms: u64,
}

impl ResourcePolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourcesConfig {
    pub stats: ResourcePolicy,
    pub leaderboard: ResourcePolicy,
    pub badges: ResourcePolicy,
    /// Applies to each of the deposit, redemption and withdrawal feeds.
    pub activity: ResourcePolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeasonConfig {
    /// Local time offset used for season boundaries, in minutes east of UTC.
    pub utc_offset_minutes: i32,
    /// How often the season window is recomputed.
    pub refresh_interval_secs: u64,
}

impl SeasonConfig {
    pub fn utc_offset_secs(&self) -> i32 {
        self.utc_offset_minutes * 60
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or ECOPOINT_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl SyncConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if matches!(&self.auth.api_key, Some(key) if key.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "auth.api_key",
                reason: "must not be blank when present".to_string(),
            });
        }
        if matches!(&self.auth.bearer_token, Some(token) if token.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "auth.bearer_token",
                reason: "must not be blank when present".to_string(),
            });
        }
        if self.activity_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "activity_limit",
                reason: "must be > 0".to_string(),
            });
        }
        for (field, policy) in [
            ("resources.stats", &self.resources.stats),
            ("resources.leaderboard", &self.resources.leaderboard),
            ("resources.badges", &self.resources.badges),
            ("resources.activity", &self.resources.activity),
        ] {
            if policy.timeout_ms == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "timeout_ms must be > 0".to_string(),
                });
            }
            if policy.ttl_ms == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "ttl_ms must be > 0".to_string(),
                });
            }
        }
        // Real-world offsets span UTC-12:00 to UTC+14:00.
        if !(-12 * 60..=14 * 60).contains(&self.season.utc_offset_minutes) {
            return Err(ConfigError::InvalidValue {
                field: "season.utc_offset_minutes",
                reason: "must be between -720 and 840".to_string(),
            });
        }
        if self.season.refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "season.refresh_interval_secs",
                reason: "must be > 0".to_string(),
            });
        }
        if self.log.filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "log.filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("ECOPOINT_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
api_base_url = "https://api.ecopoint.test/api"
activity_limit = 5

[auth]
bearer_token = "token-abc"

[resources.stats]
timeout_ms = 8000
ttl_ms = 120000

[resources.leaderboard]
timeout_ms = 8000
ttl_ms = 60000

[resources.badges]
timeout_ms = 8000
ttl_ms = 1800000

[resources.activity]
timeout_ms = 10000
ttl_ms = 120000

[season]
utc_offset_minutes = 420
refresh_interval_secs = 3600

[log]
filter = "ecopoint_sync=info"
json = false
"#;

    #[test]
    fn test_parse_sample() {
        let config = SyncConfig::from_toml(SAMPLE).expect("sample config parses");
        assert_eq!(config.activity_limit, 5);
        assert_eq!(config.auth.bearer_token.as_deref(), Some("token-abc"));
        assert!(config.auth.api_key.is_none());
        assert_eq!(config.resources.badges.ttl(), Duration::from_secs(1800));
        assert_eq!(config.resources.activity.timeout(), Duration::from_secs(10));
        assert_eq!(config.season.utc_offset_secs(), 7 * 3600);
        assert_eq!(config.season.refresh_interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let contents = format!("{}\nextra = 1\n", SAMPLE.replace("[auth]", "bogus = true\n[auth]"));
        assert!(matches!(
            SyncConfig::from_toml(&contents),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let contents = SAMPLE.replace("ttl_ms = 60000", "ttl_ms = 0");
        match SyncConfig::from_toml(&contents) {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "resources.leaderboard")
            }
            other => panic!("expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_offset_out_of_range_rejected() {
        let contents = SAMPLE.replace("utc_offset_minutes = 420", "utc_offset_minutes = 900");
        assert!(matches!(
            SyncConfig::from_toml(&contents),
            Err(ConfigError::InvalidValue {
                field: "season.utc_offset_minutes",
                ..
            })
        ));
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        let contents = SAMPLE.replace("https://api.ecopoint.test/api", "ftp://nope");
        assert!(matches!(
            SyncConfig::from_toml(&contents),
            Err(ConfigError::InvalidValue {
                field: "api_base_url",
                ..
            })
        ));
    }
}
