use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::models::ScoringWeights;

const ENV_PREFIX: &str = "WANDERPAIR";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Empty disables the Redis tier
    #[serde(default)]
    pub redis_url: String,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_token_ttl() -> i64 { 7 * 24 * 3600 }
fn default_bcrypt_cost() -> u32 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_limit")]
    pub default_limit: u16,
    #[serde(default = "default_max_limit")]
    pub max_limit: u16,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    /// Radius used when scoring outside of discovery (stored match scores)
    #[serde(default = "default_max_distance")]
    pub max_distance_km: f64,
    /// Rows fetched from the database before ranking
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool_size: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            min_score: default_min_score(),
            max_distance_km: default_max_distance(),
            candidate_pool_size: default_candidate_pool(),
        }
    }
}

fn default_limit() -> u16 { 20 }
fn default_max_limit() -> u16 { 100 }
fn default_min_score() -> f64 { 20.0 }
fn default_max_distance() -> f64 { 500.0 }
fn default_candidate_pool() -> usize { 500 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_personality_weight")]
    pub personality: f64,
    #[serde(default = "default_budget_weight")]
    pub budget: f64,
    #[serde(default = "default_interests_weight")]
    pub interests: f64,
    #[serde(default = "default_location_weight")]
    pub location: f64,
    #[serde(default = "default_destinations_weight")]
    pub destinations: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            personality: default_personality_weight(),
            budget: default_budget_weight(),
            interests: default_interests_weight(),
            location: default_location_weight(),
            destinations: default_destinations_weight(),
        }
    }
}

impl From<&WeightsConfig> for ScoringWeights {
    fn from(w: &WeightsConfig) -> Self {
        Self {
            personality: w.personality,
            budget: w.budget,
            interests: w.interests,
            location: w.location,
            destinations: w.destinations,
        }
    }
}

fn default_personality_weight() -> f64 { 0.25 }
fn default_budget_weight() -> f64 { 0.20 }
fn default_interests_weight() -> f64 { 0.30 }
fn default_location_weight() -> f64 { 0.15 }
fn default_destinations_weight() -> f64 { 0.10 }

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_refresh_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_refresh_batch")]
    pub batch_size: i64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_refresh_interval(),
            batch_size: default_refresh_batch(),
        }
    }
}

fn default_true() -> bool { true }
fn default_refresh_interval() -> u64 { 300 }
fn default_refresh_batch() -> i64 { 200 }

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Key anonymous callers on `X-Forwarded-For`/`Forwarded`; only behind a proxy that sets them
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            trust_proxy_headers: false,
        }
    }
}

fn default_max_requests() -> u32 { 120 }
fn default_window_secs() -> u64 { 60 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with WANDERPAIR_)
    /// 5. `DATABASE_URL` and `JWT_SECRET`
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., WANDERPAIR__SERVER__PORT -> server.port
            .add_source(env_source())
            .build()?;

        apply_well_known_env(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        apply_well_known_env(settings)?.try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// `DATABASE_URL` and `JWT_SECRET` are what most deploy tooling sets
fn apply_well_known_env(settings: Config) -> Result<Config, ConfigError> {
    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = std::env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", url)?;
    }
    if let Ok(secret) = std::env::var("JWT_SECRET") {
        builder = builder.set_override("auth.jwt_secret", secret)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let weights = ScoringWeights::from(&WeightsConfig::default());
        assert_eq!(weights, ScoringWeights::default());
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("wanderpair-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[database]
url = "postgres://localhost/wanderpair_test"

[cache]
redis_url = ""

[auth]
jwt_secret = "test-secret"

[scoring.weights]
interests = 0.5
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.auth.bcrypt_cost, 10);
        assert_eq!(settings.matching.default_limit, 20);
        assert_eq!(settings.scoring.weights.interests, 0.5);
        assert_eq!(settings.scoring.weights.budget, 0.20);
        assert_eq!(settings.rate_limit.max_requests, 120);

        std::fs::remove_dir_all(&dir).ok();
    }
}
