use std::env;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::NexoError;

static CONFIG: OnceLock<Config> = OnceLock::new();

// --- CONFIG AGGREGATOR ---

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub stats: StatsConfig,
    pub memory: MemoryConfig,
}

impl Config {
    /// Loads and validates the configuration, then installs it process-wide.
    /// Later calls return whatever was installed first.
    pub fn init() -> Result<&'static Config, NexoError> {
        let config = Self::load();
        config.stats.validate()?;
        Ok(CONFIG.get_or_init(|| config))
    }

    fn load() -> Self {
        dotenv::dotenv().ok();
        Self {
            server: ServerConfig::load(),
            stats: StatsConfig::load(),
            memory: MemoryConfig::load(),
        }
    }
}

// --- MODULES ---

// SERVER
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
    pub log_level: String,
}

impl ServerConfig {
    fn load() -> Self {
        Self {
            host:      get_env("SERVER_HOST", "127.0.0.1"),
            http_port: get_env("HTTP_PORT", "4151"),
            log_level: get_env("NEXO_LOG", "info"),
        }
    }
}

// STATS
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// 0 disables the deadline.
    pub timeout_ms: u64,
    /// Empty list disables e2e latency tracking.
    pub e2e_percentiles: Vec<f64>,
    pub e2e_window_ms: u64,
    pub mem_queue_size: usize,
}

impl StatsConfig {
    fn load() -> Self {
        let raw_percentiles: String = get_env("STATS_E2E_PERCENTILES", "");
        Self {
            timeout_ms:      get_env("STATS_TIMEOUT_MS", "0"),
            e2e_percentiles: parse_percentiles(&raw_percentiles),
            e2e_window_ms:   get_env("STATS_E2E_WINDOW_MS", "600000"), // 10 minutes
            mem_queue_size:  get_env("CHANNEL_MEM_QUEUE_SIZE", "10000"),
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn e2e_window(&self) -> Duration {
        Duration::from_millis(self.e2e_window_ms)
    }

    pub fn validate(&self) -> Result<(), NexoError> {
        for p in &self.e2e_percentiles {
            if !(*p > 0.0 && *p <= 1.0) {
                return Err(NexoError::Config(format!(
                    "STATS_E2E_PERCENTILES: {} is not in (0, 1]",
                    p
                )));
            }
        }
        Ok(())
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            e2e_percentiles: Vec::new(),
            e2e_window_ms: 600_000,
            mem_queue_size: 10_000,
        }
    }
}

// MEMORY
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub purge_interval_ms: u64,
    /// Resident bytes allowed above the post-purge level before the next purge.
    pub purge_headroom_bytes: u64,
}

impl MemoryConfig {
    fn load() -> Self {
        Self {
            purge_interval_ms:    get_env("MEMORY_PURGE_INTERVAL_MS", "10000"),
            purge_headroom_bytes: get_env("MEMORY_PURGE_HEADROOM_BYTES", "67108864"), // 64MB
        }
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_millis(self.purge_interval_ms)
    }
}

// --- PRIVATE HELPERS ---

fn get_env<T: std::str::FromStr>(key: &str, default: &str) -> T {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("Config: {} has invalid value '{}', using default '{}'", key, raw, default);
            // Defaults are literals owned by this module and always parse.
            default.parse().unwrap_or_else(|_| unreachable!("invalid default for {}", key))
        }
    }
}

/// "0.99,0.95" style list. Unparsable entries are dropped with a warning.
pub fn parse_percentiles(raw: &str) -> Vec<f64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<f64>() {
            Ok(p) => Some(p),
            Err(_) => {
                tracing::warn!("Config: ignoring invalid percentile '{}'", s);
                None
            }
        })
        .collect()
}
