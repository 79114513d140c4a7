//! Crawler configuration: defaults, TOML loading, validation.
//!
//! All tuning knobs live in one explicit value handed to the crawler at
//! construction; there is no process-global configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Fixed desktop browser strings used for user-agent rotation
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/115.0",
];

/// Agent token presented to robots.txt rules
pub const ROBOTS_AGENT: &str = "MyCrawler";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Token-bucket rate limit shared by all workers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Sustained requests per second
    pub per_second: u32,
    /// Maximum burst size
    pub burst: u32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            per_second: 10,
            burst: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InflightConfig {
    /// Maximum concurrent in-flight fetches
    pub cap: usize,
}

impl Default for InflightConfig {
    fn default() -> Self {
        Self { cap: 50 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlineConfig {
    /// Wall-clock budget for the whole crawl
    pub seconds: u64,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self { seconds: 600 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// HTTP client timeout
    pub timeout_secs: u64,
    /// Outer bound on a single request attempt, headers through body
    pub request_timeout_secs: u64,
    /// Total attempts per URL
    pub retries: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            request_timeout_secs: 20,
            retries: 3,
        }
    }
}

/// Complete crawler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum pages stored per path family
    pub max_per_path: usize,

    /// Maximum number of distinct path families
    pub max_path_types: usize,

    pub rate: RateConfig,
    pub inflight: InflightConfig,
    pub deadline: DeadlineConfig,
    pub fetch: FetchConfig,

    /// User agents rotated per request
    pub user_agent_pool: Vec<String>,

    /// Agent token used against robots.txt
    pub robots_agent: String,

    /// Minimum spacing between stored pages of one family
    pub path_family_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_per_path: 1000,
            max_path_types: 1000,
            rate: RateConfig::default(),
            inflight: InflightConfig::default(),
            deadline: DeadlineConfig::default(),
            fetch: FetchConfig::default(),
            user_agent_pool: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            robots_agent: ROBOTS_AGENT.to_string(),
            path_family_delay_ms: 500,
        }
    }
}

impl CrawlerConfig {
    /// Load configuration from a TOML file, overlaying the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all fields, collecting every problem into one error so the
    /// user can fix the file in a single pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.max_per_path == 0 {
            errors.push("max_per_path must be positive".to_string());
        }
        if self.max_path_types == 0 {
            errors.push("max_path_types must be positive".to_string());
        }
        if self.rate.per_second == 0 {
            errors.push("rate.per_second must be positive".to_string());
        }
        if self.rate.burst == 0 {
            errors.push("rate.burst must be positive".to_string());
        }
        if self.inflight.cap == 0 {
            errors.push("inflight.cap must be positive".to_string());
        }
        if self.deadline.seconds == 0 {
            errors.push("deadline.seconds must be positive".to_string());
        }
        if self.fetch.retries == 0 {
            errors.push("fetch.retries must be positive".to_string());
        }
        if self.user_agent_pool.is_empty() {
            errors.push("user_agent_pool must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }
}
