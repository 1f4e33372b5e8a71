//! Configuration management.
//!
//! Settings are read from a TOML file and may be overridden with
//! `CITEGRAPH_`-prefixed environment variables (e.g. `CITEGRAPH_CACHE__ENABLED=false`).
//!
//! ```toml
//! [cache]
//! enabled = true
//! directory = "~/.cache/citegraph"
//!
//! [throttle]
//! min_delay_secs = 60
//! max_delay_secs = 120
//!
//! [scholar]
//! base_url = "https://scholar.google.com"
//! timeout_secs = 30
//! results_per_page = 20
//! max_citing_results = 1000
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Page cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Delay between live requests
    #[serde(default)]
    pub throttle: ThrottleConfig,

    /// Academic search engine settings
    #[serde(default)]
    pub scholar: ScholarConfig,

    /// Citation-management site settings
    #[serde(default)]
    pub citeulike: CiteULikeConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Page cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache root; defaults to the platform cache directory
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
        }
    }
}

/// Randomized pause after every live fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    #[serde(default = "default_min_delay")]
    pub min_delay_secs: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: default_min_delay(),
            max_delay_secs: default_max_delay(),
        }
    }
}

impl ThrottleConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_secs(self.min_delay_secs)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

/// Academic search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScholarConfig {
    /// Scheme and host; stripped from request URLs to form cache keys
    #[serde(default = "default_scholar_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Results requested per citing-articles page
    #[serde(default = "default_per_page")]
    pub results_per_page: usize,

    /// The site never lists more citing articles than this
    #[serde(default = "default_max_citing")]
    pub max_citing_results: usize,

    /// Substrings that identify a human-verification interstitial
    #[serde(default = "default_robot_markers")]
    pub robot_markers: Vec<String>,
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            base_url: default_scholar_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            results_per_page: default_per_page(),
            max_citing_results: default_max_citing(),
            robot_markers: default_robot_markers(),
        }
    }
}

/// Citation-management site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiteULikeConfig {
    #[serde(default = "default_citeulike_url")]
    pub base_url: String,
}

impl Default for CiteULikeConfig {
    fn default() -> Self {
        Self {
            base_url: default_citeulike_url(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "json" for structured output, anything else for the compact text format
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_delay() -> u64 {
    60
}

fn default_max_delay() -> u64 {
    120
}

fn default_scholar_url() -> String {
    "https://scholar.google.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
        .to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_per_page() -> usize {
    20
}

fn default_max_citing() -> usize {
    1000
}

fn default_robot_markers() -> Vec<String> {
    vec![
        "Please show you're not a robot".to_string(),
        "unusual traffic from your computer network".to_string(),
    ]
}

fn default_citeulike_url() -> String {
    "http://www.citeulike.org".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default cache root: `<platform cache dir>/citegraph`
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("citegraph")
}

/// Look for a config file in the working directory, then in the platform config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("citegraph.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("citegraph").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &PathBuf) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_path()))
        .add_source(environment())
        .build()?;

    settings.try_deserialize()
}

/// Get the default configuration, with environment overrides
pub fn get_config() -> Result<Config, config::ConfigError> {
    config::Config::builder()
        .add_source(environment())
        .build()?
        .try_deserialize()
}

/// `CITEGRAPH_<SECTION>__<KEY>` variables
fn environment() -> config::Environment {
    config::Environment::with_prefix("CITEGRAPH")
        .prefix_separator("_")
        .separator("__")
}
