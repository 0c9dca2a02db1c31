use crate::links::{self, LinkError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that make a crawl configuration unusable
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid seed URL {url}: {source}")]
    InvalidSeed { url: String, source: LinkError },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

/// Configuration for a crawl run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// URL to start crawling from
    pub seed_url: String,

    /// Maximum link depth below the seed (the seed is depth 0)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Minimum delay between two requests to the same host, in seconds
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: f64,

    /// Run the browser without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Honour robots.txt
    #[serde(default = "default_true")]
    pub respect_robots: bool,

    /// Stop dispatching new pages once this many have been dispatched
    #[serde(default)]
    pub max_pages: Option<usize>,

    /// Default log filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Root directory of the output tree
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Number of concurrent crawl workers
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// User agent for robots.txt matching and plain HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upper bound for rendering a single page
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Upper bound for a plain HTTP request (robots.txt, media)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Whether to follow links to other hosts
    #[serde(default)]
    pub allow_external: bool,

    /// Only follow links whose path starts with this prefix
    #[serde(default)]
    pub path_prefix: Option<String>,

    /// Regex patterns for URLs to include
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regex patterns for URLs to exclude
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Case-insensitive substrings that exclude an image URL
    #[serde(default = "default_image_exclude_patterns")]
    pub image_exclude_patterns: Vec<String>,

    /// Substrings a network-log media URL must contain (empty accepts all)
    #[serde(default)]
    pub network_media_patterns: Vec<String>,
}

/// Upper bound for `delay_seconds`, and for a site's `Crawl-delay`
pub const MAX_DELAY_SECONDS: f64 = 3600.0;

fn default_max_depth() -> usize {
    2
}

fn default_delay_seconds() -> f64 {
    3.0
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("crawl_output")
}

/// Default value for max_concurrency
fn default_max_concurrency() -> usize {
    4
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_user_agent() -> String {
    concat!("page-tree/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_page_timeout_secs() -> u64 {
    45
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_image_exclude_patterns() -> Vec<String> {
    vec!["logo".to_string(), "icon".to_string(), "favicon".to_string()]
}

impl CrawlConfig {
    /// Create a new configuration with default values
    pub fn new(seed_url: &str) -> Self {
        Self {
            seed_url: seed_url.to_string(),
            max_depth: default_max_depth(),
            delay_seconds: default_delay_seconds(),
            headless: true,
            respect_robots: true,
            max_pages: None,
            log_level: default_log_level(),
            output_dir: default_output_dir(),
            max_concurrency: default_max_concurrency(),
            webdriver_url: default_webdriver_url(),
            user_agent: default_user_agent(),
            page_timeout_secs: default_page_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            allow_external: false,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            path_prefix: None,
            image_exclude_patterns: default_image_exclude_patterns(),
            network_media_patterns: Vec::new(),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The canonical seed URL
    pub fn seed(&self) -> Result<Url, ConfigError> {
        links::canonicalize_str(&self.seed_url).map_err(|source| ConfigError::InvalidSeed {
            url: self.seed_url.clone(),
            source,
        })
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_seconds.clamp(0.0, MAX_DELAY_SECONDS))
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Rejects configurations that must abort the run before any task is dispatched
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.seed()?;

        if !(0.0..=MAX_DELAY_SECONDS).contains(&self.delay_seconds) {
            return Err(ConfigError::InvalidValue {
                field: "delay_seconds",
                message: format!(
                    "must be between 0 and {} seconds, got {}",
                    MAX_DELAY_SECONDS, self.delay_seconds
                ),
            });
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrency",
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_pages == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_pages",
                message: "must be at least 1 when set".to_string(),
            });
        }
        if self.page_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeouts",
                message: "must be at least one second".to_string(),
            });
        }
        for pattern in self.include_patterns.iter().chain(&self.exclude_patterns) {
            regex::Regex::new(pattern)?;
        }

        Ok(())
    }
}
