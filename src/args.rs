use clap::Parser;
use page_tree::{ConfigError, CrawlConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "page-tree")]
#[command(about = "Recursive website crawler that stores each page as a directory tree node")]
#[command(version)]
pub struct Args {
    /// URL to start crawling from (may also come from --config)
    pub seed_url: Option<String>,

    /// JSON configuration file; command-line options override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum link depth below the seed
    #[arg(short = 'd', long)]
    pub max_depth: Option<usize>,

    /// Seconds between requests to the same host
    #[arg(long)]
    pub delay: Option<f64>,

    /// Show the browser window
    #[arg(long)]
    pub no_headless: bool,

    /// Ignore robots.txt
    #[arg(long)]
    pub no_robots: bool,

    /// Stop after this many pages have been dispatched
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Root directory of the output tree
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Number of concurrent crawlers
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// WebDriver server URL
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Default log filter when RUST_LOG is not set
    #[arg(long)]
    pub log_level: Option<String>,

    /// Deduplicate a stored links.json instead of crawling
    #[arg(long, value_name = "LINKS_JSON")]
    pub dedupe_file: Option<PathBuf>,

    /// Where --dedupe-file writes its result (stdout when absent)
    #[arg(long, requires = "dedupe_file")]
    pub output: Option<PathBuf>,
}

impl Args {
    /// Builds the crawl configuration from the config file and CLI overrides
    pub fn to_config(&self) -> Result<CrawlConfig, ConfigError> {
        let mut config = match (&self.config, &self.seed_url) {
            (Some(path), _) => CrawlConfig::from_file(path)?,
            (None, Some(seed)) => CrawlConfig::new(seed),
            (None, None) => {
                return Err(ConfigError::InvalidValue {
                    field: "seed_url",
                    message: "a seed URL or --config file is required".to_string(),
                });
            }
        };

        if let Some(seed) = &self.seed_url {
            config.seed_url = seed.clone();
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(delay) = self.delay {
            config.delay_seconds = delay;
        }
        if self.no_headless {
            config.headless = false;
        }
        if self.no_robots {
            config.respect_robots = false;
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = Some(max_pages);
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrency = concurrency;
        }
        if let Some(webdriver_url) = &self.webdriver_url {
            config.webdriver_url = webdriver_url.clone();
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone();
        }

        Ok(config)
    }
}
