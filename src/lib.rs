// Re-export modules
pub mod config;
pub mod crawlers;
pub mod filter;
pub mod links;
pub mod media;
pub mod output;
pub mod parsers;
pub mod politeness;
pub mod results;
pub mod utils;
pub mod visited;

// Re-export commonly used types for convenience
pub use config::{ConfigError, CrawlConfig};
pub use crawlers::{Orchestrator, PageRenderer, ReqwestFetcher, WebDriverRenderer};
pub use results::{ContentRecord, CrawlSummary, LinkRecord};

use crawlers::FetchError;
use output::PersistError;
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort a run before or outside page processing
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Output error: {0}")]
    Output(#[from] PersistError),

    #[error("HTTP client setup failed: {0}")]
    Http(#[from] FetchError),
}

/// Crawls from the configured seed with a WebDriver browser and reqwest
///
/// `WEBDRIVER_URL` in the environment overrides the configured WebDriver URL.
/// Ctrl-C stops dispatching new pages and lets in-flight pages finish.
pub async fn run(mut config: CrawlConfig) -> Result<CrawlSummary, CrawlError> {
    // Override the WebDriver URL with an environment variable if provided
    if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
        if !webdriver_url.is_empty() {
            config.webdriver_url = webdriver_url;
        }
    }

    let fetcher = ReqwestFetcher::new(&config.user_agent, config.request_timeout())?;
    let renderer = WebDriverRenderer::from_config(&config);
    let orchestrator = Orchestrator::new(config, Arc::new(renderer), Arc::new(fetcher))?;

    let stop = orchestrator.stop_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ::log::warn!("Interrupted, finishing in-flight pages");
            stop.stop();
        }
    });

    let result = orchestrator.run().await;
    interrupt.abort();
    result
}
