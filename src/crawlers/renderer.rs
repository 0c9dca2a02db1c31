use crate::parsers::network::NetworkEntry;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Errors from rendering a single page
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No browser session available: {0}")]
    Unavailable(String),

    #[error("Failed to load {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {seconds}s rendering {url}")]
    Timeout { url: String, seconds: u64 },
}

/// A page after scripts have run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedPage {
    pub html: String,
    /// Title reported by the browser
    pub title: Option<String>,
    /// Resources the page requested while loading
    pub network_log: Vec<NetworkEntry>,
}

/// Produces the rendered HTML of a URL
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError>;

    /// Releases browser resources once the crawl is over
    async fn shutdown(&self) {}
}
