use crate::config::CrawlConfig;
use crate::crawlers::renderer::{PageRenderer, RenderError, RenderedPage};
use crate::parsers::network::parse_resource_entries;
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use url::Url;

/// Lists resources fetched by the page, as seen by the browser
const RESOURCE_SCRIPT: &str = "return performance.getEntriesByType('resource')\
    .map(e => ({name: e.name, initiatorType: e.initiatorType}));";

/// Alternatives tried when the configured WebDriver URL refuses connections
const FALLBACK_URLS: [&str; 4] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// Renders pages in a WebDriver-controlled browser
///
/// Sessions are opened lazily and reused; concurrent renders each check out
/// their own session, so the pool grows to the number of concurrent callers.
pub struct WebDriverRenderer {
    webdriver_url: String,
    headless: bool,
    page_timeout: Duration,
    idle: Mutex<Vec<Client>>,
}

impl WebDriverRenderer {
    pub fn new(webdriver_url: impl Into<String>, headless: bool, page_timeout: Duration) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            headless,
            page_timeout,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(
            config.webdriver_url.clone(),
            config.headless,
            config.page_timeout(),
        )
    }

    async fn checkout(&self) -> Result<Client, RenderError> {
        if let Some(client) = self.idle.lock().await.pop() {
            return Ok(client);
        }
        ::log::debug!("Opening new WebDriver session");
        connect_to_webdriver(&self.webdriver_url, self.headless).await
    }

    async fn checkin(&self, client: Client) {
        self.idle.lock().await.push(client);
    }
}

#[async_trait]
impl PageRenderer for WebDriverRenderer {
    async fn render(&self, url: &Url) -> Result<RenderedPage, RenderError> {
        let mut client = self.checkout().await?;

        for attempt in 0..2 {
            match timeout(self.page_timeout, render_with(&client, url)).await {
                Ok(Ok(page)) => {
                    self.checkin(client).await;
                    return Ok(page);
                }
                Ok(Err(e)) if attempt == 0 && is_session_lost(&e) => {
                    ::log::warn!("Lost WebDriver session while loading {}", url);
                    client = attempt_reconnect(&self.webdriver_url, self.headless).await?;
                }
                Ok(Err(e)) => {
                    self.checkin(client).await;
                    return Err(RenderError::Navigation {
                        url: url.to_string(),
                        message: e.to_string(),
                    });
                }
                Err(_) => {
                    // The session may still be busy with the page; do not reuse it
                    if let Err(e) = client.close().await {
                        ::log::debug!("Failed to close timed out session: {}", e);
                    }
                    return Err(RenderError::Timeout {
                        url: url.to_string(),
                        seconds: self.page_timeout.as_secs(),
                    });
                }
            }
        }

        Err(RenderError::Unavailable(format!(
            "session for {} could not be recovered",
            url
        )))
    }

    async fn shutdown(&self) {
        let clients: Vec<Client> = self.idle.lock().await.drain(..).collect();
        ::log::debug!("Closing {} WebDriver sessions", clients.len());
        for client in clients {
            if let Err(e) = client.close().await {
                ::log::warn!("Failed to close WebDriver session: {}", e);
            }
        }
    }
}

/// Loads the page and collects its source, title and resource timing entries
async fn render_with(client: &Client, url: &Url) -> Result<RenderedPage, CmdError> {
    let start = std::time::Instant::now();
    client.goto(url.as_str()).await?;
    let html = client.source().await?;

    let title = match client.title().await {
        Ok(title) if !title.trim().is_empty() => Some(title.trim().to_string()),
        Ok(_) => None,
        Err(e) => {
            ::log::debug!("No title for {}: {}", url, e);
            None
        }
    };

    let network_log = match client.execute(RESOURCE_SCRIPT, Vec::new()).await {
        Ok(value) => parse_resource_entries(&value),
        Err(e) => {
            ::log::debug!("Resource timing unavailable for {}: {}", url, e);
            Vec::new()
        }
    };

    ::log::debug!(
        "Rendered {} in {:.2} seconds ({} resources)",
        url,
        start.elapsed().as_secs_f64(),
        network_log.len()
    );

    Ok(RenderedPage {
        html,
        title,
        network_log,
    })
}

fn is_session_lost(error: &CmdError) -> bool {
    let message = error.to_string();
    message.contains("Unable to find session") || message.contains("invalid session id")
}

/// Browser capabilities for a headless or windowed session
fn capabilities(headless: bool) -> Map<String, Value> {
    let mut caps = Map::new();
    if headless {
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": ["--headless=new", "--no-sandbox", "--disable-dev-shm-usage", "--disable-gpu"] }),
        );
        caps.insert(
            "moz:firefoxOptions".to_string(),
            json!({ "args": ["-headless"] }),
        );
    }
    caps
}

async fn connect(webdriver_url: &str, headless: bool) -> Result<Client, String> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(capabilities(headless));
    builder.connect(webdriver_url).await.map_err(|e| e.to_string())
}

/// Connects to the WebDriver instance, trying common alternatives on failure
async fn connect_to_webdriver(webdriver_url: &str, headless: bool) -> Result<Client, RenderError> {
    match connect(webdriver_url, headless).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
        }
    }

    for url in FALLBACK_URLS.iter().filter(|u| **u != webdriver_url) {
        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = connect(url, headless).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(RenderError::Unavailable(format!(
        "no WebDriver server reachable at {} or fallbacks",
        webdriver_url
    )))
}

/// Replaces a lost session with a fresh one on the configured server
async fn attempt_reconnect(webdriver_url: &str, headless: bool) -> Result<Client, RenderError> {
    ::log::warn!("Attempting to reconnect WebDriver session");
    match connect(webdriver_url, headless).await {
        Ok(client) => {
            ::log::info!("Reconnected to WebDriver");
            Ok(client)
        }
        Err(e) => {
            ::log::error!("Failed to reconnect to WebDriver: {}", e);
            Err(RenderError::Unavailable(e))
        }
    }
}
