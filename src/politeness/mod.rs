//! robots.txt permission and per-host request spacing

pub mod robots;

use crate::crawlers::http::HttpFetch;
use robots::{MAX_CRAWL_DELAY, RobotsPolicy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;
use url::Url;

/// Last request time of one host
type HostSlot = Arc<Mutex<Option<Instant>>>;

/// Decides whether a URL may be fetched and spaces requests to the same host
///
/// robots.txt is fetched at most once per origin for the lifetime of the gate,
/// even when many workers ask for the same origin at once.
pub struct PolitenessGate {
    fetcher: Arc<dyn HttpFetch>,
    user_agent: String,
    delay: Duration,
    respect_robots: bool,
    policies: Mutex<HashMap<String, Arc<OnceCell<RobotsPolicy>>>>,
    crawl_delays: Mutex<HashMap<String, Duration>>,
    hosts: Mutex<HashMap<String, HostSlot>>,
}

impl PolitenessGate {
    pub fn new(
        fetcher: Arc<dyn HttpFetch>,
        user_agent: impl Into<String>,
        delay: Duration,
        respect_robots: bool,
    ) -> Self {
        Self {
            fetcher,
            user_agent: user_agent.into(),
            delay: delay.min(MAX_CRAWL_DELAY),
            respect_robots,
            policies: Mutex::new(HashMap::new()),
            crawl_delays: Mutex::new(HashMap::new()),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Whether robots.txt of the URL's origin allows fetching it
    pub async fn permitted(&self, url: &Url) -> bool {
        if !self.respect_robots {
            return true;
        }

        let origin = url.origin().ascii_serialization();
        let cell = {
            let mut policies = self.policies.lock().await;
            Arc::clone(policies.entry(origin).or_default())
        };
        let policy = cell.get_or_init(|| self.load_policy(url)).await;

        let allowed = policy.is_allowed(url, &self.user_agent);
        if !allowed {
            ::log::info!("robots.txt disallows {}", url);
        }
        allowed
    }

    /// Waits until the host's delay has elapsed since its previous request
    ///
    /// Requests to the same host are serialized here; other hosts are unaffected.
    pub async fn throttle(&self, host: &str) {
        let host = host.to_ascii_lowercase();
        let slot = {
            let mut hosts = self.hosts.lock().await;
            Arc::clone(hosts.entry(host.clone()).or_default())
        };
        let delay = self.delay_for(&host).await;

        let mut last = slot.lock().await;
        if let Some(previous) = *last {
            let ready = previous.checked_add(delay).unwrap_or(previous);
            if ready > Instant::now() {
                ::log::debug!(
                    "Waiting {:.2}s before next request to {}",
                    (ready - Instant::now()).as_secs_f64(),
                    host
                );
                tokio::time::sleep_until(ready).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Configured delay, raised to the host's `Crawl-delay` when that is longer
    pub async fn delay_for(&self, host: &str) -> Duration {
        let crawl_delay = self
            .crawl_delays
            .lock()
            .await
            .get(&host.to_ascii_lowercase())
            .copied();
        crawl_delay.map_or(self.delay, |d| d.max(self.delay))
    }

    async fn load_policy(&self, url: &Url) -> RobotsPolicy {
        let policy = match self.fetch_policy(url).await {
            Ok(policy) => policy,
            Err(reason) => {
                ::log::warn!("{}; allowing all URLs of {}", reason, url.origin().ascii_serialization());
                RobotsPolicy::allow_all()
            }
        };

        if let (Some(delay), Some(host)) = (policy.crawl_delay(), url.host_str()) {
            ::log::info!("Crawl-delay of {:.2}s for {}", delay.as_secs_f64(), host);
            self.crawl_delays
                .lock()
                .await
                .insert(host.to_ascii_lowercase(), delay);
        }
        policy
    }

    async fn fetch_policy(&self, url: &Url) -> Result<RobotsPolicy, String> {
        let robots_url = url
            .join("/robots.txt")
            .map_err(|e| format!("Cannot build robots.txt URL for {}: {}", url, e))?;
        ::log::debug!("Fetching {}", robots_url);

        let response = self
            .fetcher
            .get(&robots_url)
            .await
            .map_err(|e| format!("Failed to fetch {}: {}", robots_url, e))?;
        if !response.is_success() {
            return Err(format!("{} returned status {}", robots_url, response.status));
        }

        Ok(RobotsPolicy::parse(&response.text(), &self.user_agent))
    }
}
