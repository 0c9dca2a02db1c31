//! robots.txt rules for one origin

use crate::config::MAX_DELAY_SECONDS;
use robotstxt::DefaultMatcher;
use std::time::Duration;
use url::Url;

/// Longer `Crawl-delay` values are clamped to this
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(MAX_DELAY_SECONDS as u64);

/// Parsed robots.txt of one origin
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotsPolicy {
    /// Raw robots.txt body; `None` allows everything
    body: Option<String>,
    crawl_delay: Option<Duration>,
}

impl RobotsPolicy {
    /// A policy that allows every URL, used when robots.txt is unavailable
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses `body` for the given user agent
    pub fn parse(body: &str, user_agent: &str) -> Self {
        Self {
            body: Some(body.to_string()),
            crawl_delay: crawl_delay(body, user_agent),
        }
    }

    pub fn is_allowed(&self, url: &Url, user_agent: &str) -> bool {
        match self.body.as_deref() {
            None => true,
            Some(body) if body.trim().is_empty() => true,
            Some(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, user_agent, url.as_str())
            }
        }
    }

    /// `Crawl-delay` that applies to the user agent the policy was parsed for
    pub fn crawl_delay(&self) -> Option<Duration> {
        self.crawl_delay
    }
}

/// The product token of a user agent, e.g. `page-tree` for `page-tree/0.1.0`
fn product_token(user_agent: &str) -> String {
    user_agent
        .chars()
        .take_while(|c| c.is_ascii_alphabetic() || *c == '-' || *c == '_')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Finds the `Crawl-delay` of the group naming our agent, else of the `*` group
///
/// Consecutive `User-agent` lines form one group; any other directive closes the
/// list of agents for that group.
fn crawl_delay(body: &str, user_agent: &str) -> Option<Duration> {
    let agent = product_token(user_agent);
    let mut group: Vec<String> = Vec::new();
    let mut in_rules = false;
    let mut for_agent = None;
    let mut for_wildcard = None;

    for line in body.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        if key == "user-agent" {
            if in_rules {
                group.clear();
                in_rules = false;
            }
            group.push(value.to_ascii_lowercase());
            continue;
        }

        in_rules = true;
        if key != "crawl-delay" {
            continue;
        }
        let Some(delay) = value
            .parse::<f64>()
            .ok()
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
        else {
            ::log::debug!("Ignoring malformed or out-of-range Crawl-delay {:?}", value);
            continue;
        };
        let delay = delay.min(MAX_CRAWL_DELAY);
        if !agent.is_empty() && group.iter().any(|ua| *ua == agent) {
            for_agent = Some(delay);
        } else if group.iter().any(|ua| ua == "*") {
            for_wildcard = Some(delay);
        }
    }

    for_agent.or(for_wildcard)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "page-tree/0.1.0";

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_disallow_rules() {
        let policy = RobotsPolicy::parse("User-agent: *\nDisallow: /private\n", UA);
        assert!(policy.is_allowed(&url("https://ex.com/public"), UA));
        assert!(!policy.is_allowed(&url("https://ex.com/private/page"), UA));
    }

    #[test]
    fn test_agent_specific_group_wins() {
        let body = "User-agent: page-tree\nDisallow: /\n\nUser-agent: *\nAllow: /\n";
        let policy = RobotsPolicy::parse(body, UA);
        assert!(!policy.is_allowed(&url("https://ex.com/anything"), UA));
        assert!(policy.is_allowed(&url("https://ex.com/anything"), "otherbot/1.0"));
    }

    #[test]
    fn test_empty_and_missing_allow_everything() {
        assert!(RobotsPolicy::allow_all().is_allowed(&url("https://ex.com/x"), UA));
        assert!(RobotsPolicy::parse("", UA).is_allowed(&url("https://ex.com/x"), UA));
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let policy = RobotsPolicy::parse("User-agent: *\nCrawl-delay: 2.5\nDisallow:\n", UA);
        assert_eq!(policy.crawl_delay(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_crawl_delay_prefers_own_group() {
        let body = "User-agent: *\nCrawl-delay: 1\n\nUser-agent: otherbot\nUser-agent: page-tree\nCrawl-delay: 7\n";
        let policy = RobotsPolicy::parse(body, UA);
        assert_eq!(policy.crawl_delay(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_crawl_delay_other_agent_only() {
        let body = "User-agent: otherbot\nCrawl-delay: 9\n";
        assert_eq!(RobotsPolicy::parse(body, UA).crawl_delay(), None);

        let body = "User-agent: *\nCrawl-delay: soon\n";
        assert_eq!(RobotsPolicy::parse(body, UA).crawl_delay(), None);
    }

    #[test]
    fn test_crawl_delay_out_of_range() {
        for value in ["1e20", "-3", "NaN", "inf"] {
            let body = format!("User-agent: *\nCrawl-delay: {}\n", value);
            assert_eq!(RobotsPolicy::parse(&body, UA).crawl_delay(), None, "{}", value);
        }

        let body = "User-agent: *\nCrawl-delay: 86400000\n";
        assert_eq!(
            RobotsPolicy::parse(body, UA).crawl_delay(),
            Some(MAX_CRAWL_DELAY)
        );
    }
}
