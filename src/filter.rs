use crate::config::CrawlConfig;
use regex::Regex;
use serde::Serialize;
use url::Url;

/// Static assets that are never crawled as pages
const ASSET_PATTERN: &str = r"(?i)\.(jpg|jpeg|png|gif|webp|css|js|ico|svg|woff|woff2|ttf|eot|pdf|zip|mp4|mp3)$";

/// Scope and pattern rules a link must pass before it becomes a task
#[derive(Debug, Clone)]
pub struct UrlFilterConfig {
    /// Lets links leave `required_host`; with no host set, any host passes
    pub allow_external: bool,
    pub required_host: Option<String>,
    /// Paths must start with this prefix
    pub required_path_prefix: Option<String>,
    /// When non-empty, a URL must match at least one of these
    pub include_patterns: Vec<String>,
    /// Checked before `include_patterns`
    pub exclude_patterns: Vec<String>,
}

impl Default for UrlFilterConfig {
    /// Same-host only, with static assets excluded
    fn default() -> Self {
        Self {
            allow_external: false,
            required_host: None,
            required_path_prefix: None,
            include_patterns: Vec::new(),
            exclude_patterns: vec![ASSET_PATTERN.to_string()],
        }
    }
}

/// Why a discovered link was not turned into a crawl task
///
/// Reasons are checked in declaration order, so a link that is both out of
/// scope and too deep is reported as `OutOfScope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Host or path prefix outside the configured scope
    OutOfScope,
    /// Rejected by an include/exclude pattern
    Filtered,
    /// Child depth would exceed `max_depth`
    DepthExceeded,
    /// Already pending, done or failed in the visited set
    AlreadyVisited,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::OutOfScope => "out of scope",
            SkipReason::Filtered => "filtered",
            SkipReason::DepthExceeded => "depth exceeded",
            SkipReason::AlreadyVisited => "already visited",
        };
        f.write_str(s)
    }
}

/// Compiled form of a `UrlFilterConfig`
#[derive(Debug)]
pub struct UrlFilter {
    config: UrlFilterConfig,
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl UrlFilter {
    /// Compiles the include and exclude patterns
    pub fn new(config: UrlFilterConfig) -> Result<Self, regex::Error> {
        let include_regexes = config
            .include_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude_regexes = config
            .exclude_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            include_regexes,
            exclude_regexes,
        })
    }

    /// Builds the filter for a crawl rooted at `seed`
    pub fn for_crawl(seed: &Url, config: &CrawlConfig) -> Result<Self, regex::Error> {
        let mut exclude_patterns = vec![ASSET_PATTERN.to_string()];
        exclude_patterns.extend(config.exclude_patterns.iter().cloned());

        Self::new(UrlFilterConfig {
            allow_external: config.allow_external,
            required_host: if config.allow_external {
                None
            } else {
                seed.host_str().map(|h| h.to_string())
            },
            required_path_prefix: config.path_prefix.clone(),
            include_patterns: config.include_patterns.clone(),
            exclude_patterns,
        })
    }

    /// Checks scope and patterns for a canonical URL
    pub fn check(&self, url: &Url) -> Result<(), SkipReason> {
        if !self.is_in_host_scope(url) || !self.is_in_path_scope(url) {
            return Err(SkipReason::OutOfScope);
        }

        // Exclusions take precedence over inclusions
        let url_str = url.as_str();
        if self.exclude_regexes.iter().any(|r| r.is_match(url_str)) {
            return Err(SkipReason::Filtered);
        }

        if !self.include_regexes.is_empty()
            && !self.include_regexes.iter().any(|r| r.is_match(url_str))
        {
            return Err(SkipReason::Filtered);
        }

        Ok(())
    }

    pub fn should_crawl(&self, url: &Url) -> bool {
        self.check(url).is_ok()
    }

    fn is_in_host_scope(&self, url: &Url) -> bool {
        match &self.config.required_host {
            Some(required) => url
                .host_str()
                .is_some_and(|host| host.eq_ignore_ascii_case(required)),
            None => self.config.allow_external,
        }
    }

    fn is_in_path_scope(&self, url: &Url) -> bool {
        match &self.config.required_path_prefix {
            Some(prefix) => url.path().starts_with(prefix.as_str()),
            None => true,
        }
    }
}
