//! Link canonicalization and link record deduplication
//!
//! The canonical form produced here is the dedup key of the visited set, so two
//! URLs that point at the same resource must canonicalize to the same string.

use crate::results::{LinkEntry, LinkRecord};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// Reasons a raw link cannot become a canonical URL
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("empty link")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("link has no host: {0}")]
    MissingHost(String),

    #[error("could not resolve link {href}: {source}")]
    Parse {
        href: String,
        source: url::ParseError,
    },
}

/// Resolves `href` against `base` and canonicalizes the result
///
/// Non-http(s) schemes (`javascript:`, `mailto:`, `tel:`, `data:` ...) are rejected.
pub fn canonicalize(base: &Url, href: &str) -> Result<Url, LinkError> {
    let href = href.trim();
    if href.is_empty() {
        return Err(LinkError::Empty);
    }

    let resolved = base.join(href).map_err(|source| LinkError::Parse {
        href: href.to_string(),
        source,
    })?;

    canonical_url(resolved)
}

/// Parses an absolute URL string and canonicalizes it
pub fn canonicalize_str(url: &str) -> Result<Url, LinkError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(LinkError::Empty);
    }
    let parsed = Url::parse(url).map_err(|source| LinkError::Parse {
        href: url.to_string(),
        source,
    })?;
    canonical_url(parsed)
}

/// Canonicalizes an absolute URL
///
/// Strips the fragment, drops the default port and an empty query, and removes
/// the trailing slash of non-root paths. Lowercasing the host and resolving dot
/// segments is done by the `url` parser itself.
pub fn canonical_url(mut url: Url) -> Result<Url, LinkError> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(LinkError::UnsupportedScheme(other.to_string())),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(LinkError::MissingHost(url.to_string()));
    }

    url.set_fragment(None);

    if url.port().is_some() && url.port() == default_port(url.scheme()) {
        let _ = url.set_port(None);
    }

    if url.query() == Some("") {
        url.set_query(None);
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        url.set_path(&trimmed);
    }

    Ok(url)
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Deduplicates links by canonical URL, keeping first-seen order
///
/// Entries whose URL cannot be canonicalized are dropped. When a later entry for
/// the same URL carries anchor text and the kept one has none, the text is taken
/// from the later entry.
pub fn dedupe_links(links: &[LinkEntry]) -> Vec<LinkEntry> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut deduped: Vec<LinkEntry> = Vec::new();

    for link in links {
        let canonical = match canonicalize_str(&link.url) {
            Ok(url) => url.to_string(),
            Err(e) => {
                ::log::debug!("Dropping link {:?}: {}", link.url, e);
                continue;
            }
        };

        match index.get(&canonical) {
            Some(&i) => {
                if deduped[i].text.is_empty() && !link.text.is_empty() {
                    deduped[i].text = link.text.clone();
                }
            }
            None => {
                index.insert(canonical.clone(), deduped.len());
                deduped.push(LinkEntry {
                    url: canonical,
                    text: link.text.clone(),
                });
            }
        }
    }

    deduped
}

/// Returns a copy of `record` with its links deduplicated
pub fn dedupe_record(record: &LinkRecord) -> LinkRecord {
    LinkRecord {
        url: record.url.clone(),
        links: dedupe_links(&record.links),
    }
}
