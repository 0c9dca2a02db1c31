//! Content extraction from rendered pages
//!
//! Extraction is a pure function of the rendered HTML, the page URL and the
//! renderer's network log: the same input always yields the same records.

pub mod html;
pub mod images;
pub mod network;
pub mod text;

#[cfg(test)]
mod tests;

use crate::config::CrawlConfig;
use crate::links;
use crate::results::{ContentRecord, ImageDescriptor, LinkRecord, MediaSource};
use network::NetworkEntry;
use std::collections::HashSet;
use url::Url;

/// Options that shape extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Case-insensitive substrings that drop an image URL
    pub image_exclude_patterns: Vec<String>,
    /// Substrings a network-log media URL must contain (empty accepts all)
    pub network_media_patterns: Vec<String>,
}

impl ExtractOptions {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            image_exclude_patterns: config.image_exclude_patterns.clone(),
            network_media_patterns: config.network_media_patterns.clone(),
        }
    }
}

/// Result of extracting one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageExtract {
    pub content: ContentRecord,
    pub links: LinkRecord,
}

impl PageExtract {
    fn empty(url: &Url) -> Self {
        Self {
            content: ContentRecord::empty(url.as_str()),
            links: LinkRecord::new(url.as_str(), Vec::new()),
        }
    }
}

/// Extracts the content record and link record of a rendered page
///
/// `title_hint` is used when the document has no `<title>`. Input that cannot
/// be parsed into a document yields empty records.
pub fn extract(
    html: &str,
    page_url: &Url,
    title_hint: Option<&str>,
    network_log: &[NetworkEntry],
    options: &ExtractOptions,
) -> PageExtract {
    if html.trim().is_empty() {
        ::log::error!("Empty document for {}, recording empty content", page_url);
        return PageExtract::empty(page_url);
    }

    let walk = html::walk(html, page_url);
    let base = walk.base.clone().unwrap_or_else(|| page_url.clone());

    let mut seen = HashSet::new();
    let mut descriptors: Vec<ImageDescriptor> = walk
        .images
        .into_iter()
        .filter_map(|candidate| candidate.into_descriptor(&base))
        .filter(|d| seen.insert(d.url.clone()))
        .collect();

    for url in network::media_urls(network_log, &base, &options.network_media_patterns) {
        let mut url = url;
        url.set_fragment(None);
        if seen.insert(url.to_string()) {
            descriptors.push(ImageDescriptor::new(url.to_string(), MediaSource::NetworkLog));
        }
    }

    descriptors.retain(|d| {
        let excluded = images::is_excluded(&d.url, &options.image_exclude_patterns);
        if excluded {
            ::log::debug!("Skipping excluded media: {}", d.url);
        }
        !excluded
    });

    images::associate_blocks(&mut descriptors, &walk.blocks);

    let title = walk.title.or_else(|| {
        title_hint
            .map(text::normalize_whitespace)
            .filter(|t| !t.is_empty())
    });

    ::log::debug!(
        "Extracted {} blocks, {} images and {} links from {}",
        walk.blocks.len(),
        descriptors.len(),
        walk.links.len(),
        page_url
    );

    PageExtract {
        content: ContentRecord {
            url: page_url.to_string(),
            title,
            blocks: walk.blocks,
            images: descriptors,
        },
        links: LinkRecord::new(page_url.as_str(), links::dedupe_links(&walk.links)),
    }
}
