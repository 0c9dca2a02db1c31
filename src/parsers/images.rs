//! Image candidates, caption resolution and contextual block association

use crate::parsers::text::{element_text, first_srcset_candidate, normalize_whitespace};
use crate::results::{ImageDescriptor, MediaSource, TextBlock};
use scraper::ElementRef;
use url::Url;

/// Class names that mark an element as an image caption
const CAPTION_CLASSES: &[&str] = &[
    "caption",
    "wp-caption-text",
    "figcaption",
    "image-caption",
    "storycaption",
];

/// Attributes of an image-bearing element gathered during the document walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageCandidate {
    pub src: String,
    pub alt: String,
    pub title: String,
    pub aria_label: String,
    pub data_caption: String,
    /// Caption taken from a `figcaption` or caption-styled companion element
    pub explicit_caption: Option<String>,
    /// Index of the last text block emitted before this element
    pub preceding_block: Option<usize>,
}

impl ImageCandidate {
    /// Builds a candidate from an `img` element, or a `source` inside `picture`/`video`
    ///
    /// Returns `None` for other elements and for elements without a usable URL.
    pub fn from_element(el: ElementRef<'_>, preceding_block: Option<usize>) -> Option<Self> {
        let value = el.value();
        let src = match value.name() {
            "img" => value
                .attr("src")
                .filter(|s| !s.trim().is_empty())
                .or_else(|| value.attr("data-src"))
                .or_else(|| value.attr("srcset").and_then(first_srcset_candidate)),
            "source" if parent_is_media_container(el) => value
                .attr("src")
                .filter(|s| !s.trim().is_empty())
                .or_else(|| value.attr("srcset").and_then(first_srcset_candidate)),
            _ => None,
        }?;
        let src = src.trim();
        if src.is_empty() {
            return None;
        }

        // A <source> shares the describing attributes of its sibling <img>
        let described = if value.name() == "source" {
            sibling_img(el).unwrap_or(el)
        } else {
            el
        };

        let attr = |name: &str| {
            normalize_whitespace(described.value().attr(name).unwrap_or_default())
        };

        Some(Self {
            src: src.to_string(),
            alt: attr("alt"),
            title: attr("title"),
            aria_label: attr("aria-label"),
            data_caption: attr("data-caption"),
            explicit_caption: explicit_caption(el),
            preceding_block,
        })
    }

    /// Applies the caption priority chain
    ///
    /// explicit caption element, then `aria-label`, `data-caption`, `title`, `alt`,
    /// and finally the empty string.
    pub fn caption(&self) -> String {
        [
            self.explicit_caption.as_deref(),
            Some(self.aria_label.as_str()),
            Some(self.data_caption.as_str()),
            Some(self.title.as_str()),
            Some(self.alt.as_str()),
        ]
        .into_iter()
        .flatten()
        .find(|c| !c.is_empty())
        .unwrap_or_default()
        .to_string()
    }

    /// Resolves the candidate into a descriptor, or `None` if its URL is unusable
    pub fn into_descriptor(self, base: &Url) -> Option<ImageDescriptor> {
        let url = resolve_media_url(base, &self.src)?;
        let caption = self.caption();
        let mut descriptor = ImageDescriptor::new(url.to_string(), MediaSource::Dom);
        descriptor.alt = self.alt;
        descriptor.title = self.title;
        descriptor.caption = caption;
        descriptor.associated_block = self.preceding_block;
        Some(descriptor)
    }
}

/// Resolves a media reference to an absolute http(s) URL without fragment
pub fn resolve_media_url(base: &Url, src: &str) -> Option<Url> {
    let mut url = base.join(src.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Whether `url` contains one of the exclusion substrings, ignoring case
pub fn is_excluded(url: &str, patterns: &[String]) -> bool {
    let lower = url.to_ascii_lowercase();
    patterns
        .iter()
        .any(|p| !p.is_empty() && lower.contains(&p.to_ascii_lowercase()))
}

/// Associates each image with its contextual text block
///
/// The nearest preceding block wins; an image before every block gets the
/// first block; a page without blocks leaves the association empty.
pub fn associate_blocks(images: &mut [ImageDescriptor], blocks: &[TextBlock]) {
    for image in images.iter_mut() {
        if image.source != MediaSource::Dom {
            continue;
        }
        let index = match image.associated_block {
            Some(i) if i < blocks.len() => Some(i),
            _ if !blocks.is_empty() => Some(0),
            _ => None,
        };
        image.associated_block = index;
        image.associated_text = index.map(|i| blocks[i].text.clone());
    }
}

fn parent_is_media_container(el: ElementRef<'_>) -> bool {
    el.parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|p| matches!(p.value().name(), "picture" | "video"))
}

fn sibling_img(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let parent = el.parent().and_then(ElementRef::wrap)?;
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "img")
}

fn has_caption_class(el: ElementRef<'_>) -> bool {
    el.value().classes().any(|c| CAPTION_CLASSES.contains(&c))
}

fn is_caption(el: ElementRef<'_>) -> bool {
    el.value().name() == "figcaption" || has_caption_class(el)
}

/// Text of the first caption element among the siblings of `el`
fn sibling_caption(el: ElementRef<'_>) -> Option<String> {
    el.parent()
        .and_then(ElementRef::wrap)?
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|s| s.id() != el.id())
        .find(|s| is_caption(*s))
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Finds the caption element closest to the image
///
/// Outside a `figure` only the image's own container is searched. Inside one,
/// each wrapper between the image and the figure is tried from the inside out,
/// and the first caption anywhere in the figure is the last resort.
fn explicit_caption(el: ElementRef<'_>) -> Option<String> {
    // Images inside <picture> are positioned by the picture element
    let anchor = match el.parent().and_then(ElementRef::wrap) {
        Some(p) if p.value().name() == "picture" => p,
        _ => el,
    };

    let Some(figure) = anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "figure")
    else {
        return sibling_caption(anchor);
    };

    let mut current = anchor;
    while current.id() != figure.id() {
        if let Some(caption) = sibling_caption(current) {
            return Some(caption);
        }
        match current.parent().and_then(ElementRef::wrap) {
            Some(parent) => current = parent,
            None => break,
        }
    }

    figure
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|d| is_caption(*d))
        .map(element_text)
        .filter(|t| !t.is_empty())
}
