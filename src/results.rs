use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Kind of a text block extracted from a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    /// `h1` to `h6`
    Heading { level: u8 },
    /// `p`
    Paragraph,
}

/// A paragraph or heading in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(flatten)]
    pub kind: BlockKind,
    pub text: String,
}

impl TextBlock {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.into(),
        }
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Heading { level },
            text: text.into(),
        }
    }
}

/// Where an image candidate was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSource {
    /// Present in the rendered DOM
    Dom,
    /// Only observed in the renderer's network log
    NetworkLog,
}

/// An image referenced by a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// Resolved absolute URL of the image
    pub url: String,
    pub alt: String,
    pub title: String,
    /// Caption resolved through the caption priority chain
    pub caption: String,
    pub source: MediaSource,
    /// Index into `ContentRecord::blocks` of the contextual block
    pub associated_block: Option<usize>,
    /// Text of the contextual block
    pub associated_text: Option<String>,
    /// Set once the image has been downloaded
    pub local_path: Option<PathBuf>,
    pub content_type: Option<String>,
    pub size_bytes: Option<u64>,
}

impl ImageDescriptor {
    /// Create a descriptor that has not been downloaded yet
    pub fn new(url: String, source: MediaSource) -> Self {
        Self {
            url,
            alt: String::new(),
            title: String::new(),
            caption: String::new(),
            source,
            associated_block: None,
            associated_text: None,
            local_path: None,
            content_type: None,
            size_bytes: None,
        }
    }
}

/// Structured content extracted from one rendered page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub url: String,
    pub title: Option<String>,
    pub blocks: Vec<TextBlock>,
    pub images: Vec<ImageDescriptor>,
}

impl ContentRecord {
    /// A record with nothing extracted
    pub fn empty(url: &str) -> Self {
        Self {
            url: url.to_string(),
            title: None,
            blocks: Vec::new(),
            images: Vec::new(),
        }
    }
}

/// An outbound link with its anchor text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub url: String,
    #[serde(default)]
    pub text: String,
}

/// Every outbound link discovered on a page, followed or not
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
}

impl LinkRecord {
    pub fn new(url: &str, links: Vec<LinkEntry>) -> Self {
        Self {
            url: url.to_string(),
            links,
        }
    }
}

/// One page to crawl at a given depth
///
/// `parent_path` holds the output node slugs from the output root down to the
/// node of the page that discovered this one. Tasks are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    url: Url,
    depth: usize,
    parent_path: Vec<String>,
}

impl CrawlTask {
    /// The seed task at depth 0
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            parent_path: Vec::new(),
        }
    }

    /// A task for a page discovered on the page stored at `node_path`
    pub fn child(url: Url, depth: usize, node_path: Vec<String>) -> Self {
        Self {
            url,
            depth,
            parent_path: node_path,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent_path(&self) -> &[String] {
        &self.parent_path
    }
}

/// Why a task ended in `failed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// Disallowed by robots.txt
    RobotsDenied,
    /// The renderer could not produce the page
    Render(String),
    /// The output node could not be written
    Persist(String),
    /// Depth guard tripped before dispatch
    DepthExceeded,
    /// Processing the page panicked
    Internal(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::RobotsDenied => write!(f, "disallowed by robots.txt"),
            FailureReason::Render(e) => write!(f, "render failed: {}", e),
            FailureReason::Persist(e) => write!(f, "persist failed: {}", e),
            FailureReason::DepthExceeded => write!(f, "depth exceeded"),
            FailureReason::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

/// A failed task as reported in the run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPage {
    pub url: String,
    pub depth: usize,
    #[serde(flatten)]
    pub reason: FailureReason,
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub seed_url: String,
    pub completed: usize,
    pub failed: usize,
    /// Queued tasks that were never dispatched because the run was stopped
    pub skipped: usize,
    /// Output node directories relative to the output root
    pub nodes: Vec<PathBuf>,
    pub failures: Vec<FailedPage>,
}
