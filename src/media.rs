//! Best-effort download of page media into an output node

use crate::crawlers::http::{FetchError, HttpFetch};
use crate::output::IMAGES_DIR;
use crate::results::ImageDescriptor;
use crate::utils::{extension_for, sanitize, unique_file_name};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid media URL {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Not an image or video: {0}")]
    ContentType(String),

    #[error("Failed to write media file: {0}")]
    Io(#[from] std::io::Error),
}

/// Downloads image descriptors through an `HttpFetch`
pub struct MediaFetcher {
    fetcher: Arc<dyn HttpFetch>,
}

impl MediaFetcher {
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self { fetcher }
    }

    /// Downloads every image into `node_dir/images`
    ///
    /// A failed download leaves `local_path` unset and never fails the page.
    /// Returns the number of files saved.
    pub async fn fetch_all(&self, images: &mut [ImageDescriptor], node_dir: &Path) -> usize {
        let dir = node_dir.join(IMAGES_DIR);
        let mut saved = 0;

        for (index, image) in images.iter_mut().enumerate() {
            match self.fetch_one(image, &dir, index + 1).await {
                Ok(path) => {
                    ::log::debug!("Saved {} as {}", image.url, path.display());
                    image.local_path = Some(path);
                    saved += 1;
                }
                Err(e) => {
                    ::log::warn!("Failed to download {}: {}", image.url, e);
                    image.local_path = None;
                }
            }
        }
        saved
    }

    /// Returns the saved file's path relative to the node directory
    async fn fetch_one(
        &self,
        image: &mut ImageDescriptor,
        dir: &Path,
        index: usize,
    ) -> Result<PathBuf, MediaError> {
        let url = Url::parse(&image.url).map_err(|_| MediaError::InvalidUrl(image.url.clone()))?;
        let response = self.fetcher.get(&url).await?;

        if !response.is_success() {
            return Err(MediaError::Status(response.status));
        }
        if let Some(content_type) = response.content_type.as_deref() {
            if !(content_type.starts_with("image/") || content_type.starts_with("video/")) {
                return Err(MediaError::ContentType(content_type.to_string()));
            }
        }

        tokio::fs::create_dir_all(dir).await?;
        let wanted = file_name_for(&url, response.content_type.as_deref(), index);
        let name = unique_file_name(dir, &wanted);
        tokio::fs::write(dir.join(&name), &response.body).await?;

        image.content_type = response.content_type;
        image.size_bytes = Some(response.body.len() as u64);
        Ok(Path::new(IMAGES_DIR).join(name))
    }
}

/// File name taken from the URL's last path segment
///
/// Falls back to `image_<index>.<ext>` when the URL has no usable name, and
/// takes the extension from the content type when the name has none.
fn file_name_for(url: &Url, content_type: Option<&str>, index: usize) -> String {
    let last = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .unwrap_or_default();

    let (stem, ext) = match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (sanitize(stem), sanitize(&ext.to_ascii_lowercase()))
        }
        _ => (sanitize(last), extension_for(content_type).to_string()),
    };

    let mut stem: String = stem.chars().take(100).collect();
    if stem.trim_matches('_').is_empty() {
        stem = format!("image_{}", index);
    }
    format!("{}.{}", stem, ext)
}
