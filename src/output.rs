//! Output tree on disk
//!
//! Every completed page becomes a directory holding `content.json` and
//! `links.json`, nested below the directory of the page that discovered it.

use crate::links;
use crate::results::{ContentRecord, CrawlSummary, LinkRecord};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONTENT_FILE: &str = "content.json";
pub const LINKS_FILE: &str = "links.json";
pub const SUMMARY_FILE: &str = "crawl_summary.json";
/// Directory inside an output node that holds downloaded media
pub const IMAGES_DIR: &str = "images";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl PersistError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Creates the output root and checks that it accepts new files
pub fn ensure_output_root(root: &Path) -> Result<(), PersistError> {
    fs::create_dir_all(root).map_err(|e| PersistError::io(root, e))?;

    let probe = root.join(".page-tree-write-check");
    fs::write(&probe, b"").map_err(|e| PersistError::io(&probe, e))?;
    fs::remove_file(&probe).map_err(|e| PersistError::io(&probe, e))?;
    Ok(())
}

/// Directory of an output node: root, then the ancestor slugs, then its own slug
pub fn node_dir(root: &Path, node_path: &[String]) -> PathBuf {
    node_path
        .iter()
        .fold(root.to_path_buf(), |dir, slug| dir.join(slug))
}

/// Writes both records of a page and its `images/` directory, replacing earlier files
pub async fn write_node(
    dir: &Path,
    content: &ContentRecord,
    links: &LinkRecord,
) -> Result<(), PersistError> {
    let images = dir.join(IMAGES_DIR);
    tokio::fs::create_dir_all(&images)
        .await
        .map_err(|e| PersistError::io(&images, e))?;
    write_json(&dir.join(CONTENT_FILE), content).await?;
    write_json(&dir.join(LINKS_FILE), links).await
}

/// Removes what a failed page left in its node directory
pub async fn discard_node(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => ::log::debug!("Removed incomplete node {}", dir.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => ::log::warn!("Failed to remove incomplete node {}: {}", dir.display(), e),
    }
}

/// Writes the run summary at the output root
pub async fn write_summary(root: &Path, summary: &CrawlSummary) -> Result<PathBuf, PersistError> {
    let path = root.join(SUMMARY_FILE);
    write_json(&path, summary).await?;
    Ok(path)
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| PersistError::json(path, e))?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| PersistError::io(path, e))
}

/// Dedupes the links of a stored `LinkRecord` file by canonical URL
///
/// The result goes to `output`, or to stdout when no output path is given.
pub fn dedupe_links_file(input: &Path, output: Option<&Path>) -> Result<LinkRecord, PersistError> {
    let raw = fs::read_to_string(input).map_err(|e| PersistError::io(input, e))?;
    let record: LinkRecord = serde_json::from_str(&raw).map_err(|e| PersistError::json(input, e))?;
    let deduped = links::dedupe_record(&record);

    ::log::info!(
        "Deduplicated {} links to {} in {}",
        record.links.len(),
        deduped.links.len(),
        input.display()
    );

    let json = serde_json::to_string_pretty(&deduped).map_err(|e| PersistError::json(input, e))?;
    match output {
        Some(path) => fs::write(path, json).map_err(|e| PersistError::io(path, e))?,
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", json).map_err(|e| PersistError::io(Path::new("<stdout>"), e))?;
        }
    }
    Ok(deduped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{LinkEntry, TextBlock};

    fn entry(url: &str, text: &str) -> LinkEntry {
        LinkEntry {
            url: url.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_node_dir_nests_slugs() {
        let dir = node_dir(Path::new("/out"), &["example_com".into(), "about".into()]);
        assert_eq!(dir, PathBuf::from("/out/example_com/about"));
    }

    #[tokio::test]
    async fn test_write_node_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let dir = node_dir(root.path(), &["example_com".into()]);
        let mut content = ContentRecord::empty("https://example.com/");
        content.blocks.push(TextBlock::paragraph("Hello"));
        let links = LinkRecord::new("https://example.com/", vec![entry("https://example.com/a", "A")]);

        write_node(&dir, &content, &links).await.unwrap();
        write_node(&dir, &content, &links).await.unwrap();
        assert!(dir.join(IMAGES_DIR).is_dir());

        let stored: ContentRecord =
            serde_json::from_str(&fs::read_to_string(dir.join(CONTENT_FILE)).unwrap()).unwrap();
        assert_eq!(stored, content);
        let stored: LinkRecord =
            serde_json::from_str(&fs::read_to_string(dir.join(LINKS_FILE)).unwrap()).unwrap();
        assert_eq!(stored, links);
    }

    #[tokio::test]
    async fn test_discard_node_removes_partial_media() {
        let root = tempfile::tempdir().unwrap();
        let dir = node_dir(root.path(), &["example_com".into()]);
        fs::create_dir_all(dir.join(IMAGES_DIR)).unwrap();
        fs::write(dir.join(IMAGES_DIR).join("a.png"), b"png").unwrap();

        discard_node(&dir).await;
        assert!(!dir.exists());
        assert!(root.path().is_dir());

        // Nothing to remove is not an error
        discard_node(&dir).await;
    }

    #[test]
    fn test_ensure_output_root_creates_directory() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b");
        ensure_output_root(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(fs::read_dir(&nested).unwrap().count(), 0);
    }

    #[test]
    fn test_ensure_output_root_rejects_file() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("taken");
        fs::write(&file, b"x").unwrap();
        assert!(ensure_output_root(&file).is_err());
    }

    #[test]
    fn test_dedupe_links_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("links.json");
        let output = dir.path().join("deduped.json");
        let record = LinkRecord::new(
            "http://ex.com/",
            vec![
                entry("http://ex.com/a/", ""),
                entry("http://ex.com/b", "B"),
                entry("http://ex.com:80/a", "A"),
                entry("http://ex.com/a#frag", "other"),
            ],
        );
        fs::write(&input, serde_json::to_string(&record).unwrap()).unwrap();

        let deduped = dedupe_links_file(&input, Some(&output)).unwrap();
        let stored: LinkRecord =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();

        assert_eq!(stored, deduped);
        assert_eq!(
            deduped.links,
            vec![entry("http://ex.com/a", "A"), entry("http://ex.com/b", "B")]
        );
    }

    #[test]
    fn test_dedupe_links_file_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("links.json");
        fs::write(&input, "[not json").unwrap();
        assert!(matches!(
            dedupe_links_file(&input, None),
            Err(PersistError::Json { .. })
        ));
    }
}
