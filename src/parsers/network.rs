use serde::{Deserialize, Serialize};
use url::Url;

const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".bmp", ".ico", ".avif",
];

/// A resource observed by the renderer while loading a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub url: String,
    /// What requested the resource (`img`, `css`, `script`, ...)
    #[serde(default)]
    pub initiator: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl NetworkEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            initiator: None,
            mime_type: None,
        }
    }

    /// Whether the entry looks like an image download
    pub fn is_image(&self) -> bool {
        if let Some(mime) = &self.mime_type {
            return mime.to_ascii_lowercase().starts_with("image/");
        }
        if self.initiator.as_deref() == Some("img") {
            return true;
        }
        has_image_extension(&self.url)
    }
}

/// Checks the URL path (query ignored) against known image extensions
pub fn has_image_extension(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase(),
    };
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Converts the JSON returned by the browser's resource timing API
///
/// Accepts an array of objects with `name` and optional `initiatorType` and
/// `mimeType` fields; anything else is ignored.
pub fn parse_resource_entries(value: &serde_json::Value) -> Vec<NetworkEntry> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let url = item.get("name")?.as_str()?;
            Some(NetworkEntry {
                url: url.to_string(),
                initiator: item
                    .get("initiatorType")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                mime_type: item
                    .get("mimeType")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            })
        })
        .collect()
}

/// Image URLs from a network log, resolved against `base`
///
/// When `patterns` is non-empty an entry must contain at least one of them.
pub fn media_urls(entries: &[NetworkEntry], base: &Url, patterns: &[String]) -> Vec<Url> {
    entries
        .iter()
        .filter(|entry| entry.is_image())
        .filter(|entry| patterns.is_empty() || patterns.iter().any(|p| entry.url.contains(p.as_str())))
        .filter_map(|entry| base.join(&entry.url).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_detection() {
        assert!(NetworkEntry::new("https://ex.com/a/photo.JPG?v=2").is_image());
        assert!(!NetworkEntry::new("https://ex.com/app.js").is_image());

        let by_initiator = NetworkEntry {
            initiator: Some("img".into()),
            ..NetworkEntry::new("https://ex.com/render?id=4")
        };
        assert!(by_initiator.is_image());

        let by_mime = NetworkEntry {
            mime_type: Some("text/html".into()),
            ..NetworkEntry::new("https://ex.com/fake.png")
        };
        assert!(!by_mime.is_image());
    }

    #[test]
    fn test_parse_resource_entries() {
        let value = json!([
            {"name": "https://ex.com/a.png", "initiatorType": "img"},
            {"name": "https://ex.com/b.css"},
            {"initiatorType": "script"},
            "garbage"
        ]);
        let entries = parse_resource_entries(&value);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].initiator.as_deref(), Some("img"));
        assert_eq!(entries[1].url, "https://ex.com/b.css");

        assert!(parse_resource_entries(&json!(null)).is_empty());
    }

    #[test]
    fn test_media_urls_with_patterns() {
        let base = Url::parse("https://ex.com/page").unwrap();
        let entries = vec![
            NetworkEntry::new("https://ex.com/sites/default/files/a.png"),
            NetworkEntry::new("https://ex.com/theme/b.png"),
            NetworkEntry::new("https://ex.com/sites/default/files/doc.pdf"),
        ];

        let all = media_urls(&entries, &base, &[]);
        assert_eq!(all.len(), 2);

        let scoped = media_urls(&entries, &base, &["sites/default/files".to_string()]);
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].as_str(), "https://ex.com/sites/default/files/a.png");
    }
}
