use std::path::Path;
use url::Url;

/// Longest slug or file stem written to disk
const MAX_NAME_LEN: usize = 100;

/// Replaces every character outside `[A-Za-z0-9_-]` with `_`
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// 64-bit FNV-1a, stable across runs and platforms
pub fn fnv1a(data: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    data.bytes()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

/// Directory name of the output node for a canonical URL
///
/// Path segments are joined with `_`; a query adds a digest suffix so pages
/// that differ only by query do not collide. An empty path uses the host.
pub fn slug_for(url: &Url) -> String {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let mut slug = if segments.is_empty() {
        sanitize(url.host_str().unwrap_or("root"))
    } else {
        sanitize(&segments.join("_"))
    };
    truncate(&mut slug, MAX_NAME_LEN);

    if let Some(query) = url.query() {
        let suffix = format!("_q{:016x}", fnv1a(query));
        truncate(&mut slug, MAX_NAME_LEN - suffix.len());
        slug.push_str(&suffix);
    }
    slug
}

/// Picks `name` or the first free `stem_N.ext` inside `dir`
pub fn unique_file_name(dir: &Path, name: &str) -> String {
    if !dir.join(name).exists() {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (1..)
        .map(|n| match ext {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        })
        .find(|candidate| !dir.join(candidate).exists())
        .unwrap_or_else(|| name.to_string())
}

/// File extension for a media content type
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type.unwrap_or_default() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/avif" => "avif",
        "image/bmp" => "bmp",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        _ => "bin",
    }
}

/// Keeps at most `max` bytes without splitting a character
fn truncate(s: &mut String, max: usize) {
    if s.len() > max {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_slug_from_path() {
        assert_eq!(
            slug_for(&url("https://ex.com/food-and-culture/cuisines-of-india")),
            "food-and-culture_cuisines-of-india"
        );
        assert_eq!(slug_for(&url("https://ex.com/a%20b/c.html")), "a_20b_c_html");
    }

    #[test]
    fn test_slug_of_root_is_host() {
        assert_eq!(slug_for(&url("https://www.ex.com/")), "www_ex_com");
    }

    #[test]
    fn test_slug_query_digest() {
        let a = slug_for(&url("https://ex.com/list?page=1"));
        let b = slug_for(&url("https://ex.com/list?page=2"));
        assert_ne!(a, b);
        assert!(a.starts_with("list_q"));
        assert_eq!(a, slug_for(&url("https://ex.com/list?page=1")));
    }

    #[test]
    fn test_slug_length_capped() {
        let long = format!("https://ex.com/{}", "x".repeat(300));
        assert_eq!(slug_for(&url(&long)).len(), MAX_NAME_LEN);

        let long_query = format!("{}?q=1", long);
        let slug = slug_for(&url(&long_query));
        assert_eq!(slug.len(), MAX_NAME_LEN);
        assert!(slug.contains("_q"));
    }

    #[test]
    fn test_unique_file_name() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_file_name(dir.path(), "a.png"), "a.png");

        fs::write(dir.path().join("a.png"), b"x").unwrap();
        assert_eq!(unique_file_name(dir.path(), "a.png"), "a_1.png");

        fs::write(dir.path().join("a_1.png"), b"x").unwrap();
        assert_eq!(unique_file_name(dir.path(), "a.png"), "a_2.png");

        fs::write(dir.path().join("noext"), b"x").unwrap();
        assert_eq!(unique_file_name(dir.path(), "noext"), "noext_1");
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for(Some("image/jpeg")), "jpg");
        assert_eq!(extension_for(Some("video/mp4")), "mp4");
        assert_eq!(extension_for(None), "bin");
    }
}
