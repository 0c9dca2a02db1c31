use crate::parsers::network::NetworkEntry;
use crate::parsers::{ExtractOptions, extract};
use crate::results::MediaSource;
use url::Url;

const ARTICLE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Cuisines of India | Culture Portal</title>
</head>
<body>
  <header><img src="/themes/site/logo.svg" alt="Portal"></header>
  <main>
    <h1>Cuisines of India</h1>
    <p>Food in India varies by region.</p>
    <figure class="story">
      <picture>
        <source srcset="/sites/default/files/thali.webp 1x, /sites/default/files/thali@2x.webp 2x" type="image/webp">
        <img src="/sites/default/files/thali.jpg" alt="A thali" title="Thali">
      </picture>
      <figcaption>A traditional <b>thali</b> platter.</figcaption>
    </figure>
    <h2>Spices</h2>
    <div class="wp-caption">
      <img src="/sites/default/files/spices.jpg" aria-label="Spice market">
      <span class="wp-caption-text">Spices at a market stall</span>
    </div>
    <video controls>
      <source src="/sites/default/files/cooking.mp4" type="video/mp4">
    </video>
    <p>See also <a href="/food-and-culture/">food and culture</a> and
       <a href="https://partner.example.org/recipes?id=3#top">recipes</a>.</p>
  </main>
  <footer><a href="mailto:info@example.com">Contact</a></footer>
</body>
</html>"#;

#[test]
fn test_article_page() {
    let url = Url::parse("https://example.com/food-and-culture/cuisines-of-india").unwrap();
    let options = ExtractOptions {
        image_exclude_patterns: vec!["logo".into()],
        network_media_patterns: vec!["sites/default/files".into()],
    };
    let log = vec![
        NetworkEntry::new("https://example.com/sites/default/files/thali.jpg"),
        NetworkEntry::new("https://example.com/sites/default/files/banner.png"),
        NetworkEntry::new("https://example.com/themes/site/bg.png"),
    ];

    let result = extract(ARTICLE, &url, Some("ignored"), &log, &options);
    let content = &result.content;

    assert_eq!(
        content.title.as_deref(),
        Some("Cuisines of India | Culture Portal")
    );
    let texts: Vec<_> = content.blocks.iter().map(|b| b.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Cuisines of India",
            "Food in India varies by region.",
            "Spices",
            "See also food and culture and recipes.",
        ]
    );

    let images: Vec<_> = content
        .images
        .iter()
        .map(|i| (i.url.as_str(), i.caption.as_str(), i.associated_text.as_deref(), i.source))
        .collect();
    assert_eq!(
        images,
        vec![
            (
                "https://example.com/sites/default/files/thali.webp",
                "A traditional thali platter.",
                Some("Food in India varies by region."),
                MediaSource::Dom
            ),
            (
                "https://example.com/sites/default/files/thali.jpg",
                "A traditional thali platter.",
                Some("Food in India varies by region."),
                MediaSource::Dom
            ),
            (
                "https://example.com/sites/default/files/spices.jpg",
                "Spices at a market stall",
                Some("Spices"),
                MediaSource::Dom
            ),
            (
                "https://example.com/sites/default/files/cooking.mp4",
                "",
                Some("Spices"),
                MediaSource::Dom
            ),
            (
                "https://example.com/sites/default/files/banner.png",
                "",
                None,
                MediaSource::NetworkLog
            ),
        ]
    );
    assert_eq!(content.images[1].alt, "A thali");
    assert_eq!(content.images[1].title, "Thali");

    let links: Vec<_> = result.links.links.iter().map(|l| l.url.as_str()).collect();
    assert_eq!(
        links,
        vec![
            "https://example.com/food-and-culture",
            "https://partner.example.org/recipes?id=3",
        ]
    );
}
