use crate::parsers::network::NetworkEntry;
use crate::parsers::{ExtractOptions, extract};
use crate::results::{BlockKind, MediaSource, TextBlock};
use url::Url;

fn page() -> Url {
    Url::parse("https://example.com/articles/one").unwrap()
}

fn options() -> ExtractOptions {
    ExtractOptions {
        image_exclude_patterns: vec!["logo".into(), "icon".into(), "favicon".into()],
        network_media_patterns: Vec::new(),
    }
}

#[test]
fn test_blocks_in_source_order_with_levels() {
    let html = r#"
        <html><head><title> My   Page </title></head>
        <body>
            <h1>Main title</h1>
            <p>First   paragraph
               spans lines.</p>
            <p>   </p>
            <div><h3>Sub <em>heading</em></h3></div>
            <p>Last</p>
        </body></html>"#;

    let result = extract(html, &page(), None, &[], &options());

    assert_eq!(result.content.title.as_deref(), Some("My Page"));
    assert_eq!(
        result.content.blocks,
        vec![
            TextBlock::heading(1, "Main title"),
            TextBlock::paragraph("First paragraph spans lines."),
            TextBlock::heading(3, "Sub heading"),
            TextBlock::paragraph("Last"),
        ]
    );
    assert_eq!(
        result.content.blocks[2].kind,
        BlockKind::Heading { level: 3 }
    );
}

#[test]
fn test_images_resolved_excluded_and_associated() {
    let html = r#"
        <body>
            <img src="/static/logo.png" alt="Logo">
            <img src="hero.jpg" alt="Hero shot">
            <h2>Section</h2>
            <p>Context paragraph.</p>
            <figure>
                <img src="https://cdn.example.com/photo.jpg" alt="alt" title="t">
                <figcaption>Figure caption</figcaption>
            </figure>
            <img src="javascript:alert(1)">
        </body>"#;

    let result = extract(html, &page(), None, &[], &options());
    let images = &result.content.images;

    assert_eq!(images.len(), 2);

    // Before any block: associated with the first block
    assert_eq!(images[0].url, "https://example.com/articles/hero.jpg");
    assert_eq!(images[0].caption, "Hero shot");
    assert_eq!(images[0].associated_block, Some(0));
    assert_eq!(images[0].associated_text.as_deref(), Some("Section"));

    assert_eq!(images[1].url, "https://cdn.example.com/photo.jpg");
    assert_eq!(images[1].caption, "Figure caption");
    assert_eq!(images[1].associated_text.as_deref(), Some("Context paragraph."));
    assert_eq!(images[1].local_path, None);
}

#[test]
fn test_no_blocks_leaves_association_empty() {
    let html = r#"<body><div><img src="a.png" alt="A"></div></body>"#;
    let result = extract(html, &page(), None, &[], &options());

    assert!(result.content.blocks.is_empty());
    assert_eq!(result.content.images.len(), 1);
    assert_eq!(result.content.images[0].associated_block, None);
    assert_eq!(result.content.images[0].associated_text, None);
}

#[test]
fn test_network_media_unioned_and_deduplicated() {
    let html = r#"<body><p>Text</p><img src="/media/a.png"></body>"#;
    let log = vec![
        NetworkEntry::new("https://example.com/media/a.png"),
        NetworkEntry::new("https://example.com/media/b.webp"),
        NetworkEntry::new("https://example.com/media/favicon.png"),
        NetworkEntry::new("https://example.com/app.js"),
    ];

    let result = extract(html, &page(), None, &log, &options());
    let urls: Vec<_> = result
        .content
        .images
        .iter()
        .map(|i| (i.url.as_str(), i.source))
        .collect();

    assert_eq!(
        urls,
        vec![
            ("https://example.com/media/a.png", MediaSource::Dom),
            ("https://example.com/media/b.webp", MediaSource::NetworkLog),
        ]
    );
    assert_eq!(result.content.images[1].associated_text, None);
}

#[test]
fn test_links_canonicalized_and_deduplicated() {
    let html = r#"
        <body>
            <a href="/a/">   </a>
            <a href="/a">Page A</a>
            <a href="http://example.com:80/b#x">B</a>
            <a href="mailto:me@example.com">mail</a>
            <a href="javascript:void(0)">js</a>
            <a>no href</a>
            <a href="https://other.org/">Other</a>
        </body>"#;
    let url = Url::parse("http://example.com/").unwrap();

    let result = extract(html, &url, None, &[], &options());
    let links: Vec<_> = result
        .links
        .links
        .iter()
        .map(|l| (l.url.as_str(), l.text.as_str()))
        .collect();

    assert_eq!(
        links,
        vec![
            ("http://example.com/a", "Page A"),
            ("http://example.com/b", "B"),
            ("https://other.org/", "Other"),
        ]
    );
    assert_eq!(result.links.url, "http://example.com/");
}

#[test]
fn test_base_element_changes_resolution() {
    let html = r#"<head><base href="https://example.com/root/"></head>
        <body><a href="child">c</a><img src="pic.png"></body>"#;

    let result = extract(html, &page(), None, &[], &options());
    assert_eq!(result.links.links[0].url, "https://example.com/root/child");
    assert_eq!(
        result.content.images[0].url,
        "https://example.com/root/pic.png"
    );
}

#[test]
fn test_title_hint_used_when_document_has_none() {
    let result = extract("<body><p>x</p></body>", &page(), Some(" Hint "), &[], &options());
    assert_eq!(result.content.title.as_deref(), Some("Hint"));
}

#[test]
fn test_blank_input_yields_empty_record() {
    let result = extract("  \n ", &page(), Some("ignored"), &[], &options());
    assert!(result.content.blocks.is_empty());
    assert!(result.content.images.is_empty());
    assert!(result.links.links.is_empty());
    assert_eq!(result.content.title, None);
    assert_eq!(result.content.url, page().to_string());
}

#[test]
fn test_extraction_is_deterministic() {
    let html = r#"<body><h1>T</h1><p>a</p><img src="x.png" alt="x"><a href="/y">y</a></body>"#;
    let log = vec![NetworkEntry::new("https://example.com/z.png")];

    let first = extract(html, &page(), None, &log, &options());
    let second = extract(html, &page(), None, &log, &options());
    assert_eq!(first, second);
}
