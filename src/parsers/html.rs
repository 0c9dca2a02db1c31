use crate::links;
use crate::parsers::images::ImageCandidate;
use crate::parsers::text::{element_text, normalize_whitespace};
use crate::results::{LinkEntry, TextBlock};
use scraper::{ElementRef, Html};
use url::Url;

/// Everything collected from one walk over a rendered document
#[derive(Debug, Default)]
pub struct DocumentWalk {
    pub title: Option<String>,
    /// Base URL after applying a `<base href>` element
    pub base: Option<Url>,
    pub blocks: Vec<TextBlock>,
    pub images: Vec<ImageCandidate>,
    /// Canonical outbound links in document order, not yet deduplicated
    pub links: Vec<LinkEntry>,
}

/// Walks the document in source order
///
/// Paragraphs and headings with non-empty text become blocks; image-bearing
/// elements remember the last block seen before them.
pub fn walk(html: &str, page_url: &Url) -> DocumentWalk {
    let doc = Html::parse_document(html);
    if !doc.errors.is_empty() {
        ::log::trace!("HTML parser recovered from {} errors", doc.errors.len());
    }

    let base = document_base(&doc, page_url);
    let mut result = DocumentWalk {
        title: document_title(&doc),
        ..DocumentWalk::default()
    };

    let root = find_element(doc.root_element(), "body").unwrap_or_else(|| doc.root_element());

    for node in root.descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };

        match el.value().name() {
            "p" => push_block(&mut result.blocks, TextBlock::paragraph(element_text(el))),
            name @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
                let level = name[1..].parse::<u8>().unwrap_or(1);
                push_block(&mut result.blocks, TextBlock::heading(level, element_text(el)));
            }
            "img" | "source" => {
                let preceding = result.blocks.len().checked_sub(1);
                if let Some(candidate) = ImageCandidate::from_element(el, preceding) {
                    result.images.push(candidate);
                }
            }
            "a" => {
                let Some(href) = el.value().attr("href") else {
                    continue;
                };
                match links::canonicalize(&base, href) {
                    Ok(url) => result.links.push(LinkEntry {
                        url: url.to_string(),
                        text: element_text(el),
                    }),
                    Err(e) => ::log::trace!("Ignoring link {:?}: {}", href, e),
                }
            }
            _ => {}
        }
    }

    result.base = Some(base);
    result
}

fn push_block(blocks: &mut Vec<TextBlock>, block: TextBlock) {
    if !block.text.is_empty() {
        blocks.push(block);
    }
}

fn find_element<'a>(root: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    root.descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == name)
}

fn document_title(doc: &Html) -> Option<String> {
    find_element(doc.root_element(), "title")
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn document_base(doc: &Html, page_url: &Url) -> Url {
    find_element(doc.root_element(), "base")
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| page_url.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or_else(|| page_url.clone())
}
