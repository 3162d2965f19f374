//! HTML extraction for the gazette index and edition pages
//!
//! Documents are parsed and dropped inside these synchronous helpers; only
//! owned strings leave this module, which keeps the crawl future `Send`.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::gazette::PublicationId;
use crate::gazette::error::CrawlError;

/// What the crawl cycle needs from the index page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPage {
    /// Number of the latest edition
    pub publication: PublicationId,

    /// Link target of the latest edition, as written in the page
    pub link: Option<String>,

    /// Full text content of the index page
    pub text: String,
}

/// Parse the index page and pull out the latest edition number, its link and
/// the page text.
///
/// A missing link is not an error here: the caller only needs it once the
/// edition turns out to be new.
pub fn inspect_index(
    html: &str,
    title_selector: &str,
    title_prefix: &str,
    link_selector: &str,
) -> Result<IndexPage, CrawlError> {
    let document = Html::parse_document(html);

    let publication = extract_publication_id(&document, title_selector, title_prefix)?;
    let link = extract_publication_link(&document, link_selector)?;
    let text = document_text(&document);

    Ok(IndexPage {
        publication,
        link,
        text,
    })
}

/// Extract the edition number from the title elements.
///
/// Each matching title contributes the text of its first anchor with the
/// prefix stripped; the last title on the page wins.
pub fn extract_publication_id(
    document: &Html,
    title_selector: &str,
    title_prefix: &str,
) -> Result<PublicationId, CrawlError> {
    let titles = parse_selector(title_selector)?;
    let anchor = parse_selector("a")?;

    let mut raw = None;
    for title in document.select(&titles) {
        let text = title
            .select(&anchor)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let text = text.trim();
        raw = Some(text.strip_prefix(title_prefix).unwrap_or(text).trim().to_string());
    }

    let raw = raw
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CrawlError::Extraction("could not find publication number".to_string()))?;

    debug!(raw = %raw, "Found publication title");
    raw.parse::<PublicationId>().map_err(|_| {
        CrawlError::Extraction(format!("publication number {:?} is not an integer", raw))
    })
}

/// Extract the `href` of the first anchor in the edition link container.
///
/// When several containers match, the last one carrying a link wins.
pub fn extract_publication_link(
    document: &Html,
    link_selector: &str,
) -> Result<Option<String>, CrawlError> {
    let containers = parse_selector(link_selector)?;
    let anchor = parse_selector("a")?;

    let mut link = None;
    for container in document.select(&containers) {
        if let Some(href) = container
            .select(&anchor)
            .next()
            .and_then(|a| a.value().attr("href"))
        {
            link = Some(href.to_string());
        }
    }

    Ok(link)
}

/// Concatenated text of every text node in the document
pub fn document_text(document: &Html) -> String {
    document.root_element().text().collect()
}

/// Parse a page and return its full text content
pub fn page_text(html: &str) -> String {
    document_text(&Html::parse_document(html))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn parse_selector(selector: &str) -> Result<Selector, CrawlError> {
    Selector::parse(selector).map_err(|e| {
        CrawlError::Extraction(format!("Failed to parse selector '{}': {}", selector, e))
    })
}
