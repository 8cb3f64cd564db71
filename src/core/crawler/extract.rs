//! HTML content and link extraction.
//!
//! Pulls the page title, clean body text and outgoing hrefs from a
//! fetched document. Non-content elements (script, style, nav,
//! header, footer, aside) are skipped structurally during text
//! collection, so navigation chrome never reaches the chunker.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static MAIN: Lazy<Selector> = Lazy::new(|| Selector::parse("main").unwrap());
static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

/// Element names whose entire subtree is excluded from body text.
const NON_CONTENT_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "noscript",
];

/// Extracted parts of one HTML document.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub title: String,
    pub text: String,
    pub hrefs: Vec<String>,
}

/// Parse an HTML document and extract title, body text and links.
///
/// Synchronous on purpose: the parsed DOM is not `Send` and must not
/// be held across an await point in the fetch workers.
pub fn extract_page(html: &str) -> ExtractedPage {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default();

    // Prefer <main>, then <article>, then the whole <body>.
    let root = document
        .select(&MAIN)
        .next()
        .or_else(|| document.select(&ARTICLE).next())
        .or_else(|| document.select(&BODY).next());

    let text = root
        .map(|root| {
            let mut raw = String::new();
            collect_text(root, &mut raw);
            collapse_whitespace(&raw)
        })
        .unwrap_or_default();

    let hrefs = document
        .select(&ANCHORS)
        .filter_map(|el| el.value().attr("href"))
        .map(str::to_string)
        .collect();

    ExtractedPage { title, text, hrefs }
}

/// Append text nodes under `el`, skipping non-content subtrees.
fn collect_text(el: ElementRef, out: &mut String) {
    if NON_CONTENT_TAGS.contains(&el.value().name()) {
        return;
    }
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, out);
        }
    }
}

/// Collapse all runs of whitespace into single spaces.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
