//! Selector-driven content extraction for a single HTML page.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use kbimport_shared::{ImportError, Result, WebEntryConfig};

/// Title used when no title selector is configured or nothing matches.
pub const UNTITLED: &str = "Untitled";

/// Everything the crawler needs from one fetched page.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// Title text (or [`UNTITLED`]).
    pub title: String,
    /// Title plus content-selector text, camel-case repaired.
    pub content: String,
    /// Text of the file-name selector, when configured and present.
    pub file_name: Option<String>,
    /// Raw `href` values of every link on the page.
    pub links: Vec<String>,
}

/// Compiled CSS selectors for one web source.
#[derive(Debug, Clone)]
pub struct PageSelectors {
    title: Option<Selector>,
    file_name: Option<Selector>,
    content: Vec<Selector>,
}

impl PageSelectors {
    /// Compile the configured selectors. Empty selector strings count as unset.
    pub fn new(entry: &WebEntryConfig, content_selectors: &[String]) -> Result<Self> {
        Ok(Self {
            title: optional_selector(entry.title_selector.as_deref())?,
            file_name: optional_selector(entry.file_name_selector.as_deref())?,
            content: content_selectors
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_selector(s))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    /// Parse `html` and pull title, content, file name and links.
    pub fn extract(&self, html: &str) -> ExtractedPage {
        let doc = Html::parse_document(html);

        let title = self
            .title
            .as_ref()
            .and_then(|sel| doc.select(sel).next())
            .map(stripped_text)
            .unwrap_or_else(|| UNTITLED.to_string());

        let sections: Vec<String> = self
            .content
            .iter()
            .filter_map(|sel| doc.select(sel).next())
            .map(|el| el.text().collect::<String>())
            .collect();
        let content = add_space_to_camel_case(&format!("{title}\n\n{}", sections.join(" ")));

        let file_name = self
            .file_name
            .as_ref()
            .and_then(|sel| doc.select(sel).next())
            .map(stripped_text);

        ExtractedPage {
            title,
            content,
            file_name,
            links: raw_links(&doc),
        }
    }
}

fn optional_selector(selector: Option<&str>) -> Result<Option<Selector>> {
    selector
        .filter(|s| !s.trim().is_empty())
        .map(parse_selector)
        .transpose()
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ImportError::config(format!("invalid CSS selector '{selector}': {e}")))
}

/// Text of an element with every text node trimmed and concatenated.
fn stripped_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

/// Every `href` on the page, skipping anchors and non-HTTP schemes.
fn raw_links(doc: &Html) -> Vec<String> {
    static LINK_SELECTOR: std::sync::LazyLock<Selector> =
        std::sync::LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

    doc.select(&LINK_SELECTOR)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| {
            !(href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:"))
        })
        .map(String::from)
        .collect()
}

/// Insert a space before every ASCII uppercase letter except at position 0.
///
/// Repairs words glued together when markup is stripped (`HelloWorld`).
pub fn add_space_to_camel_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for (i, c) in text.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Resolve an `href` found on `page_url`.
///
/// Root-relative links are joined to `base_url` by concatenation, absolute
/// links are kept, and anything else is resolved against the page itself.
pub fn resolve_link(base_url: &str, page_url: &str, href: &str) -> Option<String> {
    let mut resolved = if href.starts_with('/') && !href.starts_with("//") {
        Url::parse(&format!("{base_url}{href}")).ok()?
    } else if let Ok(absolute) = Url::parse(href) {
        absolute
    } else {
        Url::parse(page_url).ok()?.join(href).ok()?
    };

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}
