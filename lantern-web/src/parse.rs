//! Result-page scraping.
//!
//! Every selector lookup is optional: missing elements become empty fields,
//! never errors. The markup schema lives entirely in this module.
use std::sync::LazyLock;

use lantern_common::SearchResult;
use percent_encoding::percent_decode_str;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

const FEATURED_PANEL: &str = "#right .searchRightTop";
const FEATURED_LINK: &str = ".compText a";
const DESCRIPTION: &str = ".compText";
const FEATURED_INFO: &str = ".compInfo li";
const ORGANIC_BLOCK: &str = ".algo-sr";
const ORGANIC_LINK: &str = "h3.title a";

static REDIRECT_TARGET: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"RU=([^/]+)").ok());

/// Recover the destination embedded in an engine redirect link.
///
/// The destination is the percent-encoded `RU=` segment, up to the next `/`.
/// Anything else (including undecodable input) comes back unchanged.
///
/// ```
/// use lantern_web::unwrap_redirect_url;
///
/// let wrapped = "https://r.search.yahoo.com/_ylt=A/RV=2/RE=1/RO=10/RU=https%3a%2f%2fexample.com%2fa%3fb%3d1/RK=2/RS=x-";
/// assert_eq!(unwrap_redirect_url(wrapped), "https://example.com/a?b=1");
/// assert_eq!(unwrap_redirect_url("https://example.com/a"), "https://example.com/a");
/// ```
pub fn unwrap_redirect_url(url: &str) -> String {
    let Some(re) = REDIRECT_TARGET.as_ref() else {
        return url.to_string();
    };
    let Some(encoded) = re.captures(url).and_then(|c| c.get(1)) else {
        return url.to_string();
    };
    match percent_decode_str(encoded.as_str()).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => url.to_string(),
    }
}

/// Parse a results page into at most `1 + limit` ranked results.
///
/// A featured panel, when present, comes first and does not count against
/// `limit`. Organic blocks whose class mentions `ad` are skipped.
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);
    let mut out = Vec::with_capacity(limit + 1);

    if let Some(featured) = featured_panel(&document) {
        out.push(featured);
    }
    out.extend(organic_results(&document, limit));

    tracing::debug!(html_len = html.len(), limit, parsed = out.len(), "web.parse.results");
    out
}

fn featured_panel(document: &Html) -> Option<SearchResult> {
    let panel_sel = Selector::parse(FEATURED_PANEL).ok()?;
    let link_sel = Selector::parse(FEATURED_LINK).ok()?;
    let text_sel = Selector::parse(DESCRIPTION).ok()?;
    let info_sel = Selector::parse(FEATURED_INFO).ok()?;

    let panels: Vec<ElementRef<'_>> = document.select(&panel_sel).collect();
    if panels.is_empty() {
        return None;
    }

    let link = panels.iter().flat_map(|p| p.select(&link_sel)).next();
    let description: String = panels
        .iter()
        .flat_map(|p| p.select(&text_sel))
        .map(text_content)
        .collect();
    let info = panels
        .iter()
        .flat_map(|p| p.select(&info_sel))
        .map(|li| text_content(li).trim().to_string())
        .collect::<Vec<_>>()
        .join("\n");

    let mut body = description.trim().to_string();
    if !info.is_empty() {
        body.push_str("\n\n");
        body.push_str(&info);
    }

    Some(SearchResult {
        title: link
            .map(|a| text_content(a).trim().to_string())
            .unwrap_or_default(),
        body,
        url: unwrap_redirect_url(link.and_then(|a| a.value().attr("href")).unwrap_or("")),
    })
}

fn organic_results(document: &Html, limit: usize) -> Vec<SearchResult> {
    let (Ok(block_sel), Ok(link_sel), Ok(text_sel)) = (
        Selector::parse(ORGANIC_BLOCK),
        Selector::parse(ORGANIC_LINK),
        Selector::parse(DESCRIPTION),
    ) else {
        return Vec::new();
    };

    document
        .select(&block_sel)
        .filter(|block| !is_advert(*block))
        .take(limit)
        .map(|block| {
            let link = block.select(&link_sel).next();
            let body: String = block.select(&text_sel).map(text_content).collect();
            SearchResult {
                title: link
                    .and_then(|a| a.value().attr("aria-label"))
                    .unwrap_or("")
                    .to_string(),
                body: body.trim().to_string(),
                url: unwrap_redirect_url(link.and_then(|a| a.value().attr("href")).unwrap_or("")),
            }
        })
        .collect()
}

/// Substring match on the raw class attribute.
fn is_advert(block: ElementRef<'_>) -> bool {
    block
        .value()
        .attr("class")
        .is_some_and(|class| class.contains("ad"))
}

fn text_content(elem: ElementRef<'_>) -> String {
    elem.text().collect()
}
