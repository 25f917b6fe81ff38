//! Readable text of a single page.
use lantern_common::PageText;
use scraper::{ElementRef, Html, Node, Selector};

const CONTENT_ROOTS: [&str; 3] = ["article", "main", "body"];

/// Title plus the paragraph/list text of the page's main content.
///
/// ```
/// use lantern_web::extract::extract_page_text;
///
/// let page = extract_page_text(
///     "<html><head><title> Release   notes </title></head>\
///      <body><nav><li>Home</li></nav><article><p>First.</p><p>  Second\n line. </p></article></body></html>",
/// );
/// assert_eq!(page.title, "Release notes");
/// assert_eq!(page.body, "First.\n\nSecond line.");
/// ```
pub fn extract_page_text(html: &str) -> PageText {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|t| compact_ws(&t.text().collect::<String>()))
        .unwrap_or_default();

    let Some(root) = content_root(&document) else {
        return PageText {
            title,
            body: String::new(),
        };
    };

    let blocks: Vec<String> = Selector::parse("p, li")
        .ok()
        .map(|sel| {
            root.select(&sel)
                .map(|el| compact_ws(&el.text().collect::<Vec<_>>().join(" ")))
                .filter(|text| !text.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let body = if blocks.is_empty() {
        compact_ws(&visible_text(root))
    } else {
        blocks.join("\n\n")
    };

    PageText { title, body }
}

fn content_root(document: &Html) -> Option<ElementRef<'_>> {
    CONTENT_ROOTS.iter().find_map(|css| {
        Selector::parse(css)
            .ok()
            .and_then(|sel| document.select(&sel).next())
    })
}

/// Text nodes under `root`, skipping script and style contents.
fn visible_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .is_some_and(|el| matches!(el.name(), "script" | "style" | "noscript"));
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    out
}

fn compact_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_root_text_without_blocks() {
        let page = extract_page_text(
            "<html><body><div>Just <b>inline</b> text</div><script>var x = 1;</script></body></html>",
        );
        assert_eq!(page.title, "");
        assert_eq!(page.body, "Just inline text");
    }

    #[test]
    fn main_is_preferred_over_body() {
        let page = extract_page_text(
            "<body><p>sidebar</p><main><li>one</li><li> two </li></main></body>",
        );
        assert_eq!(page.body, "one\n\ntwo");
    }

    #[test]
    fn plain_text_input_is_kept() {
        let page = extract_page_text("not   html at all");
        assert_eq!(page.title, "");
        assert_eq!(page.body, "not html at all");
    }
}
