//! Forgiving tag scanner for scraped storefront markup.
//!
//! Upstream pages are not well-formed enough for a strict parser to agree
//! with what a browser renders, and the extraction heuristics depend on
//! byte offsets (anchor blocks, nav regions, windows after a heading). This
//! module tokenizes tags with a regex and recovers element extents by
//! counting same-name open/close tags.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(/?)([a-zA-Z][a-zA-Z0-9-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("valid regex")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid regex")
});

static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<!--.*?-->")
        .expect("valid regex")
});

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("valid regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Upper bound on how far an element's closing tag is searched for.
pub const MAX_ELEMENT_SPAN: usize = 60_000;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// One open or close tag located in a document.
#[derive(Debug, Clone)]
pub struct Tag<'a> {
    /// Lowercased element name.
    pub name: String,
    pub closing: bool,
    /// The full `<...>` text.
    pub raw: &'a str,
    pub start: usize,
    pub end: usize,
}

impl Tag<'_> {
    /// Decoded value of attribute `name` (case-insensitive).
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        attr(self.raw, name)
    }

    /// Whether the `class` attribute contains `fragment` as a substring.
    #[must_use]
    pub fn class_contains(&self, fragment: &str) -> bool {
        self.attr("class").is_some_and(|c| c.contains(fragment))
    }

    /// Whether the `class` attribute has `token` as one of its classes.
    #[must_use]
    pub fn has_class(&self, token: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|t| t == token))
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str()) || self.raw.ends_with("/>")
    }

    /// Open tag of an element that has content and a closing tag.
    #[must_use]
    pub fn opens_container(&self) -> bool {
        !self.closing && !self.is_void()
    }
}

/// Iterates every tag in `html` in document order.
pub fn tags(html: &str) -> impl Iterator<Item = Tag<'_>> {
    tags_from(html, 0)
}

/// Iterates tags starting at byte offset `from`.
pub fn tags_from(html: &str, from: usize) -> impl Iterator<Item = Tag<'_>> {
    let from = floor_boundary(html, from);
    TAG_RE.captures_iter(&html[from..]).filter_map(move |caps| {
        let whole = caps.get(0)?;
        Some(Tag {
            name: caps.get(2)?.as_str().to_ascii_lowercase(),
            closing: !caps.get(1)?.as_str().is_empty(),
            raw: &html[from + whole.start()..from + whole.end()],
            start: from + whole.start(),
            end: from + whole.end(),
        })
    })
}

/// Decoded value of attribute `name` in a raw open tag.
#[must_use]
pub fn attr(tag_raw: &str, name: &str) -> Option<String> {
    ATTR_RE.captures_iter(tag_raw).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        Some(decode_entities(value).into_owned())
    })
}

/// Byte range of the element opened by `open`, closing tag included.
///
/// Unclosed elements run to the end of the document, capped at
/// [`MAX_ELEMENT_SPAN`].
#[must_use]
pub fn element_range(html: &str, open: &Tag<'_>) -> Range<usize> {
    if !open.opens_container() {
        return open.start..open.end;
    }
    let limit = floor_boundary(html, open.start.saturating_add(MAX_ELEMENT_SPAN));
    let mut depth = 0usize;
    for tag in tags_from(html, open.end) {
        if tag.start >= limit {
            break;
        }
        if tag.name != open.name {
            continue;
        }
        if tag.closing {
            if depth == 0 {
                return open.start..tag.end;
            }
            depth -= 1;
        } else if !tag.is_void() {
            depth += 1;
        }
    }
    open.start..limit
}

/// Outer markup of the element opened by `open`.
#[must_use]
pub fn element<'a>(html: &'a str, open: &Tag<'_>) -> &'a str {
    &html[element_range(html, open)]
}

/// Content between the open tag and the closing tag of an element's outer markup.
#[must_use]
pub fn inner(outer: &str) -> &str {
    let Some(open) = tags(outer).next() else {
        return outer;
    };
    if open.start != 0 || !open.opens_container() {
        return "";
    }
    let body = &outer[open.end..];
    let close = format!("</{}", open.name);
    match body.to_ascii_lowercase().rfind(&close) {
        Some(pos) => &body[..pos],
        None => body,
    }
}

/// Open tags whose `class` contains `fragment`.
pub fn with_class<'a>(html: &'a str, fragment: &'a str) -> impl Iterator<Item = Tag<'a>> {
    tags(html).filter(move |t| !t.closing && t.class_contains(fragment))
}

/// Outer markup of the first element whose `class` contains `fragment`.
#[must_use]
pub fn first_with_class<'a>(html: &'a str, fragment: &str) -> Option<&'a str> {
    tags(html)
        .find(|t| !t.closing && t.class_contains(fragment))
        .map(|t| element(html, &t))
}

/// Outer markup of every element whose `class` contains `fragment`.
///
/// Elements nested inside an earlier match are returned as well.
#[must_use]
pub fn all_with_class<'a>(html: &'a str, fragment: &str) -> Vec<&'a str> {
    tags(html)
        .filter(|t| !t.closing && t.class_contains(fragment))
        .map(|t| element(html, &t))
        .collect()
}

/// Outer markup of every `name` element.
#[must_use]
pub fn all_named<'a>(html: &'a str, name: &str) -> Vec<&'a str> {
    tags(html)
        .filter(|t| !t.closing && t.name == name)
        .map(|t| element(html, &t))
        .collect()
}

/// Text of the first element whose `class` contains `fragment`.
#[must_use]
pub fn text_of_class(html: &str, fragment: &str) -> Option<String> {
    first_with_class(html, fragment)
        .map(text_of)
        .filter(|t| !t.is_empty())
}

/// Removes `<script>`, `<style>` and comments.
#[must_use]
pub fn strip_noise(html: &str) -> Cow<'_, str> {
    NOISE_RE.replace_all(html, " ")
}

/// Visible text of a fragment: tags become spaces, entities are decoded and
/// whitespace is collapsed.
#[must_use]
pub fn text_of(fragment: &str) -> String {
    let stripped = strip_noise(fragment);
    let without_tags = TAG_RE.replace_all(&stripped, " ");
    collapse_whitespace(&decode_entities(&without_tags))
}

/// Non-empty text runs between tags, in document order.
#[must_use]
pub fn text_lines(fragment: &str) -> Vec<String> {
    let stripped = strip_noise(fragment);
    TAG_RE
        .split(&stripped)
        .map(|chunk| collapse_whitespace(&decode_entities(chunk)))
        .filter(|line| !line.is_empty())
        .collect()
}

#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_owned()
}

/// Decodes numeric references and the named entities storefronts actually emit.
/// `&nbsp;` becomes a plain space.
#[must_use]
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    ENTITY_RE.replace_all(text, |caps: &regex::Captures<'_>| {
        let entity = &caps[1];
        let decoded = if let Some(hex) = entity
            .strip_prefix("#x")
            .or_else(|| entity.strip_prefix("#X"))
        {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        } else if let Some(dec) = entity.strip_prefix('#') {
            dec.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            named_entity(entity)
        };
        decoded.map_or_else(|| caps[0].to_owned(), |c| c.to_string())
    })
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "oacute" => 'ó',
        "Oacute" => 'Ó',
        "ndash" => '–',
        "mdash" => '—',
        "bdquo" => '„',
        "rdquo" => '”',
        "ldquo" => '“',
        "hellip" => '…',
        "raquo" => '»',
        "laquo" => '«',
        "deg" => '°',
        "sup2" => '²',
        "sup3" => '³',
        "times" => '×',
        _ => return None,
    })
}

/// Text of the first `<h1>`.
#[must_use]
pub fn first_heading(html: &str) -> Option<String> {
    tags(html)
        .find(|t| !t.closing && t.name == "h1")
        .map(|t| text_of(element(html, &t)))
        .filter(|t| !t.is_empty())
}

/// `content` of the `<meta>` whose `name` or `property` equals `key`.
#[must_use]
pub fn meta_content(html: &str, key: &str) -> Option<String> {
    tags(html)
        .filter(|t| !t.closing && t.name == "meta")
        .find(|t| {
            t.attr("name").as_deref() == Some(key) || t.attr("property").as_deref() == Some(key)
        })
        .and_then(|t| t.attr("content"))
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
}

/// Byte ranges of page chrome: header, footer, nav and sidebar regions.
///
/// Computed with an open-element stack so a region ends at its own closing
/// tag even when unrelated elements are left unclosed inside it.
#[must_use]
pub fn chrome_regions(html: &str) -> Vec<Range<usize>> {
    let mut stack: Vec<(String, usize, bool)> = Vec::new();
    let mut regions = Vec::new();
    for tag in tags(html) {
        if tag.closing {
            let Some(pos) = stack.iter().rposition(|(name, _, _)| *name == tag.name) else {
                continue;
            };
            for (_, start, chrome) in stack.drain(pos..) {
                if chrome {
                    regions.push(start..tag.end);
                }
            }
        } else if !tag.is_void() {
            let chrome = is_chrome(&tag);
            stack.push((tag.name, tag.start, chrome));
        }
    }
    regions.extend(
        stack
            .into_iter()
            .filter(|(_, _, chrome)| *chrome)
            .map(|(_, start, _)| start..html.len()),
    );
    regions
}

const CHROME_ELEMENTS: &[&str] = &["header", "footer", "nav", "aside"];
const CHROME_CLASSES: &[&str] = &[
    "header",
    "footer",
    "nav",
    "navbar",
    "sidebar",
    "header__menu",
    "search_active",
];

fn is_chrome(tag: &Tag<'_>) -> bool {
    CHROME_ELEMENTS.contains(&tag.name.as_str())
        || tag
            .attr("class")
            .is_some_and(|c| c.split_whitespace().any(|t| CHROME_CLASSES.contains(&t)))
}

/// Largest char boundary not above `index`.
#[must_use]
pub fn floor_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut i = index;
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_tolerate_quoted_gt() {
        let html = r#"<a href="/x" data-x="a>b">Go</a>"#;
        let found: Vec<_> = tags(html).collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].attr("data-x").as_deref(), Some("a>b"));
        assert!(found[1].closing);
    }

    #[test]
    fn attr_decodes_entities_and_is_case_insensitive() {
        let tag = r#"<img SRC='/a.jpg?x=1&amp;y=2' alt=bez>"#;
        assert_eq!(attr(tag, "src").as_deref(), Some("/a.jpg?x=1&y=2"));
        assert_eq!(attr(tag, "alt").as_deref(), Some("bez"));
        assert_eq!(attr(tag, "title"), None);
    }

    #[test]
    fn element_counts_nested_same_name_tags() {
        let html = "<div class=\"a\"><div>in</div><p>x</p></div><div>after</div>";
        let open = tags(html).next().unwrap();
        assert_eq!(
            element(html, &open),
            "<div class=\"a\"><div>in</div><p>x</p></div>"
        );
        assert_eq!(inner(element(html, &open)), "<div>in</div><p>x</p>");
    }

    #[test]
    fn text_helpers_decode_and_collapse() {
        let html = "<p>Cena:&nbsp;150,00\n zł</p><script>var a = 1;</script><b>net&#111;</b>";
        assert_eq!(text_of(html), "Cena: 150,00 zł neto");
        assert_eq!(text_lines(html), vec!["Cena: 150,00 zł", "neto"]);
    }

    #[test]
    fn meta_content_matches_name_or_property() {
        let html = r#"<meta name="description" content=" Opis "><meta property="og:image" content="/og.jpg">"#;
        assert_eq!(meta_content(html, "description").as_deref(), Some("Opis"));
        assert_eq!(meta_content(html, "og:image").as_deref(), Some("/og.jpg"));
        assert_eq!(meta_content(html, "og:description"), None);
    }

    #[test]
    fn chrome_regions_cover_header_and_classed_sidebar() {
        let html = "<header><a href=\"/a\">A</a></header><main><a href=\"/b\">B</a>\
                    <div class=\"col sidebar\"><a href=\"/c\">C</a></div></main>";
        let regions = chrome_regions(html);
        let a = html.find("/a").unwrap();
        let b = html.find("/b").unwrap();
        let c = html.find("/c").unwrap();
        assert!(regions.iter().any(|r| r.contains(&a)));
        assert!(!regions.iter().any(|r| r.contains(&b)));
        assert!(regions.iter().any(|r| r.contains(&c)));
    }

    #[test]
    fn class_fragment_does_not_mark_content_as_chrome() {
        let html = "<div class=\"product_rent__header\"><a href=\"/x\">x</a></div>";
        assert!(chrome_regions(html).is_empty());
    }

    #[test]
    fn floor_boundary_respects_multibyte_chars() {
        let text = "zł";
        assert_eq!(floor_boundary(text, 2), 1);
        assert_eq!(floor_boundary(text, 10), text.len());
    }
}
