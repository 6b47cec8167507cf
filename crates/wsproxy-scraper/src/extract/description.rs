//! Long-form product description.

use std::sync::LazyLock;

use regex::Regex;

use crate::markup;

static PLAIN_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:p|div|span)\b[^>]*>([^<]{10,})</(?:p|div|span)>").expect("valid regex")
});

/// Bytes scanned after the description heading.
pub const SECTION_WINDOW: usize = 2000;

/// Headings are short; longer text that happens to contain a needle is body copy.
const MAX_HEADING_LEN: usize = 40;

/// Where a site keeps its description.
#[derive(Debug, Clone, Copy)]
pub struct DescriptionSources {
    /// Dedicated description container.
    pub container: Option<&'static str>,
    /// Lowercase heading texts that open the description section.
    pub headings: &'static [&'static str],
    /// Generic description container used as a late fallback.
    pub fallback_class: Option<&'static str>,
    /// Truncate the result to this many characters.
    pub max_chars: Option<usize>,
}

/// Runs the fallback chain: container, paragraphs under the heading, first
/// plain block under the heading, generic container, meta descriptions.
///
/// `html` should already have scripts and styles stripped. Returns an empty
/// string when nothing usable is found.
#[must_use]
pub fn extract_description(html: &str, sources: &DescriptionSources) -> String {
    let found = sources
        .container
        .and_then(|class| first_usable(html, class))
        .or_else(|| section_after_heading(html, sources.headings))
        .or_else(|| sources.fallback_class.and_then(|class| first_usable(html, class)))
        .or_else(|| markup::meta_content(html, "description"))
        .or_else(|| markup::meta_content(html, "og:description"))
        .unwrap_or_default();
    match sources.max_chars {
        Some(max) if found.chars().count() > max => found.chars().take(max).collect(),
        _ => found,
    }
}

fn first_usable(html: &str, class: &str) -> Option<String> {
    markup::all_with_class(html, class)
        .into_iter()
        .map(markup::text_of)
        .find(|text| text.chars().count() > 5 && usable(text))
}

fn usable(text: &str) -> bool {
    !text.contains('{') && !text.contains("background-image")
}

fn section_after_heading(html: &str, headings: &[&str]) -> Option<String> {
    if headings.is_empty() {
        return None;
    }
    let mut previous_end = 0;
    let mut window_start = None;
    for tag in markup::tags(html) {
        let text = markup::collapse_whitespace(&markup::decode_entities(
            &html[previous_end..tag.start],
        ))
        .to_lowercase();
        if !text.is_empty()
            && text.chars().count() <= MAX_HEADING_LEN
            && headings.iter().any(|h| text.contains(h))
        {
            window_start = Some(tag.start);
            break;
        }
        previous_end = tag.end;
    }
    let start = window_start?;
    let end = markup::floor_boundary(html, start + SECTION_WINDOW);
    let window = &html[start..end];

    let paragraphs: Vec<String> = markup::tags(window)
        .filter(|t| !t.closing && t.name == "p")
        .map(|t| markup::text_of(markup::element(window, &t)))
        .filter(|text| text.chars().count() >= 10 && usable(text))
        .collect();
    if !paragraphs.is_empty() {
        return Some(paragraphs.join("\n\n"));
    }

    PLAIN_BLOCK_RE
        .captures_iter(window)
        .filter_map(|c| c.get(1))
        .map(|m| markup::collapse_whitespace(&markup::decode_entities(m.as_str())))
        .find(|text| text.chars().count() >= 10 && usable(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCES: DescriptionSources = DescriptionSources {
        container: Some("product_rent__text"),
        headings: &["opis produktu"],
        fallback_class: Some("description"),
        max_chars: None,
    };

    #[test]
    fn dedicated_container_wins() {
        let html = r#"<div class="product_rent__text"><p>Lekki młot wyburzeniowy.</p></div>
            <meta name="description" content="meta">"#;
        assert_eq!(extract_description(html, &SOURCES), "Lekki młot wyburzeniowy.");
    }

    #[test]
    fn paragraphs_after_heading_are_joined() {
        let html = r"<h3>OPIS PRODUKTU</h3><p>Pierwszy akapit opisu.</p><p>krótki</p>
            <p>Drugi akapit opisu.</p>";
        assert_eq!(
            extract_description(html, &SOURCES),
            "Pierwszy akapit opisu.\n\nDrugi akapit opisu."
        );
    }

    #[test]
    fn plain_block_after_heading_when_no_paragraphs() {
        let html = r"<div>Opis produktu</div><div><span>Zagęszczarka gruntu 90 kg</span></div>";
        assert_eq!(extract_description(html, &SOURCES), "Zagęszczarka gruntu 90 kg");
    }

    #[test]
    fn style_like_text_is_rejected_in_favour_of_meta() {
        let html = r#"<div class="product_rent__text">.a { background-image: url(x) }</div>
            <meta property="og:description" content="Opis z og">"#;
        assert_eq!(extract_description(html, &SOURCES), "Opis z og");
    }

    #[test]
    fn truncates_to_max_chars() {
        let sources = DescriptionSources {
            max_chars: Some(5),
            ..SOURCES
        };
        let html = r#"<div class="description">Żółta koparka gąsienicowa</div>"#;
        assert_eq!(extract_description(html, &sources), "Żółta");
    }

    #[test]
    fn nothing_found_is_empty() {
        assert_eq!(extract_description("<p>x</p>", &SOURCES), "");
    }
}
