use reqwest::Url;

use crate::client::site_path;
use crate::markup;
use crate::types::Crumb;

const HOME_LABELS: &[&str] = &["Strona główna"];

/// Links inside the first container whose class contains `container`.
/// Home links and empty labels are dropped.
#[must_use]
pub fn extract_breadcrumb(html: &str, base: &Url, container: &str) -> Vec<Crumb> {
    let Some(block) = markup::first_with_class(html, container) else {
        return Vec::new();
    };
    markup::tags(block)
        .filter(|t| !t.closing && t.name == "a")
        .filter_map(|t| {
            let path = site_path(base, &t.attr("href")?)?;
            let name = markup::text_of(markup::element(block, &t));
            (!name.is_empty() && !HOME_LABELS.iter().any(|h| name.contains(h)))
                .then_some(Crumb { slug: path, name })
        })
        .collect()
}
