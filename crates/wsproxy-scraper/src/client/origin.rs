//! URL resolution against a site's base origin.

use reqwest::Url;

use crate::error::ScraperError;

/// Parses a configured base URL.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if `base_url` is not an absolute URL.
pub fn parse_base(base_url: &str) -> Result<Url, ScraperError> {
    Url::parse(base_url).map_err(|e| ScraperError::InvalidUrl {
        url: base_url.to_owned(),
        reason: e.to_string(),
    })
}

/// Resolves `path` against `base`. Absolute `http(s)` URLs pass through.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] if the joined URL cannot be parsed.
pub fn resolve(base: &Url, path: &str) -> Result<Url, ScraperError> {
    let joined = if path.starts_with("http://") || path.starts_with("https://") {
        Url::parse(path)
    } else {
        base.join(path)
    };
    joined.map_err(|e| ScraperError::InvalidUrl {
        url: path.to_owned(),
        reason: e.to_string(),
    })
}

/// Absolutizes an image or link reference found in markup.
///
/// Protocol-relative references get `https:`. Unparseable input yields `None`.
#[must_use]
pub fn absolutize(base: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with("data:") {
        return None;
    }
    if let Some(rest) = reference.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    base.join(reference).ok().map(String::from)
}

/// Returns the path of an in-site `href`, or `None` for foreign hosts and
/// non-navigational links (`#`, `javascript:`, `mailto:`, `tel:`).
#[must_use]
pub fn site_path(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || ["javascript:", "mailto:", "tel:"]
            .iter()
            .any(|scheme| href.to_ascii_lowercase().starts_with(scheme))
    {
        return None;
    }
    let url = base.join(href).ok()?;
    if url.host_str() != base.host_str() {
        return None;
    }
    Some(url.path().to_owned())
}

/// Number of non-empty path segments.
#[must_use]
pub fn path_depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

/// Normalizes a slug or path to `/a/b` form (leading slash, no trailing one).
#[must_use]
pub fn normalize_path(slug: &str) -> String {
    let trimmed = slug.trim().trim_matches('/');
    format!("/{trimmed}")
}
