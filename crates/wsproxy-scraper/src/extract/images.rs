//! Image resolution for tiles, cards and galleries.
//!
//! Storefronts lazy-load most imagery, so the real URL lives in a
//! `data-lazy-bg` attribute or an inline `background-image` long before it
//! shows up in an `<img src>`.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use crate::client::absolutize;
use crate::markup::{self, Tag};

static BACKGROUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)background(?:-image)?\s*:\s*url\(\s*['"]?([^'")\s]+)"#).expect("valid regex")
});

/// Which URLs count as decorative rather than product imagery.
#[derive(Debug, Clone, Copy)]
pub struct ImagePolicy {
    /// Case-sensitive substrings that mark an icon, logo or banner.
    pub junk: &'static [&'static str],
    pub reject_svg: bool,
}

impl ImagePolicy {
    pub const PERMISSIVE: Self = Self {
        junk: &[],
        reject_svg: false,
    };

    #[must_use]
    pub fn accepts(&self, url: &str) -> bool {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if self.reject_svg && path.to_ascii_lowercase().ends_with(".svg") {
            return false;
        }
        !self.junk.iter().any(|j| url.contains(j))
    }
}

/// Resolves the representative image of a tile.
///
/// `block` starts with the tile's own open tag. Candidates in priority order:
/// the tile's `data-lazy-bg`, a descendant's `data-lazy-bg`, an inline
/// `background-image` on the tile then on a descendant, and finally
/// `<img>`/`<source>` sources. `<style>` blocks are ignored.
#[must_use]
pub fn resolve_image(block: &str, base: &Url, policy: &ImagePolicy) -> Option<String> {
    let cleaned = markup::strip_noise(block);
    let all: Vec<Tag<'_>> = markup::tags(&cleaned).filter(|t| !t.closing).collect();
    let (own, descendants) = all.split_first()?;

    let pick = |raw: Option<String>| -> Option<String> {
        raw.and_then(|r| absolutize(base, &r))
            .filter(|url| policy.accepts(url))
    };

    if let Some(url) = pick(own.attr("data-lazy-bg")) {
        return Some(url);
    }
    if let Some(url) = descendants.iter().find_map(|t| pick(t.attr("data-lazy-bg"))) {
        return Some(url);
    }
    if let Some(url) = pick(style_background(own)) {
        return Some(url);
    }
    if let Some(url) = descendants.iter().find_map(|t| pick(style_background(t))) {
        return Some(url);
    }
    all.iter().find_map(|t| source_candidates(t).into_iter().find_map(|c| pick(Some(c))))
}

/// Every acceptable image in a gallery fragment, deduplicated, in order.
#[must_use]
pub fn collect_images(fragment: &str, base: &Url, policy: &ImagePolicy) -> Vec<String> {
    let cleaned = markup::strip_noise(fragment);
    let mut out: Vec<String> = Vec::new();
    for tag in markup::tags(&cleaned).filter(|t| !t.closing) {
        let mut candidates = Vec::new();
        candidates.extend(tag.attr("data-lazy-bg"));
        candidates.extend(style_background(&tag));
        candidates.extend(source_candidates(&tag));
        for candidate in candidates {
            if let Some(url) = absolutize(base, &candidate).filter(|u| policy.accepts(u)) {
                if !out.contains(&url) {
                    out.push(url);
                }
            }
        }
    }
    out
}

fn style_background(tag: &Tag<'_>) -> Option<String> {
    let style = tag.attr("style")?;
    BACKGROUND_RE
        .captures(&style)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

fn source_candidates(tag: &Tag<'_>) -> Vec<String> {
    match tag.name.as_str() {
        "img" => ["src", "data-src", "data-lazy"]
            .iter()
            .filter_map(|a| tag.attr(a))
            .filter(|v| !v.trim().is_empty())
            .collect(),
        "source" => tag
            .attr("srcset")
            .and_then(|s| first_srcset_url(&s))
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// First URL of a `srcset` list.
#[must_use]
pub fn first_srcset_url(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .next()
        .and_then(|entry| entry.split_whitespace().next())
        .map(str::to_owned)
}
