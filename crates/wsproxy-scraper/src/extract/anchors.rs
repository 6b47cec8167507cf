//! Block-scoped anchors.
//!
//! Product tiles wrap an image, a title and a price in one or more links to
//! the same URL, frequently with sibling markup that escapes the `<a>`
//! element. An anchor's block is everything from its open tag up to the
//! next anchor pointing somewhere else, capped at [`MAX_ANCHOR_SPAN`] bytes.

use std::ops::Range;

use reqwest::Url;

use crate::client::site_path;
use crate::markup::{self, Tag};

pub const MAX_ANCHOR_SPAN: usize = 4000;

#[derive(Debug, Clone)]
pub struct AnchorBlock<'a> {
    /// In-site path the anchor points to.
    pub path: String,
    pub open: Tag<'a>,
    /// Open tag through the end of the block.
    pub block: &'a str,
    pub start: usize,
}

impl AnchorBlock<'_> {
    #[must_use]
    pub fn text_lines(&self) -> Vec<String> {
        markup::text_lines(self.block)
    }

    #[must_use]
    pub fn text(&self) -> String {
        markup::text_of(self.block)
    }

    #[must_use]
    pub fn within(&self, regions: &[Range<usize>]) -> bool {
        regions.iter().any(|r| r.contains(&self.start))
    }
}

/// Anchors to in-site paths, each scoped to its block.
///
/// An anchor nested in the block of an earlier anchor with the same path is
/// folded into it.
#[must_use]
pub fn scoped_anchors<'a>(html: &'a str, base: &Url) -> Vec<AnchorBlock<'a>> {
    let links: Vec<(Tag<'a>, Option<String>)> = markup::tags(html)
        .filter(|t| !t.closing && t.name == "a")
        .filter_map(|t| {
            let href = t.attr("href")?;
            let path = site_path(base, &href);
            Some((t, path))
        })
        .collect();

    let mut blocks: Vec<AnchorBlock<'a>> = Vec::new();
    for (i, (open, path)) in links.iter().enumerate() {
        let Some(path) = path else { continue };
        if let Some(prev) = blocks.last() {
            if prev.path == *path && open.start < prev.start + prev.block.len() {
                continue;
            }
        }
        let boundary = links[i + 1..]
            .iter()
            .find(|(_, other)| other.as_deref() != Some(path.as_str()))
            .map_or(html.len(), |(t, _)| t.start);
        let end = markup::floor_boundary(html, boundary.min(open.start + MAX_ANCHOR_SPAN));
        blocks.push(AnchorBlock {
            path: path.clone(),
            open: open.clone(),
            block: &html[open.start..end],
            start: open.start,
        });
    }
    blocks
}
