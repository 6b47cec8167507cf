//! Page classification for server-rendered catalogs.
//!
//! A catalog URL can land on a product, a list of priced products, or a hub
//! of subcategories, and the sites do not say which. The decision order:
//! detail markers, then child-category links, then priced cards, then
//! fallbacks for listings whose tiles carry neither.

use std::collections::HashSet;
use std::ops::Range;

use reqwest::Url;

use crate::client::{normalize_path, path_depth};
use crate::extract::anchors::{scoped_anchors, AnchorBlock};
use crate::extract::images::{resolve_image, ImagePolicy};
use crate::extract::price;
use crate::markup;
use crate::types::ListItem;

/// Above this many category items the catalog root keeps only top-level entries.
pub const DRILL_DOWN_THRESHOLD: usize = 30;

const MAX_NAME_CHARS: usize = 120;
const MAX_SPEC_CHARS: usize = 50;

/// Site-specific knobs for [`classify`].
#[derive(Debug, Clone, Copy)]
pub struct CatalogProfile {
    /// Path prefix of catalog pages, e.g. `/wynajem/`.
    pub root: &'static str,
    /// Substrings that only appear on product detail pages.
    pub product_markers: &'static [&'static str],
    /// Link texts of menus and promos that live inside the catalog prefix.
    pub skip_texts: &'static [&'static str],
    /// Path fragments of non-catalog pages.
    pub skip_paths: &'static [&'static str],
    pub images: ImagePolicy,
}

impl CatalogProfile {
    fn skips(&self, path: &str, text: &str) -> bool {
        self.skip_texts.contains(&text) || self.skip_paths.iter().any(|f| path.contains(f))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Product,
    Group,
    ProductListing,
    CategoryListing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: PageKind,
    /// Empty for detail pages.
    pub items: Vec<ListItem>,
}

impl Classification {
    fn new(kind: PageKind, items: Vec<ListItem>) -> Self {
        Self { kind, items }
    }

    #[must_use]
    pub fn has_products(&self) -> bool {
        self.kind == PageKind::ProductListing
    }
}

/// Classifies `html` fetched from `requested` and collects its list items.
///
/// `html` should already have scripts, styles and comments stripped.
#[must_use]
pub fn classify(
    html: &str,
    requested: &str,
    base: &Url,
    profile: &CatalogProfile,
) -> Classification {
    if profile.product_markers.iter().any(|m| html.contains(m)) {
        return Classification::new(PageKind::Product, Vec::new());
    }

    let requested = normalize_path(requested);
    let anchors = scoped_anchors(html, base);
    let chrome = markup::chrome_regions(html);

    let cards = priced_cards(&anchors, &chrome, base, profile);
    let card_paths: HashSet<&str> = cards.iter().map(|c| c.slug.as_str()).collect();
    let links: Vec<ListItem> = dedup_links(
        anchors
            .iter()
            .filter(|a| !a.within(&chrome) && !card_paths.contains(a.path.as_str()))
            .filter_map(|a| category_link(a, &requested, base, profile)),
    );

    let children: Vec<ListItem> = links
        .iter()
        .filter(|item| is_descendant(&item.slug, &requested))
        .cloned()
        .collect();
    if !children.is_empty() {
        let items = drill_down(children, &requested, profile);
        return Classification::new(PageKind::CategoryListing, items);
    }
    if !cards.is_empty() {
        return Classification::new(PageKind::ProductListing, cards);
    }

    let tile_depth = path_depth(profile.root) + 1;
    let buried: Vec<ListItem> = links
        .iter()
        .filter(|item| !item.image.is_empty() && path_depth(&item.slug) > tile_depth)
        .cloned()
        .collect();
    if !buried.is_empty() {
        tracing::debug!(path = %requested, count = buried.len(), "listing from image tiles");
        return Classification::new(PageKind::ProductListing, buried);
    }

    let requested_depth = path_depth(&requested);
    let deeper = dedup_links(
        anchors
            .iter()
            .filter(|a| path_depth(&a.path) > requested_depth)
            .filter_map(|a| category_link(a, &requested, base, profile)),
    );
    if !deeper.is_empty() {
        tracing::debug!(path = %requested, count = deeper.len(), "listing from deeper links");
        return Classification::new(PageKind::ProductListing, deeper);
    }

    Classification::new(PageKind::CategoryListing, links)
}

/// Whether `slug` lies strictly below `parent` (both normalized).
#[must_use]
pub fn is_descendant(slug: &str, parent: &str) -> bool {
    let slug = normalize_path(slug);
    if parent == "/" {
        return slug != "/";
    }
    slug.len() > parent.len() + 1
        && slug.starts_with(parent)
        && slug[parent.len()..].starts_with('/')
}

fn drill_down(items: Vec<ListItem>, requested: &str, profile: &CatalogProfile) -> Vec<ListItem> {
    if items.len() <= DRILL_DOWN_THRESHOLD || requested != normalize_path(profile.root) {
        return items;
    }
    let top_depth = path_depth(profile.root) + 1;
    let top: Vec<ListItem> = items
        .iter()
        .filter(|item| path_depth(&item.slug) == top_depth)
        .cloned()
        .collect();
    if top.is_empty() {
        items
    } else {
        top
    }
}

fn priced_cards(
    anchors: &[AnchorBlock<'_>],
    chrome: &[Range<usize>],
    base: &Url,
    profile: &CatalogProfile,
) -> Vec<ListItem> {
    let mut cards: Vec<ListItem> = Vec::new();
    for anchor in anchors {
        if !anchor.path.starts_with(profile.root)
            || anchor.within(chrome)
            || cards.iter().any(|c| c.slug == anchor.path)
        {
            continue;
        }
        let text = anchor.text();
        if !text.contains("zł") {
            continue;
        }
        let Some(name) = anchor
            .text_lines()
            .into_iter()
            .next()
            .filter(|n| (3..=MAX_NAME_CHARS).contains(&n.chars().count()))
        else {
            continue;
        };
        let price_netto = price::inline_net(&text);
        let price_brutto = price::inline_gross(&text);
        cards.push(ListItem {
            slug: anchor.path.clone(),
            name,
            image: resolve_image(anchor.block, base, &profile.images).unwrap_or_default(),
            price_unit: (price_netto.is_some() || price_brutto.is_some())
                .then(|| price::DEFAULT_UNIT.to_owned()),
            price: price_netto.map(price::format_net),
            price_netto,
            price_brutto,
            specs: card_specs(anchor.block),
            breadcrumb: None,
        });
    }
    cards
}

fn card_specs(block: &str) -> Vec<String> {
    let mut specs: Vec<String> = Vec::new();
    for tag in markup::tags(block).filter(|t| !t.closing && (t.name == "strong" || t.name == "b")) {
        let text = markup::text_of(markup::element(block, &tag));
        let lower = text.to_lowercase();
        if !text.is_empty()
            && !text.contains("zł")
            && !lower.contains("zobacz")
            && text.chars().count() < MAX_SPEC_CHARS
            && !specs.contains(&text)
        {
            specs.push(text);
        }
    }
    specs
}

fn category_link(
    anchor: &AnchorBlock<'_>,
    requested: &str,
    base: &Url,
    profile: &CatalogProfile,
) -> Option<ListItem> {
    if !anchor.path.starts_with(profile.root) || normalize_path(&anchor.path) == requested {
        return None;
    }
    let name = anchor
        .text_lines()
        .into_iter()
        .next()
        .or_else(|| anchor.open.attr("title").map(|t| markup::collapse_whitespace(&t)))
        .filter(|n| (2..=MAX_NAME_CHARS).contains(&n.chars().count()))
        .unwrap_or_default();
    if profile.skips(&anchor.path, &name) {
        return None;
    }
    let image = resolve_image(anchor.block, base, &profile.images).unwrap_or_default();
    if name.is_empty() && image.is_empty() {
        return None;
    }
    Some(ListItem {
        slug: anchor.path.clone(),
        name,
        image,
        ..ListItem::default()
    })
}

/// First occurrence of each path keeps its position; later duplicates only
/// fill in a missing name or image. Entries that never get a name are dropped.
fn dedup_links(items: impl Iterator<Item = ListItem>) -> Vec<ListItem> {
    let mut out: Vec<ListItem> = Vec::new();
    for item in items {
        match out.iter_mut().find(|o| o.slug == item.slug) {
            Some(existing) => {
                if existing.image.is_empty() {
                    existing.image = item.image;
                }
                if existing.name.is_empty() {
                    existing.name = item.name;
                }
            }
            None => out.push(item),
        }
    }
    out.retain(|item| !item.name.is_empty());
    out
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
