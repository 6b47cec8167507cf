//! Markup parsers for ramirent.pl pages and XHR fragments.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::PageKind;
use crate::client::{absolutize, site_path};
use crate::extract::{
    collect_images, extract_description, extract_params, price, resolve_image,
    DescriptionSources, ImagePolicy, ParamLayout,
};
use crate::markup::{self, Tag};
use crate::sites::scalar_string;
use crate::types::{CategoryEntry, ListItem, Param, RelatedItem};

static JSON_LD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type=["']application/ld\+json["'][^>]*>(.*?)</script\s*>"#)
        .expect("valid regex")
});

/// Unit shown when the availability fragment names none.
pub const DEFAULT_UNIT: &str = "Dzień";

const CATEGORY_PREFIX: &str = "/wynajem/wg-produktu/";

const FALLBACK_CATEGORIES: &[(&str, &str)] = &[
    ("lekki-sprzet-budowlany", "Lekki sprzęt budowlany"),
    ("ciezki-sprzet-budowlany", "Ciężki sprzęt budowlany"),
    ("podnosniki", "Podnośniki"),
    ("zasilanie-i-ogrzewanie", "Zasilanie i ogrzewanie"),
    ("ogrodzenia-i-podpory-stropowe", "Ogrodzenia i podpory stropowe"),
    ("kontenery", "Kontenery"),
    ("rusztowania-i-uslugi", "Rusztowania i usługi"),
    ("podesty-i-dzwigi-budowlane", "Podesty i dźwigi budowlane"),
];

const DESCRIPTION: DescriptionSources = DescriptionSources {
    container: None,
    headings: &[],
    fallback_class: Some("description"),
    max_chars: Some(1000),
};

const PARAMS: &[ParamLayout] = &[
    ParamLayout::LabelValue {
        labels: &["c-product-spec__label", "c-product-spec__name"],
        value: "c-product-spec__value",
    },
    ParamLayout::Table {
        container: "c-equipment-specification-table",
    },
    ParamLayout::AnyTable,
];

/// Equipment group page: one rentable machine type with its models.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentGroup {
    pub title: String,
    pub code: String,
    pub group_id: String,
    pub description: String,
    pub price_brutto: Option<f64>,
    pub price_netto: Option<f64>,
    pub price_unit: Option<String>,
    pub brand: String,
    pub image: String,
    pub images: Vec<String>,
    /// XHR fragment with prices and availability.
    pub detail_url: String,
    pub models: Vec<RelatedItem>,
    pub parameters: Vec<Param>,
    pub available: String,
    pub place: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<RelatedItem>,
    pub contact_only: bool,
}

impl EquipmentGroup {
    /// Overlays prices and availability from the XHR fragment.
    pub fn apply_detail(&mut self, detail: AvailabilityDetail) {
        if detail.price_brutto.is_some() {
            self.price_brutto = detail.price_brutto;
        }
        if detail.price_netto.is_some() {
            self.price_netto = detail.price_netto;
        }
        self.price_unit = Some(detail.price_unit);
        if !detail.available.is_empty() {
            self.available = detail.available;
        }
        if !detail.place.is_empty() {
            self.place = detail.place;
        }
        self.contact_only = self.price_brutto.is_none() && self.price_netto.is_none();
    }
}

/// Prices and stock from the group's XHR fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailabilityDetail {
    pub price_brutto: Option<f64>,
    pub price_netto: Option<f64>,
    pub price_unit: String,
    pub available: String,
    pub place: String,
}

/// `/wyszukiwarka` XHR response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchHit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub breadcrumb: Value,
    #[serde(default)]
    pub img: Option<String>,
}

/// Category hub vs equipment group, by URL first and markup second.
#[must_use]
pub fn detect_kind(path: &str, html: &str) -> PageKind {
    if path.contains("/wg-produktu/") || path.contains("/wg-zastosowania/") {
        return PageKind::CategoryListing;
    }
    if html.contains("p-equipments-item") {
        return PageKind::Group;
    }
    if html.contains("p-equipments-list-box") || html.contains("c-product-card") {
        return PageKind::CategoryListing;
    }
    PageKind::Group
}

/// Top-level categories from `/wynajem`, or the known list when the page
/// carries none.
#[must_use]
pub fn parse_categories(html: &str, base: &Url) -> Vec<CategoryEntry> {
    let found: Vec<CategoryEntry> = card_anchors(html, base, "c-category-box")
        .filter(|(path, _)| path.starts_with(CATEGORY_PREFIX))
        .filter_map(|(path, block)| {
            let name = markup::text_of_class(block, "c-category-box__title")?;
            Some(CategoryEntry {
                image: card_image(block, base),
                slug: path,
                name,
                id: None,
                subcategories: Vec::new(),
            })
        })
        .fold(Vec::new(), dedup_by_slug);
    if !found.is_empty() {
        return found;
    }
    tracing::debug!("no category boxes on /wynajem, using known categories");
    FALLBACK_CATEGORIES
        .iter()
        .map(|(slug, name)| CategoryEntry {
            slug: format!("{CATEGORY_PREFIX}{slug}"),
            name: (*name).to_owned(),
            image: String::new(),
            id: None,
            subcategories: Vec::new(),
        })
        .collect()
}

/// Tiles of a category page: equipment boxes when present, product cards otherwise.
#[must_use]
pub fn parse_category_items(html: &str, base: &Url) -> Vec<ListItem> {
    let boxes = equipment_boxes(html, base);
    if boxes.is_empty() {
        product_cards(html, base)
    } else {
        boxes
    }
}

#[must_use]
pub fn equipment_boxes(html: &str, base: &Url) -> Vec<ListItem> {
    tiles(html, base, "p-equipments-list-box", "p-equipments-list-box__title")
        .into_iter()
        .map(|(mut item, block)| {
            item.breadcrumb = markup::text_of_class(block, "p-equipments-list-box__breadcrumb");
            item
        })
        .collect()
}

#[must_use]
pub fn product_cards(html: &str, base: &Url) -> Vec<ListItem> {
    tiles(html, base, "c-product-card", "c-product-card__title")
        .into_iter()
        .map(|(item, _)| item)
        .collect()
}

fn tiles<'a>(
    html: &'a str,
    base: &'a Url,
    anchor_class: &'a str,
    title_class: &str,
) -> Vec<(ListItem, &'a str)> {
    let mut out: Vec<(ListItem, &'a str)> = Vec::new();
    for (path, block) in card_anchors(html, base, anchor_class) {
        if !path.contains("/wynajem/") || out.iter().any(|(i, _)| i.slug == path) {
            continue;
        }
        let Some(name) = markup::text_of_class(block, title_class) else {
            continue;
        };
        let item = ListItem {
            image: card_image(block, base),
            slug: path,
            name,
            ..ListItem::default()
        };
        out.push((item, block));
    }
    out
}

/// Parses an equipment group page. `html` is the raw page: JSON-LD lives in
/// a script block.
#[must_use]
pub fn parse_group(html: &str, base: &Url) -> EquipmentGroup {
    let ld = json_ld(html);
    let cleaned = markup::strip_noise(html);
    let page = cleaned.as_ref();

    let images = gallery(page, base);
    let image = ld
        .image
        .clone()
        .and_then(|i| absolutize(base, &i))
        .or_else(|| images.first().cloned())
        .or_else(|| markup::meta_content(page, "og:image").and_then(|i| absolutize(base, &i)))
        .unwrap_or_default();

    let code = markup::tags(page)
        .find(|t| !t.closing && t.has_class("text-primary") && t.has_class("font-bold"))
        .map(|t| markup::text_of(markup::element(page, &t)))
        .unwrap_or_default();

    EquipmentGroup {
        title: markup::first_heading(page).unwrap_or_default(),
        code,
        group_id: first_attr(page, "data-group_id").unwrap_or_default(),
        description: extract_description(page, &DESCRIPTION),
        contact_only: ld.price.is_none(),
        price_brutto: ld.price,
        price_netto: None,
        price_unit: None,
        brand: ld.brand.unwrap_or_default(),
        image,
        images,
        detail_url: first_attr(page, "data-jsLoad").unwrap_or_default(),
        models: models(page, base),
        parameters: extract_params(page, PARAMS),
        available: String::new(),
        place: String::new(),
        related: Vec::new(),
    }
}

/// Parses the group's XHR fragment with prices and availability.
#[must_use]
pub fn parse_detail(html: &str) -> AvailabilityDetail {
    let tags: Vec<Tag<'_>> = markup::tags(html).filter(|t| !t.closing).collect();
    let marked_price = |marker: &str| {
        tags.iter()
            .find(|t| t.raw.contains(marker))
            .and_then(|t| t.attr("data-price"))
            .and_then(|p| p.trim().parse::<f64>().ok())
    };
    let marked_text = |marker: &str| {
        tags.iter()
            .find(|t| t.raw.contains(marker))
            .map(|t| markup::text_of(markup::element(html, t)))
            .unwrap_or_default()
    };
    let classed_text = |classes: &[&str], needle: &[&str]| {
        tags.iter()
            .filter(|t| classes.iter().all(|c| t.has_class(c)))
            .map(|t| markup::text_of(markup::element(html, t)))
            .find(|text| needle.iter().all(|n| text.contains(n)))
    };

    let price_brutto = marked_price("jsPriceSumTax")
        .or_else(|| {
            classed_text(&["font-14", "font-bold"], &["zł"]).and_then(|t| price::parse_amount(&t))
        })
        .or_else(|| {
            tags.iter()
                .filter_map(|t| t.attr("data-price"))
                .find_map(|p| p.trim().parse::<f64>().ok())
        });
    let price_netto = marked_price("jsPriceSumNet").or_else(|| {
        classed_text(&["text-light"], &["zł", "netto"]).and_then(|t| price::parse_amount(&t))
    });
    let price_unit = tags
        .iter()
        .filter(|t| t.has_class("font-bold") && t.has_class("text-light"))
        .map(|t| markup::text_of(markup::element(html, t)))
        .find_map(|text| text.strip_prefix('/').map(|u| u.trim().to_owned()))
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_UNIT.to_owned());

    AvailabilityDetail {
        price_brutto,
        price_netto,
        price_unit,
        available: marked_text("jsPlaceStatus"),
        place: marked_text("jsPlaceLabel"),
    }
}

/// Cards from the `/ajax/groupsConnections/{id}` fragment.
#[must_use]
pub fn parse_related(html: &str, base: &Url) -> Vec<RelatedItem> {
    let mut items: Vec<RelatedItem> = Vec::new();
    for tag in markup::tags(html).filter(|t| !t.closing && t.name == "a") {
        let Some(path) = tag.attr("href").and_then(|h| site_path(base, &h)) else {
            continue;
        };
        if !path.contains("/wynajem/") || items.iter().any(|i| i.slug == path) {
            continue;
        }
        let block = markup::element(html, &tag);
        let Some(name) = markup::text_of_class(block, "c-product-card__title")
            .or_else(|| markup::text_of_class(block, "p-equipments-list-box__title"))
        else {
            continue;
        };
        items.push(RelatedItem {
            image: card_image(block, base),
            slug: path,
            name,
        });
    }
    items
}

/// Maps search hits to list items.
#[must_use]
pub fn search_items(response: SearchResponse, base: &Url) -> Vec<ListItem> {
    response
        .items
        .into_iter()
        .filter(|hit| !hit.href.is_empty())
        .map(|hit| ListItem {
            slug: site_path(base, &hit.href).unwrap_or(hit.href),
            name: hit.name,
            image: hit
                .img
                .and_then(|i| absolutize(base, &i))
                .unwrap_or_default(),
            breadcrumb: breadcrumb_text(&hit.breadcrumb),
            ..ListItem::default()
        })
        .collect()
}

fn breadcrumb_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(parts) => {
            let parts: Vec<String> = parts.iter().filter_map(scalar_string).collect();
            (!parts.is_empty()).then(|| parts.join(" › "))
        }
        other => scalar_string(other),
    }
}

#[derive(Debug, Default)]
struct JsonLd {
    price: Option<f64>,
    brand: Option<String>,
    image: Option<String>,
}

fn json_ld(html: &str) -> JsonLd {
    let mut ld = JsonLd::default();
    for caps in JSON_LD_RE.captures_iter(html) {
        let Ok(doc) = serde_json::from_str::<Value>(&caps[1]) else {
            tracing::debug!("skipping malformed JSON-LD block");
            continue;
        };
        let offers = match &doc["offers"] {
            Value::Array(all) => all.first().cloned().unwrap_or(Value::Null),
            other => other.clone(),
        };
        if let Some(price) = scalar_string(&offers["price"]).and_then(|p| price::parse_amount(&p)) {
            ld.price = Some(price);
        }
        if let Some(brand) =
            scalar_string(&doc["brand"]["name"]).or_else(|| scalar_string(&doc["brand"]))
        {
            ld.brand = Some(brand);
        }
        let image = match &doc["image"] {
            Value::Array(all) => all.first().and_then(scalar_string),
            other => scalar_string(other),
        };
        if image.is_some() {
            ld.image = image;
        }
    }
    ld
}

fn gallery(html: &str, base: &Url) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    for item in markup::all_with_class(html, "p-equipments-item-gallery__item") {
        for url in collect_images(item, base, &ImagePolicy::PERMISSIVE) {
            if !images.contains(&url) {
                images.push(url);
            }
        }
    }
    if images.is_empty() {
        if let Some(tag) =
            markup::tags(html).find(|t| !t.closing && t.raw.contains("data-jsGalleryItems"))
        {
            images = collect_images(markup::element(html, &tag), base, &ImagePolicy::PERMISSIVE);
        }
    }
    images
}

fn models(html: &str, base: &Url) -> Vec<RelatedItem> {
    let mut models: Vec<RelatedItem> = Vec::new();
    for (path, block) in card_anchors(html, base, "c-product-card") {
        if !(path.contains("/produkt/") || path.contains("/wynajem/")) {
            continue;
        }
        let Some(name) = markup::text_of_class(block, "c-product-card__title") else {
            continue;
        };
        models.push(RelatedItem {
            image: card_image(block, base),
            slug: path,
            name,
        });
    }
    models
}

/// `(path, outer markup)` of each `<a>` whose class contains `class`.
fn card_anchors<'a>(
    html: &'a str,
    base: &'a Url,
    class: &'a str,
) -> impl Iterator<Item = (String, &'a str)> + 'a {
    markup::tags(html)
        .filter(move |t| !t.closing && t.name == "a" && t.class_contains(class))
        .filter_map(move |t| {
            let path = site_path(base, &t.attr("href")?)?;
            Some((path, markup::element(html, &t)))
        })
}

fn card_image(block: &str, base: &Url) -> String {
    resolve_image(block, base, &ImagePolicy::PERMISSIVE).unwrap_or_default()
}

fn first_attr(html: &str, name: &str) -> Option<String> {
    markup::tags(html)
        .filter(|t| !t.closing)
        .find_map(|t| t.attr(name))
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn dedup_by_slug(mut acc: Vec<CategoryEntry>, entry: CategoryEntry) -> Vec<CategoryEntry> {
    if !acc.iter().any(|e| e.slug == entry.slug) {
        acc.push(entry);
    }
    acc
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
