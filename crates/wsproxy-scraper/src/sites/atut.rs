//! Atut Rental: anonymous, server-rendered rental catalog under `/wynajem/`.

use reqwest::Url;
use serde::Serialize;
use wsproxy_core::CookieJar;

use crate::classify::{classify, CatalogProfile, PageKind};
use crate::client::{encode_component, normalize_path, path_depth, HeaderProfile, SiteClient};
use crate::error::ScraperError;
use crate::extract::{
    extract_breadcrumb, extract_description, extract_params, extract_related, price,
    DescriptionSources, ImagePolicy, ParamLayout, PriceBlock,
};
use crate::markup;
use crate::types::{CategoryEntry, Crumb, ListItem, Listing, Param, RelatedItem};

pub const HEADER_PROFILE: HeaderProfile = HeaderProfile::HTML;

const CATALOG_ROOT: &str = "/wynajem/";
const SEARCH_PATH: &str = "/wyniki-wyszukiwania";
const BREADCRUMB_CLASS: &str = "bread-crums";

const IMAGES: ImagePolicy = ImagePolicy {
    junk: &[
        "shopping-cart",
        "logo-footer",
        "autograph",
        "Mockup",
        "discount",
        "appstore",
        "googleplay",
        "white-pin",
        "phone.png",
        "email.png",
        "Grupa-83",
        "koparka",
        "building",
        "calendar",
        "profesional",
        "van.png",
        "van-white",
        "slash.png",
        "tiny-logo",
        "map.png",
    ],
    reject_svg: true,
};

pub const PROFILE: CatalogProfile = CatalogProfile {
    root: CATALOG_ROOT,
    product_markers: &["product__aside__rental", "product_rent__right_box"],
    skip_texts: &[
        "Wynajem",
        "Sprzedaż",
        "Bobcat",
        "Serwis",
        "O firmie",
        "Kontakt",
        "BLOG",
        "Dlaczego Atut Rental?",
        "Aplikacja ATUTGO",
        "Dlaczego wynajem?",
        "Pytania i odpowiedzi",
        "Warunki najmu",
        "Do pobrania",
        "więcej wyników",
        "szukaj",
        "zobacz",
        "0",
        "Serwis na budowie",
        "Przeglądy okresowe",
        "Oryginalne części zamienne",
        "Gruntowne remonty maszyn",
        "O nas",
        "Aktualności",
        "Historia",
        "Nasze realizacje",
        "Działalność społeczna",
        "PSBW",
        "Kariera",
    ],
    skip_paths: &[
        "dlaczego",
        "pytania",
        "warunki",
        "pobrania",
        "aplikacja",
        "firma",
        "kontakt",
        "serwis/",
        "blog",
        "sprzedaz",
        "bobcat",
        "koszyk",
        "wyniki",
    ],
    images: IMAGES,
};

const NET_PRICE: PriceBlock = PriceBlock {
    block: "product__aside__rental--net",
    amount: "product__aside__rental__price",
    unit: Some("product__aside__rental__type"),
};

const GROSS_PRICE: PriceBlock = PriceBlock {
    block: "product__aside__rental--gross",
    amount: "product__aside__rental__price",
    unit: None,
};

const DESCRIPTION: DescriptionSources = DescriptionSources {
    container: Some("product_rent__text"),
    headings: &["opis produktu", "opis"],
    fallback_class: None,
    max_chars: None,
};

const PARAMS: &[ParamLayout] = &[ParamLayout::Pairs {
    class: "product_rent__right_box__description__text",
}];

/// Rental product detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AtutProduct {
    pub title: String,
    pub product_id: String,
    pub breadcrumb: Vec<Crumb>,
    pub price_netto: Option<f64>,
    pub price_brutto: Option<f64>,
    pub price_unit: String,
    pub images: Vec<String>,
    pub image: String,
    pub brand: String,
    pub description: String,
    pub params: Vec<Param>,
    pub ribbon: String,
    pub similar: Vec<RelatedItem>,
    /// No published price; the site asks for a quote instead.
    pub contact_only: bool,
}

/// Result of browsing an arbitrary catalog path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AtutPage {
    Product { product: Box<AtutProduct> },
    List(Listing),
}

#[derive(Debug, Clone)]
pub struct AtutSite {
    client: SiteClient,
}

impl AtutSite {
    #[must_use]
    pub fn new(client: SiteClient) -> Self {
        Self { client }
    }

    /// Top-level rental categories.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the catalog root cannot be fetched.
    pub async fn categories(&self) -> Result<Vec<CategoryEntry>, ScraperError> {
        let html = self.fetch(CATALOG_ROOT).await?;
        let listing = parse_listing(&html, CATALOG_ROOT, self.client.base());
        let top_depth = path_depth(CATALOG_ROOT) + 1;
        Ok(listing
            .items
            .into_iter()
            .filter(|item| path_depth(&item.slug) == top_depth)
            .map(|item| CategoryEntry {
                slug: item.slug,
                name: item.name,
                image: item.image,
                id: None,
                subcategories: Vec::new(),
            })
            .collect())
    }

    /// Fetches `slug` and returns either its product or its listing.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the page cannot be fetched.
    pub async fn browse(&self, slug: &str) -> Result<AtutPage, ScraperError> {
        let path = page_path(slug);
        let html = self.fetch(&path).await?;
        Ok(parse_page(&html, &path, self.client.base()))
    }

    /// Parses `slug` as a product page regardless of markers.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the page cannot be fetched.
    pub async fn product(&self, slug: &str) -> Result<AtutProduct, ScraperError> {
        let html = self.fetch(&page_path(slug)).await?;
        Ok(parse_product(&html, self.client.base()))
    }

    /// Runs the storefront search.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] if the results page cannot be fetched.
    pub async fn search(&self, query: &str) -> Result<Vec<ListItem>, ScraperError> {
        let path = format!("{SEARCH_PATH}?search={}", encode_component(query));
        let html = self.fetch(&path).await?;
        Ok(parse_listing(&html, SEARCH_PATH, self.client.base()).items)
    }

    async fn fetch(&self, path: &str) -> Result<String, ScraperError> {
        let mut jar = CookieJar::new();
        self.client.fetch_html(path, &mut jar).await
    }
}

/// Slugs are paths; the trailing slash the site uses is kept.
fn page_path(slug: &str) -> String {
    if slug.starts_with('/') {
        slug.to_owned()
    } else {
        format!("/{slug}")
    }
}

/// Classifies a fetched page and parses it accordingly.
#[must_use]
pub fn parse_page(html: &str, requested: &str, base: &Url) -> AtutPage {
    let cleaned = markup::strip_noise(html);
    if PROFILE
        .product_markers
        .iter()
        .any(|m| cleaned.contains(m))
    {
        return AtutPage::Product {
            product: Box::new(parse_product(html, base)),
        };
    }
    AtutPage::List(parse_listing(html, requested, base))
}

/// Parses a listing page: subcategory hub or priced product list.
#[must_use]
pub fn parse_listing(html: &str, requested: &str, base: &Url) -> Listing {
    let cleaned = markup::strip_noise(html);
    let classification = classify(&cleaned, &normalize_path(requested), base, &PROFILE);
    if classification.kind == PageKind::Product {
        tracing::debug!(path = requested, "product markers on a page parsed as listing");
    }
    Listing {
        title: markup::first_heading(&cleaned).unwrap_or_default(),
        breadcrumb: extract_breadcrumb(&cleaned, base, BREADCRUMB_CLASS),
        has_products: classification.has_products(),
        items: classification.items,
    }
}

/// Parses a rental product page.
#[must_use]
pub fn parse_product(html: &str, base: &Url) -> AtutProduct {
    let cleaned = markup::strip_noise(html);
    let html = cleaned.as_ref();

    let net = price::read_block(html, &NET_PRICE);
    let gross = price::read_block(html, &GROSS_PRICE);
    let images = product_images(html, base);

    let product_id = markup::tags(html)
        .find(|t| !t.closing && t.name == "h1")
        .and_then(|t| t.attr("data-irs"))
        .unwrap_or_default();

    AtutProduct {
        title: markup::first_heading(html).unwrap_or_default(),
        product_id,
        breadcrumb: extract_breadcrumb(html, base, BREADCRUMB_CLASS),
        contact_only: net.amount.is_none() && gross.amount.is_none(),
        price_netto: net.amount,
        price_brutto: gross.amount,
        price_unit: net.unit.unwrap_or_else(|| price::DEFAULT_UNIT.to_owned()),
        image: images.first().cloned().unwrap_or_default(),
        images,
        brand: brand(html),
        description: extract_description(html, &DESCRIPTION),
        params: extract_params(html, PARAMS),
        ribbon: markup::text_of_class(html, "product__aside__ribbon__text").unwrap_or_default(),
        similar: extract_related(html, base, "rent_like", &["rent_like__text"], &IMAGES),
    }
}

fn product_images(html: &str, base: &Url) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    let push = |raw: Option<String>, images: &mut Vec<String>| {
        if let Some(url) = raw
            .and_then(|r| crate::client::absolutize(base, &r))
            .filter(|u| IMAGES.accepts(u))
        {
            if !images.contains(&url) {
                images.push(url);
            }
        }
    };

    for class in ["carousel--big--rent__item", "carousel--small--rent__item"] {
        for tag in markup::with_class(html, class) {
            push(tag.attr("data-lazy-bg"), &mut images);
        }
    }
    if images.is_empty() {
        push(markup::meta_content(html, "og:image"), &mut images);
    }
    if images.is_empty() {
        for tag in markup::tags(html).filter(|t| !t.closing) {
            let lazy = tag
                .attr("data-lazy-bg")
                .filter(|u| u.contains("/uploads/") || u.contains("irs_category_img"));
            push(lazy, &mut images);
        }
    }
    images
}

/// Manufacturer named in the "Producent" header or the small text next to it.
fn brand(html: &str) -> String {
    for header in markup::with_class(html, "product_rent__header") {
        let text = markup::text_of(markup::element(html, &header));
        let Some(pos) = text.find("Producent").or_else(|| text.find("producent")) else {
            continue;
        };
        let inline = text[pos + "producent".len()..]
            .trim_start_matches(|c: char| c == ':' || c.is_whitespace())
            .trim();
        if !inline.is_empty() {
            return inline.to_owned();
        }
        if let Some(small) = markup::tags_from(html, header.end)
            .find(|t| !t.closing && t.class_contains("product_rent__smalltext"))
        {
            return markup::text_of(markup::element(html, &small));
        }
    }
    String::new()
}

#[cfg(test)]
#[path = "atut_test.rs"]
mod tests;
