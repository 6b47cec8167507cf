//! Onninen JSON API: wire types and their mapping to catalog payloads.
//!
//! The API is loosely typed (ids and amounts arrive as numbers or strings,
//! optional objects as `null`), so wire structs keep such fields as
//! [`Value`] and convert at the edge.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sites::{number, scalar_string};
use crate::types::{CategoryEntry, Param};

/// Products per search page when the API reports only a total.
pub const PAGE_SIZE: u64 = 24;
const DEFAULT_VAT: f64 = 23.0;
const DEFAULT_CURRENCY: &str = "PLN";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawProduct {
    pub id: Value,
    pub slug: Option<String>,
    pub index: Value,
    pub catalogindex: Value,
    pub name: Option<String>,
    pub imagemd: Option<String>,
    pub imageth: Option<String>,
    pub unit: Option<String>,
    pub currency: Option<String>,
    pub price: Option<RawPrice>,
    pub avail: Option<RawAvail>,
    pub brand: Value,
    pub series: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPrice {
    pub items: Option<Vec<RawPriceTier>>,
    pub vat: Value,
    pub pricetypename: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPriceTier {
    pub quantity: Value,
    pub priceend: Value,
    pub pricecatalog: Value,
    pub discount: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAvail {
    pub quantitydc: Value,
    pub quantitylc: Value,
    pub description: Option<String>,
    pub quantitymin: Value,
    pub quantitymodulo: Value,
}

/// `/api/card` product with the detail-only fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCard {
    #[serde(flatten)]
    pub product: RawProduct,
    pub categories: Option<Vec<RawNamed>>,
    pub ext: Option<RawExt>,
    pub attributes: Value,
    pub specs: Value,
    pub parameters: Value,
    pub ean: Value,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawNamed {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawExt {
    pub variants: Option<Vec<RawVariantGroup>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawVariantGroup {
    pub items: Option<Vec<RawVariant>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawVariant {
    pub id: Value,
    pub slug: Option<String>,
    pub name: Option<String>,
    pub active: Option<bool>,
}

/// `/api/search` response. Products arrive grouped in titled sections under
/// `items`, or flat under `products`/`results`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSearch {
    pub items: Option<Vec<Value>>,
    pub products: Option<Vec<RawProduct>>,
    pub results: Option<Vec<RawProduct>>,
    pub total: Value,
    #[serde(rename = "totalCount")]
    pub total_count: Value,
    pub lastpage: Value,
    #[serde(rename = "totalPages")]
    pub total_pages: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTier {
    pub quantity: Option<f64>,
    pub price_end: Option<f64>,
    pub price_catalog: Option<f64>,
    pub discount: Option<f64>,
}

/// Product as listed in search results and categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: String,
    pub slug: String,
    pub index: String,
    pub catalog_index: String,
    pub name: String,
    pub image: String,
    pub image_th: String,
    pub url: String,
    pub currency: String,
    pub unit: String,
    /// Catalog (list) price of the first tier.
    pub price_catalog: Option<f64>,
    /// Customer price of the first tier; only present for logged-in sessions.
    pub price_end: Option<f64>,
    pub discount: Option<f64>,
    pub vat: f64,
    pub price_type: String,
    pub price_tiers: Vec<PriceTier>,
    pub stock: f64,
    pub stock_local: f64,
    pub stock_status: String,
    pub min_qty: f64,
    pub modulo: f64,
    pub brand: String,
    pub series: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub active: bool,
}

/// Product card with specs, variants and its category path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    #[serde(flatten)]
    pub product: CatalogProduct,
    pub categories: Vec<String>,
    pub breadcrumb: String,
    pub variants: Vec<Variant>,
    pub specs: Vec<Param>,
    pub ean: String,
    pub description: String,
}

/// One page of search or category results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<CatalogProduct>,
    pub page: u32,
    pub total_pages: u64,
    pub total_products: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
}

impl RawProduct {
    #[must_use]
    pub fn into_catalog(self, origin: &str) -> CatalogProduct {
        let price = self.price.unwrap_or_default();
        let tiers: Vec<PriceTier> = price
            .items
            .unwrap_or_default()
            .iter()
            .map(|t| PriceTier {
                quantity: number(&t.quantity),
                price_end: positive(&t.priceend),
                price_catalog: positive(&t.pricecatalog),
                discount: positive(&t.discount),
            })
            .collect();
        let first = tiers.first().cloned().unwrap_or_default();
        let avail = self.avail.unwrap_or_default();
        let slug = self.slug.unwrap_or_default();
        let image_th = self.imageth.unwrap_or_default();

        CatalogProduct {
            id: scalar_string(&self.id).unwrap_or_default(),
            url: if slug.is_empty() {
                String::new()
            } else {
                format!("{origin}/product/{slug}")
            },
            slug,
            index: scalar_string(&self.index).unwrap_or_default(),
            catalog_index: scalar_string(&self.catalogindex).unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            image: self
                .imagemd
                .filter(|i| !i.is_empty())
                .unwrap_or_else(|| image_th.clone()),
            image_th,
            currency: self
                .currency
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_owned()),
            unit: self.unit.unwrap_or_default(),
            price_catalog: first.price_catalog,
            price_end: first.price_end,
            discount: first.discount,
            vat: positive(&price.vat).unwrap_or(DEFAULT_VAT),
            price_type: price.pricetypename.unwrap_or_default(),
            price_tiers: tiers,
            stock: number(&avail.quantitydc).unwrap_or(0.0),
            stock_local: number(&avail.quantitylc).unwrap_or(0.0),
            stock_status: avail.description.unwrap_or_default(),
            min_qty: positive(&avail.quantitymin).unwrap_or(1.0),
            modulo: positive(&avail.quantitymodulo).unwrap_or(1.0),
            brand: first_name(&self.brand),
            series: first_name(&self.series),
        }
    }
}

impl RawCard {
    #[must_use]
    pub fn into_card(self, origin: &str) -> ProductCard {
        let categories: Vec<String> = self
            .categories
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.name.filter(|n| !n.is_empty()))
            .collect();
        let variants = self
            .ext
            .and_then(|e| e.variants)
            .and_then(|groups| groups.into_iter().next())
            .and_then(|g| g.items)
            .unwrap_or_default()
            .into_iter()
            .map(|v| Variant {
                id: scalar_string(&v.id).unwrap_or_default(),
                slug: v.slug.unwrap_or_default(),
                name: v.name.unwrap_or_default(),
                active: v.active.unwrap_or(false),
            })
            .collect();
        let specs = [&self.attributes, &self.specs, &self.parameters]
            .into_iter()
            .map(specs_from)
            .find(|s| !s.is_empty())
            .unwrap_or_default();

        ProductCard {
            breadcrumb: categories.join(" › "),
            categories,
            variants,
            specs,
            ean: scalar_string(&self.ean).unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            product: self.product.into_catalog(origin),
        }
    }
}

impl RawSearch {
    /// Flattens sections and derives paging.
    #[must_use]
    pub fn into_page(self, page: u32, origin: &str) -> ProductPage {
        let mut title = String::new();
        let raw: Vec<RawProduct> = match (self.products, self.results) {
            (Some(products), _) if !products.is_empty() => products,
            (_, Some(results)) if !results.is_empty() => results,
            _ => {
                let mut out = Vec::new();
                for entry in self.items.unwrap_or_default() {
                    if let Some(section) = entry.get("items").and_then(Value::as_array) {
                        if title.is_empty() {
                            title = scalar_string(&entry["title"]).unwrap_or_default();
                        }
                        out.extend(section.iter().filter_map(product_from_value));
                    } else if let Some(product) = product_from_value(&entry) {
                        out.push(product);
                    }
                }
                out
            }
        };
        let products: Vec<CatalogProduct> =
            raw.into_iter().map(|p| p.into_catalog(origin)).collect();
        let total_products = count(&self.total)
            .or_else(|| count(&self.total_count))
            .unwrap_or(products.len() as u64);
        let total_pages = count(&self.lastpage)
            .or_else(|| count(&self.total_pages))
            .unwrap_or_else(|| total_products.div_ceil(PAGE_SIZE))
            .max(1);

        ProductPage {
            products,
            page,
            total_pages,
            total_products,
            title,
        }
    }
}

/// Extracts the product object of a `/api/card` response.
#[must_use]
pub fn card_body(response: Value) -> Value {
    match response {
        Value::Object(mut map) => {
            for key in ["card", "product"] {
                if let Some(inner @ Value::Object(_)) = map.remove(key) {
                    return inner;
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Builds the category tree from the flat `/api/groups` list.
///
/// Nodes whose parent is missing become roots. Order within each level
/// follows the response.
#[must_use]
pub fn category_tree(response: &Value) -> Vec<CategoryEntry> {
    let list = match response {
        Value::Array(items) => items.as_slice(),
        other => ["items", "groups", "categories"]
            .iter()
            .find_map(|k| other.get(k).and_then(Value::as_array))
            .map_or(&[][..], Vec::as_slice),
    };

    let nodes: Vec<FlatCategory> = list.iter().filter_map(FlatCategory::from_value).collect();
    let known: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();
    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        match node.parent.as_deref().and_then(|p| known.get(p)) {
            Some(&parent) if parent != i => children.entry(parent).or_default().push(i),
            _ => roots.push(i),
        }
    }

    let mut visited = vec![false; nodes.len()];
    roots
        .into_iter()
        .filter_map(|i| build_node(i, &nodes, &children, &mut visited))
        .collect()
}

struct FlatCategory {
    id: String,
    name: String,
    slug: String,
    parent: Option<String>,
}

impl FlatCategory {
    fn from_value(item: &Value) -> Option<Self> {
        let field = |keys: &[&str]| keys.iter().find_map(|k| scalar_string(&item[*k]));
        let id = field(&["id", "groupId"])?;
        Some(Self {
            name: field(&["name", "title"]).unwrap_or_default(),
            slug: field(&["slug", "urlSlug", "url"]).unwrap_or_else(|| id.clone()),
            parent: field(&["parentId", "parentGroupId"]).filter(|p| p != "0"),
            id,
        })
    }
}

fn build_node(
    index: usize,
    nodes: &[FlatCategory],
    children: &HashMap<usize, Vec<usize>>,
    visited: &mut [bool],
) -> Option<CategoryEntry> {
    if visited[index] {
        return None;
    }
    visited[index] = true;
    let node = &nodes[index];
    let subcategories = children
        .get(&index)
        .map(|kids| {
            kids.iter()
                .filter_map(|&k| build_node(k, nodes, children, visited))
                .collect()
        })
        .unwrap_or_default();
    Some(CategoryEntry {
        slug: node.slug.clone(),
        name: node.name.clone(),
        image: String::new(),
        id: Some(node.id.clone()),
        subcategories,
    })
}

fn product_from_value(value: &Value) -> Option<RawProduct> {
    serde_json::from_value(value.clone())
        .map_err(|e| tracing::debug!(error = %e, "skipping malformed onninen product"))
        .ok()
}

fn specs_from(value: &Value) -> Vec<Param> {
    value
        .as_array()
        .map(|all| {
            all.iter()
                .filter_map(|s| {
                    let name = scalar_string(&s["name"]).or_else(|| scalar_string(&s["label"]))?;
                    Some(Param {
                        name,
                        value: scalar_string(&s["value"]).unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `[{name}]`, `{name}` or a plain string.
fn first_name(value: &Value) -> String {
    let first = match value {
        Value::Array(all) => all.first().unwrap_or(&Value::Null),
        other => other,
    };
    scalar_string(&first["name"])
        .or_else(|| scalar_string(first))
        .unwrap_or_default()
}

/// Amounts where zero means "not provided".
fn positive(value: &Value) -> Option<f64> {
    number(value).filter(|n| *n > 0.0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count(value: &Value) -> Option<u64> {
    number(value).filter(|n| *n > 0.0).map(|n| n.ceil() as u64)
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
