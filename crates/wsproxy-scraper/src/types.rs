//! Payloads returned to callers. All serialize as camelCase JSON.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedItem {
    pub slug: String,
    pub name: String,
    pub image: String,
}

/// A catalog node. `slug` is the site path (or API slug for JSON catalogs).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntry {
    pub slug: String,
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<CategoryEntry>,
}

/// One tile of a listing page: a subcategory link or a priced product card.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub slug: String,
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_netto: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_brutto: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_unit: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub specs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breadcrumb: Option<String>,
}

/// A listing page after classification.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub title: String,
    pub breadcrumb: Vec<Crumb>,
    pub items: Vec<ListItem>,
    pub has_products: bool,
}

impl Listing {
    #[must_use]
    pub fn total(&self) -> usize {
        self.items.len()
    }
}
