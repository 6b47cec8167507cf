//! HTTP clients and markup/JSON extraction for the supported wholesaler sites.

pub mod auth;
pub mod classify;
pub mod client;
pub mod error;
pub mod extract;
pub mod markup;
pub mod sites;
pub mod types;

pub use auth::{AccountInfo, SignInOutcome, SiteAuth};
pub use classify::{classify, CatalogProfile, Classification, PageKind};
pub use client::{HeaderProfile, PostResponse, SiteClient};
pub use error::ScraperError;
pub use sites::atut::{AtutPage, AtutProduct};
pub use sites::onninen::{CatalogProduct, OnninenPage, ProductCard, ProductPage};
pub use sites::ramirent::{EquipmentGroup, RamirentPage};
pub use sites::{AtutSite, Authenticator, OnninenSite, RamirentSite, Sites};
pub use types::{CategoryEntry, Crumb, ListItem, Listing, Param, RelatedItem};
