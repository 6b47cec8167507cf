//! Structural field extractors.
//!
//! Every extractor degrades to an empty value when the markup does not
//! match; none of them return errors.

pub mod anchors;
pub mod breadcrumb;
pub mod description;
pub mod images;
pub mod params;
pub mod price;
pub mod related;

pub use anchors::{scoped_anchors, AnchorBlock, MAX_ANCHOR_SPAN};
pub use breadcrumb::extract_breadcrumb;
pub use description::{extract_description, DescriptionSources};
pub use images::{collect_images, first_srcset_url, resolve_image, ImagePolicy};
pub use params::{extract_params, ParamLayout};
pub use price::{BlockPrice, PriceBlock};
pub use related::extract_related;
