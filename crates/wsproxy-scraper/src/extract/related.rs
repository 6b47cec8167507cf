use reqwest::Url;

use crate::extract::anchors::scoped_anchors;
use crate::extract::images::{resolve_image, ImagePolicy};
use crate::markup;
use crate::types::RelatedItem;

/// Cards whose anchor class contains `anchor_class`, named by the first
/// element matching one of `name_classes`.
#[must_use]
pub fn extract_related(
    html: &str,
    base: &Url,
    anchor_class: &str,
    name_classes: &[&str],
    policy: &ImagePolicy,
) -> Vec<RelatedItem> {
    let mut items: Vec<RelatedItem> = Vec::new();
    for anchor in scoped_anchors(html, base) {
        if !anchor.open.class_contains(anchor_class) || items.iter().any(|i| i.slug == anchor.path)
        {
            continue;
        }
        let name = name_classes
            .iter()
            .find_map(|class| markup::text_of_class(anchor.block, class))
            .unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        items.push(RelatedItem {
            image: resolve_image(anchor.block, base, policy).unwrap_or_default(),
            slug: anchor.path,
            name,
        });
    }
    items
}
