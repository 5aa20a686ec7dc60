//! Result ordering for the catalog listing.
//!
//! All orderings are stable: products that compare equal keep their
//! relative input order.

use lustre_features::compare_names;
use lustre_model::{Product, SortKey};
use std::cmp::Ordering;

/// Compare two products under `key`.
pub fn compare(a: &Product, b: &Product, key: SortKey) -> Ordering {
    match key {
        SortKey::PriceLow => a.display_price.total_cmp(&b.display_price),
        SortKey::PriceHigh => b.display_price.total_cmp(&a.display_price),
        SortKey::Rating => by_rating(a, b),
        // Identifier order stands in for creation time; only meaningful for
        // ids that embed a timestamp prefix.
        SortKey::Newest => b.id.cmp(&a.id),
        SortKey::Name => compare_names(&a.name, &b.name),
        SortKey::Default => b
            .is_featured
            .cmp(&a.is_featured)
            .then_with(|| b.is_trending.cmp(&a.is_trending))
            .then_with(|| by_rating(a, b)),
    }
}

/// Descending rating, missing ratings counted as zero.
fn by_rating(a: &Product, b: &Product) -> Ordering {
    b.rating_or_zero().total_cmp(&a.rating_or_zero())
}

/// Order `indices` (positions into `products`) by `key`.
pub fn sort_indices(products: &[Product], indices: &mut [usize], key: SortKey) {
    indices.sort_by(|&a, &b| compare(&products[a], &products[b], key));
}

/// Order products in place by `key`.
pub fn sort_products(products: &mut [Product], key: SortKey) {
    products.sort_by(|a, b| compare(a, b, key));
}
