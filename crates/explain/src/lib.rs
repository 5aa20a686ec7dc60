//! Human-readable descriptions of the listing's filter state.
//!
//! Produces the removable "active filter" chips shown above the results,
//! explanations of why a given product is not listed, and the result
//! count summary.

use lustre_filter::{AttributeResolver, CatalogFilter, Criterion};
use lustre_model::{FilterCriteria, PriceRange, Product};
use serde::Serialize;

/// A single active selection, removable on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActiveFilter {
    Search { text: String },
    Price { min: f64, max: f64 },
    Category { name: String },
    Brand { name: String },
    Attribute { name: String, value: String },
    InStock,
}

impl ActiveFilter {
    /// Get the chip label.
    pub fn label(&self) -> String {
        match self {
            Self::Search { text } => format!("\"{}\"", text),
            Self::Price { min, max } => format!("{} - {}", format_amount(*min), format_amount(*max)),
            Self::Category { name } | Self::Brand { name } => name.clone(),
            Self::Attribute { name, value } => format!("{}: {}", name, value),
            Self::InStock => "In stock".to_string(),
        }
    }

    /// Undo this selection. Removing the price chip restores the full `bounds`.
    pub fn remove_from(&self, criteria: &mut FilterCriteria, bounds: PriceRange) {
        match self {
            Self::Search { .. } => criteria.search_query.clear(),
            Self::Price { .. } => criteria.price_range = bounds,
            Self::Category { name } => {
                criteria.categories.remove(name);
            }
            Self::Brand { name } => {
                criteria.brands.remove(name);
            }
            Self::Attribute { name, value } => {
                if let Some(values) = criteria.attributes.get_mut(name) {
                    values.remove(value);
                }
                criteria.prune_attributes();
            }
            Self::InStock => criteria.in_stock_only = false,
        }
    }
}

/// List every active selection, in filter panel order.
pub fn active_filters(criteria: &FilterCriteria, bounds: PriceRange) -> Vec<ActiveFilter> {
    let mut chips = Vec::new();

    if let Some(text) = criteria.search_text() {
        chips.push(ActiveFilter::Search {
            text: text.to_string(),
        });
    }
    if criteria.price_range != bounds {
        chips.push(ActiveFilter::Price {
            min: criteria.price_range.min,
            max: criteria.price_range.max,
        });
    }
    chips.extend(
        criteria
            .categories
            .iter()
            .map(|name| ActiveFilter::Category { name: name.clone() }),
    );
    chips.extend(
        criteria
            .brands
            .iter()
            .map(|name| ActiveFilter::Brand { name: name.clone() }),
    );
    for (name, values) in criteria.selected_attributes() {
        chips.extend(values.iter().map(|value| ActiveFilter::Attribute {
            name: name.to_string(),
            value: value.clone(),
        }));
    }
    if criteria.in_stock_only {
        chips.push(ActiveFilter::InStock);
    }

    chips
}

/// Why a product is missing from the results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub criterion: Criterion,
    pub summary: String,
}

/// Explain the first criterion `product` fails, or `None` if it is listed.
pub fn explain_rejection(
    product: &Product,
    criteria: &FilterCriteria,
    resolver: &AttributeResolver,
) -> Option<Rejection> {
    let criterion = CatalogFilter::new(criteria, resolver).check(product).err()?;

    let summary = match &criterion {
        Criterion::Search => format!(
            "Does not mention \"{}\"",
            criteria.search_text().unwrap_or_default()
        ),
        Criterion::Price => format!(
            "Price {} is outside {} - {}",
            format_amount(product.display_price),
            format_amount(criteria.price_range.min),
            format_amount(criteria.price_range.max)
        ),
        Criterion::Category => format!("Category '{}' is not selected", product.category),
        Criterion::Brand => match &product.brand {
            Some(brand) => format!("Brand '{}' is not selected", brand),
            None => "Has no brand".to_string(),
        },
        Criterion::Attribute(name) => match resolver.resolve(product, name) {
            Some((_, value)) => format!("{} '{}' is not selected", name, value),
            None => format!("Has no {}", name),
        },
        Criterion::InStock => "Out of stock".to_string(),
    };

    Some(Rejection { criterion, summary })
}

/// Result count line for the listing header.
pub fn summarize(filtered: usize, page: usize, page_size: usize) -> String {
    if filtered == 0 {
        return "No products match your filters.".to_string();
    }
    let page_size = page_size.max(1);
    let first = (page.max(1) - 1)
        .saturating_mul(page_size)
        .saturating_add(1);
    if first > filtered {
        return format!("No products on page {} of {} results.", page, filtered);
    }
    let last = first.saturating_add(page_size - 1).min(filtered);
    let noun = if filtered == 1 { "product" } else { "products" };
    format!("Showing {}-{} of {} {}", first, last, filtered, noun)
}

/// Format a price with thousands separators; fractions are kept to two places.
pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let amount = amount.abs();
    let whole = amount.trunc() as u64;
    let cents = ((amount - amount.trunc()) * 100.0).round() as u64;
    let (whole, cents) = if cents == 100 { (whole + 1, 0) } else { (whole, cents) };

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    if cents == 0 {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{:02}", sign, grouped, cents)
    }
}
