//! Core domain model for the Lustre jewellery catalog.
//!
//! This crate defines the records consumed by the listing engine and the
//! state it owns:
//! - `Product`, `Category`, `Brand`, `Attribute`: read-only catalog records
//! - `FilterCriteria` / `FilterState`: the user's current selections
//! - `SortKey`: the available result orderings
//! - `PriceRange`: inclusive price bounds

mod lenient;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Price bounds used when there are no products to derive them from.
pub const DEFAULT_PRICE_BOUNDS: PriceRange = PriceRange {
    min: 0.0,
    max: 1_000_000.0,
};

/// A product record as served by the storefront API.
///
/// Numeric fields are decoded leniently: numeric strings are parsed and
/// anything unusable becomes zero. Classification fields that are not part
/// of the fixed shape (metal type, stone type, gender, size, ...) land in
/// `fields` under their original key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(default)]
    pub short_description: String,

    /// Category name (a populated `{ _id, name }` reference is flattened to its name)
    #[serde(default, deserialize_with = "lenient::name")]
    pub category: String,

    #[serde(default, deserialize_with = "lenient::optional_name")]
    pub brand: Option<String>,

    #[serde(default, deserialize_with = "lenient::number")]
    pub display_price: f64,

    #[serde(default, deserialize_with = "lenient::number")]
    pub original_price: f64,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub has_discount: bool,

    #[serde(default, deserialize_with = "lenient::number")]
    pub discount_percent: f64,

    #[serde(default, deserialize_with = "lenient::number")]
    pub stock: f64,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_featured: bool,

    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_trending: bool,

    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub rating: Option<f64>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Open-ended classification fields keyed by their record key
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Product {
    /// Create a minimal record for testing.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: None,
            short_description: String::new(),
            category: String::new(),
            brand: None,
            display_price: 0.0,
            original_price: 0.0,
            has_discount: false,
            discount_percent: 0.0,
            stock: 0.0,
            is_featured: false,
            is_trending: false,
            rating: None,
            tags: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_price(mut self, display_price: f64) -> Self {
        self.display_price = display_price;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_stock(mut self, stock: f64) -> Self {
        self.stock = stock;
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn featured(mut self) -> Self {
        self.is_featured = true;
        self
    }

    pub fn trending(mut self) -> Self {
        self.is_trending = true;
        self
    }

    /// Look up a field by its record key, as text.
    ///
    /// Covers the fixed text fields as well as the open-ended ones. Numbers
    /// and booleans are rendered the way they appear in JSON; arrays, objects
    /// and nulls have no text value.
    pub fn field(&self, key: &str) -> Option<String> {
        match key {
            "_id" | "id" => Some(self.id.clone()),
            "name" => Some(self.name.clone()),
            "slug" => self.slug.clone(),
            "shortDescription" | "short_description" => Some(self.short_description.clone()),
            "category" => Some(self.category.clone()),
            "brand" => self.brand.clone(),
            _ => self.fields.get(key).and_then(value_text),
        }
    }

    /// Rating with a missing value counted as zero.
    pub fn rating_or_zero(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0.0
    }

    /// Key used in the product-detail location: the slug when present, else the id.
    pub fn route_key(&self) -> &str {
        match self.slug.as_deref() {
            Some(slug) if !slug.is_empty() => slug,
            _ => &self.id,
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    /// Number of products in this category (display only)
    #[serde(default, alias = "count", deserialize_with = "lenient::count")]
    pub product_count: u64,
}

/// A product brand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,
}

/// A dynamic filter facet, e.g. "Metal Type" with values Gold/Silver/Platinum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    /// Display style hint (checkbox, swatch, dropdown, ...)
    #[serde(default, alias = "type", alias = "displayType")]
    pub display: Option<String>,

    /// Permissible values, in display order
    #[serde(default)]
    pub values: Vec<String>,
}

impl Attribute {
    pub fn new(id: impl Into<String>, name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display: None,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Everything the listing page loads on mount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub brands: Vec<Brand>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl CatalogData {
    pub fn from_products(products: Vec<Product>) -> Self {
        Self {
            products,
            ..Default::default()
        }
    }

    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Inclusive price range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceRange {
    fn default() -> Self {
        DEFAULT_PRICE_BOUNDS
    }
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// The range spanned by the products' display prices, or
    /// [`DEFAULT_PRICE_BOUNDS`] when there are none.
    pub fn spanning(products: &[Product]) -> Self {
        let mut prices = products.iter().map(|p| p.display_price);
        let Some(first) = prices.next() else {
            return DEFAULT_PRICE_BOUNDS;
        };
        prices.fold(Self::new(first, first), |range, price| {
            Self::new(range.min.min(price), range.max.max(price))
        })
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

/// Available result orderings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Featured, then trending, then by rating
    #[default]
    Default,
    PriceLow,
    PriceHigh,
    Rating,
    /// Descending identifier order
    Newest,
    Name,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown sort key: {0}")]
pub struct UnknownSortKey(pub String);

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::Default,
        SortKey::PriceLow,
        SortKey::PriceHigh,
        SortKey::Rating,
        SortKey::Newest,
        SortKey::Name,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::Rating => "rating",
            Self::Newest => "newest",
            Self::Name => "name",
        }
    }

    /// Get a human-readable label for the sort selector.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Default => "Featured",
            Self::PriceLow => "Price: Low to High",
            Self::PriceHigh => "Price: High to Low",
            Self::Rating => "Top Rated",
            Self::Newest => "Newest",
            Self::Name => "Name: A to Z",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownSortKey(s.to_string()))
    }
}

/// The filter selections. Changing any of these sends the user back to page 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub search_query: String,

    pub price_range: PriceRange,

    /// Selected category names
    #[serde(default)]
    pub categories: BTreeSet<String>,

    /// Selected brand names
    #[serde(default)]
    pub brands: BTreeSet<String>,

    /// Attribute name -> selected values
    #[serde(default)]
    pub attributes: BTreeMap<String, BTreeSet<String>>,

    #[serde(default)]
    pub in_stock_only: bool,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_BOUNDS)
    }
}

impl FilterCriteria {
    /// Criteria that let everything within `bounds` through.
    pub fn new(bounds: PriceRange) -> Self {
        Self {
            search_query: String::new(),
            price_range: bounds,
            categories: BTreeSet::new(),
            brands: BTreeSet::new(),
            attributes: BTreeMap::new(),
            in_stock_only: false,
        }
    }

    /// Trimmed search text, `None` when blank.
    pub fn search_text(&self) -> Option<&str> {
        let trimmed = self.search_query.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Attributes with at least one selected value.
    pub fn selected_attributes(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.attributes
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| (name.as_str(), values))
    }

    /// Whether any criterion narrows the result beyond `bounds`.
    pub fn is_active(&self, bounds: PriceRange) -> bool {
        self.search_text().is_some()
            || self.price_range != bounds
            || !self.categories.is_empty()
            || !self.brands.is_empty()
            || self.selected_attributes().next().is_some()
            || self.in_stock_only
    }

    /// Drop attribute entries whose value set is empty.
    pub fn prune_attributes(&mut self) {
        self.attributes.retain(|_, values| !values.is_empty());
    }
}

/// Everything the listing owns: criteria, ordering and current page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub criteria: FilterCriteria,

    #[serde(default)]
    pub sort_key: SortKey,

    /// 1-based page number
    #[serde(default = "first_page")]
    pub current_page: usize,
}

fn first_page() -> usize {
    1
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_BOUNDS)
    }
}

impl FilterState {
    pub fn new(bounds: PriceRange) -> Self {
        Self {
            criteria: FilterCriteria::new(bounds),
            sort_key: SortKey::Default,
            current_page: 1,
        }
    }

    /// Apply `edit` to the criteria; go back to page 1 if anything changed.
    ///
    /// Returns whether the criteria changed.
    pub fn edit_criteria(&mut self, edit: impl FnOnce(&mut FilterCriteria)) -> bool {
        let before = self.criteria.clone();
        edit(&mut self.criteria);
        self.criteria.prune_attributes();
        let changed = self.criteria != before;
        if changed {
            self.current_page = 1;
        }
        changed
    }

    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }
}
