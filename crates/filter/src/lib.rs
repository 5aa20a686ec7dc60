//! Product filtering for the catalog listing.
//!
//! A product passes when every active criterion holds:
//! search text, price range, categories, brands, attribute values, stock.
//! Attribute values are found on the product through an ordered list of
//! resolution strategies (see [`Resolution`]).

use lustre_features::{contains_folded, snake_case, synonym_key};
use lustre_model::{FilterCriteria, Product};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Record keys searched in addition to the fixed text fields.
pub const SEARCH_FIELDS: [&str; 3] = ["metalType", "metalPurity", "stoneType"];

/// Ways of locating an attribute's value on a product, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Record key equal to the attribute name
    ExactKey,
    /// Record key equal to the snake_case attribute name
    SnakeCaseKey,
    /// Record key listed for the attribute in the synonym table
    Synonym,
}

pub const RESOLUTION_ORDER: [Resolution; 3] = [
    Resolution::ExactKey,
    Resolution::SnakeCaseKey,
    Resolution::Synonym,
];

/// Attribute name -> record keys that may hold its value.
///
/// Attribute names are matched ignoring case and spacing, so one entry
/// serves "Metal Type", "metal_type" and "metalType".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct SynonymTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::from_entries([
            ("Metal Type", &["metalType", "metal_type", "metal"][..]),
            ("Metal Purity", &["metalPurity", "metal_purity", "purity", "karat"][..]),
            ("Stone Type", &["stoneType", "stone_type", "stone", "gemstone"][..]),
            ("Gender", &["gender"][..]),
            ("Size", &["size", "ringSize", "ring_size"][..]),
        ])
    }
}

impl From<BTreeMap<String, Vec<String>>> for SynonymTable {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        let mut entries: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, keys) in map {
            entries.entry(synonym_key(&name)).or_default().extend(keys);
        }
        Self { entries }
    }
}

impl From<SynonymTable> for BTreeMap<String, Vec<String>> {
    fn from(table: SynonymTable) -> Self {
        table.entries
    }
}

impl SynonymTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a [&'a str])>) -> Self {
        entries
            .into_iter()
            .map(|(name, keys)| (name.to_string(), keys.iter().map(|k| k.to_string()).collect()))
            .collect::<BTreeMap<_, _>>()
            .into()
    }

    /// Record keys registered for an attribute name.
    pub fn keys_for(&self, attribute: &str) -> &[String] {
        self.entries
            .get(&synonym_key(attribute))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Finds the value a product holds for a named attribute.
#[derive(Debug, Clone, Default)]
pub struct AttributeResolver {
    synonyms: SynonymTable,
}

impl AttributeResolver {
    pub fn new(synonyms: SynonymTable) -> Self {
        Self { synonyms }
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    /// Resolve `attribute` on `product`, reporting which strategy found it.
    /// Empty values count as unresolved.
    pub fn resolve(&self, product: &Product, attribute: &str) -> Option<(Resolution, String)> {
        RESOLUTION_ORDER.into_iter().find_map(|strategy| {
            self.resolve_with(strategy, product, attribute)
                .map(|value| (strategy, value))
        })
    }

    /// Resolve using a single strategy.
    pub fn resolve_with(
        &self,
        strategy: Resolution,
        product: &Product,
        attribute: &str,
    ) -> Option<String> {
        let present = |key: &str| product.field(key).filter(|v| !v.is_empty());
        match strategy {
            Resolution::ExactKey => present(attribute),
            Resolution::SnakeCaseKey => present(&snake_case(attribute)),
            Resolution::Synonym => self
                .synonyms
                .keys_for(attribute)
                .iter()
                .find_map(|key| present(key)),
        }
    }
}

/// One filter criterion, as reported when a product fails it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "criterion", content = "attribute", rename_all = "snake_case")]
pub enum Criterion {
    Search,
    Price,
    Category,
    Brand,
    Attribute(String),
    InStock,
}

/// The filtering predicate for one set of criteria.
pub struct CatalogFilter<'a> {
    criteria: &'a FilterCriteria,
    resolver: &'a AttributeResolver,
    needle: Option<String>,
}

impl<'a> CatalogFilter<'a> {
    pub fn new(criteria: &'a FilterCriteria, resolver: &'a AttributeResolver) -> Self {
        Self {
            criteria,
            resolver,
            needle: criteria.search_text().map(str::to_lowercase),
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.check(product).is_ok()
    }

    /// Evaluate the criteria in order, stopping at the first one that fails.
    pub fn check(&self, product: &Product) -> Result<(), Criterion> {
        if let Some(needle) = &self.needle {
            if !matches_search(product, needle) {
                return Err(Criterion::Search);
            }
        }

        if !self.criteria.price_range.contains(product.display_price) {
            return Err(Criterion::Price);
        }

        if !self.criteria.categories.is_empty()
            && !self.criteria.categories.contains(&product.category)
        {
            return Err(Criterion::Category);
        }

        if !self.criteria.brands.is_empty() {
            let listed = product
                .brand
                .as_ref()
                .is_some_and(|brand| self.criteria.brands.contains(brand));
            if !listed {
                return Err(Criterion::Brand);
            }
        }

        for (name, selected) in self.criteria.selected_attributes() {
            if !self.attribute_selected(product, name, selected) {
                return Err(Criterion::Attribute(name.to_string()));
            }
        }

        if self.criteria.in_stock_only && !product.in_stock() {
            return Err(Criterion::InStock);
        }

        Ok(())
    }

    fn attribute_selected(&self, product: &Product, name: &str, selected: &BTreeSet<String>) -> bool {
        self.resolver
            .resolve(product, name)
            .is_some_and(|(_, value)| selected.contains(&value))
    }
}

/// Case- and accent-insensitive search over the product's text fields.
pub fn matches_search(product: &Product, needle: &str) -> bool {
    contains_folded(&product.name, needle)
        || contains_folded(&product.short_description, needle)
        || contains_folded(&product.category, needle)
        || product
            .brand
            .as_deref()
            .is_some_and(|brand| contains_folded(brand, needle))
        || product.tags.iter().any(|tag| contains_folded(tag, needle))
        || SEARCH_FIELDS
            .iter()
            .filter_map(|key| product.field(key))
            .any(|value| contains_folded(&value, needle))
}

/// Indices of the products passing `criteria`, in input order.
pub fn filter_indices(
    products: &[Product],
    criteria: &FilterCriteria,
    resolver: &AttributeResolver,
) -> Vec<usize> {
    let filter = CatalogFilter::new(criteria, resolver);
    products
        .iter()
        .enumerate()
        .filter(|(_, product)| filter.matches(product))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lustre_model::PriceRange;
    use pretty_assertions::assert_eq;

    fn catalog() -> Vec<Product> {
        vec![
            Product::new("1", "Gold Ring")
                .with_price(5000.0)
                .with_category("Rings")
                .with_brand("Aurum")
                .with_stock(3.0)
                .with_field("metalType", "Gold"),
            Product::new("2", "Silver Chain")
                .with_price(2000.0)
                .with_category("Chains")
                .with_stock(0.0)
                .with_field("metal_type", "Silver"),
            Product::new("3", "Ruby Studs")
                .with_price(8000.0)
                .with_category("Earrings")
                .with_brand("Carat & Co")
                .with_stock(10.0)
                .with_tags(&["gift", "festive"])
                .with_field("stoneType", "Ruby")
                .with_field("Gender", "Women"),
        ]
    }

    fn names(products: &[Product], indices: &[usize]) -> Vec<String> {
        indices.iter().map(|&i| products[i].name.clone()).collect()
    }

    fn criteria() -> FilterCriteria {
        FilterCriteria::new(PriceRange::new(0.0, 1_000_000.0))
    }

    #[test]
    fn test_search_matches_name_case_insensitively() {
        let products = catalog();
        let mut c = criteria();
        c.search_query = "RING".into();
        let hits = filter_indices(&products, &c, &AttributeResolver::default());
        assert_eq!(names(&products, &hits), vec!["Gold Ring"]);
    }

    #[test]
    fn test_search_ignores_accents() {
        let products = vec![
            Product::new("1", "Cafe\u{301} Chain"),
            Product::new("2", "Plain Chain"),
        ];
        let mut c = criteria();
        c.search_query = "café".into();
        let hits = filter_indices(&products, &c, &AttributeResolver::default());
        assert_eq!(names(&products, &hits), vec!["Cafe\u{301} Chain"]);
    }

    #[test]
    fn test_search_covers_tags_and_classification_fields() {
        let products = catalog();
        let resolver = AttributeResolver::default();
        let mut c = criteria();

        c.search_query = "festive".into();
        assert_eq!(names(&products, &filter_indices(&products, &c, &resolver)), vec!["Ruby Studs"]);

        c.search_query = "ruby".into();
        assert_eq!(names(&products, &filter_indices(&products, &c, &resolver)), vec!["Ruby Studs"]);

        c.search_query = "aurum".into();
        assert_eq!(names(&products, &filter_indices(&products, &c, &resolver)), vec!["Gold Ring"]);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let products = catalog();
        let mut c = criteria();
        c.search_query = "   ".into();
        assert_eq!(filter_indices(&products, &c, &AttributeResolver::default()).len(), 3);
    }

    #[test]
    fn test_price_range_is_inclusive() {
        let products = catalog();
        let mut c = criteria();
        c.price_range = PriceRange::new(2000.0, 5000.0);
        let hits = filter_indices(&products, &c, &AttributeResolver::default());
        assert_eq!(names(&products, &hits), vec!["Gold Ring", "Silver Chain"]);
    }

    #[test]
    fn test_brand_filter_excludes_products_without_brand() {
        let products = catalog();
        let mut c = criteria();
        c.brands.insert("Aurum".into());
        c.brands.insert("Carat & Co".into());
        let hits = filter_indices(&products, &c, &AttributeResolver::default());
        assert_eq!(names(&products, &hits), vec!["Gold Ring", "Ruby Studs"]);
    }

    #[test]
    fn test_category_and_stock() {
        let products = catalog();
        let mut c = criteria();
        c.categories.insert("Chains".into());
        c.categories.insert("Rings".into());
        c.in_stock_only = true;
        let hits = filter_indices(&products, &c, &AttributeResolver::default());
        assert_eq!(names(&products, &hits), vec!["Gold Ring"]);
    }

    #[test]
    fn test_resolution_order() {
        let resolver = AttributeResolver::default();
        let products = catalog();

        assert_eq!(
            resolver.resolve(&products[2], "Gender"),
            Some((Resolution::ExactKey, "Women".to_string()))
        );
        assert_eq!(
            resolver.resolve(&products[1], "Metal Type"),
            Some((Resolution::SnakeCaseKey, "Silver".to_string()))
        );
        assert_eq!(
            resolver.resolve(&products[0], "Metal Type"),
            Some((Resolution::Synonym, "Gold".to_string()))
        );
        assert_eq!(resolver.resolve(&products[0], "Stone Type"), None);
    }

    #[test]
    fn test_attribute_filter_via_synonym() {
        let products = catalog();
        let mut c = criteria();
        c.attributes
            .insert("metal  type".into(), ["Gold".to_string()].into_iter().collect());
        let hits = filter_indices(&products, &c, &AttributeResolver::default());
        assert_eq!(names(&products, &hits), vec!["Gold Ring"]);
    }

    #[test]
    fn test_unresolved_attribute_fails() {
        let products = catalog();
        let mut c = criteria();
        c.attributes
            .insert("Finish".into(), ["Matte".to_string()].into_iter().collect());
        assert!(filter_indices(&products, &c, &AttributeResolver::default()).is_empty());

        let resolver = AttributeResolver::default();
        let filter = CatalogFilter::new(&c, &resolver);
        assert_eq!(
            filter.check(&products[0]),
            Err(Criterion::Attribute("Finish".to_string()))
        );
    }

    #[test]
    fn test_synonyms_disabled() {
        let products = catalog();
        let resolver = AttributeResolver::new(SynonymTable::empty());
        assert_eq!(resolver.resolve(&products[0], "Metal Type"), None);
    }

    #[test]
    fn test_synonym_table_from_json() {
        let table: SynonymTable =
            serde_json::from_str(r#"{ "Finish": ["finish", "surface"], "finish": ["polish"] }"#).unwrap();
        assert_eq!(table.keys_for("FINISH"), ["finish", "surface", "polish"]);
        assert!(table.keys_for("Metal Type").is_empty());
    }

    #[test]
    fn test_first_failure_follows_evaluation_order() {
        let products = catalog();
        let mut c = criteria();
        c.search_query = "chain".into();
        c.in_stock_only = true;
        let resolver = AttributeResolver::default();
        let filter = CatalogFilter::new(&c, &resolver);
        assert_eq!(filter.check(&products[0]), Err(Criterion::Search));
        assert_eq!(filter.check(&products[1]), Err(Criterion::InStock));
    }
}
