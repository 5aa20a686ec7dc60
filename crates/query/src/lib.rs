//! URL query string mapping for the listing's filter state.
//!
//! `FilterCodec` is the single place that knows how criteria appear in the
//! address bar, in both directions:
//! - `encode`: criteria -> `QueryParams` (only non-default selections)
//! - `hydrate`: `QueryParams` -> criteria (only parameters that are present)
//!
//! Sort key and page number are not part of the URL.

use lustre_features::{param_key, split_list};
use lustre_model::{Attribute, FilterCriteria, PriceRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use url::form_urlencoded;

pub const SEARCH: &str = "search";
pub const CATEGORY: &str = "category";
pub const BRAND: &str = "brand";
pub const MIN_PRICE: &str = "minPrice";
pub const MAX_PRICE: &str = "maxPrice";
pub const IN_STOCK: &str = "inStock";

/// Parameter keys with a fixed meaning; never treated as attribute filters.
pub const RESERVED_KEYS: [&str; 6] = [SEARCH, CATEGORY, BRAND, MIN_PRICE, MAX_PRICE, IN_STOCK];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Invalid price bound {key}={value:?}")]
    InvalidPrice { key: &'static str, value: String },

    #[error("Price range is inverted: {min} > {max}")]
    InvertedPriceRange { min: f64, max: f64 },

    #[error("{present} given without {missing}")]
    IncompletePriceRange {
        present: &'static str,
        missing: &'static str,
    },
}

/// Ordered key/value pairs of a URL query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string, with or without the leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Last value given for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Form-encoded query string without the leading `?`.
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

fn default_fragments() -> Vec<String> {
    ["metal", "purity", "stone", "type", "gender"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

/// Options for reading attribute filters from the URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecOptions {
    /// Accept unknown parameter keys that look like attribute names
    #[serde(default = "default_true")]
    pub heuristic_attribute_keys: bool,

    /// Substrings that make an unknown key look like an attribute name
    #[serde(default = "default_fragments")]
    pub heuristic_fragments: Vec<String>,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            heuristic_attribute_keys: true,
            heuristic_fragments: default_fragments(),
        }
    }
}

/// Whether an unrecognized parameter key looks like an attribute filter
/// ("metal_type", "stoneType", "gender", ...).
///
/// This guesses from free text: a key such as "prototype" also matches.
pub fn heuristic_attribute_key(key: &str, fragments: &[String]) -> bool {
    if RESERVED_KEYS.contains(&key) {
        return false;
    }
    let key = key.to_lowercase();
    fragments.iter().any(|fragment| key.contains(fragment.as_str()))
}

/// What `hydrate` did with the parameters it was given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hydration {
    /// Parameter keys that overwrote a criterion
    pub applied: Vec<String>,
    /// Parameters that were recognized but unusable
    pub rejected: Vec<QueryError>,
    /// Parameter keys with no meaning for the listing
    pub ignored: Vec<String>,
}

/// Maps filter criteria to and from URL query parameters.
#[derive(Debug, Clone, Default)]
pub struct FilterCodec {
    options: CodecOptions,
}

impl FilterCodec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// Build the query parameters describing `criteria`.
    ///
    /// Price bounds are written only when they differ from `bounds`, the full
    /// range of the catalog.
    pub fn encode(&self, criteria: &FilterCriteria, bounds: PriceRange) -> QueryParams {
        let mut params = QueryParams::new();

        if let Some(text) = criteria.search_text() {
            params.append(SEARCH, text);
        }
        if !criteria.categories.is_empty() {
            params.append(CATEGORY, join(&criteria.categories));
        }
        if !criteria.brands.is_empty() {
            params.append(BRAND, join(&criteria.brands));
        }
        if criteria.price_range != bounds {
            params.append(MIN_PRICE, criteria.price_range.min.to_string());
            params.append(MAX_PRICE, criteria.price_range.max.to_string());
        }
        if criteria.in_stock_only {
            params.append(IN_STOCK, "true");
        }
        for (name, values) in criteria.selected_attributes() {
            params.append(param_key(name), join(values));
        }

        tracing::debug!(query = %params, "Encoded filter criteria");
        params
    }

    /// Overwrite the criteria named in `params`; leave everything else as is.
    ///
    /// Attribute parameters are matched against `attributes` by their URL key
    /// form. Unknown keys that pass [`heuristic_attribute_key`] become ad-hoc
    /// attribute filters keyed by the lower-cased parameter key, the same form
    /// `encode` writes back.
    pub fn hydrate(
        &self,
        criteria: &mut FilterCriteria,
        params: &QueryParams,
        attributes: &[Attribute],
    ) -> Hydration {
        let mut outcome = Hydration::default();

        if let Some(value) = params.get(CATEGORY) {
            criteria.categories = split_list(value).collect();
            outcome.applied.push(CATEGORY.to_string());
        }
        if let Some(value) = params.get(BRAND) {
            criteria.brands = split_list(value).collect();
            outcome.applied.push(BRAND.to_string());
        }
        match price_range(params) {
            Ok(Some(range)) => {
                criteria.price_range = range;
                outcome.applied.push(MIN_PRICE.to_string());
                outcome.applied.push(MAX_PRICE.to_string());
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "Ignoring price parameters");
                outcome.rejected.push(err);
            }
        }
        if let Some(value) = params.get(IN_STOCK) {
            criteria.in_stock_only = value == "true";
            outcome.applied.push(IN_STOCK.to_string());
        }
        if let Some(value) = params.get(SEARCH) {
            criteria.search_query = value.to_string();
            outcome.applied.push(SEARCH.to_string());
        }

        for (key, value) in params.iter() {
            if RESERVED_KEYS.contains(&key) {
                continue;
            }
            let wanted = param_key(key);
            let name = match attributes.iter().find(|a| param_key(&a.name) == wanted) {
                Some(attribute) => attribute.name.clone(),
                None if self.options.heuristic_attribute_keys
                    && heuristic_attribute_key(key, &self.options.heuristic_fragments) =>
                {
                    tracing::debug!(key, "Treating unknown parameter as attribute filter");
                    wanted
                }
                None => {
                    outcome.ignored.push(key.to_string());
                    continue;
                }
            };
            let values: BTreeSet<String> = split_list(value).collect();
            criteria.attributes.insert(name, values);
            outcome.applied.push(key.to_string());
        }

        tracing::debug!(
            applied = ?outcome.applied,
            ignored = ?outcome.ignored,
            rejected = outcome.rejected.len(),
            "Hydrated filter criteria"
        );
        outcome
    }
}

fn join(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

fn parse_price(key: &'static str, value: &str) -> Result<f64, QueryError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| QueryError::InvalidPrice {
            key,
            value: value.to_string(),
        })
}

/// Price range from `minPrice` + `maxPrice`; `None` when neither is given.
fn price_range(params: &QueryParams) -> Result<Option<PriceRange>, QueryError> {
    match (params.get(MIN_PRICE), params.get(MAX_PRICE)) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(QueryError::IncompletePriceRange {
            present: MIN_PRICE,
            missing: MAX_PRICE,
        }),
        (None, Some(_)) => Err(QueryError::IncompletePriceRange {
            present: MAX_PRICE,
            missing: MIN_PRICE,
        }),
        (Some(min), Some(max)) => {
            let min = parse_price(MIN_PRICE, min)?;
            let max = parse_price(MAX_PRICE, max)?;
            if min > max {
                return Err(QueryError::InvertedPriceRange { min, max });
            }
            Ok(Some(PriceRange::new(min, max)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BOUNDS: PriceRange = PriceRange {
        min: 1000.0,
        max: 90000.0,
    };

    fn attributes() -> Vec<Attribute> {
        vec![
            Attribute::new("a1", "Metal Type", &["Gold", "Silver", "Platinum"]),
            Attribute::new("a2", "Occasion", &["Bridal", "Daily Wear"]),
        ]
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_and_serialize_params() {
        let params = QueryParams::parse("?search=gold+ring&category=Rings%2CBangles");
        assert_eq!(params.get(SEARCH), Some("gold ring"));
        assert_eq!(params.get(CATEGORY), Some("Rings,Bangles"));
        assert_eq!(params.to_query_string(), "search=gold+ring&category=Rings%2CBangles");
    }

    #[test]
    fn test_encode_default_criteria_is_empty() {
        let codec = FilterCodec::default();
        let params = codec.encode(&FilterCriteria::new(BOUNDS), BOUNDS);
        assert!(params.is_empty());
    }

    #[test]
    fn test_encode_full_criteria() {
        let codec = FilterCodec::default();
        let mut criteria = FilterCriteria::new(BOUNDS);
        criteria.search_query = "  solitaire ".into();
        criteria.categories = set(&["Rings", "Bands"]);
        criteria.brands = set(&["Aurum"]);
        criteria.price_range = PriceRange::new(1000.0, 45000.5);
        criteria.in_stock_only = true;
        criteria.attributes.insert("Metal Type".into(), set(&["Gold", "Platinum"]));
        criteria.attributes.insert("Occasion".into(), BTreeSet::new());

        let params = codec.encode(&criteria, BOUNDS);
        let pairs: Vec<(&str, &str)> = params.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("search", "solitaire"),
                ("category", "Bands,Rings"),
                ("brand", "Aurum"),
                ("minPrice", "1000"),
                ("maxPrice", "45000.5"),
                ("inStock", "true"),
                ("metal_type", "Gold,Platinum"),
            ]
        );
    }

    #[test]
    fn test_hydrate_known_attribute_case_insensitively() {
        let codec = FilterCodec::default();
        let mut criteria = FilterCriteria::new(BOUNDS);
        let params = QueryParams::parse("Metal_Type=Gold,Silver&occasion=Bridal");
        let outcome = codec.hydrate(&mut criteria, &params, &attributes());

        assert_eq!(criteria.attributes.get("Metal Type"), Some(&set(&["Gold", "Silver"])));
        assert_eq!(criteria.attributes.get("Occasion"), Some(&set(&["Bridal"])));
        assert!(outcome.ignored.is_empty());
    }

    #[test]
    fn test_hydrate_leaves_absent_fields_untouched() {
        let codec = FilterCodec::default();
        let mut criteria = FilterCriteria::new(BOUNDS);
        criteria.brands = set(&["Aurum"]);
        criteria.in_stock_only = true;
        criteria.search_query = "pearl".into();

        codec.hydrate(&mut criteria, &QueryParams::parse("category=Rings"), &attributes());

        assert_eq!(criteria.categories, set(&["Rings"]));
        assert_eq!(criteria.brands, set(&["Aurum"]));
        assert!(criteria.in_stock_only);
        assert_eq!(criteria.search_query, "pearl");
    }

    #[test]
    fn test_hydrate_present_but_empty_clears() {
        let codec = FilterCodec::default();
        let mut criteria = FilterCriteria::new(BOUNDS);
        criteria.categories = set(&["Rings"]);
        criteria.in_stock_only = true;

        codec.hydrate(&mut criteria, &QueryParams::parse("category=&inStock=false"), &[]);
        assert!(criteria.categories.is_empty());
        assert!(!criteria.in_stock_only);
    }

    #[test]
    fn test_round_trip() {
        let codec = FilterCodec::default();
        let mut original = FilterCriteria::new(BOUNDS);
        original.search_query = "emerald, oval".into();
        original.categories = set(&["Pendants & Necklaces"]);
        original.price_range = PriceRange::new(2500.0, 30000.0);
        original.attributes.insert("Occasion".into(), set(&["Daily Wear"]));

        let query = codec.encode(&original, BOUNDS).to_query_string();
        let mut restored = FilterCriteria::new(BOUNDS);
        codec.hydrate(&mut restored, &QueryParams::parse(&query), &attributes());

        assert_eq!(restored, original);
    }

    #[test]
    fn test_heuristic_attribute_keys() {
        let fragments = CodecOptions::default().heuristic_fragments;
        assert!(heuristic_attribute_key("metal_purity", &fragments));
        assert!(heuristic_attribute_key("StoneType", &fragments));
        assert!(heuristic_attribute_key("gender", &fragments));
        assert!(!heuristic_attribute_key("utm_source", &fragments));
        assert!(!heuristic_attribute_key("category", &fragments));
    }

    #[test]
    fn test_hydrate_unknown_keys() {
        let codec = FilterCodec::default();
        let mut criteria = FilterCriteria::new(BOUNDS);
        let params = QueryParams::parse("stone_type=Ruby&utm_source=mail");
        let outcome = codec.hydrate(&mut criteria, &params, &attributes());

        assert_eq!(criteria.attributes.get("stone_type"), Some(&set(&["Ruby"])));
        assert_eq!(outcome.ignored, vec!["utm_source".to_string()]);

        let strict = FilterCodec::new(CodecOptions {
            heuristic_attribute_keys: false,
            ..Default::default()
        });
        let mut criteria = FilterCriteria::new(BOUNDS);
        let outcome = strict.hydrate(&mut criteria, &params, &attributes());
        assert!(criteria.attributes.is_empty());
        assert_eq!(outcome.ignored.len(), 2);
    }

    #[test]
    fn test_ad_hoc_attribute_survives_rehydration() {
        let codec = FilterCodec::default();
        let mut criteria = FilterCriteria::new(BOUNDS);
        codec.hydrate(&mut criteria, &QueryParams::parse("Metal_Type=Gold"), &[]);
        let query = codec.encode(&criteria, BOUNDS).to_query_string();
        assert_eq!(query, "metal_type=Gold");

        codec.hydrate(&mut criteria, &QueryParams::parse(&query), &[]);
        assert_eq!(criteria.attributes.len(), 1);
        assert_eq!(criteria.attributes.get("metal_type"), Some(&set(&["Gold"])));
        assert_eq!(codec.encode(&criteria, BOUNDS).to_query_string(), query);
    }

    #[test]
    fn test_hydrate_rejects_bad_prices() {
        let codec = FilterCodec::default();
        let mut criteria = FilterCriteria::new(BOUNDS);

        let outcome = codec.hydrate(&mut criteria, &QueryParams::parse("minPrice=abc&maxPrice=10"), &[]);
        assert_eq!(
            outcome.rejected,
            vec![QueryError::InvalidPrice {
                key: MIN_PRICE,
                value: "abc".to_string()
            }]
        );

        let outcome = codec.hydrate(&mut criteria, &QueryParams::parse("minPrice=500&maxPrice=10"), &[]);
        assert_eq!(
            outcome.rejected,
            vec![QueryError::InvertedPriceRange { min: 500.0, max: 10.0 }]
        );

        let outcome = codec.hydrate(&mut criteria, &QueryParams::parse("maxPrice=10"), &[]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(criteria.price_range, BOUNDS);

        codec.hydrate(&mut criteria, &QueryParams::parse("minPrice=10&maxPrice=20"), &[]);
        assert_eq!(criteria.price_range, PriceRange::new(10.0, 20.0));
    }
}
