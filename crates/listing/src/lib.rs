//! The catalog listing session.
//!
//! `Listing` owns the shopper's `FilterState` for one visit to the listing
//! page. Every filter widget callback maps to one method here; each change is
//! written back to the URL through a [`Location`], and a URL change can be
//! read back in with [`Listing::hydrate`].
//!
//! The visible page is a pure function of the catalog and the state. The
//! filtered, ordered result is cached until either of them changes.

mod location;
mod pagination;

pub use location::{Entry, Location, MemoryLocation};
pub use pagination::{page_buttons, page_range, total_pages, PageButton};

use lustre_explain::{active_filters, ActiveFilter};
use lustre_filter::{filter_indices, AttributeResolver, SynonymTable};
use lustre_model::{CatalogData, FilterCriteria, FilterState, PriceRange, Product, SortKey};
use lustre_query::{CodecOptions, FilterCodec, Hydration, QueryParams};
use lustre_rank::sort_indices;
use serde::{Deserialize, Serialize};

fn default_page_size() -> usize {
    12
}

fn default_page_window() -> usize {
    2
}

fn default_detail_path() -> String {
    "/product".to_string()
}

/// Configuration for the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Products per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pages shown either side of the current one in the page control
    #[serde(default = "default_page_window")]
    pub page_window: usize,

    /// Path prefix of the product detail page
    #[serde(default = "default_detail_path")]
    pub detail_path: String,

    #[serde(default)]
    pub codec: CodecOptions,

    #[serde(default)]
    pub synonyms: SynonymTable,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_window: default_page_window(),
            detail_path: default_detail_path(),
            codec: CodecOptions::default(),
            synonyms: SynonymTable::default(),
        }
    }
}

/// One rendered page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub items: Vec<Product>,
    pub filtered_count: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub page_buttons: Vec<PageButton>,
    /// Nothing matched: show the empty state with "clear all filters"
    pub is_empty: bool,
}

struct Memo {
    criteria: FilterCriteria,
    sort_key: SortKey,
    order: Vec<usize>,
}

/// A shopper's session on the listing page.
pub struct Listing<L: Location = MemoryLocation> {
    data: CatalogData,
    bounds: PriceRange,
    state: FilterState,
    config: ListingConfig,
    codec: FilterCodec,
    resolver: AttributeResolver,
    location: L,
    memo: Option<Memo>,
}

impl<L: Location> Listing<L> {
    /// Create a session with default selections spanning the catalog's prices.
    /// Does not touch the location.
    pub fn new(data: CatalogData, config: ListingConfig, location: L) -> Self {
        let bounds = PriceRange::spanning(&data.products);
        Self {
            state: FilterState::new(bounds),
            codec: FilterCodec::new(config.codec.clone()),
            resolver: AttributeResolver::new(config.synonyms.clone()),
            data,
            bounds,
            config,
            location,
            memo: None,
        }
    }

    /// Create a session and hydrate it from the location's current query.
    pub fn mount(data: CatalogData, config: ListingConfig, location: L) -> Self {
        let mut listing = Self::new(data, config, location);
        listing.hydrate_from_location();
        listing
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.state.criteria
    }

    /// Full price range of the catalog.
    pub fn bounds(&self) -> PriceRange {
        self.bounds
    }

    pub fn data(&self) -> &CatalogData {
        &self.data
    }

    pub fn config(&self) -> &ListingConfig {
        &self.config
    }

    pub fn resolver(&self) -> &AttributeResolver {
        &self.resolver
    }

    pub fn location(&self) -> &L {
        &self.location
    }

    /// Swap in freshly fetched catalog data.
    ///
    /// A price selection that covered the old full range is widened to the
    /// new one; any narrower selection is kept.
    pub fn load(&mut self, data: CatalogData) {
        let bounds = PriceRange::spanning(&data.products);
        let old_bounds = self.bounds;
        self.data = data;
        self.bounds = bounds;
        self.memo = None;
        if self.state.criteria.price_range == old_bounds {
            self.edit(|c| c.price_range = bounds);
        }
        // Price parameters are relative to the bounds, which may have moved.
        self.sync_location();
    }

    /// Overwrite the criteria named in `params`, keeping the rest.
    pub fn hydrate(&mut self, params: &QueryParams) -> Hydration {
        let codec = &self.codec;
        let attributes = &self.data.attributes;
        let mut outcome = Hydration::default();
        self.state.edit_criteria(|criteria| {
            outcome = codec.hydrate(criteria, params, attributes);
        });
        self.sync_location();
        outcome
    }

    /// Re-read the location's current query string.
    pub fn hydrate_from_location(&mut self) -> Hydration {
        let params = QueryParams::parse(&self.location.query());
        self.hydrate(&params)
    }

    /// The query string describing the current criteria.
    pub fn query_params(&self) -> QueryParams {
        self.codec.encode(&self.state.criteria, self.bounds)
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.edit(|c| c.search_query = text);
    }

    pub fn set_price_range(&mut self, range: PriceRange) {
        self.edit(|c| c.price_range = range);
    }

    pub fn toggle_category(&mut self, name: &str) {
        self.edit(|c| toggle(&mut c.categories, name));
    }

    pub fn toggle_brand(&mut self, name: &str) {
        self.edit(|c| toggle(&mut c.brands, name));
    }

    pub fn toggle_attribute_value(&mut self, attribute: &str, value: &str) {
        self.edit(|c| toggle(c.attributes.entry(attribute.to_string()).or_default(), value));
    }

    pub fn set_in_stock_only(&mut self, in_stock_only: bool) {
        self.edit(|c| c.in_stock_only = in_stock_only);
    }

    /// Remove a single active selection.
    pub fn remove_filter(&mut self, chip: &ActiveFilter) {
        let bounds = self.bounds;
        self.edit(|c| chip.remove_from(c, bounds));
    }

    /// Active selections as removable chips.
    pub fn active_filters(&self) -> Vec<ActiveFilter> {
        active_filters(&self.state.criteria, self.bounds)
    }

    /// Change the ordering; stays on the current page.
    pub fn set_sort(&mut self, sort_key: SortKey) {
        self.state.sort_key = sort_key;
        self.sync_location();
    }

    pub fn set_page(&mut self, page: usize) {
        self.state.set_page(page);
        self.sync_location();
    }

    /// Reset every selection, the ordering and the page.
    pub fn clear_all(&mut self) {
        self.state = FilterState::new(self.bounds);
        self.sync_location();
    }

    /// Filtered and ordered positions into the catalog's products.
    pub fn ordered(&mut self) -> &[usize] {
        let stale = self.memo.as_ref().map_or(true, |memo| {
            memo.sort_key != self.state.sort_key || memo.criteria != self.state.criteria
        });
        if stale {
            let criteria = self.state.criteria.clone();
            let sort_key = self.state.sort_key;
            let mut order = filter_indices(&self.data.products, &criteria, &self.resolver);
            sort_indices(&self.data.products, &mut order, sort_key);
            tracing::debug!(
                total = self.data.products.len(),
                matched = order.len(),
                sort = %sort_key,
                "Recomputed listing"
            );
            self.memo = Some(Memo {
                criteria,
                sort_key,
                order,
            });
        }
        self.memo.as_ref().map(|memo| memo.order.as_slice()).unwrap_or(&[])
    }

    /// The current page of results.
    pub fn view(&mut self) -> PageView {
        let page_size = self.config.page_size;
        let window = self.config.page_window;
        let current_page = self.state.current_page;

        let order = self.ordered();
        let filtered_count = order.len();
        let pages = total_pages(filtered_count, page_size);
        let visible = order[page_range(current_page, page_size, filtered_count)].to_vec();

        PageView {
            items: visible
                .into_iter()
                .map(|i| self.data.products[i].clone())
                .collect(),
            filtered_count,
            total_pages: pages,
            current_page,
            page_buttons: page_buttons(current_page, pages, window),
            is_empty: filtered_count == 0,
        }
    }

    /// Open a product's detail page. Returns the path navigated to, or `None`
    /// for an unknown id.
    pub fn select(&mut self, product_id: &str) -> Option<String> {
        let product = self.data.products.iter().find(|p| p.id == product_id)?;
        let path = format!(
            "{}/{}",
            self.config.detail_path.trim_end_matches('/'),
            product.route_key()
        );
        self.location.navigate(&path);
        Some(path)
    }

    fn edit(&mut self, change: impl FnOnce(&mut FilterCriteria)) {
        if self.state.edit_criteria(change) {
            self.sync_location();
        }
    }

    fn sync_location(&mut self) {
        let query = self.query_params().to_query_string();
        if query != self.location.query() {
            tracing::debug!(query = %query, "Replacing location query");
            self.location.replace_query(&query);
        }
    }
}

fn toggle(set: &mut std::collections::BTreeSet<String>, value: &str) {
    if !set.remove(value) {
        set.insert(value.to_string());
    }
}
