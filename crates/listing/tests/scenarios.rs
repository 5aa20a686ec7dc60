use lustre_listing::{Listing, ListingConfig, Location, MemoryLocation, PageButton};
use lustre_model::{Attribute, CatalogData, FilterCriteria, PriceRange, Product, SortKey};
use lustre_query::QueryParams;
use pretty_assertions::assert_eq;

fn two_products() -> CatalogData {
    CatalogData::from_products(vec![
        Product::new("1", "Gold Ring").with_price(5000.0),
        Product::new("2", "Silver Chain").with_price(2000.0),
    ])
}

fn listing(data: CatalogData) -> Listing {
    Listing::new(data, ListingConfig::default(), MemoryLocation::default())
}

fn names(listing: &mut Listing) -> Vec<String> {
    listing.view().items.into_iter().map(|p| p.name).collect()
}

#[test]
fn test_search_finds_ring() {
    let mut listing = listing(two_products());
    listing.set_search("ring");
    assert_eq!(names(&mut listing), vec!["Gold Ring"]);
}

#[test]
fn test_price_range_keeps_cheaper_product() {
    let mut listing = listing(two_products());
    listing.set_price_range(PriceRange::new(0.0, 3000.0));
    assert_eq!(names(&mut listing), vec!["Silver Chain"]);
    assert_eq!(listing.location().query(), "minPrice=0&maxPrice=3000");
}

#[test]
fn test_attribute_filter_uses_synonym_table() {
    let data = CatalogData::from_products(vec![
        Product::new("1", "Gold Band").with_field("metalType", "Gold"),
        Product::new("2", "Silver Band").with_field("metalType", "Silver"),
        Product::new("3", "Glass Bead"),
    ])
    .with_attributes(vec![Attribute::new("a1", "METAL type", &["Gold", "Silver"])]);
    let mut listing = listing(data);

    listing.toggle_attribute_value("Metal Type", "Gold");
    assert_eq!(names(&mut listing), vec!["Gold Band"]);
}

#[test]
fn test_twenty_five_products_make_three_pages() {
    let products = (0..25)
        .map(|i| Product::new(format!("{:02}", i), format!("Piece {}", i)).with_price(100.0))
        .collect();
    let mut listing = listing(CatalogData::from_products(products));

    let view = listing.view();
    assert_eq!(view.total_pages, 3);
    assert_eq!(
        view.page_buttons,
        vec![PageButton::Page(1), PageButton::Page(2), PageButton::Page(3)]
    );

    listing.set_page(3);
    let view = listing.view();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].id, "24");
}

#[test]
fn test_exact_multiple_of_page_size_has_no_trailing_page() {
    let products = (0..24)
        .map(|i| Product::new(i.to_string(), "Charm").with_price(10.0))
        .collect();
    let mut listing = listing(CatalogData::from_products(products));
    assert_eq!(listing.view().total_pages, 2);
}

#[test]
fn test_no_matches_means_zero_pages() {
    let mut listing = listing(two_products());
    listing.set_search("tiara");
    let view = listing.view();
    assert!(view.is_empty);
    assert_eq!(view.total_pages, 0);
    assert!(view.page_buttons.is_empty());
    assert!(view.items.is_empty());
}

#[test]
fn test_empty_catalog_uses_default_bounds() {
    let listing = listing(CatalogData::default());
    assert_eq!(listing.bounds(), PriceRange::new(0.0, 1_000_000.0));
}

#[test]
fn test_default_sort_puts_featured_before_trending_before_rest() {
    let data = CatalogData::from_products(vec![
        Product::new("1", "Top Rated").with_rating(5.0),
        Product::new("2", "Trending").trending().with_rating(4.5),
        Product::new("3", "Featured Low").featured().with_rating(1.0),
        Product::new("4", "Featured Trending").featured().trending(),
    ]);
    let mut listing = listing(data);
    assert_eq!(
        names(&mut listing),
        vec!["Featured Trending", "Featured Low", "Trending", "Top Rated"]
    );
}

#[test]
fn test_filtering_is_idempotent() {
    let products = (0..30)
        .map(|i| {
            Product::new(format!("{:02}", i), format!("Item {}", i))
                .with_price((i * 37 % 11) as f64)
                .with_rating((i % 4) as f64)
        })
        .collect();
    let mut first = listing(CatalogData::from_products(products));
    first.set_price_range(PriceRange::new(2.0, 8.0));
    first.set_sort(SortKey::Rating);
    let once = first.view();

    let mut second = listing(first.data().clone());
    second.hydrate(&first.query_params());
    second.set_sort(SortKey::Rating);
    assert_eq!(second.view(), once);
    assert_eq!(first.view(), once);
}

#[test]
fn test_url_round_trip_and_absent_fields_are_kept() {
    let data = two_products()
        .with_attributes(vec![Attribute::new("a1", "Stone Type", &["Ruby", "Pearl"])]);

    let mut source = listing(data.clone());
    source.set_search("gold");
    source.toggle_category("Rings");
    source.toggle_brand("Aurum");
    source.set_in_stock_only(true);
    source.toggle_attribute_value("Stone Type", "Ruby");
    source.set_price_range(PriceRange::new(2500.0, 4000.0));
    let query = source.location().query();

    let mut target = listing(data.clone());
    target.hydrate(&QueryParams::parse(&query));
    assert_eq!(target.criteria(), source.criteria());

    // A partial query only overwrites what it names.
    let mut partial = listing(data);
    partial.set_in_stock_only(true);
    partial.toggle_brand("Aurum");
    partial.hydrate(&QueryParams::parse("category=Bangles"));
    let mut expected = FilterCriteria::new(partial.bounds());
    expected.in_stock_only = true;
    expected.brands.insert("Aurum".into());
    expected.categories.insert("Bangles".into());
    assert_eq!(partial.criteria(), &expected);
}

#[test]
fn test_mount_hydrates_from_location() {
    let location = MemoryLocation::new("/products", "?search=chain&gender=Women&utm_source=ad");
    let mut listing = Listing::mount(two_products(), ListingConfig::default(), location);

    assert_eq!(listing.criteria().search_query, "chain");
    assert!(listing.criteria().attributes.contains_key("gender"));
    // Unknown parameters are dropped when the URL is rewritten.
    assert_eq!(listing.location().query(), "search=chain&gender=Women");
    assert!(listing.view().is_empty);
}

#[test]
fn test_ad_hoc_attribute_url_is_stable_across_hydrations() {
    let location = MemoryLocation::new("/products", "?Metal_Type=Gold");
    let mut listing = Listing::mount(two_products(), ListingConfig::default(), location);
    assert_eq!(listing.location().query(), "metal_type=Gold");

    listing.hydrate_from_location();
    assert_eq!(listing.criteria().attributes.len(), 1);
    assert!(listing.criteria().attributes.contains_key("metal_type"));
    assert_eq!(listing.location().query(), "metal_type=Gold");
}

#[test]
fn test_select_prefers_slug() {
    let mut product = Product::new("64f0aa", "Halo Ring");
    product.slug = Some("halo-ring".into());
    let mut listing = listing(CatalogData::from_products(vec![product]));
    assert_eq!(listing.select("64f0aa").as_deref(), Some("/product/halo-ring"));
    assert_eq!(listing.location().current().path, "/product/halo-ring");
}
