//! Command-line front end for the catalog listing.
//!
//! Usage:
//!     lustre --source catalog.json browse --query "category=Rings&inStock=true" --sort price-low
//!     lustre --source https://shop.example.com url "metal_type=Gold&inStock=true"
//!     lustre --source https://shop.example.com health

use anyhow::Result;
use clap::{Parser, Subcommand};
use lustre_explain::{explain_rejection, summarize};
use lustre_listing::{page_range, Listing, ListingConfig, MemoryLocation, PageButton, PageView};
use lustre_model::{CatalogData, SortKey};
use lustre_query::{CodecOptions, QueryParams};
use lustre_source::{load_catalog, CatalogSource, RestConfig, RestSource, SnapshotSource, SourceError};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "lustre")]
#[command(about = "Browse the jewellery catalog with listing-page filters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog snapshot file, or storefront base URL
    #[arg(long, default_value = "catalog.json")]
    source: String,

    /// Request timeout in seconds (REST source)
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Products per page
    #[arg(long, default_value = "12")]
    page_size: usize,

    /// Ignore unknown URL parameters even if they look like attribute names
    #[arg(long)]
    no_heuristic_keys: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one page of results
    Browse {
        /// Listing query string (e.g. "category=Rings&minPrice=0&maxPrice=5000")
        #[arg(short, long, default_value = "")]
        query: String,

        /// Sort order (default, price-low, price-high, rating, newest, name)
        #[arg(short, long, default_value = "default")]
        sort: SortKey,

        /// Page number
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Explain why each unlisted product was filtered out
        #[arg(long)]
        explain: bool,
    },

    /// Hydrate a query string and print its canonical form
    Url {
        /// Listing query string
        query: String,
    },

    /// Check that the source is reachable
    Health,
}

enum Source {
    Rest(RestSource),
    Snapshot(SnapshotSource),
}

impl Source {
    fn open(location: &str, timeout_secs: u64) -> Result<Self, SourceError> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let config = RestConfig {
                base_url: location.to_string(),
                timeout_secs,
                ..Default::default()
            };
            Ok(Self::Rest(RestSource::new(config)?))
        } else {
            Ok(Self::Snapshot(SnapshotSource::new(location)))
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Rest(source) => source.name(),
            Self::Snapshot(source) => source.name(),
        }
    }

    async fn load(&self) -> Result<CatalogData, SourceError> {
        match self {
            Self::Rest(source) => load_catalog(source).await,
            Self::Snapshot(source) => load_catalog(source).await,
        }
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        match self {
            Self::Rest(source) => source.health_check().await,
            Self::Snapshot(source) => source.health_check().await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lustre=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = ListingConfig {
        page_size: cli.page_size.max(1),
        codec: CodecOptions {
            heuristic_attribute_keys: !cli.no_heuristic_keys,
            ..Default::default()
        },
        ..Default::default()
    };
    let source = Source::open(&cli.source, cli.timeout)?;

    match cli.command {
        Commands::Browse {
            query,
            sort,
            page,
            format,
            explain,
        } => {
            run_browse(&source, config, &query, sort, page, &format, explain).await?;
        }
        Commands::Url { query } => {
            run_url(&source, config, &query).await?;
        }
        Commands::Health => {
            run_health(&source).await?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct BrowseOutput<'a> {
    query: String,
    sort: SortKey,
    summary: String,
    #[serde(flatten)]
    page: &'a PageView,
}

async fn run_browse(
    source: &Source,
    config: ListingConfig,
    query: &str,
    sort: SortKey,
    page: usize,
    format: &str,
    explain: bool,
) -> Result<()> {
    let data = source.load().await?;
    let page_size = config.page_size;
    let location = MemoryLocation::new("/products", query);
    let mut listing = Listing::mount(data, config, location);
    listing.set_sort(sort);
    listing.set_page(page);

    let view = listing.view();
    let summary = summarize(view.filtered_count, view.current_page, page_size);
    let canonical = listing.query_params().to_query_string();

    if format == "json" {
        let output = BrowseOutput {
            query: canonical,
            sort,
            summary,
            page: &view,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "Catalog: {} products from {}",
        listing.data().products.len(),
        source.name()
    );
    let chips: Vec<String> = listing.active_filters().iter().map(|c| c.label()).collect();
    if !chips.is_empty() {
        println!("Filters: {}", chips.join(", "));
    }
    println!("Sort: {}", sort.label());
    println!("---");

    let offset = page_range(view.current_page, page_size, view.filtered_count).start;
    for (i, product) in view.items.iter().enumerate() {
        println!(
            "{:>3}. {} ({})",
            offset + i + 1,
            product.name,
            product.route_key()
        );
        let brand = product.brand.as_deref().unwrap_or("-");
        println!(
            "     {} / {} | {} | {}",
            if product.category.is_empty() { "-" } else { product.category.as_str() },
            brand,
            lustre_explain::format_amount(product.display_price),
            if product.in_stock() { "in stock" } else { "out of stock" }
        );
    }

    if view.is_empty {
        println!("Nothing here. Try clearing some filters.");
    }

    println!("---");
    println!("{}", summary);
    if view.total_pages > 1 {
        println!("Pages: {}", render_buttons(&view.page_buttons, view.current_page));
    }
    if !canonical.is_empty() {
        println!("URL: ?{}", canonical);
    }

    if explain {
        let listed_count = listing.ordered().len();
        println!("---");
        println!("Filtered out ({}):", listing.data().products.len() - listed_count);
        for product in &listing.data().products {
            if let Some(rejection) =
                explain_rejection(product, listing.criteria(), listing.resolver())
            {
                println!("  {}: {}", product.name, rejection.summary);
            }
        }
    }

    Ok(())
}

fn render_buttons(buttons: &[PageButton], current: usize) -> String {
    buttons
        .iter()
        .map(|button| match button {
            PageButton::Page(n) if *n == current => format!("[{}]", n),
            PageButton::Page(n) => n.to_string(),
            PageButton::Gap => "...".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

async fn run_url(source: &Source, config: ListingConfig, query: &str) -> Result<()> {
    let data = source.load().await?;
    let mut listing = Listing::new(data, config, MemoryLocation::default());
    let outcome = listing.hydrate(&QueryParams::parse(query));

    for err in &outcome.rejected {
        println!("rejected: {}", err);
    }
    for key in &outcome.ignored {
        println!("ignored: {}", key);
    }
    println!("?{}", listing.query_params());
    println!("{}", serde_json::to_string_pretty(listing.criteria())?);

    Ok(())
}

async fn run_health(source: &Source) -> Result<()> {
    print!("Checking {} source... ", source.name());

    match source.health_check().await {
        Ok(()) => {
            println!("OK");
            Ok(())
        }
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    }
}
