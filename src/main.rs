//! rental-scout - property discovery from the command line
//!
//! Drives the discovery pipeline (search, filters, wishlist, comparison and
//! viewing requests) against a rental backend.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rental_scout::api::{HttpRentalApi, OptionKind, RentalApi, SortField, SortOrder};
use rental_scout::config::Config;
use rental_scout::models::{PropertyStatus, PropertySummary, ViewingRequest};
use rental_scout::pipeline::{
    BookingFlow, ComparisonSelection, ComparisonView, DiscoverySession, OwnerDesk, WishlistSet,
};
use rental_scout::storage::DenialLog;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "rental-scout")]
#[command(about = "Search rental properties, manage a wishlist and book viewings")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search listings
    Search {
        /// Free-text keyword
        keyword: Option<String>,

        #[arg(long)]
        city: Option<i64>,

        #[arg(long)]
        district: Option<i64>,

        #[arg(long)]
        commune: Option<i64>,

        #[arg(long)]
        category: Option<i64>,

        /// listed_at, rent_price, bedrooms or floor_area
        #[arg(long)]
        sort: Option<String>,

        /// asc or desc
        #[arg(long)]
        order: Option<String>,

        /// Zero-based result page
        #[arg(short, long, default_value_t = 0)]
        page: u32,
    },

    /// List filter options
    Options {
        #[command(subcommand)]
        list: OptionList,
    },

    /// Show or edit the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },

    /// Compare two or more properties side by side
    Compare {
        ids: Vec<i64>,
    },

    /// Request a viewing
    Book {
        property_id: i64,

        /// RFC 3339 time with offset, e.g. 2026-03-05T10:00:00+07:00
        #[arg(long)]
        at: String,

        #[arg(short, long)]
        message: Option<String>,
    },

    /// List viewing requests
    Requests {
        /// Requests made to me as an owner
        #[arg(long)]
        owner: bool,

        /// Only requests for this property (owner view)
        #[arg(long)]
        property: Option<i64>,
    },

    /// Accept a viewing request (owner)
    Accept { request_id: i64 },

    /// Deny a viewing request (owner)
    Deny {
        request_id: i64,

        /// Kept locally; the backend stores no reason
        #[arg(short, long)]
        reason: String,
    },

    /// Initialize a new config file
    Init {
        /// Output path for config file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum OptionList {
    Cities,
    Districts { city_id: i64 },
    Communes { district_id: i64 },
    Categories,
    Features,
}

#[derive(Subcommand)]
enum WishlistAction {
    List,
    Add { property_id: i64 },
    Remove { property_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rental_scout=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Init { output } = &cli.command {
        let path = match output {
            Some(path) => path.clone(),
            None => Config::default_path()?,
        };
        if path.exists() {
            println!("Config file already exists at {}", path.display());
            return Ok(());
        }
        Config::default().save_to(&path)?;
        println!("Created config file at {}", path.display());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env();
            config
        }
        None => Config::load()?,
    };
    let api: Arc<dyn RentalApi> =
        Arc::new(HttpRentalApi::new(&config.api).context("Failed to build HTTP client")?);

    match cli.command {
        Commands::Search {
            keyword,
            city,
            district,
            commune,
            category,
            sort,
            order,
            page,
        } => {
            let mut pairs: Vec<(&str, String)> = Vec::new();
            if let Some(keyword) = keyword {
                pairs.push(("keyword", keyword));
            }
            let ids = [
                ("city_id", city),
                ("district_id", district),
                ("commune_id", commune),
                ("category_id", category),
            ];
            for (key, id) in ids {
                if let Some(id) = id {
                    pairs.push((key, id.to_string()));
                }
            }
            if let Some(sort) = sort {
                SortField::parse(&sort).context("Unknown sort field")?;
                pairs.push(("sort_by", sort));
            }
            if let Some(order) = order {
                SortOrder::parse(&order).context("Unknown sort order")?;
                pairs.push(("sort_order", order));
            }

            let mut session = DiscoverySession::from_query_pairs(api, &config.search, pairs);
            session.open().await;
            session.settle().await;
            if page > 0 {
                session.go_to_page(page);
                session.settle().await;
            }
            print_results(&mut session);
        }

        Commands::Options { list } => {
            let kind = match list {
                OptionList::Cities => OptionKind::Cities,
                OptionList::Districts { city_id } => OptionKind::Districts { city_id },
                OptionList::Communes { district_id } => OptionKind::Communes { district_id },
                OptionList::Categories => OptionKind::Categories,
                OptionList::Features => OptionKind::Features,
            };
            let options = api.filter_options(kind).await?;
            if options.is_empty() {
                println!("No options.");
            }
            for option in options {
                println!("  {:>5}  {}", option.id, option.name);
            }
        }

        Commands::Wishlist { action } => {
            let wishlist = WishlistSet::new(api);
            wishlist.refresh().await?;
            match action {
                WishlistAction::List => {
                    if wishlist.is_empty() {
                        println!("Wishlist is empty.");
                    }
                    for entry in wishlist.entries() {
                        println!(
                            "  #{}  added {}",
                            entry.property_id,
                            entry.added_at.format("%Y-%m-%d")
                        );
                    }
                }
                WishlistAction::Add { property_id } => {
                    wishlist.add(property_id).await?;
                    println!("Added #{} to the wishlist", property_id);
                }
                WishlistAction::Remove { property_id } => {
                    wishlist.remove(property_id).await?;
                    println!("Removed #{} from the wishlist", property_id);
                }
            }
        }

        Commands::Compare { ids } => {
            let mut selection = ComparisonSelection::new();
            for id in ids {
                if !selection.contains(id) {
                    selection.toggle(id);
                }
            }
            let mut view = ComparisonView::new(selection.compare_ids()?);
            view.load(api.as_ref()).await?;
            if let Some(comparison) = view.data() {
                for item in &comparison.properties {
                    println!("#{} {}", item.property_id, item.title);
                    println!("   {:.2} / month", item.rent_price);
                    println!("   {}, {}", item.district_name, item.city_name);
                    println!(
                        "   {} bed, {} bath, {} m²",
                        item.bedrooms, item.bathrooms, item.floor_area
                    );
                    if !item.features.is_empty() {
                        println!("   Features: {}", item.features.join(", "));
                    }
                    println!();
                }
            }
        }

        Commands::Book {
            property_id,
            at,
            message,
        } => {
            let slot = DateTime::parse_from_rfc3339(&at)
                .with_context(|| format!("Invalid time '{at}', expected RFC 3339"))?;
            // Listing status is rechecked by the backend
            let mut flow = BookingFlow::new(property_id, PropertyStatus::Available);
            flow.refresh(api.as_ref()).await?;
            let created = flow
                .submit(api.as_ref(), slot, message.as_deref(), Utc::now())
                .await?;
            info!(request_id = created.request_id, "Booked viewing");
            println!(
                "Viewing request #{} for property #{} is pending",
                created.request_id, property_id
            );
        }

        Commands::Requests { owner, property } => {
            if owner || property.is_some() {
                let mut desk = OwnerDesk::new(DenialLog::new(&config.storage.denial_log));
                if let Some(property_id) = property {
                    desk = desk.for_property(property_id);
                }
                desk.refresh(api.as_ref()).await?;
                if desk.requests().is_empty() {
                    println!("No viewing requests.");
                }
                for request in desk.requests() {
                    print_request(request);
                    if let Some(denial) = desk.denial_reason(request.request_id).await {
                        println!("   Reason: {}", denial.reason);
                    }
                }
            } else {
                let requests = api.my_viewing_requests().await?;
                if requests.is_empty() {
                    println!("No viewing requests.");
                }
                for request in &requests {
                    print_request(request);
                }
            }
        }

        Commands::Accept { request_id } => {
            let mut desk = OwnerDesk::new(DenialLog::new(&config.storage.denial_log));
            desk.accept(api.as_ref(), request_id).await?;
            println!("Accepted viewing request #{}", request_id);
        }

        Commands::Deny { request_id, reason } => {
            let mut desk = OwnerDesk::new(DenialLog::new(&config.storage.denial_log));
            match desk.deny(api.as_ref(), request_id, &reason).await? {
                Some(_) => println!("Denied viewing request #{}", request_id),
                None => println!(
                    "Denied viewing request #{} (reason could not be saved locally)",
                    request_id
                ),
            }
        }

        Commands::Init { .. } => {}
    }

    Ok(())
}

fn print_results(session: &mut DiscoverySession) {
    let snapshot = session.snapshot();
    if let Some(error) = &snapshot.error {
        println!("Search failed: {}", error);
    }

    println!(
        "{} | {} | {}",
        session.location_text(),
        session.category_text(),
        session.sort_text()
    );
    println!(
        "Page {} of {} ({} results)\n",
        session.feed().current_page() + 1,
        session.feed().page_count().max(1),
        snapshot.total
    );

    for (i, property) in snapshot.items.iter().enumerate() {
        print_property(snapshot.offset as usize + i + 1, property);
    }
}

fn print_property(n: usize, property: &PropertySummary) {
    let price = property
        .rent_price()
        .map(|p| format!("{:.2}", p))
        .unwrap_or_else(|| "-".to_string());
    println!("{}. {} ({} / month)", n, property.title, price);
    println!(
        "   {} bed, {} bath, {} m²",
        property.bedrooms, property.bathrooms, property.floor_area
    );
    if let Some(location) = &property.location {
        let names: Vec<&str> = [&location.district_name, &location.city_name]
            .into_iter()
            .filter_map(|n| n.as_deref())
            .collect();
        if !names.is_empty() {
            println!("   Area: {}", names.join(", "));
        }
    }
    if property.status == PropertyStatus::Rented {
        println!("   Rented");
    }
    println!("   ID: {}", property.property_id);
    println!();
}

fn print_request(request: &ViewingRequest) {
    println!(
        "#{}  property #{}  {}  {:?}",
        request.request_id,
        request.property_id,
        request.requested_time.format("%Y-%m-%d %H:%M UTC"),
        request.status
    );
    if let Some(message) = &request.message {
        println!("   \"{}\"", message);
    }
}
