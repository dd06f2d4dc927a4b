use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use jobscope::accumulator::AccumulatePlan;
use jobscope::analytics::{self, AnalyticsReport, TimelineView, TOP_GEOGRAPHY, TOP_SKILLS};
use jobscope::api::{AnalyticsSource, ApiClient, FacetSource, GeoLevel};
use jobscope::config::{self, AppConfig};
use jobscope::facets::{ApplyOutcome, FacetSelection, FilterController, LoadStatus, ViewMode};
use jobscope::format::{format_amount, format_relative_date, format_salary, normalize_city, truncate};
use jobscope::geo::{cluster_offers, fit_view, ClusterPopup, ViewFit, ViewOptions};
use jobscope::models::RemoteType;
use jobscope::ranking::{rank_cities, Dimension, Selection, TOP_CITIES, UNKNOWN_CITY};

#[derive(Parser)]
#[command(name = "jobscope")]
#[command(about = "Explore the job-market dataset: listings, map clusters and analytics")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config and JOBSCOPE_API_URL)
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FacetArgs {
    /// Job label (ROME code)
    #[arg(short, long)]
    job: Option<String>,

    /// Department code
    #[arg(short, long)]
    department: Option<String>,

    /// Remote-work type (full_remote, hybrid, occasional)
    #[arg(short, long)]
    remote: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List one page of offers
    Offers {
        #[command(flatten)]
        facets: FacetArgs,

        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Page size (defaults to listing.page_size)
        #[arg(short, long)]
        size: Option<u32>,
    },

    /// Cluster offers on the map and rank cities
    Map {
        #[command(flatten)]
        facets: FacetArgs,

        /// Only show clusters for this city
        #[arg(long)]
        city: Option<String>,

        /// Number of cities to list
        #[arg(short, long, default_value_t = TOP_CITIES)]
        top: usize,

        /// Emit clusters, bounds and view fit as JSON
        #[arg(long)]
        json: bool,
    },

    /// Top skills, contract distribution and departments
    Analytics,

    /// Overview KPIs and the recent weekly timeline
    Dashboard,

    /// Available filter values
    Filters,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobscope=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.api {
        config.api.base_url = url;
    }
    let client = ApiClient::new(&config.api).context("Failed to set up API client")?;

    match cli.command {
        Commands::Offers { facets, page, size } => {
            let page_size = size.unwrap_or(config.listing.page_size);
            if page_size == 0 || page_size > config::MAX_PAGE_SIZE {
                return Err(anyhow!("Page size must be between 1 and {}", config::MAX_PAGE_SIZE));
            }
            let mut controller =
                FilterController::new(ViewMode::Listing { page_size }).with_selection(facets.selection());
            load(&mut controller, &client, page).await?;

            let offers = controller.working_set().offers();
            println!(
                "{:<12} {:<32} {:<20} {:<18} {:<8} {:>24}",
                "ID", "TITLE", "COMPANY", "CITY", "CONTRACT", "SALARY"
            );
            println!("{}", "-".repeat(119));
            let now = chrono::Utc::now();
            for offer in offers {
                println!(
                    "{:<12} {:<32} {:<20} {:<18} {:<8} {:>24}",
                    truncate(&offer.id, 12),
                    truncate(offer.display_title(), 30),
                    truncate(offer.company_name.as_deref().unwrap_or("-"), 18),
                    truncate(&offer.location_city.as_deref().map(normalize_city).unwrap_or_default(), 16),
                    truncate(offer.contract_type.as_deref().unwrap_or("-"), 8),
                    format_salary(offer.salary_min, offer.salary_max, offer.salary_unit.as_deref()),
                );
                println!("{:<12} {}", "", format_relative_date(offer.published_at, now));
            }
            println!(
                "\nPage {} of {} ({} offers)",
                controller.page(),
                controller.pages().max(1),
                controller.total()
            );
        }

        Commands::Map { facets, city, top, json } => {
            let plan = AccumulatePlan::new(config.map.page_size, config.map.max_pages);
            let mut controller = FilterController::new(ViewMode::Map(plan)).with_selection(facets.selection());
            load(&mut controller, &client, 1).await?;

            let offers = controller.working_set().offers();
            let mut selection = Selection::new(Dimension::City);
            selection.select(city.as_deref(), offers);
            if city.is_some() && selection.active().is_none() {
                println!("City '{}' has no offers, showing all cities.", city.unwrap_or_default());
            }

            let visible = selection.apply(offers);
            let clusters = cluster_offers(visible.iter().copied());
            let view = ViewOptions {
                padding_px: config.map.padding_px,
                max_zoom: config.map.max_zoom,
                ..ViewOptions::default()
            };
            let fit = fit_view(&clusters.bounds, &view);

            if json {
                let payload = serde_json::json!({
                    "clusters": clusters.clusters,
                    "bounds": clusters.bounds,
                    "view": fit,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }

            let mappable = offers.iter().filter(|o| o.mappable_position().is_some()).count();
            println!("{} offers loaded, {} geolocated\n", offers.len(), mappable);

            println!("Top {} cities", top);
            println!("{:<5} {:<32} {:>8}", "RANK", "CITY", "OFFERS");
            println!("{}", "-".repeat(47));
            for (i, group) in rank_cities(offers, top).iter().enumerate() {
                let marker = if selection.active() == Some(group.label.as_str()) { "*" } else { " " };
                println!("{:<5} {:<32} {:>8}{}", i + 1, truncate(&group.label, 30), group.count, marker);
            }

            println!("\n{} clusters", clusters.clusters.len());
            for cluster in &clusters.clusters {
                let popup = ClusterPopup::from_cluster(cluster);
                println!(
                    "\n[{}] {} ({})",
                    cluster.key,
                    popup.heading.as_deref().unwrap_or(UNKNOWN_CITY),
                    popup.summary()
                );
                for entry in &popup.entries {
                    let mut line = format!("  - {}", truncate(&entry.title, 50));
                    if let Some(company) = &entry.company {
                        line.push_str(&format!(" | {}", company));
                    }
                    if let Some(contract) = &entry.contract_type {
                        line.push_str(&format!(" | {}", contract));
                    }
                    println!("{}", line);
                }
                if let Some(more) = popup.remainder_line() {
                    println!("  ... {}", more);
                }
            }

            match fit {
                ViewFit::Keep => println!("\nView: unchanged"),
                ViewFit::Fit { south_west, north_east, max_zoom, .. } => println!(
                    "\nView: ({:.4}, {:.4}) to ({:.4}, {:.4}), max zoom {}",
                    south_west.lat, south_west.lon, north_east.lat, north_east.lon, max_zoom
                ),
            }
        }

        Commands::Analytics => {
            let (skills, contracts, departments) = tokio::join!(
                client.skills(TOP_SKILLS),
                client.contracts(),
                client.geography(GeoLevel::Department),
            );
            let (skills, contracts, departments) = match (skills, contracts, departments) {
                (Ok(s), Ok(c), Ok(d)) => (s, c, d),
                (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                    tracing::warn!(error = %e, "analytics fetch failed");
                    return Err(anyhow!("Failed to load analytics: {}", e));
                }
            };
            let report = AnalyticsReport::build(&skills, &contracts, &departments);

            println!("Top {} skills", TOP_SKILLS);
            if report.skills.is_empty() {
                println!("  No skills found.");
            }
            for (i, bar) in report.skills.iter().enumerate() {
                println!("{:>3}. {:<24} {:>6} {}", i + 1, truncate(&bar.label, 24), bar.count, bar_glyphs(bar.width));
            }

            println!("\nContract types");
            if report.contracts.is_empty() {
                println!("  No contract data.");
            }
            for share in &report.contracts {
                println!(
                    "  {:<20} {:>6} ({:.1}%) {}",
                    truncate(&share.label, 20),
                    share.count,
                    share.percent,
                    bar_glyphs(share.percent)
                );
            }

            println!("\nTop {} departments", TOP_GEOGRAPHY);
            if report.geography.is_empty() {
                println!("  No location data.");
            }
            for (i, dept) in report.geography.iter().enumerate() {
                println!("{:>3}. {:<30} {:>6}", i + 1, truncate(&dept.label, 30), dept.count);
            }
        }

        Commands::Dashboard => {
            let (overview, timeline) = tokio::join!(
                client.overview(),
                client.timeline(&config.analytics.timeline_interval),
            );
            let overview = overview.map_err(|e| anyhow!("Failed to load statistics: {}", e))?;
            let timeline = timeline.map_err(|e| anyhow!("Failed to load statistics: {}", e))?;

            let summary = analytics::kpi_summary(&overview);
            println!("Total offers:   {}", summary.total_offers);
            match summary.salary_median {
                Some(median) => println!("Median salary:  {} €", format_amount(median)),
                None => println!("Median salary:  -"),
            }
            println!("CDI share:      {:.1}%", summary.cdi_percent);

            println!("\nTop regions");
            for (i, region) in summary.top_regions.iter().enumerate() {
                println!("{:>3}. {:<30} {:>6}", i + 1, truncate(&region.label, 30), region.count);
            }
            println!("\nTop skills");
            for (i, skill) in summary.top_skills.iter().enumerate() {
                println!("{:>3}. {:<30} {:>6}", i + 1, truncate(&skill.label, 30), skill.count);
            }
            println!("\nContracts");
            for share in &summary.contracts {
                println!("  {:<20} {:>6} ({:.1}%)", truncate(&share.label, 20), share.count, share.percent);
            }

            let window = config.analytics.timeline_window_days;
            println!("\nActivity, last {} days", window);
            match analytics::timeline_window(&timeline, chrono::Utc::now(), window) {
                TimelineView::Points { bars } => {
                    for bar in bars {
                        println!("  {:<12} {:>6} {}", bar.date.format("%d %b %Y"), bar.count, bar_glyphs(bar.width));
                    }
                }
                other => println!("  {}", other.message().unwrap_or_default()),
            }
        }

        Commands::Filters => {
            let options = client
                .facet_options()
                .await
                .map_err(|e| anyhow!("Failed to load filter options: {}", e))?;

            println!("Job labels ({})", options.job_labels.len());
            for label in &options.job_labels {
                println!("  {}", label);
            }
            println!("\nDepartments ({})", options.departments.len());
            for dept in &options.departments {
                println!("  {:<6} {}", dept.code, dept.label);
            }
            println!("\nRemote types");
            for remote in &options.remote_types {
                println!("  {}", remote);
            }
        }
    }

    Ok(())
}

impl FacetArgs {
    fn selection(&self) -> FacetSelection {
        FacetSelection {
            job_label: self.job.clone(),
            department: self.department.clone(),
            remote_type: self.remote.clone().map(RemoteType::from),
        }
    }
}

/// Runs one fetch for the requested facets and page through the controller.
async fn load(controller: &mut FilterController, client: &ApiClient, page: u32) -> Result<()> {
    let ticket = if page > 1 { controller.set_page(page) } else { controller.refresh() };

    match controller.run(ticket, client).await {
        ApplyOutcome::Applied => {}
        ApplyOutcome::Stale => return Err(anyhow!("Response superseded by a newer request")),
        ApplyOutcome::Failed(detail) => {
            let message = controller.status().message().unwrap_or("Failed to load offers");
            return Err(anyhow!("{}: {}", message, detail));
        }
    }

    if let LoadStatus::Empty = controller.status() {
        println!("{}", controller.status().message().unwrap_or_default());
    }
    Ok(())
}

fn bar_glyphs(width: f64) -> String {
    let cells = (width.clamp(0.0, 100.0) / 5.0).round() as usize;
    "#".repeat(cells)
}
