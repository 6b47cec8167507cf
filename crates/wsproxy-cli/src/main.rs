mod catalog;
mod db;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wsproxy_core::Site;

#[derive(Debug, Parser)]
#[command(name = "wsproxy-cli")]
#[command(about = "Wholesaler catalog proxy command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the top-level categories of a site
    Categories {
        #[arg(long)]
        site: Site,
    },
    /// Classify and print any catalog path
    Browse {
        #[arg(long)]
        site: Site,
        slug: String,
    },
    /// Print one product page
    Product {
        #[arg(long)]
        site: Site,
        slug: String,
    },
    /// Run a catalog search
    Search {
        #[arg(long)]
        site: Site,
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Print one page of an Onninen category
    Products {
        category: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Delete SMS challenges older than the pending lifetime
    PurgePending,
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = wsproxy_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Categories { site }) => catalog::run_categories(&config, site).await?,
        Some(Commands::Browse { site, slug }) => catalog::run_browse(&config, site, &slug).await?,
        Some(Commands::Product { site, slug }) => catalog::run_product(&config, site, &slug).await?,
        Some(Commands::Search { site, query, page }) => {
            catalog::run_search(&config, site, &query, page).await?;
        }
        Some(Commands::Products { category, page }) => {
            catalog::run_products(&config, &category, page).await?;
        }
        Some(Commands::PurgePending) => db::run_purge_pending(&config).await?,
        Some(Commands::Migrate) => db::run_migrate(&config).await?,
        None => println!("wsproxy-cli: run with --help to list commands"),
    }

    Ok(())
}
