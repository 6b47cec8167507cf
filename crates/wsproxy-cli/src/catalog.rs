//! Anonymous catalog commands. Each prints the same JSON the server answers with.

use serde::Serialize;
use wsproxy_core::{AppConfig, CookieJar, Site};
use wsproxy_scraper::Sites;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn sites(config: &AppConfig) -> anyhow::Result<Sites> {
    Sites::from_config(config).map_err(|e| anyhow::anyhow!("failed to build site clients: {e}"))
}

pub(crate) async fn run_categories(config: &AppConfig, site: Site) -> anyhow::Result<()> {
    let sites = sites(config)?;
    let mut jar = CookieJar::new();
    let categories = match site {
        Site::Atut => sites.atut.categories().await?,
        Site::Ramirent => sites.ramirent.categories(&mut jar).await?,
        Site::Onninen => sites.onninen.categories(&mut jar).await?,
    };
    tracing::info!(site = %site, count = categories.len(), "categories fetched");
    print_json(&categories)
}

pub(crate) async fn run_browse(config: &AppConfig, site: Site, slug: &str) -> anyhow::Result<()> {
    let sites = sites(config)?;
    let mut jar = CookieJar::new();
    match site {
        Site::Atut => print_json(&sites.atut.browse(slug).await?),
        Site::Ramirent => print_json(&sites.ramirent.browse(slug, &mut jar).await?),
        Site::Onninen => print_json(&sites.onninen.browse(slug, &mut jar).await?),
    }
}

pub(crate) async fn run_product(config: &AppConfig, site: Site, slug: &str) -> anyhow::Result<()> {
    let sites = sites(config)?;
    let mut jar = CookieJar::new();
    match site {
        Site::Atut => print_json(&sites.atut.product(slug).await?),
        Site::Ramirent => print_json(&sites.ramirent.product(slug, &mut jar).await?),
        Site::Onninen => print_json(&sites.onninen.product(slug, &mut jar).await?),
    }
}

pub(crate) async fn run_search(
    config: &AppConfig,
    site: Site,
    query: &str,
    page: u32,
) -> anyhow::Result<()> {
    let sites = sites(config)?;
    let mut jar = CookieJar::new();
    match site {
        Site::Atut => print_json(&sites.atut.search(query).await?),
        Site::Ramirent => print_json(&sites.ramirent.search(query, &mut jar).await?),
        Site::Onninen => print_json(&sites.onninen.search(query, page.max(1), &mut jar).await?),
    }
}

pub(crate) async fn run_products(
    config: &AppConfig,
    category: &str,
    page: u32,
) -> anyhow::Result<()> {
    let sites = sites(config)?;
    let page = sites
        .onninen
        .products(category, page.max(1), &mut CookieJar::new())
        .await?;
    print_json(&page)
}
