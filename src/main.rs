mod cli;

use anyhow::{bail, Result};
use clap::Parser;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use sugarbox::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "sugarbox=debug" } else { "sugarbox=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let app = SugarBox::new(config)?;

    match cli.command {
        Commands::Feeds { page, limit } => {
            let limit = limit.unwrap_or(app.config().page_size);
            let repo = app.home_repository()?;
            match repo.home_feeds(page, limit).await {
                Ok(resp) => {
                    let p = resp.pagination;
                    println!("page {}/{} ({} per page, {} total)", p.current_page, p.total_pages, p.per_page, p.total_count);
                    for feed in &resp.data {
                        let assets: usize = feed.contents.iter().map(|c| c.assets.len()).sum();
                        println!("  {:<40} {:?} ({} assets)", feed.title, feed.design_slug, assets);
                    }
                }
                Err(e) => bail!("fetching page {page}: {e}"),
            }
        }
        Commands::Browse { pages } => browse(&app, pages).await?,
        Commands::Image { source_path } => {
            let cached = app.cached_image(&source_path).is_some();
            match app.load_image(&source_path).await {
                Some(data) => println!("{} bytes ({})", data.len(), if cached { "cache" } else { "network" }),
                None => bail!("could not load image {}", app.config().image_url(&source_path)),
            }
        }
        Commands::CacheClear => {
            let removed = app.image_cache().clear()?;
            println!("removed {removed} cached images");
        }
    }
    Ok(())
}

async fn browse(app: &SugarBox, pages: u32) -> Result<()> {
    let (mut vm, mut status) = app.home_view_model()?;
    vm.reset();
    if !settle(&mut status).await {
        return Ok(());
    }
    for _ in 1..pages {
        let before = vm.row_count();
        if before == 0 {
            break;
        }
        vm.viewing_item(Some(before - 1), before);
        if !settle(&mut status).await || vm.row_count() == before {
            break;
        }
    }
    for row in 0..vm.row_count() as isize {
        match vm.section_kind(row) {
            Some(HomeSection::Carousel) => println!("{row:>3} carousel  {} images", vm.carousel_assets(row).len()),
            Some(HomeSection::OttRail) => {
                let rail = vm.rail(row);
                println!("{row:>3} rail      {} ({} images)", rail.title, rail.assets.len());
            }
            None => {}
        }
    }
    Ok(())
}

// Prints statuses until a fetch settles; false when browsing should stop.
async fn settle(status: &mut UnboundedReceiver<HomeStatus>) -> bool {
    while let Some(s) = status.recv().await {
        println!("status: {s:?}");
        match s {
            HomeStatus::Fetched => return true,
            HomeStatus::Empty | HomeStatus::Failed(_) => return false,
            HomeStatus::Reset | HomeStatus::FetchingPage(_) => {}
        }
    }
    false
}
