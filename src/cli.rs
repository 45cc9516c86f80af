use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for poking at the home feed, pagination and image cache
#[derive(Parser)]
#[command(name = "sugarbox")]
#[command(about = "Debug the SugarBox home feed pipeline from a terminal", long_about = None)]
pub struct Cli {
    /// TOML config file (env SUGARBOX_* still applies on top)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a single page of home feeds
    Feeds {
        #[arg(short, long, default_value_t = 0)]
        page: u32,
        /// Items per page (defaults to the configured page size)
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Walk the home screen: reset, then scroll to the end N times
    Browse {
        #[arg(short, long, default_value_t = 2)]
        pages: u32,
    },
    /// Load an image by asset source path through the cache
    Image {
        source_path: String,
    },
    /// Empty the image cache
    CacheClear,
}
