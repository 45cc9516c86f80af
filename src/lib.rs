pub mod config;
pub mod error;
pub mod image_cache;
pub mod model;
pub mod network;
pub mod paginator;
pub mod queue;
pub mod reachability;
pub mod repository;
pub mod storage;
pub mod types;
pub mod viewmodel;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::config::{Config, ExpirationPolicy};
    pub use crate::error::{NetworkError, RepositoryError};
    pub use crate::image_cache::{ImageCache, ImageData};
    pub use crate::model::{HomeSection, RailWithHeader};
    pub use crate::paginator::PageRequest;
    pub use crate::types::{HomeFeed, HomeFeedsResponse, Pagination};
    pub use crate::viewmodel::{HomeStatus, HomeViewModel};
    pub use crate::SugarBox;
}

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

use crate::config::Config;
use crate::image_cache::{ImageCache, ImageData};
use crate::network::NetworkService;
use crate::queue::TaskQueue;
use crate::reachability::{Reachability, TcpReachability};
use crate::repository::HomeFeedRepository;
use crate::viewmodel::{HomeStatus, HomeViewModel};

/// Library entry point. Owns the process-wide pieces (HTTP client, worker
/// pool, image cache) and hands out per-screen view models.
///
/// Built inside a Tokio runtime, fetches run on that runtime. Built outside
/// one (an FFI host thread, say), it starts and owns its own.
pub struct SugarBox {
    config: Config,
    http: reqwest::Client,
    queue: TaskQueue,
    images: Arc<ImageCache>,
    reachability: Arc<dyn Reachability>,
    runtime: Option<Runtime>,
}

impl SugarBox {
    /// Build with a TCP reachability probe against the API host.
    pub fn new(config: Config) -> Result<Self> {
        let base = Url::parse(&config.base_url).with_context(|| format!("invalid base URL: {}", config.base_url))?;
        let probe = TcpReachability::for_url(&base, config.connect_timeout())
            .with_context(|| format!("base URL has no host: {}", config.base_url))?;
        Self::with_reachability(config, Arc::new(probe))
    }

    /// Build with a caller-supplied connectivity signal.
    pub fn with_reachability(config: Config, reachability: Arc<dyn Reachability>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .context("building HTTP client")?;
        let images = Arc::new(ImageCache::from_config(&config, http.clone())?);
        let (handle, owned) = match Handle::try_current() {
            Ok(handle) => (handle, None),
            Err(_) => {
                let rt = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(config.max_concurrent_fetches.max(1))
                    .thread_name("sugarbox-worker")
                    .enable_all()
                    .build()
                    .context("starting worker runtime")?;
                (rt.handle().clone(), Some(rt))
            }
        };
        let queue = TaskQueue::with_runtime(config.max_concurrent_fetches, handle);
        Ok(Self { config, http, queue, images, reachability, runtime: owned })
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn image_cache(&self) -> Arc<ImageCache> { self.images.clone() }

    /// A repository with its own request chain, sharing the worker pool.
    pub fn home_repository(&self) -> Result<HomeFeedRepository> {
        let base = Url::parse(&self.config.base_url).with_context(|| format!("invalid base URL: {}", self.config.base_url))?;
        let network = NetworkService::new(self.http.clone(), base, self.queue.clone(), self.reachability.clone());
        Ok(HomeFeedRepository::new(network))
    }

    /// A fresh view model for one home screen, plus its status stream.
    pub fn home_view_model(&self) -> Result<(HomeViewModel, UnboundedReceiver<HomeStatus>)> {
        Ok(HomeViewModel::new(self.home_repository()?, self.config.page_size))
    }

    /// Image for an asset's `sourcePath`, via the cache.
    pub async fn load_image(&self, source_path: &str) -> Option<ImageData> {
        self.images.fetch(&self.config.image_url(source_path)).await
    }

    /// Cached image for an asset's `sourcePath`, never touching the network.
    pub fn cached_image(&self, source_path: &str) -> Option<ImageData> {
        self.images.get(&self.config.image_url(source_path))
    }
}

impl Drop for SugarBox {
    fn drop(&mut self) {
        // The last handle may go away on an async thread, where a blocking shutdown panics.
        if let Some(rt) = self.runtime.take() {
            rt.shutdown_background();
        }
    }
}
