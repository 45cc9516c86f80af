//! Flutter bridge for the SugarBox home screen.
//! Exposes a thin wrapper around one home view model suitable for flutter_rust_bridge.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use flutter_rust_bridge::frb;
use sugarbox::prelude::*;
use tokio::sync::mpsc::UnboundedReceiver;

/// Dart-friendly mirror of [`HomeStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeEvent {
    Reset,
    FetchingPage { page: u32 },
    Fetched,
    Empty,
    NoInternet,
    Failed,
}

impl From<HomeStatus> for HomeEvent {
    fn from(s: HomeStatus) -> Self {
        match s {
            HomeStatus::Reset => HomeEvent::Reset,
            HomeStatus::FetchingPage(page) => HomeEvent::FetchingPage { page },
            HomeStatus::Fetched => HomeEvent::Fetched,
            HomeStatus::Empty => HomeEvent::Empty,
            HomeStatus::Failed(RepositoryError::NoInternet) => HomeEvent::NoInternet,
            HomeStatus::Failed(RepositoryError::Unknown) => HomeEvent::Failed,
        }
    }
}

#[frb(opaque)]
pub struct SugarBoxBridge {
    app: Arc<SugarBox>,
    // view model calls are short and synchronous
    home: Mutex<HomeViewModel>,
    status: tokio::sync::Mutex<UnboundedReceiver<HomeStatus>>,
}

impl SugarBoxBridge {
    /// Build the library from an optional TOML config path and open the home screen.
    pub fn new(config_path: Option<String>) -> Result<Self> {
        let config = Config::load(config_path.map(PathBuf::from).as_deref())?;
        let app = SugarBox::new(config)?;
        let (home, status) = app.home_view_model()?;
        Ok(Self { app: Arc::new(app), home: Mutex::new(home), status: tokio::sync::Mutex::new(status) })
    }

    pub fn reset(&self) {
        self.home.lock().unwrap_or_else(|e| e.into_inner()).reset();
    }

    /// `last_visible` is -1 when nothing is on screen.
    pub fn viewing_item(&self, last_visible: i64, total_items: u32) {
        let last = usize::try_from(last_visible).ok();
        self.home.lock().unwrap_or_else(|e| e.into_inner()).viewing_item(last, total_items as usize);
    }

    /// Next status change; `None` once the view model is gone.
    pub async fn next_status(&self) -> Option<HomeEvent> {
        self.status.lock().await.recv().await.map(HomeEvent::from)
    }

    #[frb(sync)]
    pub fn row_count(&self) -> u32 { self.with_home(|h| h.row_count() as u32) }

    #[frb(sync)]
    pub fn is_carousel(&self, row: i64) -> bool {
        self.with_home(|h| h.section_kind(row as isize) == Some(HomeSection::Carousel))
    }

    #[frb(sync)]
    pub fn rail_title(&self, row: i64) -> String { self.with_home(|h| h.rail(row as isize).title) }

    #[frb(sync)]
    pub fn rail_assets(&self, row: i64) -> Vec<String> { self.with_home(|h| h.rail(row as isize).assets) }

    #[frb(sync)]
    pub fn carousel_assets(&self, row: i64) -> Vec<String> { self.with_home(|h| h.carousel_assets(row as isize)) }

    /// Image bytes for an asset source path; cache first, then network.
    pub async fn load_image(&self, source_path: String) -> Option<Vec<u8>> {
        self.app.load_image(&source_path).await.map(|d| d.to_vec())
    }

    pub fn clear_image_cache(&self) -> Result<u64> { Ok(self.app.image_cache().clear()?) }

    fn with_home<R>(&self, f: impl FnOnce(&HomeViewModel) -> R) -> R {
        f(&self.home.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mirror_keeps_the_offline_case_apart() {
        assert_eq!(HomeEvent::from(HomeStatus::Failed(RepositoryError::NoInternet)), HomeEvent::NoInternet);
        assert_eq!(HomeEvent::from(HomeStatus::Failed(RepositoryError::Unknown)), HomeEvent::Failed);
        assert_eq!(HomeEvent::from(HomeStatus::FetchingPage(3)), HomeEvent::FetchingPage { page: 3 });
    }
}
