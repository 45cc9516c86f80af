use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::error::RepositoryError;
use crate::model::{HomeModel, HomeSection, RailWithHeader};
use crate::paginator::{PageRequest, Paginator};
use crate::queue::TaskHandle;
use crate::repository::HomeFeedRepository;
use crate::types::HomeFeedsResponse;

/// What the home screen should show next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeStatus {
    Reset,
    FetchingPage(u32),
    Fetched,
    Empty,
    Failed(RepositoryError),
}

/// State behind one home screen. The screen owns this; this owns the
/// paginator and the repository.
///
/// Statuses go into a channel; the screen drains the receiver on its own
/// thread, never on a fetch worker.
pub struct HomeViewModel {
    paginator: Paginator,
    repository: HomeFeedRepository,
    screen: Arc<RwLock<Screen>>,
    status: UnboundedSender<HomeStatus>,
    page_size: u32,
    in_flight: Vec<TaskHandle>,
}

impl HomeViewModel {
    pub fn new(repository: HomeFeedRepository, page_size: u32) -> (Self, UnboundedReceiver<HomeStatus>) {
        let (status, rx) = mpsc::unbounded_channel();
        let vm = Self {
            paginator: Paginator::new(),
            repository,
            screen: Arc::new(RwLock::new(Screen::default())),
            status,
            page_size,
            in_flight: Vec::new(),
        };
        (vm, rx)
    }

    /// Forget everything and load page 0.
    pub fn reset(&mut self) {
        self.screen.write().restart();
        self.publish(HomeStatus::Reset);
        let req = self.paginator.reset();
        self.paginate(req);
    }

    /// Report the last visible row (`None` when nothing is on screen).
    pub fn viewing_item(&mut self, last_visible: Option<usize>, total_items: usize) {
        if let Some(req) = self.paginator.observe(last_visible, total_items) {
            self.paginate(req);
        }
    }

    /// Extra observer for page requests; replays the current page.
    pub fn observe_pages(&mut self, tx: UnboundedSender<PageRequest>) { self.paginator.bind(tx); }

    pub fn paginator(&self) -> &Paginator { &self.paginator }

    pub fn row_count(&self) -> usize { self.screen.read().model.row_count() }
    pub fn section_kind(&self, row: isize) -> Option<HomeSection> { self.screen.read().model.section_kind(row) }
    pub fn rail(&self, row: isize) -> RailWithHeader { self.screen.read().model.rail(row) }
    pub fn carousel_assets(&self, row: isize) -> Vec<String> { self.screen.read().model.carousel_assets(row) }

    /// Read access to the aggregate feed list.
    pub fn with_model<R>(&self, f: impl FnOnce(&HomeModel) -> R) -> R { f(&self.screen.read().model) }

    /// Resolves when every request issued so far has finished.
    pub async fn settled(&self) {
        for task in &self.in_flight {
            task.finished().await;
        }
    }

    fn paginate(&mut self, req: PageRequest) {
        self.in_flight.retain(|t| !t.is_finished());
        if req.page == 0 {
            // Results of a previous pass must not land in the fresh list.
            for task in self.in_flight.drain(..) {
                task.cancel();
            }
            self.screen.write().restart();
        }
        self.publish(HomeStatus::FetchingPage(req.page));

        let screen = self.screen.clone();
        let generation = screen.read().generation;
        let status = self.status.clone();
        let page = req.page;
        let task = self.repository.fetch_home_feeds(page, self.page_size, move |res| {
            if let Some(next) = screen.write().apply(generation, page, res) {
                let _ = status.send(next);
            }
        });
        self.in_flight.push(task);
    }

    fn publish(&self, status: HomeStatus) {
        // The screen may already be gone.
        let _ = self.status.send(status);
    }
}

/// The aggregate list plus the pass it belongs to. Every restart starts a new
/// pass; results issued in an earlier pass are dropped under the same lock
/// that would append them.
#[derive(Debug, Default)]
struct Screen {
    model: HomeModel,
    generation: u64,
}

impl Screen {
    fn restart(&mut self) {
        self.generation += 1;
        self.model.clear();
    }

    fn apply(&mut self, generation: u64, page: u32, res: Result<HomeFeedsResponse, RepositoryError>) -> Option<HomeStatus> {
        if generation != self.generation {
            debug!(page, generation, current = self.generation, "dropping page from an earlier pass");
            return None;
        }
        Some(match res {
            Ok(resp) => {
                self.model.append(resp.data);
                debug!(page, rows = self.model.row_count(), "page applied");
                if self.model.is_empty() { HomeStatus::Empty } else { HomeStatus::Fetched }
            }
            Err(e) => HomeStatus::Failed(e),
        })
    }
}
