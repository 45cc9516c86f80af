//! Turns "the user is looking at item I of N" into "fetch page P".
//!
//! Layout passes may report the same position many times; a page is only
//! requested once per distinct item count seen at the end of the list.

use tokio::sync::mpsc::UnboundedSender;

/// A request to load `page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginatorState {
    Unset,
    AtPage(u32),
}

#[derive(Debug)]
pub struct Paginator {
    state: PaginatorState,
    previous_item_count: Option<usize>,
    observer: Option<UnboundedSender<PageRequest>>,
}

impl Default for Paginator {
    fn default() -> Self { Self::new() }
}

impl Paginator {
    pub fn new() -> Self {
        Self { state: PaginatorState::Unset, previous_item_count: None, observer: None }
    }

    pub fn state(&self) -> PaginatorState { self.state }

    pub fn current_page(&self) -> Option<u32> {
        match self.state {
            PaginatorState::Unset => None,
            PaginatorState::AtPage(p) => Some(p),
        }
    }

    /// Attach an observer. If a page is already set it is replayed right away.
    pub fn bind(&mut self, observer: UnboundedSender<PageRequest>) {
        if let Some(page) = self.current_page() {
            let _ = observer.send(PageRequest { page });
        }
        self.observer = Some(observer);
    }

    /// Back to page 0. Always emits.
    pub fn reset(&mut self) -> PageRequest {
        self.state = PaginatorState::AtPage(0);
        self.previous_item_count = None;
        self.emit(0)
    }

    /// `last_visible` is `None` when nothing is on screen yet. Emits only when
    /// the last known item is visible and the count differs from the last
    /// count that triggered a page.
    pub fn observe(&mut self, last_visible: Option<usize>, total_items: usize) -> Option<PageRequest> {
        if last_visible != total_items.checked_sub(1) {
            return None;
        }
        if self.previous_item_count == Some(total_items) {
            return None;
        }
        let next = match self.state {
            PaginatorState::Unset => 0,
            PaginatorState::AtPage(p) => p + 1,
        };
        self.state = PaginatorState::AtPage(next);
        self.previous_item_count = Some(total_items);
        Some(self.emit(next))
    }

    fn emit(&mut self, page: u32) -> PageRequest {
        let req = PageRequest { page };
        if let Some(tx) = &self.observer {
            if tx.send(req).is_err() {
                // receiver gone
                self.observer = None;
            }
        }
        req
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<PageRequest>) -> Vec<u32> {
        let mut out = Vec::new();
        while let Ok(r) = rx.try_recv() { out.push(r.page); }
        out
    }

    #[test]
    fn reset_always_emits_page_zero() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut p = Paginator::new();
        p.bind(tx);
        assert_eq!(p.reset(), PageRequest { page: 0 });
        p.observe(Some(9), 10);
        p.observe(Some(19), 20);
        assert_eq!(p.current_page(), Some(2));
        p.reset();
        assert_eq!(p.current_page(), Some(0));
        assert_eq!(drain(&mut rx), vec![0, 1, 2, 0]);
    }

    #[test]
    fn repeated_observations_at_same_count_emit_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut p = Paginator::new();
        p.bind(tx);
        p.reset();
        for _ in 0..5 {
            p.observe(Some(9), 10);
        }
        assert_eq!(drain(&mut rx), vec![0, 1]);
    }

    #[test]
    fn only_the_last_item_triggers() {
        let mut p = Paginator::new();
        p.reset();
        assert_eq!(p.observe(Some(3), 10), None);
        assert_eq!(p.observe(None, 10), None);
        assert_eq!(p.observe(Some(10), 10), None);
        assert_eq!(p.observe(Some(9), 10), Some(PageRequest { page: 1 }));
        assert_eq!(p.observe(Some(14), 15), Some(PageRequest { page: 2 }));
    }

    #[test]
    fn empty_list_bootstraps_from_unset() {
        let mut p = Paginator::new();
        assert_eq!(p.state(), PaginatorState::Unset);
        assert_eq!(p.observe(None, 0), Some(PageRequest { page: 0 }));
        assert_eq!(p.observe(None, 0), None);
    }

    #[test]
    fn binding_replays_current_page() {
        let mut p = Paginator::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        p.bind(tx);
        assert!(drain(&mut rx).is_empty());

        p.reset();
        p.observe(Some(0), 1);
        let (tx, mut rx) = mpsc::unbounded_channel();
        p.bind(tx);
        assert_eq!(drain(&mut rx), vec![1]);
    }
}
