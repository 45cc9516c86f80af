use serde::Serialize;

use crate::types::{AssetKind, AssetType, DesignSlug, HomeFeed};

/// How a row of the home screen is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HomeSection {
    OttRail,
    Carousel,
}

impl From<DesignSlug> for HomeSection {
    fn from(slug: DesignSlug) -> Self {
        match slug {
            DesignSlug::OttRail => HomeSection::OttRail,
            DesignSlug::Carousel => HomeSection::Carousel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RailWithHeader {
    pub title: String,
    pub assets: Vec<String>,
}

/// The aggregate feed list for one home screen. Pages are appended as they
/// arrive; nothing is merged or deduplicated.
#[derive(Debug, Default, Clone)]
pub struct HomeModel {
    feeds: Vec<HomeFeed>,
    sections: Vec<HomeSection>,
}

impl HomeModel {
    pub fn new() -> Self { Self::default() }

    pub fn feeds(&self) -> &[HomeFeed] { &self.feeds }
    pub fn sections(&self) -> &[HomeSection] { &self.sections }
    pub fn row_count(&self) -> usize { self.feeds.len() }
    pub fn is_empty(&self) -> bool { self.feeds.is_empty() }

    pub fn append(&mut self, page: Vec<HomeFeed>) {
        self.sections.extend(page.iter().map(|f| HomeSection::from(f.design_slug)));
        self.feeds.extend(page);
    }

    pub fn clear(&mut self) {
        self.feeds.clear();
        self.sections.clear();
    }

    pub fn section_kind(&self, row: isize) -> Option<HomeSection> {
        circular(&self.sections, row).copied()
    }

    /// `sourcePath`s of IMAGE assets of `kind` in the feed at `row`. Video assets are skipped.
    pub fn assets(&self, row: isize, kind: AssetKind) -> Vec<String> {
        let Some(feed) = circular(&self.feeds, row) else { return Vec::new() };
        feed.contents
            .iter()
            .flat_map(|c| c.assets.iter())
            .filter(|a| a.asset_type == AssetType::Image && a.kind == kind)
            .map(|a| a.source_path.clone())
            .collect()
    }

    pub fn carousel_assets(&self, row: isize) -> Vec<String> { self.assets(row, AssetKind::Thumbnail) }

    pub fn rail(&self, row: isize) -> RailWithHeader {
        RailWithHeader {
            title: circular(&self.feeds, row).map(|f| f.title.clone()).unwrap_or_default(),
            assets: self.assets(row, AssetKind::ThumbnailList),
        }
    }
}

// Negative rows and empty lists have nothing; rows past the end wrap around.
fn circular<T>(items: &[T], index: isize) -> Option<&T> {
    if index < 0 || items.is_empty() {
        return None;
    }
    items.get(index as usize % items.len())
}
