use serde::{Deserialize, Serialize};

/// One page of the home feed as returned by the feeds endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeFeedsResponse {
    pub data: Vec<HomeFeed>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DesignSlug {
    #[serde(rename = "OTTWidget")]
    OttRail,
    // Spelling is the server's.
    #[serde(rename = "CarousalWidget")]
    Carousel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeFeed {
    pub title: String,
    pub contents: Vec<Content>,
    pub design_slug: DesignSlug,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub assets: Vec<HomeAsset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeAsset {
    pub asset_type: AssetType,
    pub source_url: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub source_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetType {
    Image,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Dash,
    Detail,
    Hls,
    Thumbnail,
    ThumbnailList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_pages: u32,
    pub current_page: u32,
    pub per_page: u32,
    pub total_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "data": [{
            "title": "Trending",
            "designSlug": "CarousalWidget",
            "contents": [{ "assets": [
                { "assetType": "IMAGE", "sourceUrl": "u1", "type": "thumbnail_list", "sourcePath": "/a.png" },
                { "assetType": "VIDEO", "sourceUrl": "u2", "type": "hls", "sourcePath": "/a.m3u8" }
            ]}]
        }],
        "pagination": { "totalPages": 3, "currentPage": 0, "perPage": 10, "totalCount": 25 }
    }"#;

    #[test]
    fn decodes_wire_names() {
        let page: HomeFeedsResponse = serde_json::from_str(PAGE).unwrap();
        let feed = &page.data[0];
        assert_eq!(feed.design_slug, DesignSlug::Carousel);
        let assets = &feed.contents[0].assets;
        assert_eq!(assets[0].asset_type, AssetType::Image);
        assert_eq!(assets[0].kind, AssetKind::ThumbnailList);
        assert_eq!(assets[0].source_path, "/a.png");
        assert_eq!(assets[1].kind, AssetKind::Hls);
        assert_eq!(page.pagination.total_count, 25);
    }

    #[test]
    fn unknown_slug_is_a_decode_error() {
        let raw = PAGE.replace("CarousalWidget", "GridWidget");
        assert!(serde_json::from_str::<HomeFeedsResponse>(&raw).is_err());
    }
}
