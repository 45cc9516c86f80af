use crate::error::RepositoryError;
use crate::network::{Endpoint, NetworkService};
use crate::queue::TaskHandle;
use crate::types::HomeFeedsResponse;

/// Decides where home feeds come from. Today that is always the network.
pub struct HomeFeedRepository {
    network: NetworkService,
}

impl HomeFeedRepository {
    pub fn new(network: NetworkService) -> Self { Self { network } }

    pub fn network(&self) -> &NetworkService { &self.network }

    /// Queue a page fetch; `completion` runs in request order relative to
    /// earlier calls on this repository.
    pub fn fetch_home_feeds<F>(&self, page: u32, limit: u32, completion: F) -> TaskHandle
    where
        F: FnOnce(Result<HomeFeedsResponse, RepositoryError>) + Send + 'static,
    {
        self.network.request(Endpoint::FetchHomeFeeds { page, limit }, move |res| {
            completion(res.map_err(RepositoryError::from))
        })
    }

    pub async fn home_feeds(&self, page: u32, limit: u32) -> Result<HomeFeedsResponse, RepositoryError> {
        self.network.fetch_home_feeds(page, limit).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::TaskQueue;
    use crate::reachability::StaticReachability;
    use serde_json::json;
    use std::sync::Arc;
    use url::Url;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn repository(server: &MockServer, online: bool) -> HomeFeedRepository {
        let svc = NetworkService::new(
            reqwest::Client::new(),
            Url::parse(&server.uri()).unwrap(),
            TaskQueue::new(2),
            Arc::new(StaticReachability::new(online)),
        );
        HomeFeedRepository::new(svc)
    }

    #[tokio::test]
    async fn offline_is_reported_as_no_internet() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;
        let repo = repository(&server, false).await;
        assert_eq!(repo.home_feeds(0, 10).await.unwrap_err(), RepositoryError::NoInternet);
    }

    #[tokio::test]
    async fn anything_else_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
            .mount(&server)
            .await;
        let repo = repository(&server, true).await;
        let (tx, rx) = tokio::sync::oneshot::channel();
        repo.fetch_home_feeds(0, 10, move |r| { let _ = tx.send(r); });
        assert_eq!(rx.await.unwrap().unwrap_err(), RepositoryError::Unknown);
    }
}
