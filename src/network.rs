//! Typed HTTP fetches run as chained [`TaskQueue`] units.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

use crate::error::NetworkError;
use crate::queue::{TaskHandle, TaskQueue};
use crate::reachability::Reachability;
use crate::types::HomeFeedsResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// The API surface this client knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    FetchHomeFeeds { page: u32, limit: u32 },
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::FetchHomeFeeds { .. } => "/ecm/v2/super/feeds/zee5-home/details",
        }
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            Endpoint::FetchHomeFeeds { .. } => HttpMethod::Get,
        }
    }

    pub fn headers(&self) -> Vec<(&'static str, String)> { Vec::new() }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::FetchHomeFeeds { page, limit } => vec![("page", page.to_string()), ("perPage", limit.to_string())],
        }
    }

    /// Absolute URL for this endpoint under `base`.
    pub fn url(&self, base: &Url) -> Result<Url, NetworkError> {
        let raw = format!("{}{}", base.as_str().trim_end_matches('/'), self.path());
        let mut url = Url::parse(&raw).map_err(|_| NetworkError::InvalidUrl(raw.clone()))?;
        let query = self.query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}

fn encode_body<B: Serialize>(body: &B) -> Result<Vec<u8>, NetworkError> {
    serde_json::to_vec(body).map_err(NetworkError::Encoding)
}

/// Issues fetches strictly one after another: every call is queued behind
/// the previous call made through the same service.
pub struct NetworkService {
    http: reqwest::Client,
    base_url: Url,
    queue: TaskQueue,
    reachability: Arc<dyn Reachability>,
    last: Mutex<Option<TaskHandle>>,
}

impl NetworkService {
    pub fn new(http: reqwest::Client, base_url: Url, queue: TaskQueue, reachability: Arc<dyn Reachability>) -> Self {
        Self { http, base_url, queue, reachability, last: Mutex::new(None) }
    }

    pub fn base_url(&self) -> &Url { &self.base_url }

    /// Queue a request without a body. `completion` runs inside the unit,
    /// before it finishes, and is skipped if the unit was cancelled.
    pub fn request<T, F>(&self, endpoint: Endpoint, completion: F) -> TaskHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T, NetworkError>) + Send + 'static,
    {
        self.submit(endpoint, None, completion)
    }

    /// Queue a request with a JSON body.
    pub fn request_with_body<T, B, F>(&self, endpoint: Endpoint, body: &B, completion: F) -> TaskHandle
    where
        T: DeserializeOwned + Send + 'static,
        B: Serialize,
        F: FnOnce(Result<T, NetworkError>) + Send + 'static,
    {
        self.submit(endpoint, Some(encode_body(body)), completion)
    }

    /// Awaitable form of [`Self::request`].
    pub async fn fetch<T>(&self, endpoint: Endpoint) -> Result<T, NetworkError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.request(endpoint, move |res| { let _ = tx.send(res); });
        rx.await.unwrap_or(Err(NetworkError::Cancelled))
    }

    pub async fn fetch_home_feeds(&self, page: u32, limit: u32) -> Result<HomeFeedsResponse, NetworkError> {
        self.fetch(Endpoint::FetchHomeFeeds { page, limit }).await
    }

    fn submit<T, F>(&self, endpoint: Endpoint, body: Option<Result<Vec<u8>, NetworkError>>, completion: F) -> TaskHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<T, NetworkError>) + Send + 'static,
    {
        let http = self.http.clone();
        let base = self.base_url.clone();
        let reachability = self.reachability.clone();

        // Held across submit so concurrent callers still form a single chain.
        let mut last = self.last.lock();
        let handle = self.queue.submit(last.take(), move |task| async move {
            let result = execute::<T>(&http, reachability.as_ref(), &base, endpoint, body).await;
            if task.is_cancelled() {
                debug!(task = %task.id(), ?endpoint, "dropping result of cancelled request");
                return;
            }
            if let Err(e) = &result {
                warn!(task = %task.id(), ?endpoint, error = %e, "request failed");
            }
            completion(result);
        });
        *last = Some(handle.clone());
        handle
    }
}

async fn execute<T: DeserializeOwned>(
    http: &reqwest::Client,
    reachability: &dyn Reachability,
    base: &Url,
    endpoint: Endpoint,
    body: Option<Result<Vec<u8>, NetworkError>>,
) -> Result<T, NetworkError> {
    if !reachability.is_reachable().await {
        return Err(NetworkError::NoInternet);
    }
    let url = endpoint.url(base)?;
    let mut req = http.request(endpoint.method().into(), url.clone());
    for (name, value) in endpoint.headers() {
        req = req.header(name, value);
    }
    if let Some(body) = body {
        req = req.header(CONTENT_TYPE, "application/json").body(body?);
    }

    debug!(%url, "sending request");
    let resp = req.send().await?;
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if bytes.is_empty() {
        return Err(NetworkError::Unknown);
    }
    serde_json::from_slice(&bytes).map_err(|e| {
        debug!(%url, %status, "response did not decode");
        NetworkError::Decoding(e)
    })
}
