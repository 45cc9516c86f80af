//! Two-tier (memory + disk) image cache with lazy expiration.
//!
//! Reads check memory, then disk; an entry older than the expiration window
//! is removed from both tiers on the read that notices it. Fetches hit the
//! network only on a miss and share one request per URL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::{Config, ExpirationPolicy};
use crate::error::CacheError;
use crate::storage::{BlobStore, DiskStore};

pub type ImageData = Arc<[u8]>;

/// Disk key for a URL: hex SHA-256 of the whole URL.
pub fn cache_key(url: &str) -> String {
    Sha256::digest(url.as_bytes()).iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    data: ImageData,
    written: SystemTime,
}

type Waiters = HashMap<String, Vec<oneshot::Sender<Option<ImageData>>>>;

pub struct ImageCache {
    http: reqwest::Client,
    memory: RwLock<HashMap<String, MemoryEntry>>,
    disk: Arc<dyn BlobStore>,
    expiration: ExpirationPolicy,
    in_flight: Mutex<Waiters>,
}

impl ImageCache {
    pub fn new(http: reqwest::Client, disk: Arc<dyn BlobStore>, expiration: ExpirationPolicy) -> Self {
        Self { http, memory: RwLock::new(HashMap::new()), disk, expiration, in_flight: Mutex::new(HashMap::new()) }
    }

    pub fn from_config(cfg: &Config, http: reqwest::Client) -> Result<Self> {
        let dir = cfg.image_cache_dir()?;
        debug!(dir = %dir.display(), "image cache directory");
        Ok(Self::new(http, Arc::new(DiskStore::new(dir)), cfg.expiration()))
    }

    pub fn expiration(&self) -> ExpirationPolicy { self.expiration }

    /// Cached bytes for `url`, without touching the network.
    pub fn get(&self, url: &str) -> Option<ImageData> {
        let now = SystemTime::now();
        let cached = self.memory.read().get(url).cloned();
        if let Some(entry) = cached {
            if self.is_expired(entry.written, now) {
                debug!(%url, "memory entry expired");
                self.evict(url);
                return None;
            }
            return Some(entry.data);
        }

        match self.disk.read(&cache_key(url)) {
            Ok(Some(blob)) => {
                if self.is_expired(blob.modified, now) {
                    debug!(%url, "disk entry expired");
                    self.evict(url);
                    return None;
                }
                let data: ImageData = Arc::from(blob.bytes);
                // Keep the disk timestamp so both tiers expire together.
                self.memory.write().insert(url.to_string(), MemoryEntry { data: data.clone(), written: blob.modified });
                Some(data)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(%url, error = %e, "disk cache read failed");
                None
            }
        }
    }

    /// Cached bytes, or a network fetch that populates both tiers.
    /// `None` when the download fails or the payload is not an image.
    pub async fn fetch(&self, url: &str) -> Option<ImageData> {
        if let Some(hit) = self.get(url) {
            return Some(hit);
        }

        let follower = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get_mut(url) {
                Some(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                None => {
                    in_flight.insert(url.to_string(), Vec::new());
                    None
                }
            }
        };
        if let Some(rx) = follower {
            debug!(%url, "joining in-flight fetch");
            return rx.await.ok().flatten();
        }

        let mut flight = Flight { waiters: &self.in_flight, url, result: None };
        let data = self.download(url).await;
        if let Some(d) = &data {
            self.remember(url, d.clone());
            self.persist(url, d.clone()).await;
        }
        flight.result = data.clone();
        data
    }

    /// Store `data` for `url`. Memory always succeeds; disk is best effort.
    pub fn insert(&self, url: &str, data: ImageData) {
        self.remember(url, data.clone());
        if let Err(e) = self.disk.write(&cache_key(url), &data) {
            warn!(%url, error = %e, "disk cache write failed; serving from memory");
        }
    }

    /// Drop the memory tier only.
    pub fn purge_memory(&self) { self.memory.write().clear(); }

    /// Drop both tiers. Returns the number of disk entries removed.
    pub fn clear(&self) -> Result<u64, CacheError> {
        self.purge_memory();
        self.disk.clear()
    }

    fn remember(&self, url: &str, data: ImageData) {
        self.memory.write().insert(url.to_string(), MemoryEntry { data, written: SystemTime::now() });
    }

    // Disk write for the async path, kept off the runtime's worker threads.
    async fn persist(&self, url: &str, data: ImageData) {
        let disk = self.disk.clone();
        let key = cache_key(url);
        match tokio::task::spawn_blocking(move || disk.write(&key, &data)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%url, error = %e, "disk cache write failed; serving from memory"),
            Err(e) => warn!(%url, error = %e, "disk cache write task failed"),
        }
    }

    fn is_expired(&self, written: SystemTime, now: SystemTime) -> bool {
        // A timestamp in the future counts as fresh.
        self.expiration.is_expired(now.duration_since(written).unwrap_or_default())
    }

    fn evict(&self, url: &str) {
        self.memory.write().remove(url);
        if let Err(e) = self.disk.remove(&cache_key(url)) {
            warn!(%url, error = %e, "failed to remove expired disk entry");
        }
    }

    async fn download(&self, url: &str) -> Option<ImageData> {
        let resp = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => { warn!(%url, error = %e, "image request failed"); return None; }
        };
        if !resp.status().is_success() {
            warn!(%url, status = %resp.status(), "image request rejected");
            return None;
        }
        let bytes = match resp.bytes().await {
            Ok(b) => b,
            Err(e) => { warn!(%url, error = %e, "image body failed"); return None; }
        };
        if image::guess_format(&bytes).is_err() {
            debug!(%url, len = bytes.len(), "payload is not a recognised image");
            return None;
        }
        Some(Arc::from(bytes.as_ref()))
    }
}

// Releases followers when the leading fetch completes or is dropped.
struct Flight<'a> {
    waiters: &'a Mutex<Waiters>,
    url: &'a str,
    result: Option<ImageData>,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if let Some(waiters) = self.waiters.lock().remove(self.url) {
            for tx in waiters {
                let _ = tx.send(self.result.clone());
            }
        }
    }
}
