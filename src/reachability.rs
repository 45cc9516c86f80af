use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

/// One-shot "is there a route to the internet" signal, consumed once per fetch.
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Probes by opening (and immediately dropping) a TCP connection to the API host.
#[derive(Debug, Clone)]
pub struct TcpReachability {
    addr: String,
    timeout: Duration,
}

impl TcpReachability {
    pub fn for_url(url: &Url, timeout: Duration) -> Option<Self> {
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(Self { addr: format!("{host}:{port}"), timeout })
    }
}

#[async_trait]
impl Reachability for TcpReachability {
    async fn is_reachable(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => { debug!(addr = %self.addr, error = %e, "reachability probe failed"); false }
            Err(_) => { debug!(addr = %self.addr, "reachability probe timed out"); false }
        }
    }
}

/// Fixed answer, for embedders that track connectivity themselves and for tests.
#[derive(Debug, Default)]
pub struct StaticReachability {
    online: AtomicBool,
    probes: AtomicUsize,
}

impl StaticReachability {
    pub fn new(online: bool) -> Self { Self { online: AtomicBool::new(online), probes: AtomicUsize::new(0) } }
    pub fn set_online(&self, online: bool) { self.online.store(online, Ordering::SeqCst) }
    /// Number of times the signal has been consumed.
    pub fn probes(&self) -> usize { self.probes.load(Ordering::SeqCst) }
}

#[async_trait]
impl Reachability for StaticReachability {
    async fn is_reachable(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.online.load(Ordering::SeqCst)
    }
}
