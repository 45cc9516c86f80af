use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://apigw.sboxdc.com";
pub const DEFAULT_IMAGE_HOST: &str = "https://static01.sboxdc.com/images";
pub const DEFAULT_IMAGE_TTL_SECS: u64 = 1800;

/// How long a cached image stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationPolicy {
    Never,
    AfterDuration(Duration),
}

impl ExpirationPolicy {
    /// True once `age` exceeds the window.
    pub fn is_expired(&self, age: Duration) -> bool {
        match self {
            ExpirationPolicy::Never => false,
            ExpirationPolicy::AfterDuration(window) => age > *window,
        }
    }
}

impl Default for ExpirationPolicy {
    fn default() -> Self { ExpirationPolicy::AfterDuration(Duration::from_secs(DEFAULT_IMAGE_TTL_SECS)) }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub image_host: String,
    pub page_size: u32,
    pub max_concurrent_fetches: usize,
    pub image_ttl_secs: u64,
    pub image_cache_never_expires: bool,
    pub cache_dir: Option<PathBuf>,
    pub connect_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            image_host: DEFAULT_IMAGE_HOST.to_string(),
            page_size: 10,
            max_concurrent_fetches: 4,
            image_ttl_secs: DEFAULT_IMAGE_TTL_SECS,
            image_cache_never_expires: false,
            cache_dir: None,
            connect_timeout_ms: 3000,
            user_agent: concat!("sugarbox/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Read an optional TOML file, then apply `SUGARBOX_*` env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).with_context(|| format!("reading config: {}", p.display()))?;
                toml::from_str(&raw).with_context(|| format!("parsing config: {}", p.display()))?
            }
            None => Config::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    // Unparseable values are ignored, same as a missing variable.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("SUGARBOX_BASE_URL").filter(|s| !s.trim().is_empty()) { self.base_url = v; }
        if let Some(v) = var("SUGARBOX_IMAGE_HOST").filter(|s| !s.trim().is_empty()) { self.image_host = v; }
        if let Some(v) = var("SUGARBOX_PAGE_SIZE").and_then(|s| s.parse().ok()).filter(|n: &u32| *n > 0) { self.page_size = v; }
        if let Some(v) = var("SUGARBOX_IMAGE_TTL_SECS").and_then(|s| s.parse::<u64>().ok()) {
            // 0 means "keep forever"
            self.image_cache_never_expires = v == 0;
            if v > 0 { self.image_ttl_secs = v; }
        }
        if let Some(v) = var("SUGARBOX_CACHE_DIR").filter(|s| !s.trim().is_empty()) { self.cache_dir = Some(PathBuf::from(v)); }
    }

    pub fn expiration(&self) -> ExpirationPolicy {
        if self.image_cache_never_expires { ExpirationPolicy::Never } else { ExpirationPolicy::AfterDuration(Duration::from_secs(self.image_ttl_secs)) }
    }

    pub fn connect_timeout(&self) -> Duration { Duration::from_millis(self.connect_timeout_ms) }

    /// Configured cache directory, or the platform cache location.
    pub fn image_cache_dir(&self) -> Result<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_image_cache_dir(),
        }
    }

    /// Absolute image URL for an asset's `sourcePath`.
    pub fn image_url(&self, source_path: &str) -> String {
        format!("{}{}", self.image_host, source_path)
    }
}

fn default_image_cache_dir() -> Result<PathBuf> {
    let proj = ProjectDirs::from("com", "sugarbox", "sugarbox")
        .context("unable to determine cache directory for image cache")?;
    Ok(proj.cache_dir().join("ImageCache"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_home_screen_contract() {
        let cfg = Config::default();
        assert_eq!(cfg.base_url, "https://apigw.sboxdc.com");
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.expiration(), ExpirationPolicy::AfterDuration(Duration::from_secs(1800)));
        assert_eq!(cfg.image_url("/a/b.png"), "https://static01.sboxdc.com/images/a/b.png");
    }

    #[test]
    fn env_overrides_apply_and_bad_values_are_ignored() {
        let env: HashMap<&str, &str> = [
            ("SUGARBOX_BASE_URL", "http://localhost:9000"),
            ("SUGARBOX_PAGE_SIZE", "not-a-number"),
            ("SUGARBOX_IMAGE_TTL_SECS", "0"),
            ("SUGARBOX_CACHE_DIR", "/tmp/sb"),
        ].into_iter().collect();
        let mut cfg = Config::default();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.base_url, "http://localhost:9000");
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.expiration(), ExpirationPolicy::Never);
        assert_eq!(cfg.image_cache_dir().unwrap(), PathBuf::from("/tmp/sb"));
    }

    #[test]
    fn toml_file_fills_missing_fields_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sugarbox.toml");
        std::fs::write(&path, "page_size = 25\nimage_ttl_secs = 60\n").unwrap();
        let cfg: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.expiration(), ExpirationPolicy::AfterDuration(Duration::from_secs(60)));
        assert_eq!(cfg.image_host, DEFAULT_IMAGE_HOST);
    }

    #[test]
    fn expiration_is_strictly_after_window() {
        let p = ExpirationPolicy::AfterDuration(Duration::from_secs(10));
        assert!(!p.is_expired(Duration::from_secs(10)));
        assert!(p.is_expired(Duration::from_secs(11)));
        assert!(!ExpirationPolicy::Never.is_expired(Duration::MAX));
    }
}
