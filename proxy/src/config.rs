use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub port: u16,
    pub sessdata: Option<String>,
    pub cookie: Option<String>,
    pub upstream_timeout: Duration,
    pub key_ttl: Duration,
    pub refresh_backoff: Duration,
    pub feed_cache_ttl: Duration,
    pub image_cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
    pub warmup_cookies: bool,
    pub endpoints: Endpoints,
}

/// Upstream locations. Every outbound URL the proxy builds is derived from here.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_base: String,
    pub site_root: String,
    pub space_base: String,
}

impl Endpoints {
    pub fn new(api_base: &str, site_root: &str, space_base: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            site_root: site_root.to_string(),
            space_base: space_base.trim_end_matches('/').to_string(),
        }
    }

    /// Bootstrap endpoint publishing the current key fragments.
    pub fn nav_url(&self) -> String {
        format!("{}/x/web-interface/nav", self.api_base)
    }

    pub fn feed_url(&self) -> String {
        format!("{}/x/polymer/web-dynamic/v1/feed/space", self.api_base)
    }

    /// Referer the browser would send from a user's dynamic tab.
    pub fn feed_referer(&self, uid: &str) -> String {
        format!("{}/{}/dynamic", self.space_base, uid)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(
            "https://api.bilibili.com",
            "https://www.bilibili.com/",
            "https://space.bilibili.com",
        )
    }
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Endpoints::default();

        Ok(Self {
            port: env("PORT", "8080")
                .parse()
                .context("PORT must be a valid u16")?,
            sessdata: optional("BILIBILI_SESSDATA"),
            cookie: optional("BILIBILI_COOKIE"),
            upstream_timeout: secs("UPSTREAM_TIMEOUT_SECS", "10")?,
            key_ttl: secs("WBI_KEY_TTL_SECS", "3600")?,
            refresh_backoff: secs("WBI_REFRESH_BACKOFF_SECS", "5")?,
            feed_cache_ttl: secs("FEED_CACHE_TTL_SECS", "300")?,
            image_cache_ttl: secs("IMAGE_CACHE_TTL_SECS", "86400")?,
            cache_sweep_interval: secs("CACHE_SWEEP_INTERVAL_SECS", "600")?,
            warmup_cookies: env("WARMUP_COOKIES", "true") == "true",
            endpoints: Endpoints::new(
                &env("BILIBILI_API_BASE", &defaults.api_base),
                &env("BILIBILI_SITE_ROOT", &defaults.site_root),
                &env("BILIBILI_SPACE_BASE", &defaults.space_base),
            ),
        })
    }
}

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset and empty are treated the same.
fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn secs(key: &str, default: &str) -> Result<Duration> {
    let n: u64 = env(key, default)
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds"))?;
    Ok(Duration::from_secs(n))
}
