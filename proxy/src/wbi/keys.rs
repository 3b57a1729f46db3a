//! WBI key material and its refresh policy.
//!
//! [`KeyManager`] is the only owner of the key cell. Readers share a read
//! lock while the material is fresh; a stale read takes the write lock,
//! re-checks freshness, and only then calls the bootstrap endpoint, so a
//! burst of callers hitting an expired key produces a single upstream call.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::error::KeyRefreshError;
use crate::transport::Transport;
use crate::wbi::tables::{KEY_FRAGMENT_SUFFIX, MIXIN_KEY_ENC_TAB, MIXIN_KEY_LEN};

/// How long refreshed key material is trusted.
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);

/// Signing key material. `mixin_key` and `refreshed_at` are always set together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WbiKeys {
    pub img_key: String,
    pub sub_key: String,
    pub mixin_key: String,
    pub refreshed_at: Option<Instant>,
}

impl WbiKeys {
    fn is_fresh(&self, ttl: Duration) -> bool {
        !self.mixin_key.is_empty() && self.refreshed_at.is_some_and(|at| at.elapsed() < ttl)
    }
}

#[derive(Default)]
struct KeyCell {
    keys: WbiKeys,
    last_failure: Option<Instant>,
}

#[derive(Debug, Deserialize)]
struct NavResponse {
    data: Option<NavData>,
}

#[derive(Debug, Deserialize)]
struct NavData {
    wbi_img: Option<WbiImg>,
}

#[derive(Debug, Default, Deserialize)]
struct WbiImg {
    #[serde(default)]
    img_url: String,
    #[serde(default)]
    sub_url: String,
}

pub struct KeyManager {
    transport: Transport,
    nav_url: String,
    ttl: Duration,
    refresh_backoff: Duration,
    cell: RwLock<KeyCell>,
}

impl KeyManager {
    pub fn new(transport: Transport, nav_url: &str) -> Self {
        Self {
            transport,
            nav_url: nav_url.to_string(),
            ttl: DEFAULT_KEY_TTL,
            refresh_backoff: Duration::ZERO,
            cell: RwLock::new(KeyCell::default()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// After a failed refresh, fail fast for this long instead of calling the
    /// bootstrap endpoint again. Zero retries on every call.
    pub fn with_refresh_backoff(mut self, backoff: Duration) -> Self {
        self.refresh_backoff = backoff;
        self
    }

    /// Current key material, refreshed from upstream first if stale.
    ///
    /// On failure the previous material stays in place and the refresh
    /// timestamp is not advanced.
    pub async fn get_keys(&self) -> Result<WbiKeys, KeyRefreshError> {
        {
            let cell = self.cell.read().await;
            if cell.keys.is_fresh(self.ttl) {
                return Ok(cell.keys.clone());
            }
        }

        let mut cell = self.cell.write().await;

        // Another caller may have finished a refresh while we waited.
        if cell.keys.is_fresh(self.ttl) {
            debug!("WBI keys refreshed by a concurrent caller");
            return Ok(cell.keys.clone());
        }

        if let Some(failed_at) = cell.last_failure {
            let since = failed_at.elapsed();
            if since < self.refresh_backoff {
                return Err(KeyRefreshError::BackingOff(self.refresh_backoff - since));
            }
        }

        match self.fetch_keys().await {
            Ok(keys) => {
                info!("WBI keys refreshed (img={}, sub={})", keys.img_key, keys.sub_key);
                cell.keys = keys;
                cell.last_failure = None;
                Ok(cell.keys.clone())
            }
            Err(e) => {
                error!("WBI key refresh failed: {}", e);
                cell.last_failure = Some(Instant::now());
                Err(e)
            }
        }
    }

    /// Whether the held material is currently inside its freshness window.
    /// Never contacts upstream.
    pub async fn is_fresh(&self) -> bool {
        self.cell.read().await.keys.is_fresh(self.ttl)
    }

    async fn fetch_keys(&self) -> Result<WbiKeys, KeyRefreshError> {
        let resp = self
            .transport
            .get(&self.nav_url)
            .send()
            .await
            .map_err(KeyRefreshError::Request)?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(KeyRefreshError::Status(status));
        }

        let nav: NavResponse = resp.json().await.map_err(KeyRefreshError::Decode)?;
        let wbi_img = nav.data.and_then(|d| d.wbi_img).unwrap_or_default();

        let img_key = key_fragment(&wbi_img.img_url);
        let sub_key = key_fragment(&wbi_img.sub_url);
        if img_key.is_empty() || sub_key.is_empty() {
            return Err(KeyRefreshError::EmptyFragment);
        }
        // The table selects single bytes; that only makes sense on ASCII.
        if !img_key.is_ascii() || !sub_key.is_ascii() {
            return Err(KeyRefreshError::NonAsciiFragment);
        }

        let mixin_key = mixin_key(img_key, sub_key);
        if mixin_key.len() != MIXIN_KEY_LEN {
            return Err(KeyRefreshError::MixinKeyLength(mixin_key.len()));
        }

        Ok(WbiKeys {
            img_key: img_key.to_string(),
            sub_key: sub_key.to_string(),
            mixin_key,
            refreshed_at: Some(Instant::now()),
        })
    }
}

/// File stem of a key fragment URL: `https://.../wbi/<stem>.png` -> `<stem>`.
pub fn key_fragment(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    let base = path.rsplit('/').next().unwrap_or_default();
    base.strip_suffix(KEY_FRAGMENT_SUFFIX).unwrap_or(base)
}

/// Permute `img_key + sub_key` through the encoding table and keep at most
/// the first 32 bytes. Positions past the end of the input are skipped.
pub fn mixin_key(img_key: &str, sub_key: &str) -> String {
    let raw = [img_key.as_bytes(), sub_key.as_bytes()].concat();
    let mixed: Vec<u8> = MIXIN_KEY_ENC_TAB
        .iter()
        .filter_map(|&i| raw.get(i).copied())
        .take(MIXIN_KEY_LEN)
        .collect();
    String::from_utf8_lossy(&mixed).into_owned()
}
