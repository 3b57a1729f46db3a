//! Cache-aside fetches of space feeds and hotlinked images.
//!
//! ```text
//! fetch_feed(uid)  -> cache hit? return
//!                  -> sign fixed params -> GET feed endpoint
//!                  -> cache only if HTTP 200 and body `code == 0`
//! fetch_image(url) -> cache hit? return
//!                  -> GET url -> cache only if HTTP 200
//! ```
//!
//! Every upstream request is made once. Failures go straight back to the caller.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::cache::ProxyCache;
use crate::config::Endpoints;
use crate::error::FetchError;
use crate::transport::{self, Transport};
use crate::wbi::tables::{FEED_STATIC_PARAMS, FEED_SUBJECT_PARAM};
use crate::wbi::{KeyManager, Params, WbiSigner};

/// A feed body as returned by upstream, or from cache.
#[derive(Debug, Clone)]
pub struct FeedResponse {
    pub body: Bytes,
    pub status: StatusCode,
    pub cached: bool,
}

#[derive(Debug, Clone)]
pub struct ImageResponse {
    pub body: Bytes,
    pub content_type: String,
    pub status: StatusCode,
    pub cached: bool,
}

pub struct FetchService {
    transport: Transport,
    signer: WbiSigner,
    cache: Arc<dyn ProxyCache>,
    endpoints: Endpoints,
}

impl FetchService {
    pub fn new(
        transport: Transport,
        keys: Arc<KeyManager>,
        cache: Arc<dyn ProxyCache>,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            transport,
            signer: WbiSigner::new(keys),
            cache,
            endpoints,
        }
    }

    /// Add session credentials to the shared cookie jar for the upstream
    /// API, space and site origins. They are sent next to any cookies
    /// upstream has set, never instead of them.
    pub fn with_credentials(self, sessdata: Option<&str>, cookie: Option<&str>) -> Self {
        if let Some(cookie) = transport::session_cookie(sessdata, cookie) {
            let origins = [
                self.endpoints.api_base.as_str(),
                self.endpoints.space_base.as_str(),
                self.endpoints.site_root.as_str(),
            ];
            self.transport.add_cookies(&cookie, &origins);
        }
        self
    }

    pub async fn fetch_feed(&self, uid: &str) -> Result<FeedResponse, FetchError> {
        validate_uid(uid)?;

        if let Some(body) = self.cache.get_feed(uid) {
            debug!("Feed cache hit uid={}", uid);
            return Ok(FeedResponse {
                body,
                status: StatusCode::OK,
                cached: true,
            });
        }

        let signed = self.signer.sign(feed_params(uid)).await?;
        let url = format!("{}?{}", self.endpoints.feed_url(), signed.query());

        let headers =
            transport::feed_headers(&self.endpoints.feed_referer(uid), &self.endpoints.space_base)
                .map_err(FetchError::Request)?;

        let resp = self
            .transport
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(send_error)?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(FetchError::Read)?;

        if status == StatusCode::OK && is_business_success(&body) {
            self.cache.set_feed(uid, body.clone());
        } else {
            warn!("Feed for uid={} not cached (status {})", uid, status);
        }

        Ok(FeedResponse {
            body,
            status,
            cached: false,
        })
    }

    pub async fn fetch_image(&self, raw_url: &str) -> Result<ImageResponse, FetchError> {
        let url = parse_image_url(raw_url)?;
        let key = url.as_str().to_string();

        if let Some((body, content_type)) = self.cache.get_image(&key) {
            debug!("Image cache hit {}", key);
            return Ok(ImageResponse {
                body,
                content_type,
                status: StatusCode::OK,
                cached: true,
            });
        }

        let resp = self
            .transport
            .get(url)
            .header(REFERER, self.transport.site_root())
            .send()
            .await
            .map_err(send_error)?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = resp.bytes().await.map_err(FetchError::Read)?;

        if status == StatusCode::OK {
            self.cache.set_image(&key, body.clone(), &content_type);
        } else {
            warn!("Image {} returned {}", key, status);
        }

        Ok(ImageResponse {
            body,
            content_type,
            status,
            cached: false,
        })
    }
}

fn feed_params(uid: &str) -> Params {
    let mut params: Params = FEED_STATIC_PARAMS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    params.insert(FEED_SUBJECT_PARAM.to_string(), uid.to_string());
    params
}

fn validate_uid(uid: &str) -> Result<(), FetchError> {
    if uid.is_empty() {
        return Err(FetchError::Validation("Empty UID".into()));
    }
    if !uid.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FetchError::Validation(format!("Invalid UID: {uid}")));
    }
    Ok(())
}

/// Absolute http(s) URL with a host, normalized.
fn parse_image_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|_| FetchError::Validation("Invalid URL".into()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(FetchError::Validation("Invalid URL".into()));
    }
    Ok(url)
}

/// HTTP 200 alone is not success: rate-limited and private-space replies
/// carry a non-zero `code`. Unparseable bodies count as failures.
fn is_business_success(body: &[u8]) -> bool {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("code").and_then(Value::as_f64))
        == Some(0.0)
}

fn send_error(e: reqwest::Error) -> FetchError {
    if e.is_builder() {
        FetchError::Request(e.to_string())
    } else {
        FetchError::Transport(e)
    }
}
