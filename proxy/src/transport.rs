use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use reqwest::{IntoUrl, RequestBuilder};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

use crate::wbi::tables;

/// Shared outbound HTTP client.
///
/// Holds a persistent cookie jar so cookies set by upstream (including the
/// warm-up request) and configured credentials ride along on every later
/// call, and applies one fixed timeout to every request.
#[derive(Clone)]
pub struct Transport {
    client: reqwest::Client,
    jar: Arc<Jar>,
    site_root: String,
}

impl Transport {
    pub fn new(timeout: Duration, site_root: &str) -> Result<Self, reqwest::Error> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_provider(jar.clone())
            .build()?;

        Ok(Self {
            client,
            jar,
            site_root: site_root.to_string(),
        })
    }

    pub fn site_root(&self) -> &str {
        &self.site_root
    }

    /// GET with the spoofed desktop browser user agent already set.
    pub fn get(&self, url: impl IntoUrl) -> RequestBuilder {
        self.client
            .get(url)
            .header(reqwest::header::USER_AGENT, tables::USER_AGENT)
    }

    /// Store every `name=value` pair of a cookie string in the jar for each
    /// origin, so it is sent alongside whatever upstream has set. Returns how
    /// many origins accepted the cookies.
    pub fn add_cookies(&self, cookie: &str, origins: &[&str]) -> usize {
        let pairs: Vec<&str> = cookie
            .split(';')
            .map(str::trim)
            .filter(|p| p.contains('='))
            .collect();

        let mut added = 0;
        for origin in origins {
            let Ok(url) = Url::parse(origin) else {
                warn!("Skipping credentials for invalid origin {}", origin);
                continue;
            };
            for pair in &pairs {
                self.jar.add_cookie_str(&format!("{pair}; Path=/"), &url);
            }
            added += 1;
        }
        added
    }

    /// Fire-and-forget request to the site root to seed the cookie jar.
    ///
    /// The outcome is only logged. Must be called from within a tokio runtime.
    pub fn spawn_warmup(&self) -> JoinHandle<()> {
        let transport = self.clone();
        tokio::spawn(async move {
            match transport.get(transport.site_root()).send().await {
                Ok(resp) => info!("Initialized upstream cookies ({})", resp.status()),
                Err(e) => warn!("Failed to init upstream cookies: {}", e),
            }
        })
    }
}

/// Headers a browser sends when the space page loads its dynamic feed.
pub fn feed_headers(referer: &str, origin: &str) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    headers.insert(REFERER, header_value(referer)?);
    headers.insert(ORIGIN, header_value(origin)?);
    headers.insert(ACCEPT, HeaderValue::from_static(tables::ACCEPT_JSON));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(tables::ACCEPT_LANGUAGE));
    Ok(headers)
}

/// Combine the configured credentials into one cookie string.
///
/// The raw cookie string is kept verbatim. A session token is prepended as
/// `SESSDATA=...` unless the raw string already carries one.
pub fn session_cookie(sessdata: Option<&str>, raw: Option<&str>) -> Option<String> {
    let session = sessdata.map(|s| format!("{}={}", tables::SESSION_COOKIE, s));
    match (session, raw) {
        (None, None) => None,
        (Some(s), None) => Some(s),
        (None, Some(r)) => Some(r.to_string()),
        (Some(s), Some(r)) => {
            let prefix = format!("{}=", tables::SESSION_COOKIE);
            if r.split(';').any(|part| part.trim_start().starts_with(&prefix)) {
                Some(r.to_string())
            } else {
                Some(format!("{s}; {r}"))
            }
        }
    }
}

fn header_value(v: &str) -> Result<HeaderValue, String> {
    HeaderValue::from_str(v).map_err(|_| format!("invalid header value: {v:?}"))
}
