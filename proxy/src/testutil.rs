//! In-process stand-in for the upstream API, image host and site root.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::config::Endpoints;
use crate::transport::Transport;

/// Published WBI example fragments and their derived mixin key.
pub const IMG_KEY: &str = "7cd084941338484aae1ad9425b84077c";
pub const SUB_KEY: &str = "4932caff0ff746eab6f01bf08b70ac45";
pub const MIXIN_KEY: &str = "ea1db124af3c7062474693fa704f4ff8";

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake";

#[derive(Clone)]
pub struct MockState {
    pub nav_calls: Arc<AtomicUsize>,
    pub feed_calls: Arc<AtomicUsize>,
    pub image_calls: Arc<AtomicUsize>,
    pub root_calls: Arc<AtomicUsize>,
    pub nav_status: Arc<AtomicU16>,
    pub nav_delay_ms: Arc<AtomicU64>,
    pub nav_empty: Arc<AtomicBool>,
    pub nav_garbled: Arc<AtomicBool>,
    /// Replaces the published fragments when set.
    pub nav_fragments: Arc<Mutex<Option<(String, String)>>>,
    pub feed_delay_ms: Arc<AtomicU64>,
    pub feed_code: Arc<AtomicI64>,
    pub feed_status: Arc<AtomicU16>,
    pub feed_garbled: Arc<AtomicBool>,
    pub last_feed_query: Arc<Mutex<Option<String>>>,
    pub last_feed_headers: Arc<Mutex<Option<HeaderMap>>>,
    pub last_image_headers: Arc<Mutex<Option<HeaderMap>>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            nav_calls: Arc::default(),
            feed_calls: Arc::default(),
            image_calls: Arc::default(),
            root_calls: Arc::default(),
            nav_status: Arc::new(AtomicU16::new(200)),
            nav_delay_ms: Arc::default(),
            nav_empty: Arc::default(),
            nav_garbled: Arc::default(),
            nav_fragments: Arc::default(),
            feed_delay_ms: Arc::default(),
            feed_code: Arc::default(),
            feed_status: Arc::new(AtomicU16::new(200)),
            feed_garbled: Arc::default(),
            last_feed_query: Arc::default(),
            last_feed_headers: Arc::default(),
            last_image_headers: Arc::default(),
        }
    }
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    pub state: MockState,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/", get(root))
            .route("/x/web-interface/nav", get(nav))
            .route("/x/polymer/web-dynamic/v1/feed/space", get(feed))
            .route("/img/pic.png", get(image))
            .route("/img/missing.png", get(|| async { StatusCode::NOT_FOUND }))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn endpoints(&self) -> Endpoints {
        let base = self.base();
        Endpoints::new(&base, &format!("{base}/"), &format!("{base}/space"))
    }

    pub fn transport(&self) -> Transport {
        Transport::new(Duration::from_secs(5), &self.endpoints().site_root).unwrap()
    }

    pub fn image_url(&self) -> String {
        format!("{}/img/pic.png", self.base())
    }
}

async fn root(State(s): State<MockState>) -> impl IntoResponse {
    s.root_calls.fetch_add(1, Ordering::SeqCst);
    ([(header::SET_COOKIE, "buvid3=warm; Path=/")], "ok")
}

async fn nav(State(s): State<MockState>) -> Response {
    s.nav_calls.fetch_add(1, Ordering::SeqCst);

    let delay = s.nav_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let status = StatusCode::from_u16(s.nav_status.load(Ordering::SeqCst)).unwrap();
    if status != StatusCode::OK {
        return (status, "nope").into_response();
    }
    if s.nav_garbled.load(Ordering::SeqCst) {
        return (StatusCode::OK, "{\"code\":-101,\"data\":{\"wbi_").into_response();
    }

    let fragments = s.nav_fragments.lock().unwrap().clone();
    let (img, sub) = if s.nav_empty.load(Ordering::SeqCst) {
        (String::new(), String::new())
    } else if let Some((img, sub)) = fragments {
        (
            format!("https://i0.hdslb.com/bfs/wbi/{img}.png"),
            format!("https://i0.hdslb.com/bfs/wbi/{sub}.png"),
        )
    } else {
        (
            format!("https://i0.hdslb.com/bfs/wbi/{IMG_KEY}.png"),
            format!("https://i0.hdslb.com/bfs/wbi/{SUB_KEY}.png"),
        )
    };

    // Unauthenticated nav answers -101 but still publishes the key fragments.
    Json(json!({
        "code": -101,
        "message": "账号未登录",
        "data": { "isLogin": false, "wbi_img": { "img_url": img, "sub_url": sub } }
    }))
    .into_response()
}

async fn feed(State(s): State<MockState>, RawQuery(q): RawQuery, headers: HeaderMap) -> Response {
    s.feed_calls.fetch_add(1, Ordering::SeqCst);
    *s.last_feed_query.lock().unwrap() = q;
    *s.last_feed_headers.lock().unwrap() = Some(headers);

    let delay = s.feed_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let status = StatusCode::from_u16(s.feed_status.load(Ordering::SeqCst)).unwrap();
    if s.feed_garbled.load(Ordering::SeqCst) {
        return (status, "{\"code\":0,\"data\":{\"ite").into_response();
    }

    let code = s.feed_code.load(Ordering::SeqCst);
    let message = if code == 0 { "0" } else { "风控校验失败" };
    let body = json!({
        "code": code,
        "message": message,
        "ttl": 1,
        "data": { "has_more": false, "items": [] }
    });
    (status, Json(body)).into_response()
}

async fn image(State(s): State<MockState>, headers: HeaderMap) -> impl IntoResponse {
    s.image_calls.fetch_add(1, Ordering::SeqCst);
    *s.last_image_headers.lock().unwrap() = Some(headers);
    ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES)
}

/// Every `name=value` pair across the request's `Cookie` headers.
pub fn cookie_pairs(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}
