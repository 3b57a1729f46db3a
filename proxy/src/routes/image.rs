use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::warn;

use crate::routes::{cache_label, X_CACHE};
use crate::AppState;

/// Images are immutable once published upstream.
const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000";

#[derive(Deserialize)]
pub struct ImageQuery {
    pub url: Option<String>,
}

/// GET /api/bilibili/image?url=...
///
/// Fetches a hotlink-protected image with a site referer and returns it
/// with a long-lived public cache header.
pub async fn get_image(State(state): State<AppState>, Query(q): Query<ImageQuery>) -> Response {
    let Some(url) = q.url.filter(|u| !u.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing url parameter").into_response();
    };

    match state.fetcher.fetch_image(&url).await {
        Ok(img) => {
            let content_type = HeaderValue::from_str(&img.content_type)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(HeaderValue::from_static("application/octet-stream"));

            let mut resp = (img.status, img.body).into_response();
            let headers = resp.headers_mut();
            headers.insert(header::CONTENT_TYPE, content_type);
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(IMAGE_CACHE_CONTROL));
            headers.insert(X_CACHE, HeaderValue::from_static(cache_label(img.cached)));
            resp
        }
        Err(e) => {
            warn!("Image fetch failed for {}: {}", url, e);
            (e.status(), e.to_string()).into_response()
        }
    }
}
