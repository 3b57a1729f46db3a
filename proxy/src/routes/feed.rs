use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::routes::{cache_label, X_CACHE};
use crate::AppState;

/// GET /api/bilibili/dynamic/:uid
///
/// Proxies the user's space feed. The upstream status and body are passed
/// through unchanged, including business-level failures.
pub async fn get_feed(State(state): State<AppState>, Path(uid): Path<String>) -> Response {
    match state.fetcher.fetch_feed(&uid).await {
        Ok(feed) => (
            feed.status,
            [
                (header::CONTENT_TYPE, "application/json"),
                (X_CACHE, cache_label(feed.cached)),
            ],
            feed.body,
        )
            .into_response(),
        Err(e) => {
            warn!("Feed fetch failed for uid={}: {}", uid, e);
            (e.status(), e.to_string()).into_response()
        }
    }
}

pub async fn missing_uid() -> impl IntoResponse {
    (StatusCode::BAD_REQUEST, "Empty UID")
}
