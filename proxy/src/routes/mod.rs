pub mod feed;
pub mod health;
pub mod image;

use axum::http::HeaderName;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::AppState;

/// `HIT` when a response was served from cache, `MISS` otherwise.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

pub fn cache_label(cached: bool) -> &'static str {
    if cached {
        "HIT"
    } else {
        "MISS"
    }
}

pub fn build_router(state: AppState) -> Router {
    // CORS layer: allow requests from any origin (public API)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/bilibili/dynamic/", get(feed::missing_uid))
        .route("/api/bilibili/dynamic/:uid", get(feed::get_feed))
        .route("/feed/", get(feed::missing_uid))
        .route("/feed/:uid", get(feed::get_feed))
        .route("/api/bilibili/image", get(image::get_image))
        .route("/image", get(image::get_image))
        .layer(cors)
        .with_state(state)
}
