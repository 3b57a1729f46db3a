//! Caching proxy for Bilibili space feeds and hotlinked images.
//!
//! Feed requests are signed with the upstream WBI scheme: a mixin key is
//! derived from two fragments published by the nav endpoint, refreshed at
//! most hourly, and used to hash the sorted query string.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod janitor;
pub mod routes;
pub mod transport;
pub mod wbi;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use crate::fetch::FetchService;
use crate::wbi::KeyManager;

/// Shared application state passed to all route handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<FetchService>,
    pub keys: Arc<KeyManager>,
}
