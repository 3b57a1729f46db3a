//! Error taxonomy for the signing client and the two fetch operations.
//!
//! Each failure carries the HTTP status class the proxy reports to its own
//! caller; none of them are retried internally.

use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Refreshing WBI key material from the bootstrap endpoint failed.
///
/// Existing key material is left untouched whenever one of these is returned.
#[derive(Debug, Error)]
pub enum KeyRefreshError {
    #[error("nav request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("nav api status: {0}")]
    Status(StatusCode),

    #[error("nav response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("empty wbi key fragment in nav response")]
    EmptyFragment,

    #[error("non-ascii wbi key fragment in nav response")]
    NonAsciiFragment,

    #[error("mixin key has wrong length: got {0} bytes, need 32")]
    MixinKeyLength(usize),

    /// A refresh failed recently; the bootstrap endpoint is not contacted again
    /// until the backoff window passes.
    #[error("key refresh backing off for another {0:?}")]
    BackingOff(Duration),
}

/// Signing has no failure mode of its own beyond obtaining keys.
#[derive(Debug, Error)]
pub enum SignError {
    #[error(transparent)]
    KeyRefresh(#[from] KeyRefreshError),
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// Caller input rejected before any upstream call.
    #[error("{0}")]
    Validation(String),

    #[error("WBI sign error: {0}")]
    Signing(#[from] SignError),

    #[error("request creation error: {0}")]
    Request(String),

    /// The upstream host could not be reached or timed out.
    #[error("upstream error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Connected, but the body could not be read to the end.
    #[error("failed to read upstream response: {0}")]
    Read(#[source] reqwest::Error),
}

impl FetchError {
    /// Status class reported to the proxy's caller.
    pub fn status(&self) -> StatusCode {
        match self {
            FetchError::Validation(_) => StatusCode::BAD_REQUEST,
            FetchError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FetchError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FetchError::Transport(_) => StatusCode::BAD_GATEWAY,
            FetchError::Read(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
