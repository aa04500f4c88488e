//! HTTP collaborators: bulk place fetch, geocoding and the streaming push transport

pub mod geocoding;
pub mod places;
pub mod push;

use once_cell::sync::Lazy;

use crate::core::constants::{DEFAULT_REQUEST_TIMEOUT_MS, USER_AGENT};
use crate::Result;

/// Shared async HTTP client for request/response calls
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    request_client(DEFAULT_REQUEST_TIMEOUT_MS).unwrap_or_else(|e| {
        log::warn!("Falling back to default HTTP client: {}", e);
        reqwest::Client::new()
    })
});

/// Client for request/response calls, bounded by a total timeout
pub fn request_client(timeout_ms: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_millis(timeout_ms))
        .tcp_keepalive(std::time::Duration::from_secs(30))
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .build()?)
}

/// Client for long-lived streams; only connecting is bounded
pub fn streaming_client(connect_timeout_ms: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(std::time::Duration::from_millis(connect_timeout_ms))
        .tcp_keepalive(std::time::Duration::from_secs(30))
        .build()?)
}
