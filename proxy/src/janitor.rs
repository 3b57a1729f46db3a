use std::time::Duration;
use tracing::{debug, info};

use crate::cache::MemoryCache;

/// Background task that periodically evicts expired cache entries so that
/// uids and image URLs nobody asks for again do not pile up in memory.
pub async fn run_janitor(cache: MemoryCache, interval: Duration) {
    info!("Cache janitor started (interval: {}s)", interval.as_secs());

    loop {
        tokio::time::sleep(interval).await;

        let removed = cache.purge_expired();
        if removed > 0 {
            info!("Evicted {} expired cache entries ({} remain)", removed, cache.len());
        } else {
            debug!("Cache sweep: nothing expired ({} entries)", cache.len());
        }
    }
}
