use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use wbi_proxy::cache::MemoryCache;
use wbi_proxy::config::ProxyConfig;
use wbi_proxy::fetch::FetchService;
use wbi_proxy::transport::Transport;
use wbi_proxy::wbi::KeyManager;
use wbi_proxy::{janitor, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignored in production where env vars are set externally)
    let _ = dotenvy::dotenv();

    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ProxyConfig::from_env()?;
    info!(
        "Configuration loaded (port={}, sessdata={}, cookie={})",
        config.port,
        config.sessdata.is_some(),
        config.cookie.is_some()
    );

    let transport = Transport::new(config.upstream_timeout, &config.endpoints.site_root)
        .context("Failed to build HTTP client")?;
    if config.warmup_cookies {
        transport.spawn_warmup();
    }

    let keys = Arc::new(
        KeyManager::new(transport.clone(), &config.endpoints.nav_url())
            .with_ttl(config.key_ttl)
            .with_refresh_backoff(config.refresh_backoff),
    );

    let cache = MemoryCache::new(config.feed_cache_ttl, config.image_cache_ttl);
    let fetcher = FetchService::new(
        transport,
        keys.clone(),
        Arc::new(cache.clone()),
        config.endpoints.clone(),
    )
    .with_credentials(config.sessdata.as_deref(), config.cookie.as_deref());

    let state = AppState {
        fetcher: Arc::new(fetcher),
        keys,
    };
    let app = routes::build_router(state);

    tokio::spawn(janitor::run_janitor(cache, config.cache_sweep_interval));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("WBI proxy v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);
    info!("Routes:");
    info!("  GET  /api/health");
    info!("  GET  /api/bilibili/dynamic/:uid  (alias /feed/:uid)");
    info!("  GET  /api/bilibili/image?url=    (alias /image?url=)");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
