use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::services::{
    AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore,
};
use cache_cell::{MemoryResponseCache, RedisResponseCache, ResponseCache};
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting appointment API server");

    let config = Arc::new(AppConfig::from_env());
    let store = build_store(&config);
    let cache = build_cache(&config).await;

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(config.clone(), store, cache)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn build_store(config: &AppConfig) -> Arc<dyn AppointmentStore> {
    if config.is_configured() {
        info!("Using Supabase appointment store at {}", config.supabase_url);
        Arc::new(SupabaseAppointmentStore::new(config))
    } else {
        warn!("Supabase not configured, appointments are kept in memory");
        Arc::new(InMemoryAppointmentStore::new())
    }
}

async fn build_cache(config: &AppConfig) -> Arc<dyn ResponseCache> {
    let Some(redis_url) = config.redis_url.as_deref() else {
        info!("REDIS_URL not set, using in-process response cache");
        return Arc::new(MemoryResponseCache::new());
    };

    match RedisResponseCache::new(redis_url).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            warn!("Redis unavailable ({}), using in-process response cache", e);
            Arc::new(MemoryResponseCache::new())
        }
    }
}
