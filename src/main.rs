//! parley-gateway server entry point.
//!
//! Loads configuration, connects the shared store, bus and database, starts
//! bus dispatch and serves the REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use parley_gateway::app_state::AppState;
use parley_gateway::build_app;
use parley_gateway::bus::{MemoryBus, MessageBus, RedisBus};
use parley_gateway::config::{GatewayConfig, LogFormat, StoreBackend};
use parley_gateway::persistence::postgres::PostgresDomain;
use parley_gateway::persistence::{MemoryStore, RedisStore, SharedStore};
use parley_gateway::service::JwtVerifier;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, backend = ?config.store_backend, "starting parley-gateway");

    let (store, bus): (Arc<dyn SharedStore>, Arc<dyn MessageBus>) = match config.store_backend {
        StoreBackend::Redis => {
            let client = redis::Client::open(config.redis_url.as_str())
                .context("invalid REDIS_URL")?;
            let store = RedisStore::connect(client.clone())
                .await
                .context("connecting session store")?;
            let bus = RedisBus::connect(client, config.bus_channel_prefix.clone())
                .await
                .context("connecting message bus")?;
            (Arc::new(store), Arc::new(bus))
        }
        StoreBackend::Memory => {
            tracing::warn!("in-memory backend: sessions and events stay inside this process");
            (
                Arc::new(MemoryStore::new()),
                Arc::new(MemoryBus::new(config.event_bus_capacity)),
            )
        }
    };

    let domain = PostgresDomain::connect(&config)
        .await
        .context("connecting business database")?;
    let verifier = JwtVerifier::new(&config.jwt_secret);

    let listen_addr = config.listen_addr;
    let state = AppState::new(config, store, bus, Arc::new(domain), Arc::new(verifier));
    let _dispatch = state
        .start_dispatch()
        .await
        .context("subscribing to the message bus")?;

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    tracing::info!(addr = %listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
