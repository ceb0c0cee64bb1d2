//! Duckgate binary - wires configuration, the upstream client, and the HTTP
//! surface together and serves until the process exits.

use std::sync::Arc;
use std::time::Duration;

use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use duckgate::adapters::http::{gateway_router, GatewayState};
use duckgate::adapters::upstream::DuckDuckGoBackend;
use duckgate::application::{ChatService, SessionRegistry};
use duckgate::config::AppConfig;
use duckgate::ports::ChatBackend;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    let backend: Arc<dyn ChatBackend> = Arc::new(DuckDuckGoBackend::new(config.upstream.clone()));
    let registry = Arc::new(SessionRegistry::new(Arc::clone(&backend)));
    let chat = Arc::new(ChatService::new(Arc::clone(&registry), backend));

    // Bound memory held by clients that never delete their session.
    let max_idle = config.sessions.max_idle();
    let sweep_interval = config.sessions.sweep_interval();
    let sweeper = Arc::clone(&registry);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            sweeper.evict_idle(max_idle).await;
        }
    });

    let app = gateway_router(GatewayState { chat })
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, upstream = %config.upstream.base_url, "duckgate listening");
    axum::serve(listener, app).await?;

    Ok(())
}
