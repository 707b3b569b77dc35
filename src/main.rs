use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use void_relay::adapters::auth::JwtSessionValidator;
use void_relay::adapters::http::{build_router, AuthState, EventsAppState};
use void_relay::adapters::push::{ChannelLifecycle, ConnectionRegistry, EventBroadcaster};
use void_relay::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))?;
    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }

    tracing::info!(
        environment = ?config.server.environment,
        "void-relay v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let registry = Arc::new(ConnectionRegistry::new());
    let broadcaster = EventBroadcaster::new_shared(Arc::clone(&registry));
    let lifecycle = ChannelLifecycle::from_config(
        Arc::clone(&registry),
        Arc::clone(&broadcaster),
        &config.push,
    );

    let validator = Arc::new(JwtSessionValidator::from_config(&config.auth));
    let state = EventsAppState {
        lifecycle,
        publisher: broadcaster,
        connections: registry.clone(),
    };
    let app = build_router(state, AuthState::new(validator), &config.server.cors_origins_list());

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;

    tracing::info!("Shut down");
    Ok(())
}

/// Waits for ctrl-c, then ends every push stream so open responses can finish.
async fn shutdown_signal(registry: Arc<ConnectionRegistry>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    let closed = registry.close_all();
    tracing::info!(closed, "Shutdown signal received, push channels closed");
}
