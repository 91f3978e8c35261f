//! Matrix Registration Proxy - Entry point.

use matrix_registration_proxy::{
    api::{create_router, AppState},
    config::Config,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Matrix Registration Proxy");
    info!(homeserver = %config.homeserver_url, "Forwarding to homeserver");

    let state = match AppState::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create homeserver clients: {}", e);
            std::process::exit(1);
        }
    };

    let app = create_router(state);

    // Bind to address
    let addr = match config.server.listen_addr.parse() {
        Ok(ip) => SocketAddr::new(ip, config.server.port),
        Err(e) => {
            error!("Invalid listen address {}: {}", config.server.listen_addr, e);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Run server
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
