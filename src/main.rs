use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenv::dotenv;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wikiwalk::api::{self, AppState};
use wikiwalk::services::{LinkSourceConfig, LinkSourceFactory, RunController, WalkConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wikiwalk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting wikiwalk...");

    let walk_config = WalkConfig::from_env();
    if let Err(e) = walk_config.validate() {
        return Err(anyhow::anyhow!("Invalid walk configuration: {}", e));
    }
    if walk_config.is_experimental() {
        warn!(
            "Branch factor {} is experimental and may be slow",
            walk_config.branch_factor
        );
    }

    let source_config = LinkSourceConfig::from_env();
    info!("Link source: {} ({})", source_config.provider, source_config.api_base);
    let source = LinkSourceFactory::create(source_config)?;

    let controller = RunController::new(source, walk_config);
    let state = Arc::new(AppState {
        controller: controller.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    let app = api::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("SERVER_PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("wikiwalk API server starting on http://{}", addr);
    api::print_routes();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    controller.pause().await;
    info!("wikiwalk shut down gracefully");

    Ok(())
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received...");
}
