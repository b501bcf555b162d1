use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wellbeing_dashboard::{handlers, seed, startup, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with conditional JSON/text output
    let use_json = std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| "text".to_string()) == "json";

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,wellbeing_dashboard=debug,tower_http=debug".into());

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        // Human-readable for development
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {}", e);
        e
    })?;

    // Open the configured store
    let (store, sheets) = startup::build_store(&config).await.map_err(|e| {
        tracing::error!(backend = %config.store_backend, "Failed to open store: {}", e);
        e
    })?;
    tracing::info!(backend = %store.backend(), "Store ready");

    // Provision accounts from the seed file
    if let Some(path) = &config.seed_users_path {
        let users = seed::load_seed_file(path).await?;
        let report = seed::seed_users(store.as_ref(), users).await?;
        tracing::info!(created = report.created, skipped = report.skipped, "Seed users processed");
    }

    // Initialize metrics recorder
    let metrics_state = Arc::new(handlers::setup_metrics_recorder()?);
    tracing::info!("Metrics recorder initialized");

    let bind_addr = config.bind_addr.clone();

    // Create application state
    let state = Arc::new(AppState {
        store,
        sheets,
        config,
        metrics: metrics_state,
    });

    // Build router
    let app = startup::build_router(state);

    // Start server
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
