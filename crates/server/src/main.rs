//! Farmvisit-rs server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use farmvisit_api::{middleware::AppState, router as api_router};
use farmvisit_common::Config;
use farmvisit_core::{
    CleanupPolicy, CleanupService, MaintenanceConfig, NotificationSettingsService,
    SubscriptionService, VapidService, spawn_maintenance,
};
use farmvisit_db::repositories::{
    NotificationSettingsRepository, PushSubscriptionRepository, UserRepository, VapidKeyRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farmvisit=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting farmvisit-rs server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = farmvisit_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    farmvisit_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    // Repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let subscription_repo = PushSubscriptionRepository::new(Arc::clone(&db));
    let vapid_repo = VapidKeyRepository::new(Arc::clone(&db));
    let settings_repo = NotificationSettingsRepository::new(Arc::clone(&db));

    // Services
    let vapid_service = VapidService::new(vapid_repo, config.push.clone());
    let subscription_service = SubscriptionService::new(subscription_repo.clone());
    let cleanup_service = CleanupService::new(
        subscription_repo.clone(),
        vapid_service.clone(),
        CleanupPolicy::from_config(&config.push),
    );
    let settings_service = NotificationSettingsService::new(settings_repo);

    // Background maintenance: periodic heuristic sweep and purge of rows
    // deactivated past the retention window.
    spawn_maintenance(
        MaintenanceConfig::from_config(&config.push),
        cleanup_service.clone(),
        subscription_repo,
    );

    let state = AppState {
        user_repo,
        vapid_service,
        subscription_service,
        cleanup_service,
        settings_service,
    };

    let app = api_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            farmvisit_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
