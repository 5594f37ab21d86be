use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pluto_api::analysis::AnalysisClient;
use pluto_api::config::ServerConfig;
use pluto_api::router::build_app_router;
use pluto_api::state::AppState;
use pluto_api::storage::LocalBlobStore;
use pluto_core::workflow::AssessmentEngine;
use pluto_db::{PgIdentityDirectory, PgSubmissionStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pluto_api=debug,pluto_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = pluto_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    pluto_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    pluto_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Engine ---
    let engine = Arc::new(AssessmentEngine::new(
        Arc::new(PgSubmissionStore::new(pool.clone())),
        Arc::new(PgIdentityDirectory::new(pool.clone())),
    ));

    // --- Blob store ---
    let blobs = Arc::new(LocalBlobStore::new(config.storage_root.clone()));
    tracing::info!(root = %config.storage_root.display(), "Blob store ready");

    // --- Analysis service ---
    let analysis = match &config.analysis_service_url {
        Some(url) => {
            let client = AnalysisClient::new(url.clone()).expect("Failed to build analysis client");
            tracing::info!(%url, "Analysis service configured");
            Some(Arc::new(client))
        }
        None => {
            tracing::info!("No analysis service configured; submissions will not be analysed");
            None
        }
    };

    // --- App state ---
    let state = AppState {
        engine,
        blobs,
        analysis,
        config: Arc::new(config.clone()),
        pool: Some(pool),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.changed().await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            tracing::error!(?result, "Server exited unexpectedly");
            return;
        }
        () = shutdown_signal() => {}
    }

    // Stop accepting connections and give in-flight requests a bounded drain.
    let _ = stop_tx.send(true);
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(drain, server).await {
        Ok(Ok(Ok(()))) => tracing::info!("Server shut down cleanly"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error during shutdown"),
        Ok(Err(e)) => tracing::error!(error = %e, "Server task panicked"),
        Err(_) => tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Shutdown drain timed out; exiting with requests in flight"
        ),
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
