//! Atelier server.
//!
//! Loads configuration, connects the content store, seeds the catalog if
//! asked to, and serves the HTTP API and Prometheus metrics until Ctrl+C or
//! SIGTERM.

use anyhow::Context;
use atelier_core::environment::SystemClock;
use atelier_core::{ContentStore, Coordinator};
use atelier_postgres::PostgresContentStore;
use atelier_stripe::StripeClient;
use atelier_testing::InMemoryContentStore;
use atelier_web::{AppState, Config, StoreBackend, build_router, metrics, seed};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,atelier=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Atelier server");

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        store = ?config.store.backend,
        stripe_api = %config.stripe.api_url,
        "Configuration loaded"
    );

    // Initialize Prometheus metrics exporter
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    metrics::register_business_metrics();

    // Content store
    let store: Arc<dyn ContentStore> = match config.store.backend {
        StoreBackend::Postgres => {
            info!(
                "Connecting to PostgreSQL: {}",
                config
                    .store
                    .database_url
                    .split('@')
                    .next_back()
                    .unwrap_or("unknown")
            );
            let postgres = PostgresContentStore::connect(
                &config.store.database_url,
                config.store.max_connections,
                Duration::from_secs(config.store.connect_timeout),
            )
            .await
            .context("Failed to connect to PostgreSQL")?;
            postgres.migrate().await.context("Failed to run migrations")?;
            info!("PostgreSQL connected, migrations complete");
            Arc::new(postgres)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory content store; sales are lost on restart");
            Arc::new(InMemoryContentStore::new())
        }
    };

    if let Some(path) = &config.store.seed_path {
        seed::seed_catalog(store.as_ref(), path)
            .await
            .context("Failed to seed catalog")?;
    }

    // Payment provider
    let stripe = StripeClient::new(config.stripe.client_config())
        .context("Failed to create Stripe client")?;

    let coordinator = Coordinator::new(store, Arc::new(stripe), Arc::new(SystemClock));
    let app = build_router(
        AppState::new(coordinator),
        &config.server.cors_allowed_origins,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // HTTP server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid HOST/PORT")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let server_shutdown = wait_for_shutdown(shutdown_rx.clone());
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown)
            .await
    });

    // Metrics server
    let metrics_addr: SocketAddr = format!(
        "{}:{}",
        config.server.metrics_host, config.server.metrics_port
    )
    .parse()
    .context("Invalid METRICS_HOST/METRICS_PORT")?;
    let metrics_app = axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr).await?;
    info!("Prometheus metrics available at http://{}/metrics", metrics_addr);

    let metrics_handle = tokio::spawn(async move {
        axum::serve(metrics_listener, metrics_app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    let timeout = Duration::from_secs(config.server.shutdown_timeout);
    for (name, handle) in [("HTTP", server_handle), ("Metrics", metrics_handle)] {
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(Ok(()))) => info!("{} server stopped", name),
            Ok(Ok(Err(e))) => error!("{} server error: {}", name, e),
            Ok(Err(e)) => warn!("{} server task error during shutdown: {}", name, e),
            Err(_) => warn!(
                "{} server did not stop within {}s, exiting anyway",
                name,
                timeout.as_secs()
            ),
        }
    }

    info!("Shutdown complete");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Unable to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Unable to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
