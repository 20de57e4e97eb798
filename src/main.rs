//! Storefront Pilot billing service entrypoint.
//!
//! Wires configuration, the Postgres-backed billing store, the Paddle
//! client, and the HTTP router together, and spawns the background
//! expiry sweep loop.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use storefront_pilot::adapters::http::{billing_router, BillingAppState};
use storefront_pilot::adapters::paddle::{PaddleClient, PaddleConfig};
use storefront_pilot::adapters::postgres::PostgresBillingStore;
use storefront_pilot::config::AppConfig;
use storefront_pilot::domain::billing::{ExpirySweeper, PaddleWebhookVerifier, Reconciler};
use storefront_pilot::domain::foundation::Timestamp;
use storefront_pilot::ports::{BillingProvider, BillingStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    config.validate()?;

    // RUST_LOG overrides the configured default filter.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let store: Arc<dyn BillingStore> = Arc::new(PostgresBillingStore::new(pool));

    let mut paddle_config = PaddleConfig::new(config.payment.paddle_api_key.clone());
    if let Some(base_url) = &config.payment.paddle_api_base_url {
        paddle_config = paddle_config.with_base_url(base_url.clone());
    }
    let provider: Arc<dyn BillingProvider> = Arc::new(PaddleClient::new(paddle_config));

    let reconciler = Arc::new(Reconciler::new(store.clone()));
    let sweeper = Arc::new(ExpirySweeper::new(store.clone(), config.sweeper.batch_size));

    spawn_sweep_loop(sweeper.clone(), config.sweeper.interval());

    let state = BillingAppState {
        store,
        provider,
        reconciler,
        sweeper,
        webhook_verifier: PaddleWebhookVerifier::new(config.payment.paddle_webhook_secret.clone()),
    };

    let app = Router::new()
        .nest("/api", billing_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config))
        .with_state(state);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Billing service listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically downgrade expired paid memberships.
fn spawn_sweep_loop(sweeper: Arc<ExpirySweeper>, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately; catch up on anything that
        // expired while the service was down.
        loop {
            ticker.tick().await;
            match sweeper.sweep(Timestamp::now()).await {
                Ok(report) => {
                    if report.downgraded > 0 || report.skipped > 0 {
                        info!(
                            downgraded = report.downgraded,
                            skipped = report.skipped,
                            "Expiry sweep pass complete"
                        );
                    }
                }
                Err(e) => error!(error = %e, "Expiry sweep pass failed"),
            }
        }
    });
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any)
    }
}
