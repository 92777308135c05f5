//! FieldOps server
//!
//! Serves the REST API, health and metrics endpoints and uploaded files.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fo_api::AppState;
use fo_attachments::{LocalStorage, Storage};
use fo_core::config::{AppConfig, DatabaseBackend};
use fo_db::{Database, DatabaseConfig, Stores};
use fo_services::Seeder;

mod health;
mod metrics;

use health::{HealthChecker, HealthConfig, HealthState};
use metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::load().context("Failed to load configuration")?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "Starting FieldOps"
    );

    let (stores, database) = connect_stores(&config).await?;
    bootstrap(&stores, &config).await?;

    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(
        &config.storage.root,
        config.storage.public_url.clone(),
    ));

    let mut checker = HealthChecker::new(HealthConfig::default()).with_storage_root(&config.storage.root);
    if let Some(database) = &database {
        checker = checker.with_database(database.clone());
    }

    let addr = config.server_addr();
    let state = AppState::new(config, stores, storage);
    let metrics = Arc::new(Metrics::new(state.hub.clone()));
    let health = HealthState {
        health: Arc::new(checker),
    };
    let shutdown = state.shutdown.clone();

    let app = build_router(state, health, metrics);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Ends open notification streams so the server can drain
            shutdown.cancel();
        })
        .await?;

    if let Some(database) = database {
        database.close().await;
    }
    info!("Server shutdown complete");
    Ok(())
}

/// `FO_LOG_FORMAT=json` switches to one JSON object per line
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,fo_server=debug,fo_api=debug,tower_http=debug".into());
    let json = std::env::var("FO_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

/// Postgres when configured and reachable, memory otherwise
async fn connect_stores(config: &AppConfig) -> anyhow::Result<(Stores, Option<Database>)> {
    if config.database.backend == DatabaseBackend::Memory {
        warn!("Using the in-memory store; data is lost on restart");
        return Ok((Stores::memory(), None));
    }

    let database = match Database::connect(&DatabaseConfig::from(&config.database)).await {
        Ok(database) => database,
        Err(e) => {
            warn!(error = %e, "Failed to connect to database, falling back to the in-memory store");
            return Ok((Stores::memory(), None));
        }
    };
    info!("Connected to database");

    if config.database.run_migrations {
        database.migrate().await.context("Failed to run migrations")?;
    }
    Ok((Stores::postgres(database.pool().clone()), Some(database)))
}

/// Seeds reference data and the first administrator
async fn bootstrap(stores: &Stores, config: &AppConfig) -> anyhow::Result<()> {
    let seeder = Seeder::new(stores.clone());
    let report = seeder.run().await.context("Failed to seed reference data")?;
    info!(
        permissions = report.permissions,
        roles = report.roles_created,
        lookups = report.lookups_created,
        "Reference data ready"
    );

    if let Some(password) = &config.auth.bootstrap_admin_password {
        if let Some(admin) = seeder
            .ensure_admin(password)
            .await
            .context("Failed to create the administrator")?
        {
            info!(user_id = admin.id, username = %admin.username, "Administrator created");
        }
    }
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

fn build_router(state: AppState, health: HealthState, metrics: Arc<Metrics>) -> Router {
    let body_limit = state.config.server.max_body_size_bytes;
    let cors = cors_layer(&state.config.server.cors_allowed_origins);
    let uploads = ServeDir::new(&state.config.storage.root);

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(health);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/metrics.json", get(metrics::json_metrics))
        .with_state(metrics.clone());

    Router::new()
        .merge(health_routes)
        .merge(metrics_routes)
        .merge(fo_api::router().with_state(state))
        .nest_service("/uploads", uploads)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .layer(middleware::from_fn_with_state(metrics, metrics::metrics_middleware))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
