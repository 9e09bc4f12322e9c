use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smartconvert_api::api::handlers::{self, AppState};
use smartconvert_api::config::Config;
use smartconvert_api::integrations::backend_client::BackendClient;
use smartconvert_api::integrations::snapshot::SnapshotStore;

/// Main entry point for the dashboard API.
///
/// Initializes logging, loads configuration, builds the backend client and the
/// snapshot cache, then serves the dashboard routes.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smartconvert_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let backend = BackendClient::new(
        config.backend_base_url.clone(),
        Duration::from_secs(config.backend_timeout_secs),
    )?;
    tracing::info!("✓ Backend client initialized: {}", config.backend_base_url);

    let snapshots = SnapshotStore::new(
        backend,
        config.snapshot_limit,
        Duration::from_secs(config.snapshot_ttl_secs),
    );
    tracing::info!(
        "Snapshot cache initialized ({}s TTL, up to {} leads)",
        config.snapshot_ttl_secs,
        config.snapshot_limit
    );

    let app_state = Arc::new(AppState {
        config: config.clone(),
        snapshots,
    });

    // Rate limiter: 20 requests/second per IP, burst of 40
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(20)
            .burst_size(40)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let api_routes = Router::new()
        .route("/api/v1/dashboard/leads", get(handlers::list_leads))
        .route("/api/v1/dashboard/leads/:id", get(handlers::get_lead))
        .route(
            "/api/v1/dashboard/leads/:id/status",
            put(handlers::update_lead_status),
        )
        .route("/api/v1/dashboard/filters", get(handlers::filter_options))
        .route(
            "/api/v1/dashboard/analytics",
            get(handlers::analytics_summary),
        )
        .route(
            "/api/v1/dashboard/refresh",
            post(handlers::refresh_snapshot),
        )
        .layer(
            ServiceBuilder::new()
                // Status updates are tiny; 64KB is plenty
                .layer(RequestBodyLimitLayer::new(64 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
