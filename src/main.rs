mod auth;
mod config;
mod db;
mod errors;
mod export;
mod handlers;
mod match_handler;
mod matching;
mod models;
mod storage;
mod upload;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool (running pending
/// migrations), and the HTTP router with its security layers, then serves.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amfi_matching_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool and run migrations
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        db: db.pool.clone(),
        config: config.clone(),
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Routes behind the rate limiter and body size cap. Authentication is
    // enforced per-handler by the AuthUser extractor.
    let api_routes = Router::new()
        .route("/api", get(handlers::root))
        // Authentication
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        // Originador CRUD
        .route(
            "/api/originadores",
            post(handlers::create_originador).get(handlers::list_originadores),
        )
        .route(
            "/api/originadores/:id",
            get(handlers::get_originador)
                .put(handlers::update_originador)
                .delete(handlers::delete_originador),
        )
        // Investidor CRUD
        .route(
            "/api/investidores",
            post(handlers::create_investidor).get(handlers::list_investidores),
        )
        .route(
            "/api/investidores/:id",
            get(handlers::get_investidor)
                .put(handlers::update_investidor)
                .delete(handlers::delete_investidor),
        )
        // Matching pipeline
        .route("/api/matches", get(match_handler::list_matches))
        .route("/api/matches/stats", get(match_handler::match_stats))
        .route(
            "/api/export/matches/csv",
            get(match_handler::export_matches_csv),
        )
        // Audit trail
        .route("/api/audit", get(handlers::audit_history))
        // Eligibility documents
        .route(
            "/api/upload/elegibilidade",
            post(upload::upload_elegibilidade),
        )
        .route(
            "/api/upload/elegibilidade/:filename",
            get(upload::download_elegibilidade),
        )
        .layer(
            ServiceBuilder::new()
                // Request size limit: 10MB max payload (covers document uploads)
                .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting so orchestrators can probe freely
    let app = Router::new()
        .route("/api/health", get(handlers::health))
        .merge(api_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
