//! DigiGov Citizen Services Backend
//!
//! REST backend for citizen accounts, complaints and document uploads,
//! persisted in SQLite with files kept on local disk.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod location;
mod models;
mod storage;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use location::GeoLocator;
use storage::UploadStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub uploads: Arc<UploadStore>,
    pub locator: Arc<GeoLocator>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting DigiGov Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Upload directory: {:?}", config.upload_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));
    tracing::info!("Schema version {}", repo.schema_version().await?);

    let uploads = Arc::new(UploadStore::new(config.upload_dir.clone()).await?);

    // One-time import of the JSON files the previous deployment wrote
    if let Some(legacy_dir) = &config.legacy_dir {
        if repo.import_legacy(legacy_dir, &uploads).await?.is_none() {
            tracing::info!("Legacy import already recorded, skipping");
        }
    }
    tracing::info!("{} registered accounts", repo.count_users().await?);

    let locator = Arc::new(GeoLocator::new(config.geolocation_url.clone())?);

    // Create application state
    let state = AppState {
        repo,
        uploads,
        locator,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/health", get(api::health_check))
        // Accounts
        .route("/register", post(api::register_citizen))
        .route("/login", post(api::login_citizen))
        .route("/official/register", post(api::register_official))
        .route("/official/login", post(api::login_official))
        // Complaints
        .route(
            "/complaints",
            get(api::list_complaints).post(api::create_complaint),
        )
        .route("/complaints/{id}", get(api::get_complaint))
        .route("/complaints/{id}/status", put(api::update_complaint_status))
        // Documents
        .route(
            "/documents",
            get(api::list_documents).post(api::upload_document),
        )
        .route("/documents/{id}", delete(api::delete_document))
        .route("/documents/{id}/download", get(api::download_document))
        .route("/documents/{id}/view", get(api::view_document))
        // Misc
        .route("/notifications", get(api::list_notifications))
        .route("/location", get(api::get_location))
        .route("/voice", post(api::process_voice));

    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests;
