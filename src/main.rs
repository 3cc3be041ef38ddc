//! Native Plant Nursery Server
//!
//! Public storefront catalog plus the admin back-office API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    NURSERY SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  Catalog  │  │  Admin    │  │  Admin Back-Office      │ │
//! │  │  (public) │  │  Session  │  │  plants/images/         │ │
//! │  │           │  │  (cookie) │  │  categories             │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │                ┌─────────────┐                             │
//! │                │ PostgreSQL  │                             │
//! │                └─────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod models;
mod handlers;
mod middleware;
mod error;
mod seed;

use axum::{
    Router,
    routing::{get, post, put, delete},
    middleware as axum_middleware,
    http::{header, HeaderValue, Method},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
    services::ServeDir,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use anyhow::Context;
use std::net::SocketAddr;

pub use error::{AppError, AppJson, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    init_tracing(&config.log_format);

    tracing::info!("Nursery server starting ({})...", config.environment);
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    if !config.admin_login_enabled() {
        tracing::warn!("ADMIN_PASSWORD_HASH is not set; admin login is disabled");
    }

    // Initialize database pool
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    if config.is_development() && seed::seed_if_empty(&pool).await.context("Failed to seed catalog")? {
        tracing::info!("Development catalog seeded");
    }

    // Build application state
    let state = AppState {
        pool,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(log_format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nursery_server=debug,tower_http=debug".into());

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Storefront routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/plants", get(handlers::catalog::list))
        .route("/api/v1/plants/featured", get(handlers::catalog::featured))
        .route("/api/v1/plants/facets", get(handlers::catalog::facets))
        .route("/api/v1/plants/:id", get(handlers::catalog::get))
        .route("/api/v1/categories", get(handlers::catalog::categories));

    // Session routes
    let auth_routes = Router::new()
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route("/api/v1/auth/session", get(handlers::auth::session));

    // Back-office routes (admin session cookie)
    let admin_routes = Router::new()
        // Plants
        .route("/api/v1/admin/plants", get(handlers::admin_plants::list).post(handlers::admin_plants::create))
        .route(
            "/api/v1/admin/plants/:id",
            get(handlers::admin_plants::get)
                .put(handlers::admin_plants::update)
                .delete(handlers::admin_plants::delete),
        )
        .route("/api/v1/admin/plants/:id/categories", put(handlers::admin_plants::set_categories))

        // Images
        .route("/api/v1/admin/plants/:id/images", get(handlers::admin_images::list).post(handlers::admin_images::add))
        .route("/api/v1/admin/plants/:id/images/order", put(handlers::admin_images::reorder))
        .route(
            "/api/v1/admin/plants/:id/images/:image_id/primary",
            put(handlers::admin_images::set_primary),
        )
        .route("/api/v1/admin/images/:image_id", delete(handlers::admin_images::delete))

        // Categories
        .route("/api/v1/admin/categories", get(handlers::admin_categories::list).post(handlers::admin_categories::create))
        .route(
            "/api/v1/admin/categories/:id",
            put(handlers::admin_categories::update).delete(handlers::admin_categories::delete),
        )

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_admin
        ));

    let mut router = Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(admin_routes);

    if let Some(dir) = &state.config.static_dir {
        tracing::info!("Serving images from {}", dir.display());
        router = router.nest_service("/images", ServeDir::new(dir));
    }

    router
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(state.config.cors_origin.as_deref()))
        .with_state(state)
}

/// Any origin without credentials, or one configured origin with cookies allowed
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allowed = origin.and_then(|o| match HeaderValue::from_str(o) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring invalid CORS_ORIGIN {:?}: {}", o, e);
            None
        }
    });

    match allowed {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}
