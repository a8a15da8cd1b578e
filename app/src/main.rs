use axum::{
    routing::post,
    Router,
    middleware::{self},
};
use clap::Parser;
use common::{AppState, Config, auth::auth_middleware};
use database::Database;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tower_sessions::{MemoryStore, SessionManagerLayer};

mod handlers;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize Logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Load Config from .env, environment and CLI args
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }
    let config = Config::parse();

    // 3. Initialize Database
    let db = Database::new(&config.database_url).await?;
    db.run_migrations().await?;

    let state = Arc::new(AppState::new(db, config.clone()));
    tracing::info!(
        week_start = ?state.policy.week_start,
        exclusions = ?state.policy.exclusions,
        "reconciliation policy loaded"
    );

    // 4. Session Store
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false); // Set to true in production with HTTPS

    // 5. Routing
    let protected_routes = Router::<Arc<AppState>>::new()
        .nest("/api/costs", costs::handler::costs_router(state.clone()))
        .nest("/api/budget", budgets::handler::budgets_router(state.clone()))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let app = Router::<Arc<AppState>>::new()
        .route("/api/login", post(handlers::auth::login))
        .route("/api/logout", post(handlers::auth::logout))
        .merge(protected_routes)
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    // 6. Start Server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    if config.app_password.is_none() {
        tracing::warn!(
            "APP_PASSWORD is not set! Authentication is DISABLED; all data belongs to '{}'.",
            config.default_user
        );
    }
    axum::serve(listener, app).await?;

    Ok(())
}
