use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // Poll-driven browser clients call these endpoints from a different origin
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .nest("/api/v1/duels", duel_routes())
        .nest("/api/v1/presence", presence_routes())
        .nest("/api/v1/solo", solo_routes())
        .route("/api/v1/skill", get(handlers::skill::get_skill))
        .nest("/admin", admin_routes())
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn duel_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/", post(handlers::duels::create_challenge))
        .route("/pending", get(handlers::duels::get_pending_challenge))
        .route("/{id}", get(handlers::duels::get_duel_state))
        .route("/{id}/accept", post(handlers::duels::accept_challenge))
        .route("/{id}/answers", post(handlers::duels::submit_answer))
        .route("/{id}/summary", get(handlers::duels::get_duel_summary))
}

fn presence_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/heartbeat", post(handlers::presence::heartbeat))
        .route("/opponents", get(handlers::presence::list_opponents))
}

fn solo_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/", post(handlers::solo::create_session))
        .route("/{id}/answers", post(handlers::solo::submit_answer))
        .route("/{id}/complete", post(handlers::solo::complete_session))
}

fn admin_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new().route("/duels/{id}/expire", post(handlers::admin::force_expire_duel))
}
