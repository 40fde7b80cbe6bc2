pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

pub use engine::{ExecuteOutcome, LedgerEngine, DEFAULT_MAX_RETRIES};
pub use error::LedgerError;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub engine: LedgerEngine,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/transactions", post(handlers::create_transaction))
        .route("/transactions/:account_id", get(handlers::transaction_history))
        .route("/accounts/:account_id/balance", get(handlers::account_balance))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
