//! Recipe API Server
//!
//! A REST service for user accounts, per-user tags and per-user recipes.
//! Storage is injected through the [`recipe_store::Store`] trait, so the same
//! router runs against PostgreSQL in production and in memory in tests.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

use std::sync::Arc;

use auth::{JwtConfig, JwtManager};
use axum::Router;
use recipe_store::Store;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::state::{AppState, create_shared_state};

/// Creates the application router with all routes configured.
pub fn create_app<S: Store + 'static>(state: Arc<AppState<S>>) -> Router {
    let enable_cors = state.config.enable_cors;
    let app = api::create_router(state).layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app.layer(cors)
    } else {
        app
    }
}

/// Creates the token manager described by the configuration.
pub fn create_jwt_manager(config: &Config) -> JwtManager {
    let jwt_config = JwtConfig::new(&config.jwt_secret)
        .with_expiration_hours(config.jwt_expiration_hours)
        .with_issuer(&config.jwt_issuer);
    JwtManager::new(jwt_config)
}

/// Creates the application state with the given configuration and store.
pub fn create_state<S: Store>(config: Config, store: S) -> Arc<AppState<S>> {
    let jwt_manager = create_jwt_manager(&config);
    create_shared_state(config, store, jwt_manager)
}

/// Initializes tracing with the given log level.
///
/// `RUST_LOG` takes precedence when set.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
